//! Assembles a session's data payload from raw ledger records.

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::errors::AaError;
use crate::model::{format_timestamp, Consent, DateRange, FiRecord, FiType};
use crate::repository::Store;

/// All records of one provider covered by the consent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FipBundle {
    #[serde(rename = "fipID")]
    pub fip_id: String,
    pub data: Vec<AccountData>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountData {
    #[serde(rename = "linkRefNumber")]
    pub link_ref_number: String,
    #[serde(rename = "maskedAccNumber")]
    pub masked_acc_number: String,
    #[serde(rename = "decryptedFI")]
    pub decrypted_fi: DecryptedFi,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecryptedFi {
    #[serde(rename = "fiType")]
    pub fi_type: FiType,
    pub data: Vec<Map<String, Value>>,
}

/// Build one bundle per provider the consent has accounts at.
///
/// Bundles follow first-encounter order over the consent's account list;
/// records inside an account are newest first and restricted to `window`
/// (both ends inclusive). No linked accounts yields an empty vector.
pub async fn generate(
    store: &dyn Store,
    consent: &Consent,
    window: &DateRange,
) -> Result<Vec<FipBundle>, AaError> {
    let accounts = crate::directory::linked_accounts(store, consent).await?;

    let mut bundles: Vec<FipBundle> = Vec::new();
    for account in accounts {
        let records = store
            .records_in_window(&account.account_id, window.from, window.to)
            .await?;

        let entry = AccountData {
            link_ref_number: account.link_ref_number,
            masked_acc_number: account.masked_acc_number,
            decrypted_fi: DecryptedFi {
                fi_type: account.fi_type,
                data: records.iter().map(record_entry).collect(),
            },
        };

        match bundles.iter_mut().find(|b| b.fip_id == account.fip_id) {
            Some(bundle) => bundle.data.push(entry),
            None => bundles.push(FipBundle {
                fip_id: account.fip_id,
                data: vec![entry],
            }),
        }
    }
    Ok(bundles)
}

/// The record's own payload with timestamp, amount and direction written
/// over it at top level.
pub fn record_entry(record: &FiRecord) -> Map<String, Value> {
    let mut entry = record.payload.clone();
    entry.insert(
        "transactionDate".to_string(),
        Value::String(format_timestamp(&record.transaction_at)),
    );
    entry.insert(
        "amount".to_string(),
        Number::from_f64(record.amount).map_or(Value::Null, Value::Number),
    );
    entry.insert(
        "type".to_string(),
        Value::String(record.txn_type.to_string()),
    );
    entry
}
