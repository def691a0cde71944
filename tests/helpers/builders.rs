use aa_sandbox::model::{Account, EntityStatus, FiRecord, FiType, TxnType};
use aa_sandbox::repository::{AccountRepository, RecordRepository};
use aa_sandbox::storage::SqlStore;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

/// Builder for test accounts
pub struct AccountBuilder {
    account: Account,
}

impl AccountBuilder {
    pub fn new(account_id: &str, customer_id: &str, fip_id: &str) -> Self {
        Self {
            account: Account {
                account_id: account_id.to_string(),
                customer_id: customer_id.to_string(),
                fip_id: fip_id.to_string(),
                fi_type: FiType::Deposit,
                masked_acc_number: "XXXXXX0000".to_string(),
                link_ref_number: format!("link-{}", account_id.to_lowercase()),
                status: EntityStatus::Active,
            },
        }
    }

    pub fn fi_type(mut self, fi_type: FiType) -> Self {
        self.account.fi_type = fi_type;
        self
    }

    pub fn masked(mut self, masked: &str) -> Self {
        self.account.masked_acc_number = masked.to_string();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.account.status = EntityStatus::Inactive;
        self
    }

    pub async fn create(self, store: &SqlStore) -> Account {
        store
            .insert_account(&self.account)
            .await
            .expect("Failed to insert account");
        self.account
    }
}

/// Builder for ledger entries
pub struct RecordBuilder {
    record: FiRecord,
}

impl RecordBuilder {
    pub fn new(account_id: &str, transaction_at: DateTime<Utc>) -> Self {
        Self {
            record: FiRecord {
                account_id: account_id.to_string(),
                transaction_at,
                amount: 100.0,
                txn_type: TxnType::Debit,
                payload: Map::new(),
            },
        }
    }

    pub fn amount(mut self, amount: f64, txn_type: TxnType) -> Self {
        self.record.amount = amount;
        self.record.txn_type = txn_type;
        self
    }

    pub fn narration(self, narration: &str) -> Self {
        self.detail("narration", json!(narration))
    }

    pub fn detail(mut self, key: &str, value: Value) -> Self {
        self.record.payload.insert(key.to_string(), value);
        self
    }

    pub async fn create(self, store: &SqlStore) -> FiRecord {
        store
            .insert_record(&self.record)
            .await
            .expect("Failed to insert record");
        self.record
    }
}

/// Builder for consent creation request bodies
pub struct ConsentRequestBuilder {
    body: Value,
}

impl ConsentRequestBuilder {
    pub fn new(customer_id: &str) -> Self {
        Self {
            body: json!({
                "Detail": {
                    "Customer": { "id": customer_id },
                    "Purpose": { "code": "101", "text": "Wealth management service" },
                    "FIDataRange": {
                        "from": "2023-01-01T00:00:00.000Z",
                        "to": "2024-12-31T00:00:00.000Z"
                    },
                    "DataLife": { "unit": "MONTH", "value": 6 },
                    "Frequency": { "unit": "MONTHLY", "value": 1 },
                    "DataFilter": [{ "type": "DEPOSIT" }]
                },
                "redirectUrl": "https://fiu.example.com/consent/callback"
            }),
        }
    }

    pub fn window(mut self, from: &str, to: &str) -> Self {
        self.body["Detail"]["FIDataRange"] = json!({ "from": from, "to": to });
        self
    }

    pub fn fi_types(mut self, fi_types: &[&str]) -> Self {
        self.body["Detail"]["DataFilter"] = Value::Array(
            fi_types
                .iter()
                .map(|fi_type| json!({ "type": fi_type }))
                .collect(),
        );
        self
    }

    /// Set a top-level or `Detail` field.
    pub fn set(mut self, path: &str, value: Value) -> Self {
        match path.split_once('.') {
            Some((parent, child)) => self.body[parent][child] = value,
            None => self.body[path] = value,
        }
        self
    }

    /// Remove a field addressed by a dotted path.
    pub fn without(mut self, path: &str) -> Self {
        let mut segments: Vec<&str> = path.split('.').collect();
        let last = segments.pop().expect("empty path");
        let mut target = &mut self.body;
        for segment in segments {
            target = &mut target[segment];
        }
        if let Some(object) = target.as_object_mut() {
            object.remove(last);
        }
        self
    }

    pub fn build(self) -> Value {
        self.body
    }
}
