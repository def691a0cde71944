//! Consent lifecycle: PENDING -> ACTIVE | REJECTED, plus usage accounting.

use std::collections::HashSet;

use axum::http::HeaderValue;
use chrono::{DateTime, Months, Utc};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AaError;
use crate::model::{
    Consent, ConsentDetail, ConsentMode, ConsentStatus, ConsentUsage, ContextEntry, DataLife,
    FetchType, FiType, Frequency,
};
use crate::repository::Store;
use crate::validation::{lookup, validate_date_range, validate_required_fields, validate_status};

pub const REQUIRED_FIELDS: [&str; 10] = [
    "Detail.Customer.id",
    "Detail.Purpose.code",
    "Detail.FIDataRange.from",
    "Detail.FIDataRange.to",
    "Detail.DataLife.unit",
    "Detail.DataLife.value",
    "Detail.Frequency.unit",
    "Detail.Frequency.value",
    "Detail.DataFilter",
    "redirectUrl",
];

/// Validity of a new consent.
const CONSENT_VALIDITY_MONTHS: u32 = 12;

#[derive(Debug, Deserialize)]
struct ConsentRequest {
    #[serde(rename = "Detail")]
    detail: DetailRequest,
    #[serde(rename = "redirectUrl")]
    redirect_url: String,
    #[serde(rename = "fetchType")]
    fetch_type: Option<FetchType>,
    #[serde(rename = "consentMode")]
    consent_mode: Option<ConsentMode>,
    context: Option<Vec<ContextEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetailRequest {
    customer: CustomerRef,
    purpose: PurposeRequest,
    data_life: DataLife,
    frequency: Frequency,
    data_filter: Vec<DataFilterEntry>,
    #[serde(rename = "fetchType")]
    fetch_type: Option<FetchType>,
    #[serde(rename = "consentMode")]
    consent_mode: Option<ConsentMode>,
}

#[derive(Debug, Deserialize)]
struct CustomerRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PurposeRequest {
    code: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DataFilterEntry {
    #[serde(rename = "type")]
    fi_type: FiType,
}

fn window_bound<'a>(request: &'a Value, path: &str) -> Result<&'a str, AaError> {
    lookup(request, path)
        .and_then(Value::as_str)
        .ok_or_else(|| AaError::InvalidDateRange("Invalid date format".to_string()))
}

/// Validate a consent request and persist it as PENDING.
pub async fn create_consent(
    store: &dyn Store,
    request: &Value,
    now: DateTime<Utc>,
) -> Result<Consent, AaError> {
    validate_required_fields(request, &REQUIRED_FIELDS)?;

    let fi_data_range = validate_date_range(
        window_bound(request, "Detail.FIDataRange.from")?,
        window_bound(request, "Detail.FIDataRange.to")?,
    )?;

    let parsed: ConsentRequest = serde_json::from_value(request.clone())
        .map_err(|e| AaError::InvalidRequest(format!("Invalid consent request: {e}")))?;

    // approve and reject answer with a Location header pointing here
    if HeaderValue::from_str(&parsed.redirect_url).is_err() {
        return Err(AaError::InvalidRequest(
            "redirectUrl is not a valid URL".to_string(),
        ));
    }

    let customer = crate::directory::require_customer(store, &parsed.detail.customer.id).await?;

    let expires_at = now
        .checked_add_months(Months::new(CONSENT_VALIDITY_MONTHS))
        .ok_or_else(|| AaError::InvalidRequest("Consent expiry out of range".to_string()))?;

    let detail = parsed.detail;
    let consent = Consent {
        consent_id: Uuid::new_v4().to_string(),
        customer_id: customer.customer_id,
        status: ConsentStatus::Pending,
        redirect_url: parsed.redirect_url,
        fetch_type: parsed.fetch_type.or(detail.fetch_type).unwrap_or_default(),
        consent_mode: parsed
            .consent_mode
            .or(detail.consent_mode)
            .unwrap_or_default(),
        detail: ConsentDetail {
            purpose_text: detail
                .purpose
                .text
                .unwrap_or_else(|| detail.purpose.code.clone()),
            purpose_code: detail.purpose.code,
            fi_data_range,
            data_life: detail.data_life,
            frequency: detail.frequency,
            fi_types: detail.data_filter.into_iter().map(|f| f.fi_type).collect(),
        },
        accounts: Vec::new(),
        usage: ConsentUsage::default(),
        expires_at,
        context: parsed.context.unwrap_or_default(),
        created_at: now,
    };

    store.insert_consent(&consent).await?;
    tracing::info!(
        consent_id = %consent.consent_id,
        customer_id = %consent.customer_id,
        "Consent created"
    );
    Ok(consent)
}

pub async fn get_consent(store: &dyn Store, consent_id: &str) -> Result<Consent, AaError> {
    store
        .find_consent(consent_id)
        .await?
        .ok_or_else(|| AaError::ConsentNotFound(consent_id.to_string()))
}

/// Bind `account_ids` to a PENDING consent and activate it.
///
/// All-or-nothing: one unknown or foreign account fails the whole call and
/// nothing is linked.
pub async fn approve_consent(
    store: &dyn Store,
    consent_id: &str,
    account_ids: &[String],
    now: DateTime<Utc>,
) -> Result<Consent, AaError> {
    let consent = get_consent(store, consent_id).await?;
    validate_status(&consent, &[ConsentStatus::Pending], now)?;

    if account_ids.is_empty() {
        return Err(AaError::InvalidAccounts(
            "At least one account must be selected".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = account_ids.iter().find(|id| !seen.insert(id.as_str())) {
        return Err(AaError::InvalidAccounts(format!("Duplicate account: {dup}")));
    }

    let mut invalid = Vec::new();
    for account_id in account_ids {
        match store.find_account(account_id).await? {
            Some(account) if account.customer_id == consent.customer_id => {}
            _ => invalid.push(account_id.as_str()),
        }
    }
    if !invalid.is_empty() {
        tracing::warn!(consent_id, accounts = ?invalid, "Approval names accounts outside the customer");
        return Err(AaError::InvalidAccounts(format!(
            "Accounts not held by the consent's customer: {}",
            invalid.join(", ")
        )));
    }

    if !store.activate_consent(consent_id, account_ids).await? {
        return Err(lost_transition(store, consent_id).await);
    }

    tracing::info!(consent_id, accounts = ?account_ids, "Consent approved");
    get_consent(store, consent_id).await
}

pub async fn reject_consent(
    store: &dyn Store,
    consent_id: &str,
    now: DateTime<Utc>,
) -> Result<Consent, AaError> {
    let consent = get_consent(store, consent_id).await?;
    validate_status(&consent, &[ConsentStatus::Pending], now)?;

    if !store
        .transition_consent(consent_id, ConsentStatus::Pending, ConsentStatus::Rejected)
        .await?
    {
        return Err(lost_transition(store, consent_id).await);
    }

    tracing::info!(consent_id, "Consent rejected");
    get_consent(store, consent_id).await
}

/// Count one successful data fetch against the consent.
pub async fn update_consent_usage(
    store: &dyn Store,
    consent_id: &str,
    now: DateTime<Utc>,
) -> Result<(), AaError> {
    if !store.record_usage(consent_id, now).await? {
        return Err(AaError::ConsentNotFound(consent_id.to_string()));
    }
    tracing::debug!(consent_id, "Consent usage recorded");
    Ok(())
}

/// A conditional write that matched nothing: somebody else moved the
/// consent out of PENDING between our read and our write.
async fn lost_transition(store: &dyn Store, consent_id: &str) -> AaError {
    let current = match store.find_consent(consent_id).await {
        Ok(Some(consent)) => consent.status,
        Ok(None) => return AaError::ConsentNotFound(consent_id.to_string()),
        Err(e) => return e,
    };
    tracing::warn!(consent_id, status = %current, "Consent transition lost to a concurrent writer");
    AaError::InvalidStatus(format!(
        "Status must be one of: {}. Current status: {current}",
        ConsentStatus::Pending
    ))
}
