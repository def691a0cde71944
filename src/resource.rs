//! Wire representations of consents, sessions and providers.

use serde::Serialize;
use serde_json::Value;

use crate::directory::HeldAccount;
use crate::model::{
    format_timestamp, Account, Consent, ConsentMode, ConsentStatus, ContextEntry, DataLife,
    EntityStatus, FetchType, FiType, Frequency, Institution, InstitutionType, Session,
    SessionFormat, SessionStatus,
};

#[derive(Debug, Clone, Serialize)]
pub struct ConsentResource {
    pub id: String,
    pub status: ConsentStatus,
    #[serde(rename = "Detail")]
    pub detail: DetailResource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "redirectUrl")]
    pub redirect_url: String,
    #[serde(rename = "Usage", skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageResource>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<ContextEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailResource {
    #[serde(rename = "consentStart")]
    pub consent_start: String,
    #[serde(rename = "consentExpiry")]
    pub consent_expiry: String,
    #[serde(rename = "Customer")]
    pub customer: IdRef,
    #[serde(rename = "FIDataRange")]
    pub fi_data_range: RangeResource,
    #[serde(rename = "consentMode")]
    pub consent_mode: ConsentMode,
    #[serde(rename = "fetchType")]
    pub fetch_type: FetchType,
    #[serde(rename = "Frequency")]
    pub frequency: Frequency,
    #[serde(rename = "DataLife")]
    pub data_life: DataLife,
    #[serde(rename = "DataFilter")]
    pub data_filter: Vec<DataFilterResource>,
    #[serde(rename = "Purpose")]
    pub purpose: PurposeResource,
    #[serde(rename = "Accounts", skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<LinkedAccountResource>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdRef {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RangeResource {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataFilterResource {
    #[serde(rename = "type")]
    pub fi_type: FiType,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurposeResource {
    pub code: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkedAccountResource {
    #[serde(rename = "linkRefNumber")]
    pub link_ref_number: String,
    #[serde(rename = "maskedAccNumber")]
    pub masked_acc_number: String,
    #[serde(rename = "fiType")]
    pub fi_type: FiType,
    #[serde(rename = "fipId")]
    pub fip_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageResource {
    pub count: i64,
    #[serde(rename = "lastUsed", skip_serializing_if = "Option::is_none")]
    pub last_used: Option<String>,
}

impl ConsentResource {
    /// `accounts` are the consent's linked accounts, already resolved.
    /// The approval link is only rendered while the consent is PENDING.
    pub fn new(consent: &Consent, accounts: &[Account], base_url: &str) -> Self {
        let detail = &consent.detail;
        Self {
            id: consent.consent_id.clone(),
            status: consent.status,
            detail: DetailResource {
                consent_start: format_timestamp(&consent.created_at),
                consent_expiry: format_timestamp(&consent.expires_at),
                customer: IdRef {
                    id: consent.customer_id.clone(),
                },
                fi_data_range: RangeResource {
                    from: format_timestamp(&detail.fi_data_range.from),
                    to: format_timestamp(&detail.fi_data_range.to),
                },
                consent_mode: consent.consent_mode,
                fetch_type: consent.fetch_type,
                frequency: detail.frequency,
                data_life: detail.data_life,
                data_filter: detail
                    .fi_types
                    .iter()
                    .map(|fi_type| DataFilterResource { fi_type: *fi_type })
                    .collect(),
                purpose: PurposeResource {
                    code: detail.purpose_code.clone(),
                    text: detail.purpose_text.clone(),
                },
                accounts: accounts
                    .iter()
                    .map(|account| LinkedAccountResource {
                        link_ref_number: account.link_ref_number.clone(),
                        masked_acc_number: account.masked_acc_number.clone(),
                        fi_type: account.fi_type,
                        fip_id: account.fip_id.clone(),
                    })
                    .collect(),
            },
            url: (consent.status == ConsentStatus::Pending)
                .then(|| approval_url(base_url, &consent.consent_id)),
            redirect_url: consent.redirect_url.clone(),
            usage: (consent.usage.count > 0).then(|| UsageResource {
                count: consent.usage.count,
                last_used: consent.usage.last_used.as_ref().map(format_timestamp),
            }),
            context: consent.context.clone(),
        }
    }
}

pub fn approval_url(base_url: &str, consent_id: &str) -> String {
    format!("{}/mock-aa/consents/{consent_id}", base_url.trim_end_matches('/'))
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResource {
    pub id: String,
    #[serde(rename = "consentId")]
    pub consent_id: String,
    pub status: SessionStatus,
    #[serde(rename = "DataRange")]
    pub data_range: RangeResource,
    pub format: SessionFormat,
    #[serde(rename = "Payload")]
    pub payload: Value,
}

impl From<&Session> for SessionResource {
    fn from(session: &Session) -> Self {
        let payload = match (&session.status, &session.payload) {
            (SessionStatus::Completed, Some(payload)) => payload.clone(),
            _ => Value::Array(Vec::new()),
        };
        Self {
            id: session.session_id.clone(),
            consent_id: session.consent_id.clone(),
            status: session.status,
            data_range: RangeResource {
                from: format_timestamp(&session.data_range.from),
                to: format_timestamp(&session.data_range.to),
            },
            format: session.format,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderResource {
    pub id: String,
    pub name: String,
    #[serde(rename = "institutionType")]
    pub institution_type: InstitutionType,
    pub status: EntityStatus,
    #[serde(rename = "fiTypes")]
    pub fi_types: Vec<FiType>,
}

impl From<&Institution> for ProviderResource {
    fn from(institution: &Institution) -> Self {
        Self {
            id: institution.fip_id.clone(),
            name: institution.name.clone(),
            institution_type: institution.institution_type,
            status: institution.status,
            fi_types: institution.fi_types.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderList {
    pub data: Vec<ProviderResource>,
}

/// What the approver sees for one consent.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalView {
    pub consent: ConsentResource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<CandidateResource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateResource {
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(rename = "linkRefNumber")]
    pub link_ref_number: String,
    #[serde(rename = "maskedAccNumber")]
    pub masked_acc_number: String,
    #[serde(rename = "fiType")]
    pub fi_type: FiType,
    #[serde(rename = "fipId")]
    pub fip_id: String,
    #[serde(rename = "fipName")]
    pub fip_name: String,
}

impl From<&HeldAccount> for CandidateResource {
    fn from(held: &HeldAccount) -> Self {
        Self {
            account_id: held.account.account_id.clone(),
            link_ref_number: held.account.link_ref_number.clone(),
            masked_acc_number: held.account.masked_acc_number.clone(),
            fi_type: held.account.fi_type,
            fip_id: held.account.fip_id.clone(),
            fip_name: held.provider_name.clone(),
        }
    }
}

impl ApprovalView {
    pub fn pending(consent: ConsentResource, candidates: &[HeldAccount]) -> Self {
        Self {
            consent,
            accounts: Some(candidates.iter().map(CandidateResource::from).collect()),
            message: None,
        }
    }

    pub fn settled(consent: ConsentResource) -> Self {
        let message = format!("This consent is already {}", consent.status);
        Self {
            consent,
            accounts: None,
            message: Some(message),
        }
    }
}
