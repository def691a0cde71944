//! Domain types shared by the lifecycles, the payload generator and storage.
//!
//! Closed sets are plain enums. Their wire spelling (SCREAMING_SNAKE_CASE,
//! except session formats) is shared by serde and by the string form kept in
//! the database, so both go through `strum`.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentStatus {
    Pending,
    Active,
    Rejected,
    Revoked,
    Expired,
    Failed,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Pending,
    Completed,
    Failed,
    Partial,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchType {
    #[default]
    Onetime,
    Periodic,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentMode {
    Store,
    #[default]
    View,
    Query,
    Stream,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DataLifeUnit {
    Month,
    Year,
    Day,
    Inf,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FrequencyUnit {
    Hourly,
    Daily,
    Monthly,
    Yearly,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InstitutionType {
    Bank,
    Nbfc,
    MutualFund,
    Insurance,
    PensionFund,
    Other,
}

/// ACTIVE/INACTIVE flag used by institutions and accounts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatus {
    #[default]
    Active,
    Inactive,
}

/// Financial-instrument type of an account, also the unit of consent scope.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FiType {
    Deposit,
    TermDeposit,
    RecurringDeposit,
    Sip,
    Cp,
    GovtSecurities,
    Equities,
    Bonds,
    Debentures,
    MutualFunds,
    Etf,
    Idr,
    Cis,
    Aif,
    InsurancePolicies,
    Nps,
    Invit,
    Reit,
    #[serde(rename = "GSTR1_3B")]
    #[strum(serialize = "GSTR1_3B")]
    Gstr1And3b,
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TxnType {
    Credit,
    Debit,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionFormat {
    #[default]
    Json,
    Xml,
}

/// Parse a window bound. RFC 3339 timestamps and bare `YYYY-MM-DD` dates
/// (midnight UTC) are accepted.
///
/// Sub-millisecond digits are dropped: windows are compared and stored at
/// millisecond precision.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).trunc_subsecs(3));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Wire format for every timestamp the service emits.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Inclusive `[from, to]` data window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        *ts >= self.from && *ts <= self.to
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLife {
    pub unit: DataLifeUnit,
    pub value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frequency {
    pub unit: FrequencyUnit,
    pub value: i64,
}

/// Opaque consent context entry, echoed back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub customer_id: String,
    pub name: String,
    pub mobile: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Institution {
    pub fip_id: String,
    pub name: String,
    pub institution_type: InstitutionType,
    pub status: EntityStatus,
    pub fi_types: Vec<FiType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub account_id: String,
    pub customer_id: String,
    pub fip_id: String,
    pub fi_type: FiType,
    pub masked_acc_number: String,
    pub link_ref_number: String,
    pub status: EntityStatus,
}

/// One immutable ledger entry of an account.
#[derive(Debug, Clone, PartialEq)]
pub struct FiRecord {
    pub account_id: String,
    pub transaction_at: DateTime<Utc>,
    pub amount: f64,
    pub txn_type: TxnType,
    /// Instrument-specific detail (merchant, reference, balance, NAV, ...).
    pub payload: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentDetail {
    pub purpose_code: String,
    pub purpose_text: String,
    pub fi_data_range: DateRange,
    pub data_life: DataLife,
    pub frequency: Frequency,
    pub fi_types: Vec<FiType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsentUsage {
    pub count: i64,
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consent {
    pub consent_id: String,
    pub customer_id: String,
    pub status: ConsentStatus,
    pub redirect_url: String,
    pub fetch_type: FetchType,
    pub consent_mode: ConsentMode,
    pub detail: ConsentDetail,
    /// Linked account ids in approval order. Empty unless ACTIVE.
    pub accounts: Vec<String>,
    pub usage: ConsentUsage,
    pub expires_at: DateTime<Utc>,
    pub context: Vec<ContextEntry>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_id: String,
    pub consent_id: String,
    pub status: SessionStatus,
    pub format: SessionFormat,
    pub data_range: DateRange,
    /// `None` until materialized; never changes afterwards.
    pub payload: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Anything whose usability is bounded by a status and an absolute deadline.
pub trait Expiring {
    type Status: Copy + PartialEq + std::fmt::Display;

    fn status(&self) -> Self::Status;
    fn expires_at(&self) -> DateTime<Utc>;
}

impl Expiring for Consent {
    type Status = ConsentStatus;

    fn status(&self) -> ConsentStatus {
        self.status
    }

    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}
