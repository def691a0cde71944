//! Narrow persistence interfaces, one per entity.
//!
//! The lifecycles only see these traits. `storage::SqlStore` is the
//! production implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::errors::AaError;
use crate::model::{Account, Consent, ConsentStatus, Customer, FiRecord, Institution, Session};

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_customer(&self, customer_id: &str) -> Result<Option<Customer>, AaError>;

    async fn insert_customer(&self, customer: &Customer) -> Result<(), AaError>;
}

#[async_trait]
pub trait InstitutionRepository: Send + Sync {
    async fn find_institution(&self, fip_id: &str) -> Result<Option<Institution>, AaError>;

    /// ACTIVE institutions ordered by display name.
    async fn list_active_institutions(&self) -> Result<Vec<Institution>, AaError>;

    async fn insert_institution(&self, institution: &Institution) -> Result<(), AaError>;
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_account(&self, account_id: &str) -> Result<Option<Account>, AaError>;

    async fn accounts_for_customer(&self, customer_id: &str) -> Result<Vec<Account>, AaError>;

    async fn insert_account(&self, account: &Account) -> Result<(), AaError>;
}

#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Records of one account with `from <= transaction_at <= to`, newest first.
    async fn records_in_window(
        &self,
        account_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<FiRecord>, AaError>;

    async fn insert_record(&self, record: &FiRecord) -> Result<(), AaError>;
}

#[async_trait]
pub trait ConsentRepository: Send + Sync {
    async fn insert_consent(&self, consent: &Consent) -> Result<(), AaError>;

    async fn find_consent(&self, consent_id: &str) -> Result<Option<Consent>, AaError>;

    /// PENDING -> ACTIVE and link `account_ids`, as one conditional write.
    /// Returns `false` when the consent was no longer PENDING.
    async fn activate_consent(
        &self,
        consent_id: &str,
        account_ids: &[String],
    ) -> Result<bool, AaError>;

    /// `from` -> `to` if the stored status is still `from`.
    async fn transition_consent(
        &self,
        consent_id: &str,
        from: ConsentStatus,
        to: ConsentStatus,
    ) -> Result<bool, AaError>;

    /// Increment the usage counter in place and stamp `last_used`.
    async fn record_usage(&self, consent_id: &str, at: DateTime<Utc>) -> Result<bool, AaError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert_session(&self, session: &Session) -> Result<(), AaError>;

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>, AaError>;

    /// PENDING -> COMPLETED with `payload`, counting one usage against
    /// `consent_id` in the same transaction. Returns `false` when another
    /// writer completed the session first; the stored payload and the
    /// usage counter are untouched. If the usage write fails nothing is
    /// committed and the session stays PENDING.
    async fn complete_session(
        &self,
        session_id: &str,
        consent_id: &str,
        payload: &Value,
        at: DateTime<Utc>,
    ) -> Result<bool, AaError>;
}

/// Everything the protocol core needs from its storage collaborator.
pub trait Store:
    CustomerRepository
    + InstitutionRepository
    + AccountRepository
    + RecordRepository
    + ConsentRepository
    + SessionRepository
{
}

impl<T> Store for T where
    T: CustomerRepository
        + InstitutionRepository
        + AccountRepository
        + RecordRepository
        + ConsentRepository
        + SessionRepository
{
}
