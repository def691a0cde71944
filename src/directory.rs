//! Read-only lookups over the reference catalog: customers, providers and
//! the accounts they hold.

use std::collections::HashMap;

use crate::errors::AaError;
use crate::model::{Account, Consent, Customer, EntityStatus, Institution};
use crate::repository::Store;

/// An account together with the display name of the provider holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldAccount {
    pub account: Account,
    pub provider_name: String,
}

pub async fn list_providers(store: &dyn Store) -> Result<Vec<Institution>, AaError> {
    store.list_active_institutions().await
}

pub async fn require_customer(store: &dyn Store, customer_id: &str) -> Result<Customer, AaError> {
    store
        .find_customer(customer_id)
        .await?
        .ok_or_else(|| AaError::CustomerNotFound(customer_id.to_string()))
}

/// Accounts bound to `consent`, in approval order.
///
/// A link to an account that no longer exists is a storage inconsistency,
/// not a caller error.
pub async fn linked_accounts(store: &dyn Store, consent: &Consent) -> Result<Vec<Account>, AaError> {
    let mut accounts = Vec::with_capacity(consent.accounts.len());
    for account_id in &consent.accounts {
        let account = store.find_account(account_id).await?.ok_or_else(|| {
            AaError::Storage(format!(
                "consent {} links unknown account {account_id}",
                consent.consent_id
            ))
        })?;
        accounts.push(account);
    }
    Ok(accounts)
}

/// The customer's ACTIVE accounts whose instrument type the consent covers.
pub async fn approval_candidates(
    store: &dyn Store,
    consent: &Consent,
) -> Result<Vec<HeldAccount>, AaError> {
    let accounts = store.accounts_for_customer(&consent.customer_id).await?;

    let mut names: HashMap<String, String> = HashMap::new();
    let mut candidates = Vec::new();
    for account in accounts {
        if account.status != EntityStatus::Active
            || !consent.detail.fi_types.contains(&account.fi_type)
        {
            continue;
        }
        if !names.contains_key(&account.fip_id) {
            let name = store
                .find_institution(&account.fip_id)
                .await?
                .map(|institution| institution.name)
                .unwrap_or_else(|| account.fip_id.clone());
            names.insert(account.fip_id.clone(), name);
        }
        let provider_name = names
            .get(&account.fip_id)
            .cloned()
            .unwrap_or_default();
        candidates.push(HeldAccount {
            account,
            provider_name,
        });
    }
    Ok(candidates)
}
