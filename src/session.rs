//! Session lifecycle: consent-bounded fetch requests whose payload is
//! materialized on first read, exactly once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::consent::get_consent;
use crate::errors::AaError;
use crate::model::{Consent, ConsentStatus, Session, SessionFormat, SessionStatus};
use crate::repository::Store;
use crate::validation::{
    is_within, lookup, validate_date_range, validate_required_fields, validate_status,
};

pub const REQUIRED_FIELDS: [&str; 3] = ["consentId", "DataRange.from", "DataRange.to"];

/// Per-session async mutexes, so concurrent first reads of one session in
/// this process queue behind a single materialization. Entries are dropped
/// once nobody holds or waits on them.
#[derive(Debug, Default)]
pub struct MaterializationLocks {
    slots: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

pub struct MaterializationGuard<'a> {
    locks: &'a MaterializationLocks,
    session_id: String,
    slot: Arc<tokio::sync::Mutex<()>>,
    held: Option<OwnedMutexGuard<()>>,
}

impl MaterializationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, session_id: &str) -> MaterializationGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(session_id.to_string()).or_default().clone()
        };
        let held = slot.clone().lock_owned().await;
        MaterializationGuard {
            locks: self,
            session_id: session_id.to_string(),
            slot,
            held: Some(held),
        }
    }

    /// Number of sessions with a live lock entry.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for MaterializationGuard<'_> {
    fn drop(&mut self) {
        self.held.take();
        let mut slots = self
            .locks
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // the map and this guard are the only owners left
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.session_id);
        }
    }
}

fn window_bound<'a>(request: &'a Value, path: &str) -> Result<&'a str, AaError> {
    lookup(request, path)
        .and_then(Value::as_str)
        .ok_or_else(|| AaError::InvalidDateRange("Invalid date format".to_string()))
}

/// Open a PENDING session inside an ACTIVE consent's data window.
pub async fn create_session(
    store: &dyn Store,
    request: &Value,
    now: DateTime<Utc>,
) -> Result<Session, AaError> {
    validate_required_fields(request, &REQUIRED_FIELDS)?;

    let data_range = validate_date_range(
        window_bound(request, "DataRange.from")?,
        window_bound(request, "DataRange.to")?,
    )?;

    let consent_id = request
        .get("consentId")
        .and_then(Value::as_str)
        .ok_or_else(|| AaError::InvalidRequest("consentId must be a string".to_string()))?;

    let format = match request.get("format") {
        None | Some(Value::Null) => SessionFormat::default(),
        Some(raw) => serde_json::from_value(raw.clone())
            .map_err(|_| AaError::InvalidRequest(format!("Unsupported format: {raw}")))?,
    };

    let consent = get_consent(store, consent_id).await?;
    validate_status(&consent, &[ConsentStatus::Active], now)?;

    if !is_within(&data_range, &consent.detail.fi_data_range) {
        tracing::warn!(consent_id, "Session window outside consent window");
        return Err(AaError::DateRangeOutOfBounds);
    }

    let session = Session {
        session_id: Uuid::new_v4().to_string(),
        consent_id: consent.consent_id,
        status: SessionStatus::Pending,
        format,
        data_range,
        payload: None,
        created_at: now,
        completed_at: None,
    };
    store.insert_session(&session).await?;

    tracing::info!(
        session_id = %session.session_id,
        consent_id = %session.consent_id,
        "Session created"
    );
    Ok(session)
}

/// Read a session, materializing its payload if this is the first read.
///
/// Only the caller whose conditional write flips PENDING to COMPLETED
/// counts a consent usage, in the same transaction as the flip. Every
/// caller gets the stored session back, so all of them see the same payload.
pub async fn get_session_by_id(
    store: &dyn Store,
    locks: &MaterializationLocks,
    session_id: &str,
) -> Result<(Session, Consent), AaError> {
    let mut session = find_session(store, session_id).await?;

    if session.status == SessionStatus::Pending {
        let _guard = locks.lock(session_id).await;
        let current = find_session(store, session_id).await?;
        if current.status == SessionStatus::Pending {
            materialize(store, &current).await?;
        }
        session = find_session(store, session_id).await?;
    }

    let consent = get_consent(store, &session.consent_id).await?;
    Ok((session, consent))
}

async fn find_session(store: &dyn Store, session_id: &str) -> Result<Session, AaError> {
    store
        .find_session(session_id)
        .await?
        .ok_or_else(|| AaError::SessionNotFound(session_id.to_string()))
}

async fn materialize(store: &dyn Store, session: &Session) -> Result<(), AaError> {
    let consent = get_consent(store, &session.consent_id).await?;
    let bundles = crate::payload::generate(store, &consent, &session.data_range).await?;
    let payload = serde_json::to_value(&bundles)?;

    let now = Utc::now();
    if store
        .complete_session(&session.session_id, &consent.consent_id, &payload, now)
        .await?
    {
        tracing::info!(
            session_id = %session.session_id,
            consent_id = %consent.consent_id,
            bundles = bundles.len(),
            "Session materialized"
        );
    } else {
        tracing::debug!(
            session_id = %session.session_id,
            "Session already materialized by another writer"
        );
    }
    Ok(())
}
