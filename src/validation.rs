//! Stateless checks shared by the consent and session lifecycles.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::errors::AaError;
use crate::model::{parse_timestamp, DateRange, Expiring};

/// Parse and order-check a window. Either bound unparsable, or
/// `from >= to`, is an `InvalidDateRange`.
pub fn validate_date_range(from: &str, to: &str) -> Result<DateRange, AaError> {
    let (Some(from), Some(to)) = (parse_timestamp(from), parse_timestamp(to)) else {
        return Err(AaError::InvalidDateRange("Invalid date format".to_string()));
    };
    if from >= to {
        return Err(AaError::InvalidDateRange(
            "From date must be before to date".to_string(),
        ));
    }
    Ok(DateRange { from, to })
}

/// Closed-interval containment of the request window in the bound window.
pub fn is_within(request: &DateRange, bound: &DateRange) -> bool {
    request.from >= bound.from && request.to <= bound.to
}

/// Status must be one of `allowed`, and the entity must not be past its
/// deadline. The deadline is checked even when the status is allowed.
pub fn validate_status<E: Expiring>(
    entity: &E,
    allowed: &[E::Status],
    now: DateTime<Utc>,
) -> Result<(), AaError> {
    let status = entity.status();
    if !allowed.contains(&status) {
        let allowed = allowed
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(AaError::InvalidStatus(format!(
            "Status must be one of: {allowed}. Current status: {status}"
        )));
    }
    if now > entity.expires_at() {
        return Err(AaError::Expired);
    }
    Ok(())
}

/// Every dotted path must resolve to a present, non-null value.
pub fn validate_required_fields(payload: &Value, paths: &[&str]) -> Result<(), AaError> {
    let missing: Vec<String> = paths
        .iter()
        .filter(|path| lookup(payload, path).map_or(true, Value::is_null))
        .map(|path| path.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AaError::MissingFields(missing))
    }
}

/// Resolve `a.b.c` against nested JSON objects.
pub fn lookup<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(payload, |value, segment| value.as_object()?.get(segment))
}
