use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::model::format_timestamp;

/// Protocol version echoed in every error envelope.
pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Error, Diagnostic)]
pub enum AaError {
    #[error("Missing x-client-id or x-client-secret headers")]
    #[diagnostic(code(aa_sandbox::missing_credentials))]
    MissingCredentials,

    #[error("Invalid client credentials")]
    #[diagnostic(code(aa_sandbox::invalid_credentials))]
    InvalidCredentials,

    #[error("Missing required fields: {}", .0.join(", "))]
    #[diagnostic(code(aa_sandbox::missing_fields))]
    MissingFields(Vec<String>),

    #[error("{0}")]
    #[diagnostic(code(aa_sandbox::invalid_request))]
    InvalidRequest(String),

    #[error("{0}")]
    #[diagnostic(code(aa_sandbox::invalid_date_range))]
    InvalidDateRange(String),

    #[error("Requested date range is outside consent's allowed range")]
    #[diagnostic(code(aa_sandbox::date_range_out_of_bounds))]
    DateRangeOutOfBounds,

    #[error("Customer not found: {0}")]
    #[diagnostic(code(aa_sandbox::customer_not_found))]
    CustomerNotFound(String),

    #[error("Consent not found: {0}")]
    #[diagnostic(code(aa_sandbox::consent_not_found))]
    ConsentNotFound(String),

    #[error("Session not found: {0}")]
    #[diagnostic(code(aa_sandbox::session_not_found))]
    SessionNotFound(String),

    #[error("Route {0} not found")]
    #[diagnostic(code(aa_sandbox::route_not_found))]
    RouteNotFound(String),

    #[error("{0}")]
    #[diagnostic(code(aa_sandbox::invalid_status))]
    InvalidStatus(String),

    #[error("Consent has expired")]
    #[diagnostic(code(aa_sandbox::expired))]
    Expired,

    #[error("{0}")]
    #[diagnostic(code(aa_sandbox::invalid_accounts))]
    InvalidAccounts(String),

    #[error("Database error: {0}")]
    #[diagnostic(code(aa_sandbox::db))]
    Db(#[from] sea_orm::DbErr),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(aa_sandbox::serde))]
    Serde(#[from] serde_json::Error),

    #[error("Corrupt stored value: {0}")]
    #[diagnostic(code(aa_sandbox::storage))]
    Storage(String),

    #[error("Config error: {0}")]
    #[diagnostic(code(aa_sandbox::config))]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    #[diagnostic(code(aa_sandbox::io))]
    Io(#[from] std::io::Error),
}

impl AaError {
    /// Stable machine-readable code rendered as `errorCode`.
    pub fn code(&self) -> &'static str {
        match self {
            AaError::MissingCredentials => "MISSING_CREDENTIALS",
            AaError::InvalidCredentials => "INVALID_CREDENTIALS",
            AaError::MissingFields(_) | AaError::InvalidRequest(_) => "INVALID_REQUEST",
            AaError::InvalidDateRange(_) => "INVALID_DATE_RANGE",
            AaError::DateRangeOutOfBounds => "DATE_RANGE_OUT_OF_BOUNDS",
            AaError::CustomerNotFound(_) => "CUSTOMER_NOT_FOUND",
            AaError::ConsentNotFound(_) => "CONSENT_NOT_FOUND",
            AaError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            AaError::RouteNotFound(_) => "NOT_FOUND",
            AaError::InvalidStatus(_) => "INVALID_STATUS",
            AaError::Expired => "CONSENT_EXPIRED",
            AaError::InvalidAccounts(_) => "INVALID_ACCOUNTS",
            AaError::Db(_)
            | AaError::Serde(_)
            | AaError::Storage(_)
            | AaError::Config(_)
            | AaError::Io(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AaError::MissingCredentials | AaError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AaError::MissingFields(_)
            | AaError::InvalidRequest(_)
            | AaError::InvalidDateRange(_)
            | AaError::DateRangeOutOfBounds
            | AaError::InvalidStatus(_)
            | AaError::Expired
            | AaError::InvalidAccounts(_) => StatusCode::BAD_REQUEST,
            AaError::CustomerNotFound(_)
            | AaError::ConsentNotFound(_)
            | AaError::SessionNotFound(_)
            | AaError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            AaError::Db(_)
            | AaError::Serde(_)
            | AaError::Storage(_)
            | AaError::Config(_)
            | AaError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status() == StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Message safe to show to the caller. Internal details stay in the log.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "An unexpected error occurred".to_string()
        } else {
            self.to_string()
        }
    }
}

/// Uniform error body of every protocol operation.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    #[serde(rename = "errorCode")]
    pub error_code: String,
    #[serde(rename = "errorMsg")]
    pub error_msg: String,
    pub timestamp: String,
    pub txnid: String,
    pub ver: String,
}

impl ErrorEnvelope {
    pub fn new(error: &AaError, txnid: &str) -> Self {
        Self {
            error_code: error.code().to_string(),
            error_msg: error.public_message(),
            timestamp: format_timestamp(&Utc::now()),
            txnid: txnid.to_string(),
            ver: PROTOCOL_VERSION.to_string(),
        }
    }

    pub fn with_txnid(mut self, txnid: &str) -> Self {
        self.txnid = txnid.to_string();
        self
    }
}

impl IntoResponse for AaError {
    fn into_response(self) -> Response {
        if self.is_internal() {
            tracing::error!(error = %self, "request failed");
        }
        let status = self.status();
        let envelope = ErrorEnvelope::new(&self, "N/A");
        let mut response = (status, Json(envelope.clone())).into_response();
        // The router's envelope middleware rewrites txnid from the request
        response.extensions_mut().insert(envelope);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_lists_every_path() {
        let err = AaError::MissingFields(vec![
            "Detail.Customer.id".to_string(),
            "redirectUrl".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Missing required fields: Detail.Customer.id, redirectUrl"
        );
        assert_eq!(err.code(), "INVALID_REQUEST");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(AaError::MissingCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AaError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AaError::ConsentNotFound("c".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AaError::Expired.code(), "CONSENT_EXPIRED");
        assert_eq!(AaError::DateRangeOutOfBounds.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AaError::Storage("bad".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let err = AaError::Storage("unknown status 'WAT'".into());
        let envelope = ErrorEnvelope::new(&err, "req-1");
        assert_eq!(envelope.error_code, "INTERNAL_ERROR");
        assert_eq!(envelope.error_msg, "An unexpected error occurred");
        assert_eq!(envelope.txnid, "req-1");
        assert_eq!(envelope.ver, "1.0");
    }
}
