use axum::http::HeaderMap;

use crate::errors::AaError;
use crate::settings::Credentials;

pub const CLIENT_ID_HEADER: &str = "x-client-id";
pub const CLIENT_SECRET_HEADER: &str = "x-client-secret";

/// Credential pair presented by a consumer on one request.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    /// Both headers must be present, valid UTF-8 and non-empty.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| {
            headers
                .get(name)?
                .to_str()
                .ok()
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        Some(Self {
            client_id: header(CLIENT_ID_HEADER)?,
            client_secret: header(CLIENT_SECRET_HEADER)?,
        })
    }
}

/// Checks presented credentials against the configured pair. Built once at
/// start-up from `Settings`.
#[derive(Clone)]
pub struct CredentialCheck {
    expected: Credentials,
}

impl CredentialCheck {
    pub fn new(expected: Credentials) -> Self {
        if expected.client_id.is_empty() || expected.client_secret.is_empty() {
            tracing::warn!("No consumer credentials configured; every consumer request will be rejected");
        }
        Self { expected }
    }

    pub fn verify(&self, headers: &HeaderMap) -> Result<(), AaError> {
        let presented =
            ClientCredentials::from_headers(headers).ok_or(AaError::MissingCredentials)?;

        // An unconfigured pair never matches, even an empty presented one.
        if self.expected.client_id.is_empty() || self.expected.client_secret.is_empty() {
            return Err(AaError::InvalidCredentials);
        }
        if presented.client_id != self.expected.client_id
            || presented.client_secret != self.expected.client_secret
        {
            tracing::warn!("Rejected consumer credentials");
            return Err(AaError::InvalidCredentials);
        }
        Ok(())
    }
}
