//! HTTP surface: the consumer protocol routes, the approval routes used by
//! the customer's browser, and the uniform error envelope.
use crate::auth::CredentialCheck;
use crate::errors::{AaError, ErrorEnvelope};
use crate::model::{format_timestamp, ConsentStatus};
use crate::repository::Store;
use crate::resource::{
    ApprovalView, ConsentResource, ProviderList, ProviderResource, SessionResource,
};
use crate::session::MaterializationLocks;
use crate::settings::Settings;
use crate::{consent, directory, session};
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderName, HeaderValue, Request, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use miette::IntoDiagnostic;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn Store>,
    pub locks: Arc<MaterializationLocks>,
    pub auth: Arc<CredentialCheck>,
}

impl AppState {
    pub fn new(settings: Settings, store: Arc<dyn Store>) -> Self {
        let auth = CredentialCheck::new(settings.credentials.clone());
        Self {
            settings: Arc::new(settings),
            store,
            locks: Arc::new(MaterializationLocks::new()),
            auth: Arc::new(auth),
        }
    }

    fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}

// Security headers middleware
async fn security_headers(request: Request<Body>, next: Next) -> impl IntoResponse {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    // Consent and session bodies carry financial data
    headers.insert(
        HeaderName::from_static("cache-control"),
        HeaderValue::from_static("no-store"),
    );

    response
}

/// Fill `txnid` of error envelopes from the caller's request id.
async fn error_envelope(request: Request<Body>, next: Next) -> Response {
    let txnid = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let mut response = next.run(request).await;
    let Some(txnid) = txnid else {
        return response;
    };
    match response.extensions_mut().remove::<ErrorEnvelope>() {
        Some(envelope) => (response.status(), Json(envelope.with_txnid(&txnid))).into_response(),
        None => response,
    }
}

async fn require_client(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AaError> {
    state.auth.verify(request.headers())?;
    Ok(next.run(request).await)
}

pub fn router(state: AppState) -> Router {
    let consumer = Router::new()
        .route("/v2/fips", get(list_fips))
        .route("/consents", post(create_consent))
        .route("/consents/{id}", get(get_consent))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_client));

    Router::new()
        .route("/health", get(health))
        .route("/mock-aa/consents/{id}", get(approval_view))
        .route("/mock-aa/consents/{id}/approve", post(approve_consent))
        .route("/mock-aa/consents/{id}/reject", post(reject_consent))
        .merge(consumer)
        .fallback(not_found)
        .layer(middleware::from_fn(error_envelope))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(settings: Settings, store: Arc<dyn Store>) -> miette::Result<()> {
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .map_err(|e| miette::miette!("bad listen addr: {e}"))?;

    let state = AppState::new(settings, store);
    tracing::info!(base_url = %state.settings.base_url(), "Approval links use this base URL");
    let router = router(state);

    tracing::info!(%addr, "Account aggregator API listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .into_diagnostic()?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AaError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AaError::InvalidRequest(rejection.body_text()))
}

async fn not_found(uri: Uri) -> AaError {
    AaError::RouteNotFound(uri.path().to_string())
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "timestamp": format_timestamp(&Utc::now()),
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_fips(State(state): State<AppState>) -> Result<Json<ProviderList>, AaError> {
    let providers = directory::list_providers(state.store()).await?;
    Ok(Json(ProviderList {
        data: providers.iter().map(ProviderResource::from).collect(),
    }))
}

async fn consent_resource(
    state: &AppState,
    consent: &crate::model::Consent,
) -> Result<ConsentResource, AaError> {
    let accounts = directory::linked_accounts(state.store(), consent).await?;
    Ok(ConsentResource::new(
        consent,
        &accounts,
        &state.settings.base_url(),
    ))
}

async fn create_consent(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AaError> {
    let body = json_body(body)?;
    let consent = consent::create_consent(state.store(), &body, Utc::now()).await?;
    let resource = consent_resource(&state, &consent).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

async fn get_consent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConsentResource>, AaError> {
    let consent = consent::get_consent(state.store(), &id).await?;
    Ok(Json(consent_resource(&state, &consent).await?))
}

async fn create_session(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AaError> {
    let body = json_body(body)?;
    let session = session::create_session(state.store(), &body, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(SessionResource::from(&session))))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResource>, AaError> {
    let (session, _consent) = session::get_session_by_id(state.store(), &state.locks, &id).await?;
    Ok(Json(SessionResource::from(&session)))
}

async fn approval_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApprovalView>, AaError> {
    let consent = consent::get_consent(state.store(), &id).await?;
    let resource = consent_resource(&state, &consent).await?;
    if consent.status == ConsentStatus::Pending {
        let candidates = directory::approval_candidates(state.store(), &consent).await?;
        Ok(Json(ApprovalView::pending(resource, &candidates)))
    } else {
        Ok(Json(ApprovalView::settled(resource)))
    }
}

#[derive(Debug, Deserialize)]
struct ApproveForm {
    #[serde(rename = "accountIds", default)]
    account_ids: Vec<String>,
}

async fn approve_consent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ApproveForm>, JsonRejection>,
) -> Result<Redirect, AaError> {
    let Json(form) = body.map_err(|rejection| AaError::InvalidRequest(rejection.body_text()))?;
    if form.account_ids.is_empty() {
        return Err(AaError::InvalidRequest(
            "Please select at least one account".to_string(),
        ));
    }
    let consent =
        consent::approve_consent(state.store(), &id, &form.account_ids, Utc::now()).await?;
    Ok(Redirect::to(&consent.redirect_url))
}

async fn reject_consent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, AaError> {
    let consent = consent::reject_consent(state.store(), &id, Utc::now()).await?;
    Ok(Redirect::to(&consent.redirect_url))
}
