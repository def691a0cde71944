mod helpers;

use aa_sandbox::settings::{Credentials, Settings};
use aa_sandbox::web::{router, AppState};
use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use helpers::{ConsentRequestBuilder, TestDb};
use serde_json::{json, Value};
use tower::ServiceExt;

const CLIENT_ID: &str = "fiu-client";
const CLIENT_SECRET: &str = "fiu-secret";

struct TestApp {
    router: Router,
    _db: TestDb,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestApp {
    async fn new() -> Self {
        let db = TestDb::seeded().await;
        let mut settings = Settings::default();
        settings.server.public_base_url = Some("http://aa.test/".to_string());
        settings.credentials = Credentials {
            client_id: CLIENT_ID.to_string(),
            client_secret: CLIENT_SECRET.to_string(),
        };
        Self {
            router: router(AppState::new(settings, db.shared())),
            _db: db,
        }
    }

    async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    async fn get(&self, uri: &str) -> Reply {
        self.send(authed("GET", uri).body(Body::empty()).unwrap())
            .await
    }

    async fn post(&self, uri: &str, body: &Value) -> Reply {
        self.send(
            authed("POST", uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn browser_post(&self, uri: &str, body: Option<&Value>) -> Reply {
        let builder = Request::builder().method("POST").uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };
        self.send(request.unwrap()).await
    }

    async fn create_consent(&self) -> String {
        let reply = self
            .post("/consents", &ConsentRequestBuilder::new("CUST001").build())
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        reply.body["id"].as_str().unwrap().to_string()
    }
}

fn authed(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-client-id", CLIENT_ID)
        .header("x-client-secret", CLIENT_SECRET)
}

fn assert_envelope(reply: &Reply, status: StatusCode, code: &str) {
    assert_eq!(reply.status, status, "body: {}", reply.body);
    assert_eq!(reply.body["errorCode"], code);
    assert_eq!(reply.body["ver"], "1.0");
    assert!(reply.body["errorMsg"].is_string());
    assert!(reply.body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_health_is_public_and_hardened() {
    let app = TestApp::new().await;
    let reply = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "OK");
    assert_eq!(reply.body["service"], "aa-sandbox");
    assert_eq!(reply.headers["x-content-type-options"], "nosniff");
    assert_eq!(reply.headers["x-frame-options"], "DENY");
    assert_eq!(reply.headers["cache-control"], "no-store");
}

#[tokio::test]
async fn test_consumer_routes_require_credentials() {
    let app = TestApp::new().await;

    let reply = app
        .send(
            Request::get("/v2/fips")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_envelope(&reply, StatusCode::UNAUTHORIZED, "MISSING_CREDENTIALS");
    assert_eq!(reply.body["txnid"], "req-42");

    let reply = app
        .send(
            Request::get("/v2/fips")
                .header("x-client-id", CLIENT_ID)
                .header("x-client-secret", "wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_envelope(&reply, StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS");
    assert_eq!(reply.body["txnid"], "N/A");
}

#[tokio::test]
async fn test_list_fips_active_sorted() {
    let app = TestApp::new().await;
    let reply = app.get("/v2/fips").await;

    assert_eq!(reply.status, StatusCode::OK);
    let names: Vec<&str> = reply.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|fip| fip["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["HDFC Bank", "ICICI Bank", "SBI Mutual Fund"]);
    assert_eq!(
        reply.body["data"][0],
        json!({
            "id": "HDFC_BANK",
            "name": "HDFC Bank",
            "institutionType": "BANK",
            "status": "ACTIVE",
            "fiTypes": ["DEPOSIT", "TERM_DEPOSIT"]
        })
    );
}

#[tokio::test]
async fn test_create_and_read_consent() {
    let app = TestApp::new().await;
    let reply = app
        .post("/consents", &ConsentRequestBuilder::new("CUST001").build())
        .await;

    assert_eq!(reply.status, StatusCode::CREATED);
    let id = reply.body["id"].as_str().unwrap();
    assert_eq!(reply.body["status"], "PENDING");
    assert_eq!(
        reply.body["url"],
        format!("http://aa.test/mock-aa/consents/{id}")
    );
    assert_eq!(
        reply.body["redirectUrl"],
        "https://fiu.example.com/consent/callback"
    );
    assert_eq!(reply.body["Detail"]["Customer"]["id"], "CUST001");
    assert_eq!(reply.body["Detail"]["fetchType"], "ONETIME");
    assert_eq!(reply.body["Detail"]["consentMode"], "VIEW");

    let read = app.get(&format!("/consents/{id}")).await;
    assert_eq!(read.status, StatusCode::OK);
    assert_eq!(read.body["id"], id);
    assert_eq!(read.body["Detail"]["Purpose"]["code"], "101");
}

#[tokio::test]
async fn test_create_consent_errors() {
    let app = TestApp::new().await;

    let reply = app
        .post(
            "/consents",
            &ConsentRequestBuilder::new("CUST001")
                .without("Detail.DataFilter")
                .build(),
        )
        .await;
    assert_envelope(&reply, StatusCode::BAD_REQUEST, "INVALID_REQUEST");
    assert!(reply.body["errorMsg"]
        .as_str()
        .unwrap()
        .contains("Detail.DataFilter"));

    let reply = app
        .post(
            "/consents",
            &ConsentRequestBuilder::new("CUST001")
                .window("2024-12-31", "2023-01-01")
                .build(),
        )
        .await;
    assert_envelope(&reply, StatusCode::BAD_REQUEST, "INVALID_DATE_RANGE");

    let reply = app
        .post("/consents", &ConsentRequestBuilder::new("GHOST").build())
        .await;
    assert_envelope(&reply, StatusCode::NOT_FOUND, "CUSTOMER_NOT_FOUND");

    let reply = app
        .send(
            authed("POST", "/consents")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_envelope(&reply, StatusCode::BAD_REQUEST, "INVALID_REQUEST");

    let reply = app
        .post(
            "/consents",
            &ConsentRequestBuilder::new("CUST001")
                .set("redirectUrl", json!("https://fiu.example.com/cb\n"))
                .build(),
        )
        .await;
    assert_envelope(&reply, StatusCode::BAD_REQUEST, "INVALID_REQUEST");
    assert!(reply.body["errorMsg"]
        .as_str()
        .unwrap()
        .contains("redirectUrl"));

    let reply = app.get("/consents/does-not-exist").await;
    assert_envelope(&reply, StatusCode::NOT_FOUND, "CONSENT_NOT_FOUND");
}

#[tokio::test]
async fn test_approval_view_lists_eligible_accounts() {
    let app = TestApp::new().await;
    let id = app.create_consent().await;

    let reply = app
        .send(
            Request::get(format!("/mock-aa/consents/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let accounts: Vec<&str> = reply.body["accounts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["accountId"].as_str().unwrap())
        .collect();
    // DEPOSIT only, ACTIVE only, CUST001 only
    assert_eq!(accounts, vec!["ACC001", "ACC002"]);
    assert_eq!(reply.body["accounts"][0]["fipName"], "HDFC Bank");
    assert!(reply.body.get("message").is_none());
}

#[tokio::test]
async fn test_approve_redirects_and_activates() {
    let app = TestApp::new().await;
    let id = app.create_consent().await;
    let approve = format!("/mock-aa/consents/{id}/approve");

    let reply = app
        .browser_post(&approve, Some(&json!({ "accountIds": [] })))
        .await;
    assert_envelope(&reply, StatusCode::BAD_REQUEST, "INVALID_REQUEST");

    let reply = app.browser_post(&approve, None).await;
    assert_envelope(&reply, StatusCode::BAD_REQUEST, "INVALID_REQUEST");

    let reply = app
        .browser_post(&approve, Some(&json!({ "accountIds": ["ACC101"] })))
        .await;
    assert_envelope(&reply, StatusCode::BAD_REQUEST, "INVALID_ACCOUNTS");

    let reply = app
        .browser_post(&approve, Some(&json!({ "accountIds": ["ACC001"] })))
        .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(
        reply.headers[header::LOCATION],
        "https://fiu.example.com/consent/callback"
    );

    let read = app.get(&format!("/consents/{id}")).await;
    assert_eq!(read.body["status"], "ACTIVE");
    assert!(read.body.get("url").is_none());
    assert_eq!(
        read.body["Detail"]["Accounts"],
        json!([{
            "linkRefNumber": "link-acc001",
            "maskedAccNumber": "XXXXXX1234",
            "fiType": "DEPOSIT",
            "fipId": "HDFC_BANK"
        }])
    );

    let view = app
        .send(
            Request::get(format!("/mock-aa/consents/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(view.body["message"], "This consent is already ACTIVE");

    let reply = app
        .browser_post(&approve, Some(&json!({ "accountIds": ["ACC001"] })))
        .await;
    assert_envelope(&reply, StatusCode::BAD_REQUEST, "INVALID_STATUS");
}

#[tokio::test]
async fn test_reject_redirects_once() {
    let app = TestApp::new().await;
    let id = app.create_consent().await;
    let reject = format!("/mock-aa/consents/{id}/reject");

    let reply = app.browser_post(&reject, None).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);

    let reply = app.browser_post(&reject, None).await;
    assert_envelope(&reply, StatusCode::BAD_REQUEST, "INVALID_STATUS");

    let reply = app
        .browser_post("/mock-aa/consents/missing/reject", None)
        .await;
    assert_envelope(&reply, StatusCode::NOT_FOUND, "CONSENT_NOT_FOUND");
}

#[tokio::test]
async fn test_session_flow_over_http() {
    let app = TestApp::new().await;
    let id = app.create_consent().await;
    app.browser_post(
        &format!("/mock-aa/consents/{id}/approve"),
        Some(&json!({ "accountIds": ["ACC001", "ACC002"] })),
    )
    .await;

    let reply = app
        .post(
            "/sessions",
            &json!({
                "consentId": id,
                "DataRange": { "from": "2024-01-01", "to": "2024-12-31" },
                "format": "json"
            }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["status"], "PENDING");
    assert_eq!(reply.body["Payload"], json!([]));
    assert_eq!(reply.body["DataRange"]["from"], "2024-01-01T00:00:00.000Z");
    let session_id = reply.body["id"].as_str().unwrap().to_string();

    let first = app.get(&format!("/sessions/{session_id}")).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["status"], "COMPLETED");
    assert_eq!(first.body["Payload"].as_array().unwrap().len(), 2);

    let second = app.get(&format!("/sessions/{session_id}")).await;
    assert_eq!(first.body, second.body);

    let consent = app.get(&format!("/consents/{id}")).await;
    assert_eq!(consent.body["Usage"]["count"], 1);
}

#[tokio::test]
async fn test_session_errors_over_http() {
    let app = TestApp::new().await;
    let id = app.create_consent().await;

    // consent still PENDING
    let reply = app
        .post(
            "/sessions",
            &json!({
                "consentId": id,
                "DataRange": { "from": "2024-01-01", "to": "2024-12-31" }
            }),
        )
        .await;
    assert_envelope(&reply, StatusCode::BAD_REQUEST, "INVALID_STATUS");

    app.browser_post(
        &format!("/mock-aa/consents/{id}/approve"),
        Some(&json!({ "accountIds": ["ACC001"] })),
    )
    .await;

    let reply = app
        .post(
            "/sessions",
            &json!({
                "consentId": id,
                "DataRange": { "from": "2022-01-01", "to": "2024-12-31" }
            }),
        )
        .await;
    assert_envelope(&reply, StatusCode::BAD_REQUEST, "DATE_RANGE_OUT_OF_BOUNDS");

    let reply = app
        .post(
            "/sessions",
            &json!({
                "consentId": "missing",
                "DataRange": { "from": "2024-01-01", "to": "2024-12-31" }
            }),
        )
        .await;
    assert_envelope(&reply, StatusCode::NOT_FOUND, "CONSENT_NOT_FOUND");

    let reply = app.get("/sessions/missing").await;
    assert_envelope(&reply, StatusCode::NOT_FOUND, "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn test_unknown_route_uses_envelope() {
    let app = TestApp::new().await;
    let reply = app
        .send(
            Request::get("/v1/nowhere")
                .header("x-request-id", "abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_envelope(&reply, StatusCode::NOT_FOUND, "NOT_FOUND");
    assert_eq!(reply.body["txnid"], "abc");
    assert_eq!(reply.body["errorMsg"], "Route /v1/nowhere not found");
}
