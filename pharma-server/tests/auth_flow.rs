//! End-to-end auth flow tests
//!
//! Drive the full router (middleware included) in-process, without the
//! network stack.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use chrono::{DateTime, Duration, Utc};
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use pharma_server::auth::{
    Clock, CredentialError, CredentialStore, PasswordVerifier, RolePermissionMatrix,
    SessionManager,
};
use pharma_server::{Config, ServerState, build_app};

/// Cheap verifier so these tests do not pay argon2 costs per request;
/// the argon2 path is covered by the credential store's own tests.
struct PlainVerifier;

impl PasswordVerifier for PlainVerifier {
    fn hash(&self, password: &str) -> Result<String, CredentialError> {
        Ok(format!("plain:{password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        hash == format!("plain:{password}")
    }
}

struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    fn new() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

fn test_config() -> Config {
    Config {
        http_port: 0,
        session_ttl_hours: 24,
        environment: "test".to_string(),
        seed_demo_users: false,
    }
}

fn test_state() -> ServerState {
    test_state_with_clock(Arc::new(pharma_server::auth::SystemClock))
}

fn test_state_with_clock(clock: Arc<dyn Clock>) -> ServerState {
    let credentials = CredentialStore::new(Box::new(PlainVerifier)).unwrap();
    let sessions = SessionManager::with_clock(Duration::hours(24), clock);
    ServerState::new(
        test_config(),
        Arc::new(credentials),
        Arc::new(sessions),
        Arc::new(RolePermissionMatrix::pharmacy_defaults()),
    )
}

fn app(state: &ServerState) -> Router {
    build_app(state).with_state(state.clone())
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(state: &ServerState, req: Request<Body>) -> (StatusCode, Value) {
    let response = app(state).oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Register a user through the API and return (token, user_id)
async fn register(state: &ServerState, email: &str, password: &str, role: &str) -> (String, String) {
    let (status, body) = send(
        state,
        post_json(
            "/auth/register",
            &json!({
                "email": email,
                "password": password,
                "display_name": "Test User",
                "role": role,
            }),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let token = body["data"]["token"].as_str().unwrap().to_string();
    let user_id = body["data"]["user"]["id"].as_str().unwrap().to_string();
    (token, user_id)
}

#[tokio::test]
async fn login_validate_logout_round_trip() {
    let state = test_state();
    let (_, user_id) = register(&state, "nurse@example.com", "s3cret-pw", "PHARMACIST").await;

    // Login with the registered credentials
    let (status, body) = send(
        &state,
        post_json(
            "/auth/login",
            &json!({ "email": "nurse@example.com", "password": "s3cret-pw" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["user"]["role"], "PHARMACIST");

    // Validate returns the same user id and role
    let bearer = format!("Bearer {token}");
    let (status, body) = send(&state, get("/auth/validate", Some(&bearer))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], user_id.as_str());
    assert_eq!(body["data"]["role"], "PHARMACIST");

    // Logout revokes the session
    let (status, _) = send(&state, post_json("/auth/logout", &json!({}), Some(&bearer))).await;
    assert_eq!(status, StatusCode::OK);

    // The token no longer resolves
    let (status, _) = send(&state, get("/auth/validate", Some(&bearer))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Logout again with the dead token: still 200 (idempotent)
    let (status, _) = send(&state, post_json("/auth/logout", &json!({}), Some(&bearer))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn bearer_prefix_is_optional() {
    let state = test_state();
    let (token, _) = register(&state, "tech@example.com", "tech-pw", "TECHNICIAN").await;

    let (status, _) = send(&state, get("/auth/validate", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &state,
        get("/auth/validate", Some(&format!("Bearer {token}"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn technician_role_and_permission_gates() {
    let state = test_state();
    let (token, _) = register(&state, "tech@example.com", "tech-pw", "TECHNICIAN").await;
    let bearer = format!("Bearer {token}");

    // Wrong role: 403
    let (status, _) = send(&state, get("/api/admin/dashboard", Some(&bearer))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Matching role: 200
    let (status, _) = send(&state, get("/api/technician/dashboard", Some(&bearer))).await;
    assert_eq!(status, StatusCode::OK);

    // TECHNICIAN has VIEW_INVENTORY in the default matrix
    let (status, body) = send(&state, get("/api/inventory/products", Some(&bearer))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().len() >= 2);

    // ...but not EDIT_INVENTORY
    let (status, _) = send(
        &state,
        post_json(
            "/api/inventory/update",
            &json!({ "product_id": 1, "stock": 10 }),
            Some(&bearer),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // ...and not MANAGE_USERS
    let (status, _) = send(&state, get("/api/system/users", Some(&bearer))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_permissions_and_user_listing() {
    let state = test_state();
    let (token, _) = register(&state, "root@example.com", "root-pw", "ADMIN").await;
    let bearer = format!("Bearer {token}");

    let (status, _) = send(&state, get("/api/admin/dashboard", Some(&bearer))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&state, get("/api/system/users", Some(&bearer))).await;
    assert_eq!(status, StatusCode::OK);

    // Profile data only; credential hashes never leave the store
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert!(users[0].get("credential_hash").is_none());
    assert!(!body.to_string().contains("plain:root-pw"));
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let state = test_state();
    register(&state, "known@example.com", "right-pw", "ADMIN").await;

    let (unknown_status, unknown_body) = send(
        &state,
        post_json(
            "/auth/login",
            &json!({ "email": "nobody@example.com", "password": "right-pw" }),
            None,
        ),
    )
    .await;
    let (wrong_status, wrong_body) = send(
        &state,
        post_json(
            "/auth/login",
            &json!({ "email": "known@example.com", "password": "wrong-pw" }),
            None,
        ),
    )
    .await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    // Same code, same message: no user-enumeration signal
    assert_eq!(unknown_body, wrong_body);
}

#[tokio::test]
async fn register_rejects_bad_input_and_duplicates() {
    let state = test_state();

    // Invalid email: 400
    let (status, _) = send(
        &state,
        post_json(
            "/auth/register",
            &json!({ "email": "not-an-email", "password": "longenough", "display_name": "X" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Password below the minimum length: 400
    let (status, _) = send(
        &state,
        post_json(
            "/auth/register",
            &json!({ "email": "a@example.com", "password": "short", "display_name": "X" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Duplicate identifier: 409
    register(&state, "dup@example.com", "longenough", "TECHNICIAN").await;
    let (status, body) = send(
        &state,
        post_json(
            "/auth/register",
            &json!({ "email": "dup@example.com", "password": "longenough", "display_name": "X" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["identifier"], "dup@example.com");
}

#[tokio::test]
async fn incomplete_bodies_answer_400_in_the_envelope() {
    let state = test_state();

    // Register body without the password field
    let (status, body) = send(
        &state,
        post_json(
            "/auth/register",
            &json!({ "email": "a@example.com", "display_name": "X" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "E0002");
    assert!(body["message"].is_string());

    // Login body without the password field
    let (status, body) = send(
        &state,
        post_json("/auth/login", &json!({ "email": "a@example.com" }), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "E0002");
}

#[tokio::test]
async fn unknown_register_role_defaults_to_technician() {
    let state = test_state();

    let (status, body) = send(
        &state,
        post_json(
            "/auth/register",
            &json!({
                "email": "odd@example.com",
                "password": "longenough",
                "display_name": "X",
                "role": "SUPERUSER",
            }),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["role"], "TECHNICIAN");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let state = test_state();

    for uri in ["/auth/validate", "/auth/session", "/api/inventory/products"] {
        let (status, _) = send(&state, get(uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "no token on {uri}");

        let (status, _) = send(&state, get(uri, Some("Bearer garbage"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "bad token on {uri}");
    }

    // Public routes stay reachable
    let (status, _) = send(&state, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn session_endpoint_returns_metadata_and_permissions() {
    let state = test_state();
    let (token, user_id) = register(&state, "ph@example.com", "ph-secret", "PHARMACIST").await;
    let bearer = format!("Bearer {token}");

    let (status, body) = send(&state, get("/auth/session", Some(&bearer))).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(body["data"]["user"]["id"], user_id.as_str());
    assert!(body["data"]["session"]["created_at"].is_string());
    assert!(body["data"]["session"]["expires_at"].is_string());
    assert!(body["data"]["session"]["origin_address"].is_string());

    let permissions = body["data"]["user"]["permissions"].as_array().unwrap();
    assert!(permissions.contains(&json!("EDIT_INVENTORY")));
    assert!(!permissions.contains(&json!("MANAGE_USERS")));
}

#[tokio::test]
async fn sessions_expire_after_ttl() {
    let clock = Arc::new(ManualClock::new());
    let state = test_state_with_clock(clock.clone());
    let (token, _) = register(&state, "late@example.com", "late-pw", "ADMIN").await;
    let bearer = format!("Bearer {token}");

    let (status, _) = send(&state, get("/auth/validate", Some(&bearer))).await;
    assert_eq!(status, StatusCode::OK);

    clock.advance(Duration::hours(24) + Duration::seconds(1));

    // Expired without ever being logged out: still 401
    let (status, _) = send(&state, get("/auth/validate", Some(&bearer))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    // The expired record was evicted on that lookup
    assert_eq!(state.sessions.session_count(), 0);
}

#[tokio::test]
async fn preflight_needs_no_auth_and_origin_is_reflected() {
    let state = test_state();

    // Preflight against a guarded route, no Authorization header
    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/api/inventory/products")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();

    let response = app(&state).oneshot(preflight).await.unwrap();
    assert!(response.status().is_success());
    assert!(
        response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );

    // Simple request: origin reflected on the response
    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();

    let response = app(&state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );
}
