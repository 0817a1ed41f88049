//! Shared fixtures for unit tests: sample users and an in-process mock backend.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::Notify;

use crate::config::{ClientConfig, HttpTimeouts};
use crate::net::gateway::ApiGateway;
use crate::net::types::{Role, User};
use crate::state::auth::AuthStore;
use crate::state::session::SessionHandle;
use crate::util::token_persistence::MemoryTokenStorage;

// =============================================================================
// USERS
// =============================================================================

#[must_use]
pub fn plain_user() -> User {
    User {
        id: 1,
        username: "alice".into(),
        nickname: Some("Alice".into()),
        email: Some("alice@campus.edu".into()),
        avatar_url: None,
        role: Role::User,
        extra: serde_json::Map::new(),
    }
}

#[must_use]
pub fn admin_user() -> User {
    User {
        id: 2,
        username: "root".into(),
        nickname: Some("Groundskeeper".into()),
        email: Some("root@campus.edu".into()),
        avatar_url: None,
        role: Role::Admin,
        extra: serde_json::Map::new(),
    }
}

// =============================================================================
// MOCK BACKEND
// =============================================================================

/// Token that makes `GET /users/me` wait for [`MockBackend::release`].
pub const SLOW_TOKEN: &str = "token-slow";
/// Token that makes `GET /users/me` answer 403.
pub const FORBIDDEN_TOKEN: &str = "token-forbidden";

/// Observable state of the mock backend.
#[derive(Default)]
pub struct BackendState {
    /// Authorization header of every request, in arrival order (`None` if absent).
    pub authorization: Mutex<Vec<Option<String>>>,
    /// Request counts keyed by `"METHOD /path"`.
    pub hits: Mutex<HashMap<String, usize>>,
    /// Nickname overrides applied by `PUT /users/me`, keyed by username.
    pub nicknames: Mutex<HashMap<String, String>>,
    pub arrived: Notify,
    pub gate: Notify,
}

impl BackendState {
    fn record(&self, key: &str, headers: &HeaderMap) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);
        self.authorization.lock().push(auth);
        *self.hits.lock().entry(key.to_owned()).or_default() += 1;
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
}

impl MockBackend {
    #[must_use]
    pub fn hits(&self, key: &str) -> usize {
        self.state.hits.lock().get(key).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn last_authorization(&self) -> Option<String> {
        self.state.authorization.lock().last().cloned().flatten()
    }

    /// Wait until a gated request (`slowlogin` login or slow `GET /users/me`) has arrived.
    pub async fn wait_for_slow_request(&self) {
        self.state.arrived.notified().await;
    }

    /// Let the pending gated request answer.
    pub fn release(&self) {
        self.state.gate.notify_one();
    }

    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            api_base_url: self.base_url.clone(),
            token_dir: std::env::temp_dir().join("greenfriends-test-unused"),
            timeouts: HttpTimeouts { request_secs: 5, connect_secs: 5 },
        }
    }

    /// Session over `storage` plus a gateway and auth store bound to it.
    #[must_use]
    pub fn auth_store(&self, storage: Arc<MemoryTokenStorage>) -> AuthStore {
        let session = SessionHandle::restore(storage);
        let gateway = ApiGateway::new(&self.config())
            .expect("gateway should build")
            .with_session(session.clone());
        AuthStore::new(session, gateway)
    }
}

/// Start the mock backend on an ephemeral port.
pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(BackendState::default());
    let app = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/users/me", get(me).put(update_me))
        .route("/api/users/me/password", put(change_password))
        .route("/api/plants", get(plants))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend failed");
    });

    MockBackend { base_url: format!("http://{addr}/api"), state }
}

type Reply = (StatusCode, Json<Value>);

fn ok(data: Value) -> Reply {
    (StatusCode::OK, Json(json!({ "success": true, "message": "Operation successful", "data": data })))
}

fn fail(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({ "success": false, "message": message, "data": null })))
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
}

fn user_json(state: &BackendState, user: &User) -> Value {
    let mut value = serde_json::to_value(user).expect("user serializes");
    if let Some(nickname) = state.nicknames.lock().get(&user.username) {
        value["nickname"] = json!(nickname);
    }
    value
}

async fn register(State(state): State<Arc<BackendState>>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    state.record("POST /auth/register", &headers);
    match body["username"].as_str() {
        Some("taken") => fail(StatusCode::BAD_REQUEST, "Username is already taken"),
        Some("soft-fail") => fail(StatusCode::OK, "Registration is closed"),
        Some("silent-fail") => (StatusCode::OK, Json(json!({ "success": false }))),
        Some("crash") => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))),
        Some(_) => (
            StatusCode::OK,
            Json(json!({ "success": true, "message": "User registered successfully!", "data": null })),
        ),
        None => fail(StatusCode::BAD_REQUEST, "username is required"),
    }
}

async fn login(State(state): State<Arc<BackendState>>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    state.record("POST /auth/login", &headers);
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    match (username, password) {
        ("alice", "secret") => ok(json!({ "accessToken": "token-alice", "tokenType": "Bearer" })),
        ("root", "admin") => ok(json!({ "accessToken": "token-root", "tokenType": "Bearer" })),
        ("ghost", "boo") => ok(json!({ "accessToken": "token-ghost", "tokenType": "Bearer" })),
        ("slow", "slow") => ok(json!({ "accessToken": SLOW_TOKEN, "tokenType": "Bearer" })),
        ("slowlogin", "secret") => {
            state.arrived.notify_one();
            state.gate.notified().await;
            ok(json!({ "accessToken": "token-alice", "tokenType": "Bearer" }))
        }
        ("disabled", _) => fail(StatusCode::OK, "Account disabled"),
        ("tokenless", _) => ok(json!({ "accessToken": "" })),
        _ => fail(StatusCode::UNAUTHORIZED, "Bad credentials"),
    }
}

async fn me(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Reply {
    state.record("GET /users/me", &headers);
    match bearer(&headers).as_deref() {
        Some("token-alice") => ok(user_json(&state, &plain_user())),
        Some("token-root") => ok(user_json(&state, &admin_user())),
        Some(SLOW_TOKEN) => {
            state.arrived.notify_one();
            state.gate.notified().await;
            ok(user_json(&state, &plain_user()))
        }
        Some(FORBIDDEN_TOKEN) => fail(StatusCode::FORBIDDEN, "User not found, authentication failed."),
        Some("token-soft") => fail(StatusCode::OK, "User record unavailable"),
        _ => fail(StatusCode::UNAUTHORIZED, "Full authentication is required"),
    }
}

async fn update_me(State(state): State<Arc<BackendState>>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    state.record("PUT /users/me", &headers);
    let user = match bearer(&headers).as_deref() {
        Some("token-alice") => plain_user(),
        Some("token-root") => admin_user(),
        _ => return fail(StatusCode::UNAUTHORIZED, "Full authentication is required"),
    };
    if let Some(nickname) = body["nickname"].as_str() {
        state.nicknames.lock().insert(user.username.clone(), nickname.to_owned());
    }
    ok(user_json(&state, &user))
}

async fn change_password(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    state.record("PUT /users/me/password", &headers);
    if bearer(&headers).is_none() {
        return fail(StatusCode::UNAUTHORIZED, "Full authentication is required");
    }
    if body["oldPassword"].as_str() != Some("secret") {
        return fail(StatusCode::BAD_REQUEST, "Old password is incorrect");
    }
    (StatusCode::OK, Json(json!({ "success": true, "message": "Password changed successfully.", "data": null })))
}

async fn plants(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Reply {
    state.record("GET /plants", &headers);
    ok(json!([{ "id": 1, "name": "Ginkgo" }]))
}
