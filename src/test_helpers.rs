//! In-process mock backend and client builders shared by unit tests.
//!
//! The mock speaks the same REST contract as the real backend: login sets a
//! `refresh_token` cookie, `/auth/refresh` mints `issued_token` when that
//! cookie is present, and protected routes accept only `valid_token`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::{ClientConfig, Timeouts};
use crate::net::auth;
use crate::net::client::ApiClient;
use crate::net::types::LoginRequest;
use crate::state::storage::MemoryStorage;
use crate::state::store::SessionStore;
use crate::util::navigation::Navigator;

pub const PASSWORD: &str = "correct-horse";
pub const LOGIN_TOKEN: &str = "token-1";
pub const REFRESHED_TOKEN: &str = "token-2";
const REFRESH_COOKIE: &str = "refresh_token";

// =============================================================================
// MOCK STATE
// =============================================================================

#[derive(Clone)]
pub struct MockState {
    pub login_calls: Arc<AtomicUsize>,
    pub refresh_calls: Arc<AtomicUsize>,
    pub logout_calls: Arc<AtomicUsize>,
    pub refresh_ok: Arc<AtomicBool>,
    /// Bearer token protected routes accept.
    pub valid_token: Arc<Mutex<String>>,
    /// Token returned by `/auth/refresh`.
    pub issued_token: Arc<Mutex<String>>,
    pub refresh_delay: Duration,
    pub user_name: Arc<Mutex<String>>,
}

impl MockState {
    fn new() -> Self {
        Self {
            login_calls: Arc::new(AtomicUsize::new(0)),
            refresh_calls: Arc::new(AtomicUsize::new(0)),
            logout_calls: Arc::new(AtomicUsize::new(0)),
            refresh_ok: Arc::new(AtomicBool::new(true)),
            valid_token: Arc::new(Mutex::new(REFRESHED_TOKEN.to_owned())),
            issued_token: Arc::new(Mutex::new(REFRESHED_TOKEN.to_owned())),
            refresh_delay: Duration::from_millis(50),
            user_name: Arc::new(Mutex::new("Ada".to_owned())),
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn set_refresh_ok(&self, ok: bool) {
        self.refresh_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_valid_token(&self, token: &str) {
        *self.valid_token.lock().expect("mock mutex should lock") = token.to_owned();
    }

    fn user_json(&self) -> Value {
        let name = self.user_name.lock().expect("mock mutex should lock").clone();
        json!({
            "id": "u1",
            "email": "ada@example.com",
            "name": name,
            "emailVerified": true,
            "plan": "pro"
        })
    }

    fn authorized(&self, headers: &HeaderMap) -> Result<(), Response> {
        let expected = format!("Bearer {}", self.valid_token.lock().expect("mock mutex should lock"));
        let got = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if got == expected {
            Ok(())
        } else {
            Err(unauthorized("Access token expired"))
        }
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub state: MockState,
}

/// Start the mock backend on an ephemeral port.
pub async fn spawn_backend() -> MockBackend {
    let state = MockState::new();
    let app = router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock backend addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend failed");
    });
    MockBackend { base_url: format!("http://{addr}"), state }
}

/// Client against `backend` with in-memory storage.
pub fn client_for(backend: &MockBackend, navigator: Arc<dyn Navigator>) -> (ApiClient, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let store = SessionStore::hydrate(storage.clone());
    (client_with_store(backend, store, navigator), storage)
}

pub fn client_with_store(backend: &MockBackend, store: SessionStore, navigator: Arc<dyn Navigator>) -> ApiClient {
    let timeouts = Timeouts { request_secs: 1, connect_secs: 1 };
    let config = ClientConfig::new(&backend.base_url, timeouts).expect("mock base url");
    ApiClient::new(config, store, navigator).expect("client builds")
}

pub fn login_request() -> LoginRequest {
    LoginRequest { email: "ada@example.com".to_owned(), password: PASSWORD.to_owned(), remember_me: false }
}

/// Client that has logged in and holds `LOGIN_TOKEN` plus the refresh cookie.
pub async fn logged_in_client(
    backend: &MockBackend,
    navigator: Arc<dyn Navigator>,
) -> (ApiClient, Arc<MemoryStorage>) {
    let (client, storage) = client_for(backend, navigator);
    auth::login(&client, &login_request()).await.expect("mock login succeeds");
    (client, storage)
}

// =============================================================================
// ROUTES
// =============================================================================

fn router(state: MockState) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/register", post(register))
        .route("/auth/forgot-password", post(acknowledge))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/verify-email", post(acknowledge))
        .route("/auth/resend-verification", post(acknowledge))
        .route("/auth/me", get(me))
        .route("/users/me", axum::routing::patch(update_me))
        .route("/users/me/password", post(change_password))
        .route("/dashboard/stats", get(stats))
        .route("/jobs", get(list_jobs))
        .route("/jobs/{id}", get(get_job).delete(delete_job))
        .route("/jobs/{id}/cancel", post(cancel_job))
        .route("/billing/subscription", get(subscription))
        .route("/billing/invoices", get(invoices))
        .route("/always-401", get(always_unauthorized))
        .route("/echo", get(echo))
        .route("/boom", get(boom))
        .route("/slow", get(slow))
        .with_state(state)
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": message }))).into_response()
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(State(state): State<MockState>, jar: CookieJar, Json(body): Json<LoginBody>) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);
    if body.password != PASSWORD || body.email.is_empty() {
        return unauthorized("Invalid email or password");
    }
    let cookie = Cookie::build((REFRESH_COOKIE, "rt-1")).path("/").http_only(true);
    let payload = json!({ "user": state.user_json(), "accessToken": LOGIN_TOKEN });
    (jar.add(cookie), Json(payload)).into_response()
}

async fn refresh(State(state): State<MockState>, jar: CookieJar) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.refresh_delay).await;
    let has_cookie = jar.get(REFRESH_COOKIE).is_some_and(|c| !c.value().is_empty());
    if !has_cookie || !state.refresh_ok.load(Ordering::SeqCst) {
        return unauthorized("Refresh token expired");
    }
    let token = state.issued_token.lock().expect("mock mutex should lock").clone();
    Json(json!({ "user": state.user_json(), "accessToken": token })).into_response()
}

async fn logout(State(state): State<MockState>, headers: HeaderMap, jar: CookieJar) -> Response {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    if let Err(rejection) = state.authorized(&headers) {
        return rejection;
    }
    let cleared = jar.remove(Cookie::build((REFRESH_COOKIE, "")).path("/"));
    (cleared, StatusCode::NO_CONTENT).into_response()
}

#[derive(Deserialize)]
struct RegisterBody {
    name: String,
    email: String,
}

async fn register(Json(body): Json<RegisterBody>) -> Response {
    if body.email == "taken@example.com" {
        let payload = json!({
            "message": "Validation failed",
            "code": "validation_error",
            "errors": [{ "field": "email", "message": "Email already registered" }]
        });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    }
    let payload = json!({
        "message": "Check your inbox to verify your email.",
        "user": { "id": "u9", "email": body.email, "name": body.name, "emailVerified": false }
    });
    (StatusCode::CREATED, Json(payload)).into_response()
}

async fn acknowledge() -> Response {
    Json(json!({ "message": "ok" })).into_response()
}

#[derive(Deserialize)]
struct ResetBody {
    token: String,
}

async fn reset_password(Json(body): Json<ResetBody>) -> Response {
    if body.token == "expired" {
        let payload = json!({ "message": "Reset link expired", "code": "token_expired" });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    }
    Json(json!({ "message": "Password updated" })).into_response()
}

async fn me(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = state.authorized(&headers) {
        return rejection;
    }
    Json(state.user_json()).into_response()
}

async fn update_me(State(state): State<MockState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(rejection) = state.authorized(&headers) {
        return rejection;
    }
    if let Some(name) = body.get("name").and_then(Value::as_str) {
        *state.user_name.lock().expect("mock mutex should lock") = name.to_owned();
    }
    Json(state.user_json()).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordBody {
    current_password: String,
}

async fn change_password(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<ChangePasswordBody>,
) -> Response {
    if let Err(rejection) = state.authorized(&headers) {
        return rejection;
    }
    if body.current_password != PASSWORD {
        let payload = json!({
            "message": "Current password is incorrect",
            "errors": [{ "field": "currentPassword", "message": "Incorrect password" }]
        });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
    }
    Json(json!({ "message": "Password changed" })).into_response()
}

async fn stats(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = state.authorized(&headers) {
        return rejection;
    }
    Json(json!({
        "totalJobs": 12,
        "completedJobs": 9,
        "failedJobs": 1,
        "wordsTranslated": 48210,
        "creditsRemaining": 350
    }))
    .into_response()
}

fn job_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "fileName": "episode-01.srt",
        "sourceLanguage": "en",
        "targetLanguage": "fr",
        "status": status,
        "progress": 0.5,
        "createdAt": "2026-10-01T09:00:00Z"
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobsQuery {
    page: Option<u32>,
    page_size: Option<u32>,
    status: Option<String>,
}

async fn list_jobs(State(state): State<MockState>, headers: HeaderMap, Query(query): Query<JobsQuery>) -> Response {
    if let Err(rejection) = state.authorized(&headers) {
        return rejection;
    }
    let status = query.status.unwrap_or_else(|| "processing".to_owned());
    Json(json!({
        "items": [job_json("j1", &status), job_json("j2", &status)],
        "total": 2,
        "page": query.page.unwrap_or(1),
        "pageSize": query.page_size.unwrap_or(20)
    }))
    .into_response()
}

async fn get_job(State(state): State<MockState>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(rejection) = state.authorized(&headers) {
        return rejection;
    }
    if id == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Job not found" }))).into_response();
    }
    Json(job_json(&id, "processing")).into_response()
}

async fn cancel_job(State(state): State<MockState>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(rejection) = state.authorized(&headers) {
        return rejection;
    }
    Json(job_json(&id, "cancelled")).into_response()
}

async fn delete_job(State(state): State<MockState>, headers: HeaderMap, Path(_id): Path<String>) -> Response {
    if let Err(rejection) = state.authorized(&headers) {
        return rejection;
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn subscription(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = state.authorized(&headers) {
        return rejection;
    }
    Json(json!({
        "plan": "pro",
        "status": "active",
        "currentPeriodEnd": "2026-11-01T00:00:00Z",
        "cancelAtPeriodEnd": false
    }))
    .into_response()
}

async fn invoices(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = state.authorized(&headers) {
        return rejection;
    }
    Json(json!([{
        "id": "in_1",
        "amountCents": 1900,
        "currency": "eur",
        "status": "paid",
        "issuedAt": "2026-10-01T00:00:00Z"
    }]))
    .into_response()
}

async fn always_unauthorized() -> Response {
    unauthorized("Token revoked")
}

async fn echo(headers: HeaderMap) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    Json(json!({
        "authorization": header("authorization"),
        "acceptLanguage": header("accept-language")
    }))
    .into_response()
}

async fn boom() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "").into_response()
}

async fn slow() -> Response {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({ "ok": true })).into_response()
}
