//! Authenticated REST client for the translation backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every backend call goes through `ApiClient`. It attaches the bearer token
//! and locale header, and recovers from exactly one failure class: a 401 on a
//! protected endpoint caused by an expired access token. Recovery refreshes
//! the token once per expiry event (see `refresh`) and replays the request
//! once; every other failure is normalized into `ApiError` and returned.
//!
//! ERROR HANDLING
//! ==============
//! - 401 on credential endpoints (login, register, ...) is a rejection, never
//!   an expiry: no refresh, session untouched.
//! - 401 on `/auth/refresh` or `/auth/logout` clears the session.
//! - 401 on a replayed request is surfaced as-is.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::sync::Arc;

use cookie_store::CookieStore;
use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::Method;
use reqwest::header::ACCEPT_LANGUAGE;
use reqwest_cookie_store::CookieStoreMutex;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::refresh::{RefreshCoordinator, RefreshOutcome, Trigger};
use super::types::AuthResponse;
use crate::config::{ClientConfig, ConfigError};
use crate::error::ApiError;
use crate::state::store::SessionStore;
use crate::util::locale::{DEFAULT_LOCALE, is_login_path, locale_from_path, login_redirect};
use crate::util::navigation::Navigator;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Public auth endpoints where a 401 means "wrong credentials".
const CREDENTIAL_PATHS: &[&str] = &[
    LOGIN_PATH,
    "/auth/register",
    "/auth/forgot-password",
    "/auth/reset-password",
    "/auth/verify-email",
    "/auth/resend-verification",
];

// =============================================================================
// REQUEST
// =============================================================================

/// Replayable description of a backend call.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `/jobs/42`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None }
    }

    #[must_use]
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` as the JSON payload.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be represented as JSON.
    pub fn with_json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::encode(&e))?;
        Ok(self.with_body(value))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EndpointClass {
    Credential,
    Session,
    Protected,
}

fn classify(path: &str) -> EndpointClass {
    let path = path.split('?').next().unwrap_or_default().trim_end_matches('/');
    if CREDENTIAL_PATHS.contains(&path) {
        EndpointClass::Credential
    } else if path == REFRESH_PATH || path == LOGOUT_PATH {
        EndpointClass::Session
    } else {
        EndpointClass::Protected
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Fully-read HTTP response.
#[derive(Debug)]
struct RawResponse {
    status: u16,
    body: String,
}

impl RawResponse {
    fn into_result(self) -> Result<Self, ApiError> {
        if (200..300).contains(&self.status) {
            Ok(self)
        } else {
            Err(ApiError::from_response(self.status, &self.body))
        }
    }

    fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let body = if self.body.trim().is_empty() { "null" } else { self.body.as_str() };
        serde_json::from_str(body).map_err(|e| ApiError::decode(self.status, &e))
    }
}

/// Cheap-to-clone HTTP sender shared with refresh flights.
#[derive(Clone)]
struct Transport {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl Transport {
    async fn send(&self, request: &ApiRequest, token: Option<&str>, locale: &str) -> Result<RawResponse, ApiError> {
        let url = self.config.endpoint(&request.path);
        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .header(ACCEPT_LANGUAGE, locale);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| ApiError::transport(&e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| ApiError::transport(&e))?;
        tracing::debug!(method = %request.method, path = %request.path, status, "api response");
        Ok(RawResponse { status, body })
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct ApiClient {
    transport: Transport,
    store: SessionStore,
    navigator: Arc<dyn Navigator>,
    cookies: Arc<CookieStoreMutex>,
    refresh: RefreshCoordinator,
}

impl ApiClient {
    /// Build a client with an empty cookie jar for the refresh credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: ClientConfig, store: SessionStore, navigator: Arc<dyn Navigator>) -> Result<Self, ConfigError> {
        Self::with_cookies(config, store, navigator, CookieStore::default())
    }

    /// Build a client whose jar starts from `cookies`, e.g. cookies restored
    /// from a previous run.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn with_cookies(
        config: ClientConfig,
        store: SessionStore,
        navigator: Arc<dyn Navigator>,
        cookies: CookieStore,
    ) -> Result<Self, ConfigError> {
        let cookies = Arc::new(CookieStoreMutex::new(cookies));
        let http = reqwest::Client::builder()
            .timeout(config.timeouts.request())
            .connect_timeout(config.timeouts.connect())
            .cookie_provider(Arc::clone(&cookies))
            .build()
            .map_err(|e| ConfigError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            transport: Transport { http, config: Arc::new(config) },
            store,
            navigator,
            cookies,
            refresh: RefreshCoordinator::default(),
        })
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.transport.config
    }

    /// Cookie jar holding the server-set refresh credential.
    #[must_use]
    pub fn cookie_jar(&self) -> &Arc<CookieStoreMutex> {
        &self.cookies
    }

    /// Locale header value for the current navigation path.
    #[must_use]
    pub fn locale(&self) -> &'static str {
        self.navigator
            .current_location()
            .map_or(DEFAULT_LOCALE, |location| locale_from_path(&location))
    }

    // =========================================================================
    // SESSION LIFECYCLE
    // =========================================================================

    /// Adopt a freshly issued session (login or startup refresh).
    pub fn establish_session(&self, auth: AuthResponse) {
        self.refresh.reset();
        self.store.set_auth(auth.user, auth.access_token);
    }

    pub fn end_session(&self) {
        self.refresh.reset();
        self.store.clear_auth();
    }

    /// Refresh the access token now, sharing any refresh already in flight.
    ///
    /// On success the new token is stored; on failure the session is
    /// cleared. The login redirect is only issued if a failed protected
    /// request joined the refresh.
    ///
    /// # Errors
    ///
    /// Returns the normalized refresh failure.
    pub async fn refresh_session(&self) -> Result<AuthResponse, ApiError> {
        self.refresh
            .run(Trigger::Explicit, || self.refresh_call(), self.settle_refresh())
            .await
    }

    // =========================================================================
    // REQUESTS
    // =========================================================================

    /// Execute `request` and deserialize the JSON response. Empty bodies
    /// deserialize as `null`.
    ///
    /// # Errors
    ///
    /// Returns the normalized error for transport failures, non-success
    /// statuses that could not be recovered, or undecodable bodies.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.execute(&request).await?.json()
    }

    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::new(Method::GET, path)).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::new(Method::POST, path).with_json(body)?).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::new(Method::PUT, path).with_json(body)?).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::new(Method::PATCH, path).with_json(body)?).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::new(Method::DELETE, path)).await
    }

    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
        let locale = self.locale();
        let sent_with = self.store.access_token();
        let response = self.transport.send(request, sent_with.as_deref(), locale).await?;
        if response.status != 401 {
            return response.into_result();
        }

        match classify(&request.path) {
            EndpointClass::Credential => {
                tracing::debug!(path = %request.path, "credentials rejected");
                return response.into_result();
            }
            EndpointClass::Session => {
                tracing::info!(path = %request.path, "session endpoint returned 401; clearing session");
                self.end_session();
                return response.into_result();
            }
            EndpointClass::Protected => {}
        }

        let token = self.recover(sent_with.as_deref()).await?;
        // Replayed once. A second 401 is surfaced, not recovered.
        self.transport
            .send(request, Some(&token), locale)
            .await?
            .into_result()
    }

    /// Token to replay with after a 401 sent with `sent_with`.
    async fn recover(&self, sent_with: Option<&str>) -> Result<String, ApiError> {
        if let Some(current) = self.store.access_token() {
            if Some(current.as_str()) != sent_with {
                tracing::debug!("token changed while request was in flight; replaying");
                return Ok(current);
            }
        }
        self.refresh
            .run(Trigger::Expired(sent_with), || self.refresh_call(), self.settle_refresh())
            .await
            .map(|auth| auth.access_token)
    }

    /// One `/auth/refresh` call. Session side effects live in
    /// [`ApiClient::settle_refresh`].
    fn refresh_call(&self) -> BoxFuture<'static, RefreshOutcome> {
        let transport = self.transport.clone();
        let locale = self.locale();
        async move {
            tracing::debug!("refreshing access token");
            let request = ApiRequest::new(Method::POST, REFRESH_PATH);
            transport
                .send(&request, None, locale)
                .await
                .and_then(RawResponse::into_result)
                .and_then(|response| response.json::<AuthResponse>())
        }
        .boxed()
    }

    /// Apply a settled refresh to the session: store the new token, or clear
    /// the session and, when a failed protected request is waiting on it,
    /// redirect to login.
    fn settle_refresh(&self) -> impl FnOnce(&RefreshOutcome, bool) + Send + 'static {
        let store = self.store.clone();
        let navigator = Arc::clone(&self.navigator);
        move |outcome, redirect_owed| match outcome {
            Ok(auth) => {
                store.set_access_token(auth.access_token.clone());
                tracing::info!(user_id = %auth.user.id, "access token refreshed");
            }
            Err(e) => {
                tracing::warn!(status = e.status, error = %e, "token refresh failed; clearing session");
                store.clear_auth();
                if redirect_owed {
                    redirect_to_login(navigator.as_ref());
                }
            }
        }
    }
}

/// Hard redirect to the login page, remembering where the user was.
fn redirect_to_login(navigator: &dyn Navigator) {
    let Some(location) = navigator.current_location() else {
        return;
    };
    if is_login_path(&location) {
        return;
    }
    let target = login_redirect(&location);
    tracing::info!(from = %location, to = %target, "redirecting to login");
    navigator.navigate(&target);
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.transport.config.base_url)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
