// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a mock identity provider, a scripted
//! browser, and assertion helpers.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Form, Router};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::browser::BrowserOpener;
use crate::config::LoginConfig;
use crate::token::{Credential, LoginInfo};

/// Assert that `$expr` is `Err` and its message contains `$substr`.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

/// HTTP client for tests, with the TLS provider installed.
pub fn http_client() -> reqwest::Client {
    crate::ensure_crypto();
    reqwest::Client::builder().timeout(Duration::from_secs(10)).build().unwrap_or_default()
}

/// Build a [`LoginInfo`] with a bearer credential.
pub fn login_info(
    tenant_id: &str,
    access_token: &str,
    refresh_token: &str,
    expires_at_ms: u64,
) -> LoginInfo {
    LoginInfo {
        tenant_id: tenant_id.to_owned(),
        credential: Credential {
            token_type: "Bearer".to_owned(),
            scope: "https://management.azure.com/user_impersonation".to_owned(),
            access_token: access_token.to_owned(),
            refresh_token: refresh_token.to_owned(),
            expires_at_ms,
        },
    }
}

/// A token endpoint request observed by [`MockIdentityProvider`].
#[derive(Debug, Clone)]
pub struct TokenRequest {
    /// Tenant path segment (`organizations` or a tenant id).
    pub tenant: String,
    pub form: HashMap<String, String>,
}

impl TokenRequest {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }
}

#[derive(Default)]
struct MockState {
    token_responses: Mutex<VecDeque<(u16, String)>>,
    tenants_response: Mutex<Option<(u16, String)>>,
    token_requests: Mutex<Vec<TokenRequest>>,
    tenant_auth_headers: Mutex<Vec<String>>,
}

/// In-process identity provider serving the token and tenant endpoints.
///
/// Token responses are served in the order they were queued; once the queue
/// is empty every token request gets a 500.
pub struct MockIdentityProvider {
    addr: SocketAddr,
    state: Arc<MockState>,
    task: JoinHandle<()>,
}

impl MockIdentityProvider {
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/{tenant}/oauth2/v2.0/token", post(token_handler))
            .route("/tenants", get(tenants_handler))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        Ok(Self { addr, state, task })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Login config pointing at this provider, with short timeouts.
    pub fn login_config(&self) -> LoginConfig {
        LoginConfig {
            authority: self.base_url(),
            management_url: self.base_url(),
            callback_timeout: Duration::from_secs(10),
            http_timeout: Duration::from_secs(5),
            ..LoginConfig::default()
        }
    }

    pub fn push_token_response(&self, status: u16, body: serde_json::Value) {
        self.state.token_responses.lock().push_back((status, body.to_string()));
    }

    pub fn set_tenants_response(&self, status: u16, body: impl Into<String>) {
        *self.state.tenants_response.lock() = Some((status, body.into()));
    }

    pub fn token_requests(&self) -> Vec<TokenRequest> {
        self.state.token_requests.lock().clone()
    }

    /// `Authorization` headers of every tenant listing request.
    pub fn tenant_requests(&self) -> Vec<String> {
        self.state.tenant_auth_headers.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.token_requests.lock().len() + self.state.tenant_auth_headers.lock().len()
    }
}

impl Drop for MockIdentityProvider {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn token_handler(
    State(state): State<Arc<MockState>>,
    Path(tenant): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, String) {
    state.token_requests.lock().push(TokenRequest { tenant, form });
    let (status, body) =
        state.token_responses.lock().pop_front().unwrap_or((500, r#"{"error":"server_error"}"#.to_owned()));
    (StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), body)
}

async fn tenants_handler(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
) -> (StatusCode, String) {
    let auth = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    state.tenant_auth_headers.lock().push(auth);
    let (status, body) = state
        .tenants_response
        .lock()
        .clone()
        .unwrap_or((200, r#"{"value":[]}"#.to_owned()));
    (StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), body)
}

#[derive(Debug, Clone)]
enum BrowserBehavior {
    /// Record the URL and do nothing, like a user who never finishes.
    Idle,
    /// Follow the redirect with this query string.
    Redirect(String),
    /// Fail to launch.
    Broken,
}

/// Scripted [`BrowserOpener`] that records every URL it is asked to open.
#[derive(Clone)]
pub struct FakeBrowser {
    behavior: BrowserBehavior,
    opened: Arc<Mutex<Vec<String>>>,
}

impl FakeBrowser {
    pub fn idle() -> Self {
        Self::with(BrowserBehavior::Idle)
    }

    /// Simulates the provider redirecting back with `query` appended to the
    /// redirect URI found in the authorization URL.
    pub fn redirecting(query: &str) -> Self {
        Self::with(BrowserBehavior::Redirect(query.to_owned()))
    }

    pub fn broken() -> Self {
        Self::with(BrowserBehavior::Broken)
    }

    fn with(behavior: BrowserBehavior) -> Self {
        Self { behavior, opened: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }

    /// `redirect_uri` parameter of the last opened URL.
    pub fn last_redirect_uri(&self) -> Option<String> {
        self.opened.lock().last().and_then(|url| query_param(url, "redirect_uri"))
    }
}

impl BrowserOpener for FakeBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        self.opened.lock().push(url.to_owned());
        match &self.behavior {
            BrowserBehavior::Idle => Ok(()),
            BrowserBehavior::Broken => {
                Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no browser available"))
            }
            BrowserBehavior::Redirect(query) => {
                let redirect_uri = query_param(url, "redirect_uri").ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "no redirect_uri")
                })?;
                let target = format!("{redirect_uri}/?{query}");
                tokio::spawn(async move {
                    let _ = http_client().get(target).send().await;
                });
                Ok(())
            }
        }
    }
}

/// Decoded value of query parameter `name` in `url`.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let value = parsed.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned());
    value
}
