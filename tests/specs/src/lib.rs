// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end login scenarios.
//!
//! Wires a [`LoginService`] to an in-process mock identity provider, a
//! scripted browser, and a token store in a temporary directory.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use azlogin::error::LoginError;
use azlogin::login::LoginService;
use azlogin::store::TokenStore;
use azlogin::test_support::{FakeBrowser, MockIdentityProvider};
use azlogin::token::LoginInfo;

pub use azlogin::test_support::login_info;

/// Token endpoint body with a one hour lifetime.
pub fn token_body(access_token: &str, refresh_token: &str) -> serde_json::Value {
    serde_json::json!({
        "token_type": "Bearer",
        "scope": "https://management.azure.com/user_impersonation",
        "expires_in": 3599,
        "ext_expires_in": 3599,
        "foci": "1",
        "access_token": access_token,
        "refresh_token": refresh_token,
    })
}

/// Tenant listing body with `ids` in order.
pub fn tenants_body(ids: &[&str]) -> String {
    let value: Vec<_> = ids.iter().map(|id| serde_json::json!({ "tenantId": id })).collect();
    serde_json::json!({ "value": value }).to_string()
}

/// A login service plus everything it talks to.
pub struct LoginHarness {
    pub provider: MockIdentityProvider,
    pub browser: FakeBrowser,
    pub service: LoginService,
    _dir: tempfile::TempDir,
}

impl LoginHarness {
    /// Harness whose browser never completes the login.
    pub async fn start() -> anyhow::Result<Self> {
        Self::with_browser(FakeBrowser::idle()).await
    }

    /// Harness whose browser is redirected back with `query`.
    pub async fn redirecting(query: &str) -> anyhow::Result<Self> {
        Self::with_browser(FakeBrowser::redirecting(query)).await
    }

    async fn with_browser(browser: FakeBrowser) -> anyhow::Result<Self> {
        let provider = MockIdentityProvider::start().await?;
        let dir = tempfile::tempdir()?;
        let store = TokenStore::new(dir.path().join("azloginAccessToken.json"));
        let service = LoginService::new(provider.login_config(), store, Arc::new(browser.clone()));
        Ok(Self { provider, browser, service, _dir: dir })
    }

    pub fn store_path(&self) -> &Path {
        self.service.store().path()
    }

    pub async fn login(&self) -> Result<LoginInfo, LoginError> {
        self.service.login(CancellationToken::new()).await
    }

    /// Port of the listener from the last login attempt.
    pub fn callback_port(&self) -> anyhow::Result<u16> {
        let uri = self
            .browser
            .last_redirect_uri()
            .ok_or_else(|| anyhow::anyhow!("browser was never opened"))?;
        let port = uri
            .rsplit_once(':')
            .map(|(_, port)| port)
            .ok_or_else(|| anyhow::anyhow!("no port in {uri}"))?;
        Ok(port.parse()?)
    }
}
