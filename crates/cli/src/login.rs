// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Login coordinator and valid-credential accessor.
//!
//! One interactive login walks a fixed sequence of states:
//!
//! ```text
//! Idle -> Listening -> AwaitingCallback -> CallbackReceived
//!      -> CodeExchanged -> TenantDiscovered -> TokenPersisted
//! ```
//!
//! Any step can fail; the error records which state it stopped in (see
//! [`LoginError::failed_in`]). Nothing is persisted until the final step, so
//! a failed login leaves the previous login untouched.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::browser::{generate_state, BrowserOpener, SystemBrowser};
use crate::callback::{CallbackError, CallbackServer};
use crate::config::LoginConfig;
use crate::error::{LoginError, StoreError, TokenError};
use crate::identity::IdentityClient;
use crate::store::TokenStore;
use crate::token::{now_ms, BearerToken, Credential, LoginInfo};

/// Progress of one interactive login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    Listening,
    AwaitingCallback,
    CallbackReceived,
    CodeExchanged,
    TenantDiscovered,
    TokenPersisted,
}

impl LoginState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::AwaitingCallback => "awaiting_callback",
            Self::CallbackReceived => "callback_received",
            Self::CodeExchanged => "code_exchanged",
            Self::TenantDiscovered => "tenant_discovered",
            Self::TokenPersisted => "token_persisted",
        }
    }
}

impl std::fmt::Display for LoginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of the stored login, safe to print (no token values).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginStatus {
    pub tenant_id: String,
    pub token_type: String,
    pub expires_at_ms: u64,
    pub expires_in_secs: u64,
    pub valid: bool,
}

/// Runs interactive logins and hands out valid credentials.
///
/// Holds no credential in memory: the token store is read on every call.
pub struct LoginService {
    identity: IdentityClient,
    store: TokenStore,
    browser: Arc<dyn BrowserOpener>,
}

impl LoginService {
    pub fn new(config: LoginConfig, store: TokenStore, browser: Arc<dyn BrowserOpener>) -> Self {
        Self { identity: IdentityClient::new(config), store, browser }
    }

    /// Service that launches the platform browser.
    pub fn with_system_browser(config: LoginConfig, store: TokenStore) -> Self {
        Self::new(config, store, Arc::new(SystemBrowser))
    }

    pub fn config(&self) -> &LoginConfig {
        self.identity.config()
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Run one interactive login to completion.
    ///
    /// Returns early with [`LoginError::Cancelled`] when `cancel` fires, or
    /// [`LoginError::DeadlineExceeded`] when no redirect arrives within the
    /// configured callback timeout. The local listener is closed on every
    /// path before this returns.
    pub async fn login(&self, cancel: CancellationToken) -> Result<LoginInfo, LoginError> {
        let (mut server, rx) = CallbackServer::bind().await.map_err(LoginError::Listen)?;
        server.serve();
        let redirect_uri = server.redirect_uri().to_string();
        debug!(state = %LoginState::Listening, redirect_uri, "login server listening");

        let url = self.identity.authorize_url(&redirect_uri, &generate_state());
        if let Err(e) = self.browser.open(&url) {
            server.close().await;
            return Err(LoginError::BrowserLaunch(e));
        }
        info!(state = %LoginState::AwaitingCallback, "waiting for browser login");

        let timeout = self.config().callback_timeout;
        let received = tokio::select! {
            _ = cancel.cancelled() => Err(LoginError::Cancelled),
            _ = tokio::time::sleep(timeout) => Err(LoginError::DeadlineExceeded(timeout)),
            result = rx => match result {
                Ok(Ok(values)) => Ok(values),
                Ok(Err(e)) => Err(LoginError::CallbackTransport(e)),
                Err(_) => Err(LoginError::CallbackTransport(CallbackError::closed())),
            },
        };
        server.close().await;

        let values = match received {
            Ok(values) => values,
            Err(e) => {
                if e.is_cancellation() {
                    info!("{e}");
                } else {
                    warn!(state = %e.failed_in(), "{e}");
                }
                return Err(e);
            }
        };
        debug!(state = %LoginState::CallbackReceived, "login redirect received");

        let result = self.complete(&values, &redirect_uri).await;
        match &result {
            Ok(info) => {
                info!(state = %LoginState::TokenPersisted, tenant = %info.tenant_id, "login succeeded");
            }
            Err(e) => warn!(state = %e.failed_in(), "{e}"),
        }
        result
    }

    /// Everything after the redirect: code exchange, tenant pick, tenant
    /// scoped refresh, persist.
    async fn complete(
        &self,
        values: &crate::callback::QueryValues,
        redirect_uri: &str,
    ) -> Result<LoginInfo, LoginError> {
        let Some(code) = values.get("code") else {
            if let Some(error) = values.get("error") {
                warn!(
                    error,
                    description = values.get("error_description").unwrap_or_default(),
                    "identity provider returned an error"
                );
            }
            return Err(LoginError::NoCode);
        };

        let multi_tenant =
            self.identity.exchange_code(code, redirect_uri).await.map_err(LoginError::TokenExchange)?;
        debug!(state = %LoginState::CodeExchanged, "authorization code exchanged");

        let tenants = self.identity.list_tenants(&multi_tenant.access_token).await?;
        let tenant_id = tenants.into_iter().next().ok_or(LoginError::NoTenant)?.tenant_id;
        debug!(state = %LoginState::TenantDiscovered, tenant = %tenant_id, "tenant selected");

        let credential = self
            .identity
            .refresh(&multi_tenant.refresh_token, &tenant_id)
            .await
            .map_err(LoginError::Refresh)?;

        let info = LoginInfo { tenant_id, credential };
        self.store.write(&info).map_err(LoginError::Store)?;
        Ok(info)
    }

    /// Stored credential if still valid, otherwise a refreshed one.
    ///
    /// A successful refresh is written back to the store. A failed refresh
    /// leaves the store as it was.
    pub async fn valid_token(&self) -> Result<Credential, TokenError> {
        let info = self.store.read()?;
        if info.credential.is_valid() {
            return Ok(info.credential);
        }

        debug!(tenant = %info.tenant_id, "access token expired, refreshing");
        let credential = self
            .identity
            .refresh(&info.credential.refresh_token, &info.tenant_id)
            .await
            .map_err(TokenError::Refresh)?;

        let refreshed = LoginInfo { tenant_id: info.tenant_id, credential };
        if let Err(source) = self.store.write(&refreshed) {
            return Err(TokenError::Persist { credential: Box::new(refreshed.credential), source });
        }
        Ok(refreshed.credential)
    }

    /// [`Self::valid_token`] adapted for a management API client.
    pub async fn bearer_token(&self) -> Result<BearerToken, TokenError> {
        Ok(self.valid_token().await?.bearer())
    }

    /// Summary of the stored login. Never refreshes.
    pub fn status(&self) -> Result<LoginStatus, StoreError> {
        let info = self.store.read()?;
        let now = now_ms();
        Ok(LoginStatus {
            expires_at_ms: info.credential.expires_at_ms,
            expires_in_secs: info.credential.expires_in_secs_at(now),
            valid: info.credential.is_valid_at(now),
            token_type: info.credential.token_type,
            tenant_id: info.tenant_id,
        })
    }

    /// Forget the stored login. Returns false if there was none.
    pub fn logout(&self) -> Result<bool, StoreError> {
        let removed = self.store.remove()?;
        if removed {
            info!(path = %self.store.path().display(), "login removed");
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "login_tests.rs"]
mod tests;
