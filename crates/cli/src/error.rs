// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the login flow, the token store and the accessor.
//!
//! Nothing in this crate retries: every error surfaces to the caller, who is
//! expected to run the interactive login again.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::callback::CallbackError;
use crate::login::LoginState;
use crate::token::Credential;

/// Failure of a single token endpoint exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("token request failed")]
    Http(#[from] reqwest::Error),
    #[error("token endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unable to decode token response")]
    Decode(#[from] serde_json::Error),
}

/// Token store failures. `NotLoggedIn` is kept apart from I/O and decode
/// problems so callers can branch on it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not logged in")]
    NotLoggedIn,
    #[error("unable to locate the credentials directory (set AZURE_CONFIG_DIR or HOME)")]
    NoCredentialsDir,
    #[error("unable to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to decode {}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unable to write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Terminal outcome of an interactive login other than success.
///
/// `Cancelled` and `DeadlineExceeded` are not failures; check with
/// [`LoginError::is_cancellation`].
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("login failed: unable to start login server")]
    Listen(#[source] std::io::Error),
    #[error("login failed: unable to open the browser")]
    BrowserLaunch(#[source] std::io::Error),
    #[error("login failed: unhandled local login server error")]
    CallbackTransport(#[source] CallbackError),
    #[error("login failed: no login code")]
    NoCode,
    #[error("login failed: access token request failed")]
    TokenExchange(#[source] ExchangeError),
    #[error("login failed: check auth failed")]
    TenantRequest(#[source] reqwest::Error),
    #[error("login failed: unable to login status code {status}: {body}")]
    TenantStatus { status: u16, body: String },
    #[error("login failed: unable to decode tenant list")]
    TenantDecode(#[source] serde_json::Error),
    #[error("login failed: could not find azure tenant")]
    NoTenant,
    #[error("login failed: unable to refresh token")]
    Refresh(#[source] ExchangeError),
    #[error("login failed: could not store login info")]
    Store(#[source] StoreError),
    #[error("login cancelled")]
    Cancelled,
    #[error("login timed out after {}s waiting for the browser", .0.as_secs())]
    DeadlineExceeded(Duration),
}

impl LoginError {
    /// True for the cancellation/deadline outcome, false for real failures.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded(_))
    }

    /// State the flow was in when it stopped.
    pub fn failed_in(&self) -> LoginState {
        match self {
            Self::Listen(_) => LoginState::Idle,
            Self::BrowserLaunch(_) => LoginState::Listening,
            Self::CallbackTransport(_) | Self::Cancelled | Self::DeadlineExceeded(_) => {
                LoginState::AwaitingCallback
            }
            Self::NoCode | Self::TokenExchange(_) => LoginState::CallbackReceived,
            Self::TenantRequest(_)
            | Self::TenantStatus { .. }
            | Self::TenantDecode(_)
            | Self::NoTenant => LoginState::CodeExchanged,
            Self::Refresh(_) | Self::Store(_) => LoginState::TenantDiscovered,
        }
    }
}

/// Failure of the non-interactive valid-credential accessor.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("access token request failed. Maybe you need to login to azure again")]
    Refresh(#[source] ExchangeError),
    /// The refresh worked but the store could not be updated. The fresh
    /// credential is handed back so the caller can still use it.
    #[error("refreshed access token could not be saved")]
    Persist {
        credential: Box<Credential>,
        #[source]
        source: StoreError,
    },
}

impl TokenError {
    pub fn is_not_logged_in(&self) -> bool {
        matches!(self, Self::Store(StoreError::NotLoggedIn))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
