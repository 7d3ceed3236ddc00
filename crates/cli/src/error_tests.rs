// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::error::Error as _;

use super::*;

fn io_err() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")
}

#[yare::parameterized(
    listen = { LoginError::Listen(io_err()), LoginState::Idle },
    browser = { LoginError::BrowserLaunch(io_err()), LoginState::Listening },
    cancelled = { LoginError::Cancelled, LoginState::AwaitingCallback },
    deadline = { LoginError::DeadlineExceeded(Duration::from_secs(5)), LoginState::AwaitingCallback },
    no_code = { LoginError::NoCode, LoginState::CallbackReceived },
    no_tenant = { LoginError::NoTenant, LoginState::CodeExchanged },
    tenant_status = { LoginError::TenantStatus { status: 401, body: String::new() }, LoginState::CodeExchanged },
    store = { LoginError::Store(StoreError::NotLoggedIn), LoginState::TenantDiscovered },
)]
fn failed_in(err: LoginError, expected: LoginState) {
    assert_eq!(err.failed_in(), expected);
}

#[test]
fn only_cancel_and_deadline_are_cancellations() {
    assert!(LoginError::Cancelled.is_cancellation());
    assert!(LoginError::DeadlineExceeded(Duration::from_secs(1)).is_cancellation());
    assert!(!LoginError::NoCode.is_cancellation());
    assert!(!LoginError::NoTenant.is_cancellation());
}

#[test]
fn messages_name_the_stage() {
    assert_eq!(LoginError::NoCode.to_string(), "login failed: no login code");
    assert_eq!(
        LoginError::DeadlineExceeded(Duration::from_secs(300)).to_string(),
        "login timed out after 300s waiting for the browser"
    );
    let status = ExchangeError::Status { status: 400, body: "invalid_grant".to_owned() };
    assert_eq!(status.to_string(), "token endpoint returned HTTP 400: invalid_grant");
}

#[test]
fn source_chain_keeps_the_cause() {
    let err = LoginError::Store(StoreError::Write { path: PathBuf::from("/x/token.json"), source: io_err() });
    let store = err.source().map(ToString::to_string);
    assert_eq!(store.as_deref(), Some("unable to write /x/token.json"));
    let io = err.source().and_then(|s| s.source()).map(ToString::to_string);
    assert_eq!(io.as_deref(), Some("denied"));
}

#[test]
fn token_error_distinguishes_not_logged_in() {
    assert!(TokenError::from(StoreError::NotLoggedIn).is_not_logged_in());
    assert_eq!(TokenError::from(StoreError::NotLoggedIn).to_string(), "not logged in");
    let refresh = TokenError::Refresh(ExchangeError::Status { status: 400, body: String::new() });
    assert!(!refresh.is_not_logged_in());
    assert!(refresh.to_string().contains("Maybe you need to login to azure again"));
}
