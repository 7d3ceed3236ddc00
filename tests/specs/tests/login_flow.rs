// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end login scenarios through the public library API.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use azlogin::error::{LoginError, StoreError};
use azlogin::token::now_ms;
use azlogin_specs::{login_info, tenants_body, token_body, LoginHarness};

#[tokio::test]
async fn browser_login_stores_tenant_scoped_token() -> anyhow::Result<()> {
    let h = LoginHarness::redirecting("code=abc123&state=ignored&session_state=x").await?;
    h.provider.push_token_response(200, token_body("AT1", "RT1"));
    h.provider.set_tenants_response(200, tenants_body(&["T1"]));
    h.provider.push_token_response(200, token_body("AT2", "RT2"));

    let info = h.login().await?;

    let stored = h.service.store().read()?;
    assert_eq!(stored, info);
    assert_eq!(stored.tenant_id, "T1");
    assert_eq!(stored.credential.access_token, "AT2");
    assert_eq!(stored.credential.refresh_token, "RT2");

    // The stored token is served as-is afterwards.
    let before = h.provider.request_count();
    let cred = h.service.valid_token().await?;
    assert_eq!(cred, stored.credential);
    assert_eq!(h.provider.request_count(), before);
    Ok(())
}

#[tokio::test]
async fn first_listed_tenant_wins() -> anyhow::Result<()> {
    let h = LoginHarness::redirecting("code=abc123").await?;
    h.provider.push_token_response(200, token_body("AT1", "RT1"));
    h.provider.set_tenants_response(200, tenants_body(&["T9", "T1", "T5"]));
    h.provider.push_token_response(200, token_body("AT2", "RT2"));

    let info = h.login().await?;
    assert_eq!(info.tenant_id, "T9");
    assert_eq!(h.provider.token_requests()[1].tenant, "T9");
    Ok(())
}

#[tokio::test]
async fn provider_error_redirect_is_no_code() -> anyhow::Result<()> {
    let h = LoginHarness::redirecting("error=access_denied&error_description=user+cancelled").await?;

    let result = h.login().await;
    assert!(matches!(result, Err(LoginError::NoCode)), "got {result:?}");
    assert_eq!(h.provider.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn login_can_run_again_after_cancellation() -> anyhow::Result<()> {
    let h = LoginHarness::start().await?;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = h.service.login(cancel).await;
    assert!(matches!(result, Err(LoginError::Cancelled)), "got {result:?}");

    let port = h.callback_port()?;
    drop(tokio::net::TcpListener::bind(("localhost", port)).await?);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });
    let result = h.service.login(cancel).await;
    assert!(matches!(result, Err(LoginError::Cancelled)), "got {result:?}");
    assert_eq!(h.browser.opened().len(), 2);
    Ok(())
}

#[tokio::test]
async fn no_tenant_means_no_refresh_and_nothing_stored() -> anyhow::Result<()> {
    let h = LoginHarness::redirecting("code=abc123").await?;
    h.provider.push_token_response(200, token_body("AT1", "RT1"));
    h.provider.set_tenants_response(200, tenants_body(&[]));

    let result = h.login().await;
    assert!(matches!(result, Err(LoginError::NoTenant)), "got {result:?}");
    assert_eq!(h.provider.token_requests().len(), 1);
    assert!(!h.store_path().exists());
    Ok(())
}

#[tokio::test]
async fn expired_token_is_refreshed_once_then_served_from_store() -> anyhow::Result<()> {
    let h = LoginHarness::start().await?;
    h.service.store().write(&login_info("T1", "AT1", "RT1", now_ms() - 1_000))?;
    h.provider.push_token_response(200, token_body("AT2", "RT2"));

    let first = h.service.valid_token().await?;
    let second = h.service.valid_token().await?;

    assert_eq!(first.access_token, "AT2");
    assert_eq!(second, first);
    assert_eq!(h.provider.token_requests().len(), 1);
    assert_eq!(h.service.store().read()?.credential, first);
    Ok(())
}

#[tokio::test]
async fn rejected_refresh_keeps_stored_bytes() -> anyhow::Result<()> {
    let h = LoginHarness::start().await?;
    h.service.store().write(&login_info("T1", "AT1", "RT1", 0))?;
    let before = std::fs::read(h.store_path())?;

    let result = h.service.valid_token().await;
    let err = result.err().ok_or_else(|| anyhow::anyhow!("expected refresh failure"))?;
    assert!(err.to_string().contains("login to azure again"), "{err}");
    assert_eq!(std::fs::read(h.store_path())?, before);
    Ok(())
}

#[tokio::test]
async fn logout_then_token_is_not_logged_in() -> anyhow::Result<()> {
    let h = LoginHarness::start().await?;
    h.service.store().write(&login_info("T1", "AT1", "RT1", now_ms() + 60_000))?;

    assert!(h.service.logout()?);
    assert!(matches!(h.service.status(), Err(StoreError::NotLoggedIn)));
    let err = h.service.valid_token().await.err().ok_or_else(|| anyhow::anyhow!("expected error"))?;
    assert!(err.is_not_logged_in());
    Ok(())
}
