// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

use super::{Command, Config, LoginConfig, DEFAULT_AUTHORITY, DEFAULT_CLIENT_ID, DEFAULT_SCOPE};

fn parse(args: &[&str]) -> Config {
    Config::parse_from(args)
}

#[test]
fn login_defaults() -> anyhow::Result<()> {
    let config = parse(&["azlogin", "login"]);
    config.validate()?;
    assert!(matches!(config.command, Command::Login { timeout_secs: 300 }));
    assert_eq!(config.client_id, DEFAULT_CLIENT_ID);
    assert_eq!(config.scope, DEFAULT_SCOPE);
    assert_eq!(config.authority, DEFAULT_AUTHORITY);
    assert_eq!(config.log_format, "text");
    Ok(())
}

#[test]
fn login_timeout_flows_into_login_config() -> anyhow::Result<()> {
    let config = parse(&["azlogin", "login", "--timeout-secs", "42", "--http-timeout-secs", "7"]);
    config.validate()?;
    let login = config.login_config();
    assert_eq!(login.callback_timeout, Duration::from_secs(42));
    assert_eq!(login.http_timeout, Duration::from_secs(7));
    Ok(())
}

#[test]
fn global_flags_accepted_after_subcommand() -> anyhow::Result<()> {
    let config = parse(&[
        "azlogin",
        "token",
        "--json",
        "--authority",
        "http://127.0.0.1:9000",
        "--token-store",
        "/tmp/token.json",
    ]);
    config.validate()?;
    assert!(matches!(config.command, Command::Token { json: true }));
    assert_eq!(config.authority, "http://127.0.0.1:9000");
    let store = config.token_store()?;
    assert_eq!(store.path(), std::path::Path::new("/tmp/token.json"));
    Ok(())
}

#[yare::parameterized(
    empty_client_id = { &["azlogin", "status", "--client-id", " "], "--client-id" },
    empty_scope     = { &["azlogin", "status", "--scope", ""], "--scope" },
    bad_authority   = { &["azlogin", "status", "--authority", "login.example.com"], "--authority" },
    bad_management  = { &["azlogin", "status", "--management-url", "ftp://x"], "--management-url" },
    zero_timeout    = { &["azlogin", "login", "--timeout-secs", "0"], "--timeout-secs" },
    zero_http       = { &["azlogin", "status", "--http-timeout-secs", "0"], "--http-timeout-secs" },
    bad_log_format  = { &["azlogin", "status", "--log-format", "xml"], "invalid log format" },
)]
fn invalid_config(args: &[&str], expected_substr: &str) {
    let config = parse(args);
    crate::assert_err_contains!(config.validate(), expected_substr);
}

#[test]
fn endpoints_use_tenant_path_segment() {
    let config = LoginConfig {
        authority: "https://login.example.com/".to_owned(),
        management_url: "https://management.example.com".to_owned(),
        ..LoginConfig::default()
    };
    assert_eq!(
        config.authorize_endpoint(),
        "https://login.example.com/organizations/oauth2/v2.0/authorize"
    );
    assert_eq!(
        config.token_endpoint("organizations"),
        "https://login.example.com/organizations/oauth2/v2.0/token"
    );
    assert_eq!(config.token_endpoint("T1"), "https://login.example.com/T1/oauth2/v2.0/token");
    assert_eq!(
        config.tenants_url(),
        "https://management.example.com/tenants?api-version=2019-11-01"
    );
}
