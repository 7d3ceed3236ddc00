// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::error::StoreError;
use crate::store::TokenStore;

/// Public client id of the Azure CLI.
pub const DEFAULT_CLIENT_ID: &str = "04b07795-8ddb-461a-bbee-02f9e1bf7b46";

/// `offline_access` is needed for a refresh token. The management scope is
/// the v1-style `.default`, which multi-tenant tokens cannot use directly.
pub const DEFAULT_SCOPE: &str = "offline_access https://management.azure.com/.default";

pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

pub const DEFAULT_MANAGEMENT_URL: &str = "https://management.azure.com";

/// Tenant path segment for the multi-tenant endpoints.
pub const ORGANIZATIONS_TENANT: &str = "organizations";

const TENANTS_API_VERSION: &str = "2019-11-01";

const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 300;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Identity provider settings for one login service. Built once and never
/// mutated, so tests can point the whole flow at a mock provider.
#[derive(Debug, Clone)]
pub struct LoginConfig {
    pub client_id: String,
    /// Space-separated scope list.
    pub scope: String,
    /// Base URL of the identity provider (token and authorize endpoints).
    pub authority: String,
    /// Base URL of the resource-management API (tenant listing).
    pub management_url: String,
    /// How long to wait for the browser redirect.
    pub callback_timeout: Duration,
    /// Per-request timeout for token and tenant calls.
    pub http_timeout: Duration,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_owned(),
            scope: DEFAULT_SCOPE.to_owned(),
            authority: DEFAULT_AUTHORITY.to_owned(),
            management_url: DEFAULT_MANAGEMENT_URL.to_owned(),
            callback_timeout: Duration::from_secs(DEFAULT_CALLBACK_TIMEOUT_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl LoginConfig {
    pub fn authorize_endpoint(&self) -> String {
        format!(
            "{}/{ORGANIZATIONS_TENANT}/oauth2/v2.0/authorize",
            self.authority.trim_end_matches('/')
        )
    }

    /// Token endpoint for `tenant` (`organizations` or a tenant id).
    pub fn token_endpoint(&self, tenant: &str) -> String {
        format!("{}/{tenant}/oauth2/v2.0/token", self.authority.trim_end_matches('/'))
    }

    pub fn tenants_url(&self) -> String {
        format!(
            "{}/tenants?api-version={TENANTS_API_VERSION}",
            self.management_url.trim_end_matches('/')
        )
    }
}

/// Browser-based Azure login for command-line tools.
#[derive(Debug, Parser)]
#[command(name = "azlogin", version, about)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,

    /// Path of the token store file (defaults to the Azure config directory).
    #[arg(long, env = "AZLOGIN_TOKEN_STORE", global = true)]
    pub token_store: Option<PathBuf>,

    /// OAuth client id.
    #[arg(long, env = "AZLOGIN_CLIENT_ID", default_value = DEFAULT_CLIENT_ID, global = true)]
    pub client_id: String,

    /// Space-separated OAuth scopes.
    #[arg(long, env = "AZLOGIN_SCOPE", default_value = DEFAULT_SCOPE, global = true)]
    pub scope: String,

    /// Identity provider base URL.
    #[arg(long, env = "AZLOGIN_AUTHORITY", default_value = DEFAULT_AUTHORITY, global = true)]
    pub authority: String,

    /// Resource-management API base URL.
    #[arg(long, env = "AZLOGIN_MANAGEMENT_URL", default_value = DEFAULT_MANAGEMENT_URL, global = true)]
    pub management_url: String,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "AZLOGIN_HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS, global = true)]
    pub http_timeout_secs: u64,

    /// Log format (json or text).
    #[arg(long, env = "AZLOGIN_LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "AZLOGIN_LOG_LEVEL", default_value = "warn", global = true)]
    pub log_level: String,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Log in through the system browser.
    Login {
        /// Seconds to wait for the browser to complete the login.
        #[arg(long, env = "AZLOGIN_TIMEOUT_SECS", default_value_t = DEFAULT_CALLBACK_TIMEOUT_SECS)]
        timeout_secs: u64,
    },
    /// Print a valid access token, refreshing it first if it expired.
    Token {
        /// Print the bearer token as JSON instead of the raw access token.
        #[arg(long)]
        json: bool,
    },
    /// Show the stored login without contacting the provider.
    Status,
    /// Forget the stored login.
    Logout,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.client_id.trim().is_empty() {
            anyhow::bail!("--client-id must not be empty");
        }
        if self.scope.trim().is_empty() {
            anyhow::bail!("--scope must not be empty");
        }
        for (flag, url) in [("--authority", &self.authority), ("--management-url", &self.management_url)]
        {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                anyhow::bail!("{flag} must be an http(s) URL, got {url:?}");
            }
        }
        if self.http_timeout_secs == 0 {
            anyhow::bail!("--http-timeout-secs must be greater than zero");
        }
        if let Command::Login { timeout_secs: 0 } = self.command {
            anyhow::bail!("--timeout-secs must be greater than zero");
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        Ok(())
    }

    pub fn login_config(&self) -> LoginConfig {
        let callback_timeout = match self.command {
            Command::Login { timeout_secs } => Duration::from_secs(timeout_secs),
            _ => Duration::from_secs(DEFAULT_CALLBACK_TIMEOUT_SECS),
        };
        LoginConfig {
            client_id: self.client_id.clone(),
            scope: self.scope.clone(),
            authority: self.authority.clone(),
            management_url: self.management_url.clone(),
            callback_timeout,
            http_timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }

    /// Token store at `--token-store`, or at the default location.
    pub fn token_store(&self) -> Result<TokenStore, StoreError> {
        match self.token_store {
            Some(ref path) => Ok(TokenStore::new(path.clone())),
            None => TokenStore::open_default(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
