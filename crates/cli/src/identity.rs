// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP calls to the identity provider: token grants and tenant listing.

use reqwest::StatusCode;
use tracing::debug;

use crate::browser::build_authorize_url;
use crate::config::{LoginConfig, ORGANIZATIONS_TENANT};
use crate::error::{ExchangeError, LoginError};
use crate::token::{now_ms, Credential, Tenant, TenantList, TokenResponse};

/// Client for the provider endpoints named in a [`LoginConfig`].
pub struct IdentityClient {
    http: reqwest::Client,
    config: LoginConfig,
}

impl IdentityClient {
    pub fn new(config: LoginConfig) -> Self {
        crate::ensure_crypto();
        let http = reqwest::Client::builder().timeout(config.http_timeout).build().unwrap_or_default();
        Self { http, config }
    }

    pub fn config(&self) -> &LoginConfig {
        &self.config
    }

    /// Authorization URL for the browser, redirecting to `redirect_uri`.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        build_authorize_url(
            &self.config.authorize_endpoint(),
            &self.config.client_id,
            redirect_uri,
            state,
            &self.config.scope,
        )
    }

    /// Authorization code grant against the multi-tenant endpoint.
    ///
    /// `redirect_uri` must be exactly the one the browser was sent with.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Credential, ExchangeError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("scope", self.config.scope.as_str()),
            ("redirect_uri", redirect_uri),
        ];
        self.request_token(ORGANIZATIONS_TENANT, &form).await
    }

    /// Refresh token grant scoped to `tenant_id`.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        tenant_id: &str,
    ) -> Result<Credential, ExchangeError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("scope", self.config.scope.as_str()),
            ("refresh_token", refresh_token),
        ];
        self.request_token(tenant_id, &form).await
    }

    async fn request_token(
        &self,
        tenant: &str,
        form: &[(&str, &str)],
    ) -> Result<Credential, ExchangeError> {
        let url = self.config.token_endpoint(tenant);
        let resp = self.http.post(&url).form(form).send().await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ExchangeError::Status { status: status.as_u16(), body });
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        debug!(tenant, expires_in = token.expires_in, "token issued");
        Ok(Credential::from_response(token, now_ms()))
    }

    /// List the tenants visible to `access_token`, in provider order.
    pub async fn list_tenants(&self, access_token: &str) -> Result<Vec<Tenant>, LoginError> {
        let resp = self
            .http
            .get(self.config.tenants_url())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(LoginError::TenantRequest)?;

        let status = resp.status();
        let body = resp.text().await.map_err(LoginError::TenantRequest)?;
        if status != StatusCode::OK {
            return Err(LoginError::TenantStatus { status: status.as_u16(), body });
        }

        let list: TenantList = serde_json::from_str(&body).map_err(LoginError::TenantDecode)?;
        debug!(count = list.value.len(), "tenants listed");
        Ok(list.value)
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
