// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential types: token endpoint responses, the persisted login unit,
//! and the bearer adaptation handed to management API clients.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Token type assumed when the provider omits `token_type`.
const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Current wall-clock time as milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Token endpoint response (authorization code and refresh token grants).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    /// Token lifetime in seconds.
    #[serde(default)]
    pub expires_in: u64,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

/// An access credential issued by the identity provider.
///
/// Never mutated after issue; a refresh produces a whole new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as milliseconds since Unix epoch.
    pub expires_at_ms: u64,
}

impl Credential {
    /// Build a credential from a token response received at `issued_at_ms`.
    pub fn from_response(response: TokenResponse, issued_at_ms: u64) -> Self {
        Self {
            token_type: response.token_type,
            scope: response.scope,
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at_ms: issued_at_ms.saturating_add(response.expires_in.saturating_mul(1000)),
        }
    }

    /// A credential is valid while its expiry lies strictly after `now_ms`.
    pub fn is_valid_at(&self, now_ms: u64) -> bool {
        self.expires_at_ms > now_ms
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_ms())
    }

    /// Whole seconds of validity left at `now_ms` (zero once expired).
    pub fn expires_in_secs_at(&self, now_ms: u64) -> u64 {
        self.expires_at_ms.saturating_sub(now_ms) / 1000
    }

    /// Adapt into a bearer token, with the lifetime recomputed at `now_ms`.
    pub fn bearer_at(&self, now_ms: u64) -> BearerToken {
        let token_type = if self.token_type.is_empty() {
            DEFAULT_TOKEN_TYPE.to_owned()
        } else {
            self.token_type.clone()
        };
        BearerToken {
            access_token: self.access_token.clone(),
            token_type,
            expires_in: self.expires_in_secs_at(now_ms),
            expires_on: self.expires_at_ms / 1000,
        }
    }

    pub fn bearer(&self) -> BearerToken {
        self.bearer_at(now_ms())
    }
}

/// The unit of persistence: the active tenant and its scoped credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginInfo {
    pub tenant_id: String,
    pub credential: Credential,
}

/// Response of the tenant listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantList {
    #[serde(default)]
    pub value: Vec<Tenant>,
}

/// A tenant visible to the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tenant {
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
}

/// Bearer authentication handed to resource-management clients.
///
/// Carries no refresh token: the consumer asks for a new one through
/// [`crate::login::LoginService::bearer_token`] instead of refreshing itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BearerToken {
    pub access_token: String,
    pub token_type: String,
    /// Seconds remaining at the moment of adaptation.
    pub expires_in: u64,
    /// Expiry as seconds since Unix epoch.
    pub expires_on: u64,
}

impl BearerToken {
    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
