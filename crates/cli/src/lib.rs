// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod browser;
pub mod callback;
pub mod config;
pub mod error;
pub mod identity;
pub mod login;
pub mod store;
pub mod test_support;
pub mod token;

static CRYPTO_INIT: std::sync::Once = std::sync::Once::new();

/// Install the rustls ring crypto provider (idempotent).
///
/// reqwest is built without a bundled provider, so this must run before the
/// first HTTPS request.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
