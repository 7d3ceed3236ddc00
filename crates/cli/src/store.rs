// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token store: the last successful login, persisted as JSON.
//!
//! The file is the source of truth; nothing is cached between calls. There
//! is no inter-process locking, so concurrent writers race (last one wins).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StoreError;
use crate::token::LoginInfo;

/// File name of the token store inside the credentials directory.
pub const TOKEN_STORE_FILENAME: &str = "azloginAccessToken.json";

/// Resolve the platform credentials directory.
///
/// Checks `AZURE_CONFIG_DIR`, then `$HOME/.azure` (`%USERPROFILE%\.azure`
/// on Windows).
pub fn credentials_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("AZURE_CONFIG_DIR") {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir));
        }
    }
    let home_var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    match std::env::var(home_var) {
        Ok(home) if !home.is_empty() => Some(PathBuf::from(home).join(".azure")),
        _ => None,
    }
}

/// File-backed store holding exactly one [`LoginInfo`].
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at [`TOKEN_STORE_FILENAME`] inside [`credentials_dir`].
    pub fn open_default() -> Result<Self, StoreError> {
        let dir = credentials_dir().ok_or(StoreError::NoCredentialsDir)?;
        Ok(Self::new(dir.join(TOKEN_STORE_FILENAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored login. A missing file is [`StoreError::NotLoggedIn`].
    pub fn read(&self) -> Result<LoginInfo, StoreError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotLoggedIn),
            Err(source) => return Err(StoreError::Read { path: self.path.clone(), source }),
        };
        serde_json::from_str(&data)
            .map_err(|source| StoreError::Decode { path: self.path.clone(), source })
    }

    /// Replace the stored login atomically (write tmp + rename).
    ///
    /// The temp name is unique per process and call, so concurrent writers
    /// never interleave bytes in one temp file.
    pub fn write(&self, info: &LoginInfo) -> Result<(), StoreError> {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        let write_err = |source| StoreError::Write { path: self.path.clone(), source };

        let json = serde_json::to_string_pretty(info)
            .map_err(|e| write_err(std::io::Error::new(ErrorKind::InvalidData, e)))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = self.path.with_file_name(tmp_name);

        if let Err(e) = write_private(&tmp_path, json.as_bytes()) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(write_err(e));
        }
        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(write_err(e));
        }

        debug!(path = %self.path.display(), tenant = %info.tenant_id, "login info stored");
        Ok(())
    }

    /// Delete the stored login. Returns false if there was none.
    pub fn remove(&self) -> Result<bool, StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Write { path: self.path.clone(), source }),
        }
    }
}

/// Write `data` to a new file readable only by the current user.
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
