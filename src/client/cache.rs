//! Client-side token holder.
//!
//! The cache never evicts on its own: expiry is decided by the authority, the
//! cache only remembers what the last successful exchange returned.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

/// The persisted entry: one token and its expiry (Unix seconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Holder of the current token, optionally mirrored to a JSON file.
#[derive(Debug, Default)]
pub struct TokenCache {
    entry: Mutex<Option<CachedToken>>,
    path: Option<PathBuf>,
}

impl TokenCache {
    /// A cache that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A cache persisted at `path`, restoring any entry already stored there.
    /// A missing or unreadable file starts the cache empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entry = load(&path);
        Self {
            entry: Mutex::new(entry),
            path: Some(path),
        }
    }

    pub fn get(&self) -> Option<CachedToken> {
        self.lock().clone()
    }

    /// Replace the held token. Persistence failures are logged, the in-memory
    /// value is updated regardless.
    pub fn set(&self, token: impl Into<String>, expires_at: i64) {
        let entry = CachedToken {
            token: token.into(),
            expires_at,
        };
        let mut guard = self.lock();
        if let Some(path) = &self.path {
            if let Err(e) = store(path, &entry) {
                warn!(path = %path.display(), error = %e, "Failed to persist token");
            }
        }
        *guard = Some(entry);
    }

    pub fn clear(&self) {
        let mut guard = self.lock();
        if let Some(path) = &self.path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove token file"),
            }
        }
        *guard = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<CachedToken>> {
        // The entry is replaced wholesale, a poisoned guard still holds a coherent value
        self.entry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn load(path: &Path) -> Option<CachedToken> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read token file");
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring corrupt token file");
            None
        }
    }
}

fn store(path: &Path, entry: &CachedToken) -> std::io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let content = serde_json::to_string(entry).map_err(std::io::Error::other)?;
    fs::write(path, content)?;

    // The file holds a bearer credential
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
