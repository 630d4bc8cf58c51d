use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
struct CachedToken {
    auth_token: String,
}

/// On-disk cache holding the last access token. The profile is never stored.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No cached token at {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str::<CachedToken>(&content) {
            Ok(cached) if !cached.auth_token.is_empty() => Some(cached.auth_token),
            Ok(_) => None,
            Err(e) => {
                warn!("Ignoring unreadable token cache {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Best effort; a failed write only costs a fresh login next start.
    pub fn store(&self, token: &str) {
        let cached = CachedToken {
            auth_token: token.to_string(),
        };
        let result = serde_json::to_string(&cached)
            .map_err(std::io::Error::other)
            .and_then(|json| {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&self.path, json)
            });
        if let Err(e) = result {
            warn!("Failed to write token cache {}: {}", self.path.display(), e);
        }
    }

    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed token cache {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove token cache {}: {}", self.path.display(), e),
        }
    }
}
