//! Session proof kept between CLI runs
//!
//! Each run is a fresh process with an empty cookie store, so the long-lived
//! session proof is saved after every command and loaded before the next.
//! The access credential itself is never written to disk.

use anyhow::{Context, Result};
use keystone_http::SessionClient;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
struct SavedProof {
    base_url: String,
    cookie: String,
}

pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `KEYSTONE_STATE_DIR/session.json`, else the platform data directory
    pub fn default_path() -> PathBuf {
        let state_dir = std::env::var("KEYSTONE_STATE_DIR").map_or_else(
            |_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("keystone")
            },
            PathBuf::from,
        );
        state_dir.join("session.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hand a previously saved proof to the client's cookie store.
    ///
    /// A missing or unreadable file just means there is nothing to restore.
    pub fn load_into(&self, client: &SessionClient) {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %self.path.display(), "no saved session: {e}");
                return;
            }
        };

        match serde_json::from_str::<SavedProof>(&content) {
            Ok(saved) if saved.base_url == client.base_url() => {
                client.restore_session_proof(&saved.cookie);
                debug!(path = %self.path.display(), "loaded saved session");
            }
            Ok(saved) => {
                debug!(saved = %saved.base_url, "saved session belongs to another service");
            }
            Err(e) => {
                warn!(path = %self.path.display(), "ignoring unreadable session file: {e}");
            }
        }
    }

    /// Write the client's current proof, or remove the file when it has none
    pub fn save_from(&self, client: &SessionClient) -> Result<()> {
        let Some(cookie) = client.session_proof() else {
            if self.path.exists() {
                fs::remove_file(&self.path).with_context(|| {
                    format!("failed to remove session file {}", self.path.display())
                })?;
                debug!(path = %self.path.display(), "removed session file");
            }
            return Ok(());
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let saved = SavedProof {
            base_url: client.base_url().to_string(),
            cookie,
        };
        let mut file = open_private(&self.path)
            .with_context(|| format!("failed to write session file {}", self.path.display()))?;
        file.write_all(serde_json::to_string_pretty(&saved)?.as_bytes())?;
        debug!(path = %self.path.display(), "saved session");
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}
