//! Persisted sign-in state.
//!
//! The signed-in user's card is written to a single JSON file under the
//! platform data directory, mirroring what the app keeps in browser storage.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use ldhingram_model::UserCard;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

const SESSION_FILE: &str = "app_user.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub user: UserCard,
    pub signed_in_at: String,
}

impl AuthSession {
    pub fn now(user: UserCard) -> Result<Self> {
        let signed_in_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("format sign-in timestamp")?;
        Ok(Self {
            user,
            signed_in_at,
        })
    }
}

pub struct SessionStore {
    file: PathBuf,
}

impl SessionStore {
    /// Store rooted at the platform data directory.
    pub fn open() -> Result<Self> {
        let dirs = ProjectDirs::from("org", "ldhingram", "ldhingram")
            .ok_or_else(|| anyhow!("no home directory available"))?;
        Ok(Self::at(dirs.data_dir()))
    }

    /// Store rooted at an explicit directory.
    pub fn at(dir: &Path) -> Self {
        Self {
            file: dir.join(SESSION_FILE),
        }
    }

    /// The persisted session, or `None` when signed out.
    pub async fn load(&self) -> Result<Option<AuthSession>> {
        match tokio::fs::read(&self.file).await {
            Ok(bytes) => {
                let session = serde_json::from_slice(&bytes)
                    .with_context(|| format!("parse session file {}", self.file.display()))?;
                Ok(Some(session))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("read {}", self.file.display())),
        }
    }

    pub async fn save(&self, session: &AuthSession) -> Result<()> {
        if let Some(parent) = self.file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let bytes = serde_json::to_vec_pretty(session)?;
        tokio::fs::write(&self.file, bytes)
            .await
            .with_context(|| format!("write {}", self.file.display()))?;
        debug!(user = %session.user.handle, "session saved");
        Ok(())
    }

    /// Sign out. Missing file is fine.
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.file).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("remove {}", self.file.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockStore;

    #[tokio::test]
    async fn session_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::at(dir.path());
        assert!(store.load().await.unwrap().is_none());

        let user = MockStore::seeded().current_user();
        let session = AuthSession::now(user).unwrap();
        store.save(&session).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(session));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        // clearing twice is not an error
        store.clear().await.unwrap();
    }
}
