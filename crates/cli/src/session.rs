//! Saved login tokens between invocations

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use ssg_business::{BusinessError, IdentityProvider, Session};
use ssg_core::Principal;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFile {
    pub access_token: String,
    pub refresh_token: String,
    pub email: String,
}

impl From<&Session> for SessionFile {
    fn from(session: &Session) -> Self {
        Self {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            email: session.user.email.clone(),
        }
    }
}

impl SessionFile {
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file {:?}", path))?;
        let session = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt session file {:?}", path))?;
        Ok(Some(session))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write session file {:?}", path))
    }

    pub fn remove(path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove session file {:?}", path))?;
        }
        Ok(())
    }
}

/// Principal of the saved session, refreshing expired tokens once.
pub async fn require_principal(identity: &dyn IdentityProvider, path: &Path) -> Result<Principal> {
    let Some(saved) = SessionFile::load(path)? else {
        bail!("Not logged in. Run 'ssg login <email> <password>' first.");
    };

    match identity.principal(&saved.access_token).await {
        Ok(principal) => Ok(principal),
        Err(BusinessError::Unauthenticated) => {
            let session = identity
                .refresh(&saved.refresh_token)
                .await
                .context("Session expired. Run 'ssg login' again.")?;
            SessionFile::from(&session).save(path)?;
            tracing::debug!(email = %session.user.email, "session refreshed");
            Ok(session.principal())
        }
        Err(e) => Err(e.into()),
    }
}
