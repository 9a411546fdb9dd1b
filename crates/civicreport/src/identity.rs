//! Identity context for the submitting user.
//!
//! Authentication itself belongs to an external identity provider. This
//! module only holds the result: who is signed in right now, if anyone.
//! The [`Session`] is passed explicitly to whoever needs it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Stable user identifier.
    pub id: String,
    /// Account email address.
    pub email: String,
    /// Optional full name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl CurrentUser {
    /// Create a user without a display name.
    #[must_use]
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            display_name: None,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Name to show for this user: the display name, else the email.
    #[must_use]
    pub fn display_label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Authentication state: populated on sign-in, cleared on sign-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    user: Option<CurrentUser>,
}

impl Session {
    /// An anonymous session.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A session already signed in as `user`.
    #[must_use]
    pub fn signed_in(user: CurrentUser) -> Self {
        Self { user: Some(user) }
    }

    /// The current user, or `None` when anonymous.
    #[must_use]
    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    /// Check if a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Record a successful sign-in, replacing any previous user.
    pub fn sign_in(&mut self, user: CurrentUser) {
        info!("Signed in as {}", user.display_label());
        self.user = Some(user);
    }

    /// Clear the current user. Returns the user that was signed in.
    pub fn sign_out(&mut self) -> Option<CurrentUser> {
        let previous = self.user.take();
        if let Some(user) = &previous {
            info!("Signed out {}", user.display_label());
        }
        previous
    }

    /// Load a session from a JSON file.
    ///
    /// A missing file yields an anonymous session.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No session file at {}, anonymous", path.display());
            return Ok(Self::anonymous());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::session(path, format!("read failed: {e}")))?;
        serde_json::from_str(&raw).map_err(|e| Error::session(path, format!("parse failed: {e}")))
    }

    /// Write the session to a JSON file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| Error::session(path, format!("write failed: {e}")))?;
        debug!("Session saved to {}", path.display());
        Ok(())
    }
}
