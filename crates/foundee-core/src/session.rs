//! Session credential storage.
//!
//! The bearer token lives in `<home>/session.json` with restricted
//! permissions (0600). [`Session`] is the single owner of that state: flows
//! receive a clone of the handle and may read it, but only the methods here
//! mutate it. Tokens are never logged or displayed in full.
//!
//! The file also holds at most one pending destination, the route a
//! signed-out user was heading to when sign-in was required.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::config::paths;
use crate::routes::Route;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    return_to: Option<String>,
}

impl SessionFile {
    fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.return_to.is_none()
    }
}

/// Shared handle to the process-wide session.
///
/// Clones share state. A handle created with [`Session::in_memory`] never
/// touches the filesystem.
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<Mutex<SessionFile>>,
    path: Option<PathBuf>,
}

impl Session {
    /// A session that is not persisted.
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionFile::default())),
            path: None,
        }
    }

    /// Loads the session from the default location.
    ///
    /// # Errors
    /// Returns an error if the session file exists but cannot be read.
    pub fn load() -> Result<Self> {
        Self::load_from(paths::session_path())
    }

    /// Loads the session from `path`; a missing file is an empty session.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: PathBuf) -> Result<Self> {
        let file = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read session from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse session from {}", path.display()))?
        } else {
            SessionFile::default()
        };

        Ok(Self {
            state: Arc::new(Mutex::new(file)),
            path: Some(path),
        })
    }

    /// Where this session is persisted, if anywhere.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the current bearer token.
    pub fn credential(&self) -> Option<String> {
        self.lock().access_token.clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.lock().access_token.is_some()
    }

    /// Stores a new bearer token.
    ///
    /// # Errors
    /// Returns an error if the session cannot be persisted.
    pub fn set_credential(&self, token: &str) -> Result<()> {
        let mut state = self.lock();
        state.access_token = Some(token.to_string());
        self.persist(&state)
    }

    /// Drops the bearer token. Returns whether one was present.
    ///
    /// # Errors
    /// Returns an error if the session cannot be persisted.
    pub fn clear(&self) -> Result<bool> {
        let mut state = self.lock();
        let had_token = state.access_token.take().is_some();
        if had_token {
            self.persist(&state)?;
        }
        Ok(had_token)
    }

    /// Drops the credential and the remembered destination. Returns whether
    /// a credential was present.
    ///
    /// # Errors
    /// Returns an error if the session cannot be persisted.
    pub fn reset(&self) -> Result<bool> {
        let mut state = self.lock();
        let had_token = state.access_token.is_some();
        *state = SessionFile::default();
        self.persist(&state)?;
        Ok(had_token)
    }

    /// Remembers where to go after the next successful sign-in.
    ///
    /// # Errors
    /// Returns an error if the session cannot be persisted.
    pub fn remember_destination(&self, route: &Route) -> Result<()> {
        let mut state = self.lock();
        state.return_to = Some(route.to_path());
        self.persist(&state)
    }

    /// Returns the remembered destination without consuming it.
    pub fn pending_destination(&self) -> Option<Route> {
        let path = self.lock().return_to.clone()?;
        path.parse().ok()
    }

    /// Consumes the remembered destination.
    ///
    /// # Errors
    /// Returns an error if the session cannot be persisted.
    pub fn take_destination(&self) -> Result<Option<Route>> {
        let mut state = self.lock();
        let Some(path) = state.return_to.take() else {
            return Ok(None);
        };
        self.persist(&state)?;
        match path.parse() {
            Ok(route) => Ok(Some(route)),
            Err(e) => {
                tracing::warn!(return_to = %path, error = %e, "discarding unparseable destination");
                Ok(None)
            }
        }
    }

    /// Routes to sign-in, remembering `return_to` for afterwards.
    ///
    /// Persistence failures are logged; the redirect still happens.
    pub fn redirect_to_sign_in(&self, return_to: Option<&Route>) -> Route {
        if let Some(route) = return_to
            && let Err(e) = self.remember_destination(route)
        {
            tracing::warn!(error = %e, "failed to remember destination");
        }
        Route::SignIn
    }

    /// Checks that `destination` can be shown. Routes needing a credential
    /// redirect to sign-in when signed out, remembering `destination`.
    ///
    /// # Errors
    /// Returns the sign-in route when the precondition fails.
    pub fn require_for(&self, destination: &Route) -> Result<(), Route> {
        if !destination.requires_session() || self.is_signed_in() {
            return Ok(());
        }
        Err(self.redirect_to_sign_in(Some(destination)))
    }

    /// Maps a rejected credential to the sign-in route, remembering `here`.
    /// Other errors are left to the caller.
    pub fn sign_in_if_rejected(&self, err: &ApiError, here: &Route) -> Option<Route> {
        err.is_unauthorized()
            .then(|| self.redirect_to_sign_in(Some(here)))
    }

    /// Drops the credential after the backend rejected it.
    pub(crate) fn expire(&self) {
        match self.clear() {
            Ok(true) => tracing::info!("session credential rejected; signed out"),
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "failed to clear rejected session"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionFile> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &SessionFile) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if state.is_empty() {
            if path.exists() {
                fs::remove_file(path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(state).context("Failed to serialize session")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)
                .with_context(|| format!("Failed to open {} for writing", path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(path, contents)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }

        Ok(())
    }
}

/// Masks a token for display, keeping only the first few characters.
pub fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(6).collect();
    if token.chars().count() <= 6 {
        "***".to_string()
    } else {
        format!("{visible}...")
    }
}
