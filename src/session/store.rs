//! Session persistence, validation, and the interactive login flow.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::{LivenessProbe, LoginSignal, PersistenceError, Session, SessionError};
use crate::atomic_file::write_atomic;
use crate::driver::{BrowserDriver, wait_for_page_ready};

/// Owns the session file and the login/validation flows around it.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
    landing_url: String,
    ready_timeout: Duration,
}

impl SessionStore {
    /// Creates a store for `path` that validates against `landing_url`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, landing_url: impl Into<String>, ready_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            landing_url: landing_url.into(),
            ready_timeout,
        }
    }

    /// Location of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored session.
    ///
    /// Missing, unreadable, malformed, or empty storage yields `None`; the
    /// cause is logged and never surfaced to the caller.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Option<Session> {
        match self.read() {
            Ok(Some(session)) => {
                debug!(credentials = session.len(), "loaded stored session");
                Some(session)
            }
            Ok(None) => {
                debug!("no stored session");
                None
            }
            Err(error) => {
                warn!(error = %error, "ignoring unusable session file");
                None
            }
        }
    }

    fn read(&self) -> Result<Option<Session>, SessionError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path).map_err(|source| SessionError::Read {
            path: self.path.clone(),
            source,
        })?;
        let session: Session =
            serde_json::from_str(&raw).map_err(|source| SessionError::Parse {
                path: self.path.clone(),
                source,
            })?;
        if session.is_empty() {
            return Err(SessionError::Empty {
                path: self.path.clone(),
            });
        }
        Ok(Some(session))
    }

    /// Writes `session`, replacing any previous file.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the file cannot be written.
    #[instrument(level = "debug", skip(self, session), fields(path = %self.path.display()))]
    pub fn persist(&self, session: &Session) -> Result<(), PersistenceError> {
        let json = serde_json::to_vec_pretty(session)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        write_atomic(&self.path, &json).map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })?;
        info!(credentials = session.len(), path = %self.path.display(), "session saved");
        Ok(())
    }

    /// Applies `session` to the driver, reloads the landing page, and asks
    /// `probe` whether the page still shows a logged-in user.
    ///
    /// Only a page with a logged-out marker and no logged-in marker counts as
    /// invalid; ambiguous pages are kept.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Apply`] when the landing page cannot be loaded
    /// or the driver rejects the credentials.
    #[instrument(level = "debug", skip_all, fields(credentials = session.len()))]
    pub async fn validate(
        &self,
        driver: &mut dyn BrowserDriver,
        session: &Session,
        probe: &dyn LivenessProbe,
    ) -> Result<bool, SessionError> {
        // Cookies can only be set for the domain currently loaded.
        driver
            .navigate(&self.landing_url)
            .await
            .map_err(SessionError::Apply)?;
        driver
            .apply_cookies(session.credentials())
            .await
            .map_err(SessionError::Apply)?;
        driver.reload().await.map_err(SessionError::Apply)?;
        wait_for_page_ready(driver, self.ready_timeout).await;

        let markup = driver.page_source().await.map_err(SessionError::Apply)?;
        let liveness = probe.evaluate(&markup);
        debug!(?liveness, "liveness probe evaluated");
        Ok(liveness.is_valid())
    }

    /// Opens the landing page, waits for the human to finish logging in, then
    /// captures and persists the browser's credentials.
    ///
    /// A persistence failure is logged; the captured session is still
    /// returned because the browser already holds it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Apply`] if the landing page cannot be opened and
    /// [`SessionError::Capture`] if the credentials cannot be read back.
    #[instrument(level = "debug", skip_all)]
    pub async fn interactive_login(
        &self,
        driver: &mut dyn BrowserDriver,
        signal: &dyn LoginSignal,
    ) -> Result<Session, SessionError> {
        driver
            .navigate(&self.landing_url)
            .await
            .map_err(SessionError::Apply)?;

        signal.wait_for_confirmation().await;

        let credentials = driver.cookies().await.map_err(SessionError::Capture)?;
        if credentials.is_empty() {
            warn!("browser reported no credentials after login");
        }
        let session = Session::new(credentials);

        if let Err(error) = self.persist(&session) {
            warn!(error = %error, "failed to save session; continuing with live browser session");
        }
        Ok(session)
    }
}
