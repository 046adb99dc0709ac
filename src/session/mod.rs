//! Authentication session model, storage, and liveness checks.
//!
//! A [`Session`] is the ordered set of browser credentials proving a login to
//! the target platform. It is stored as a JSON array of credential records:
//!
//! ```json
//! [{"name": "token", "value": "...", "domain": ".scys.com", "path": "/", "sameSite": "Lax"}]
//! ```
//!
//! Fields beyond the five modelled ones (expiry, secure, httpOnly, ...) are
//! kept verbatim so a load/persist round-trip never drops information.

mod probe;
mod signal;
mod store;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use crate::driver::DriverError;

pub use probe::{Liveness, LivenessProbe, MarkerProbe};
pub use signal::{LoginSignal, StdinConfirmation};
pub use store::SessionStore;

/// Same-site policy of a credential, normalized to the three browser values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    /// Maps a raw policy string onto the enumerated set.
    ///
    /// Matching ignores ASCII case; anything unrecognized becomes `Lax`.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("strict") {
            Self::Strict
        } else if raw.eq_ignore_ascii_case("none") {
            Self::None
        } else {
            Self::Lax
        }
    }
}

fn deserialize_same_site<'de, D>(deserializer: D) -> Result<SameSite, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .map_or(SameSite::Lax, SameSite::normalize))
}

fn default_path() -> String {
    "/".to_string()
}

/// One cookie-like credential record.
///
/// The value is redacted in `Debug` output.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Cookie name.
    pub name: String,
    value: String,
    /// Domain scope (e.g. `.scys.com`).
    #[serde(default)]
    pub domain: String,
    /// Path scope.
    #[serde(default = "default_path")]
    pub path: String,
    /// Normalized same-site policy.
    #[serde(
        rename = "sameSite",
        default,
        deserialize_with = "deserialize_same_site"
    )]
    pub same_site: SameSite,
    /// Driver-reported fields not modelled above.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Credential {
    /// Creates a credential with no extra fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
        same_site: SameSite,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: path.into(),
            same_site,
            extra: serde_json::Map::new(),
        }
    }

    /// Returns the credential value. Never log it.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Reads a boolean extra field such as `secure` or `httpOnly`.
    #[must_use]
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.extra.get(key).and_then(serde_json::Value::as_bool)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("same_site", &self.same_site)
            .finish_non_exhaustive()
    }
}

/// An ordered set of credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session {
    credentials: Vec<Credential>,
}

impl Session {
    #[must_use]
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self { credentials }
    }

    #[must_use]
    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

/// Errors loading or applying a session. Recovered by logging in again.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Session file could not be read.
    #[error("failed to read session file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Session file is not a JSON array of credentials.
    #[error("malformed session file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Session file holds no credentials.
    #[error("session file {path} contains no credentials")]
    Empty { path: PathBuf },

    /// The driver rejected the credentials or the landing page would not load.
    #[error("failed to apply session: {0}")]
    Apply(#[source] DriverError),

    /// Credentials could not be read back from the driver after login.
    #[error("failed to capture session after login: {0}")]
    Capture(#[source] DriverError),
}

/// Session storage could not be written.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to write session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize session: {0}")]
    Json(#[from] serde_json::Error),
}
