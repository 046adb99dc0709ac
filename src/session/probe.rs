//! Liveness probes deciding whether a loaded page still shows a logged-in user.

/// Outcome of evaluating a liveness probe on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// A logged-in marker is present.
    LoggedIn,
    /// A logged-out marker is present and no logged-in marker is.
    LoggedOut,
    /// Neither marker matched.
    Ambiguous,
}

impl Liveness {
    /// Whether the session should be kept. Only `LoggedOut` invalidates.
    #[must_use]
    pub fn is_valid(self) -> bool {
        !matches!(self, Self::LoggedOut)
    }
}

/// A predicate over page markup.
pub trait LivenessProbe: Send + Sync {
    fn evaluate(&self, page_markup: &str) -> Liveness;
}

impl<F> LivenessProbe for F
where
    F: Fn(&str) -> Liveness + Send + Sync,
{
    fn evaluate(&self, page_markup: &str) -> Liveness {
        self(page_markup)
    }
}

/// Substring probe over localized UI text.
///
/// The default markers come from the platform's header: a "log in" button
/// when logged out, "log out"/"sign out" entries when logged in.
#[derive(Debug, Clone)]
pub struct MarkerProbe {
    logged_out_markers: Vec<String>,
    logged_in_markers: Vec<String>,
}

impl MarkerProbe {
    #[must_use]
    pub fn new(logged_out_markers: Vec<String>, logged_in_markers: Vec<String>) -> Self {
        Self {
            logged_out_markers,
            logged_in_markers,
        }
    }
}

impl Default for MarkerProbe {
    fn default() -> Self {
        Self::new(
            vec!["登录".to_string()],
            vec!["退出".to_string(), "登出".to_string()],
        )
    }
}

impl LivenessProbe for MarkerProbe {
    fn evaluate(&self, page_markup: &str) -> Liveness {
        let contains_any = |markers: &[String]| {
            markers
                .iter()
                .any(|marker| !marker.is_empty() && page_markup.contains(marker.as_str()))
        };

        let logged_in = contains_any(&self.logged_in_markers);
        let logged_out = contains_any(&self.logged_out_markers);

        match (logged_out, logged_in) {
            (_, true) => Liveness::LoggedIn,
            (true, false) => Liveness::LoggedOut,
            (false, false) => Liveness::Ambiguous,
        }
    }
}
