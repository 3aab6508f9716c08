//! Navigable routes and the guard deciding what each one shows.

use std::fmt;

use url::form_urlencoded;

use super::session_gate::GateState;
use super::UserId;

/// Errors raised when parsing a route path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// Path matched no route.
    #[error("unknown route: {0}")]
    UnknownPath(String),
    /// `user` query parameter was not a valid user id.
    #[error("invalid user id in route: {0}")]
    InvalidUser(String),
}

/// Client route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/`, the sign-in screen.
    Entry,
    /// `/home`, the public feed.
    Home,
    /// `/profile`, or `/profile?user=<id>` for someone else's profile.
    Profile {
        /// Profile owner; `None` means the viewer's own profile.
        user: Option<UserId>,
    },
    /// `/upload`, the upload and track management screen.
    Upload,
}

impl Route {
    /// Parse a path with an optional query string.
    ///
    /// # Examples
    /// ```
    /// use trackshare::domain::Route;
    ///
    /// assert_eq!(Route::parse("/home"), Ok(Route::Home));
    /// assert_eq!(Route::parse("/profile"), Ok(Route::Profile { user: None }));
    /// assert!(Route::parse("/admin").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        let (path, query) = raw.split_once('?').unwrap_or((raw, ""));
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        match path {
            "/" => Ok(Self::Entry),
            "/home" => Ok(Self::Home),
            "/upload" => Ok(Self::Upload),
            "/profile" => {
                let user = form_urlencoded::parse(query.as_bytes())
                    .find(|(key, _)| key == "user")
                    .map(|(_, value)| {
                        UserId::new(&*value)
                            .map_err(|_| RouteError::InvalidUser(value.into_owned()))
                    })
                    .transpose()?;
                Ok(Self::Profile { user })
            }
            _ => Err(RouteError::UnknownPath(raw.to_owned())),
        }
    }

    /// Route for a user's profile as seen by `viewer`.
    ///
    /// The viewer's own id maps to the bare `/profile` route.
    pub fn profile_of(user: UserId, viewer: Option<UserId>) -> Self {
        if viewer == Some(user) {
            Self::Profile { user: None }
        } else {
            Self::Profile { user: Some(user) }
        }
    }

    /// Render the route back to a path.
    pub fn path(&self) -> String {
        match self {
            Self::Entry => "/".to_owned(),
            Self::Home => "/home".to_owned(),
            Self::Upload => "/upload".to_owned(),
            Self::Profile { user: None } => "/profile".to_owned(),
            Self::Profile { user: Some(user) } => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair("user", &user.to_string())
                    .finish();
                format!("/profile?{query}")
            }
        }
    }

    /// Whether the route requires a signed-in user.
    pub const fn is_protected(&self) -> bool {
        match self {
            Self::Entry => false,
            Self::Home | Self::Profile { .. } | Self::Upload => true,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Outcome of guarding a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not settled yet; show a neutral placeholder.
    Placeholder,
    /// Navigate elsewhere.
    Redirect(Route),
    /// Show the requested route.
    Render(Route),
}

/// Decide what to show for `route` given the current gate state.
///
/// Pure; callers re-run it whenever the route or the state changes.
pub fn guard(route: Route, state: &GateState) -> GuardDecision {
    match state {
        GateState::Loading => GuardDecision::Placeholder,
        GateState::Anonymous if route.is_protected() => GuardDecision::Redirect(Route::Entry),
        GateState::Authenticated(_) if route == Route::Entry => {
            GuardDecision::Redirect(Route::Home)
        }
        GateState::Anonymous | GateState::Authenticated(_) => GuardDecision::Render(route),
    }
}
