//! Route guard
//!
//! Navigation decisions are a pure function of [`SessionState`]. While the
//! session is still initializing, protected routes resolve to
//! [`GuardDecision::Pending`] so a view renders nothing instead of flashing a
//! redirect to the login page.

use keystone_core::SessionState;
use serde::Serialize;

/// Outcome of a navigation check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "to", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Session not settled yet; render nothing
    Pending,
    /// Render the requested view
    Allow,
    /// Navigate to the given path instead (replacing history)
    Redirect(String),
}

/// Who may see a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Anyone, at any time
    Public,
    /// Only signed-out users; signed-in users are sent home
    GuestOnly,
    /// Only signed-in users
    Protected,
}

/// Gate for a single protected view
pub fn guard_protected(state: &SessionState, login_path: &str) -> GuardDecision {
    match state {
        SessionState::Initializing => GuardDecision::Pending,
        SessionState::Authenticated(_) => GuardDecision::Allow,
        SessionState::Unauthenticated => GuardDecision::Redirect(login_path.to_string()),
    }
}

#[derive(Debug, Clone)]
struct Route {
    segments: Vec<String>,
    access: RouteAccess,
}

impl Route {
    fn new(pattern: &str, access: RouteAccess) -> Self {
        Self {
            segments: split(pattern).map(str::to_string).collect(),
            access,
        }
    }

    fn matches(&self, path: &[&str]) -> bool {
        self.segments.len() == path.len()
            && self.segments.iter().zip(path).all(|(pattern, segment)| {
                pattern.strip_prefix(':').map_or_else(
                    || pattern == segment,
                    |_| !segment.is_empty(),
                )
            })
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Application routes and where unauthorized navigation goes
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    login_path: String,
    home_path: String,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new("/login", "/dashboard")
            .route("/login", RouteAccess::GuestOnly)
            .route("/register", RouteAccess::GuestOnly)
            .route("/forgot-password", RouteAccess::Public)
            .route("/reset-password/:token", RouteAccess::Public)
            .route("/dashboard", RouteAccess::Protected)
            .route("/profile", RouteAccess::Protected)
    }
}

impl RouteTable {
    /// Empty table with the login entry point and the signed-in home
    pub fn new(login_path: impl Into<String>, home_path: impl Into<String>) -> Self {
        Self {
            routes: Vec::new(),
            login_path: login_path.into(),
            home_path: home_path.into(),
        }
    }

    /// Add a route; `:name` segments match any single segment
    #[must_use]
    pub fn route(mut self, pattern: &str, access: RouteAccess) -> Self {
        self.routes.push(Route::new(pattern, access));
        self
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn home_path(&self) -> &str {
        &self.home_path
    }

    /// Access rule for a path, `None` if no route matches
    pub fn resolve(&self, path: &str) -> Option<RouteAccess> {
        let segments: Vec<&str> = split(path).collect();
        self.routes
            .iter()
            .find(|route| route.matches(&segments))
            .map(|route| route.access)
    }

    /// Decide what navigating to `path` does in the given state.
    ///
    /// Unknown paths go to the login entry point.
    pub fn decide(&self, state: &SessionState, path: &str) -> GuardDecision {
        match self.resolve(path) {
            None => GuardDecision::Redirect(self.login_path.clone()),
            Some(RouteAccess::Public) => GuardDecision::Allow,
            Some(RouteAccess::GuestOnly) => {
                if state.is_authenticated() {
                    GuardDecision::Redirect(self.home_path.clone())
                } else {
                    GuardDecision::Allow
                }
            }
            Some(RouteAccess::Protected) => guard_protected(state, &self.login_path),
        }
    }
}
