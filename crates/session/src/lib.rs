//! Keystone session lifecycle
//!
//! [`Session`] owns the authenticated/unauthenticated status and drives the
//! credential holder of its [`keystone_http::SessionClient`]; the route guard
//! turns a status snapshot into navigation decisions.

pub mod form;
pub mod guard;
pub mod session;

pub use form::{FormError, FormKind};
pub use guard::{GuardDecision, RouteAccess, RouteTable, guard_protected};
pub use session::Session;
