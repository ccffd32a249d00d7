//! Route table construction errors.

use http::Method;
use thiserror::Error;

/// Errors surfaced while building a [`Router`](crate::Router).
///
/// Construction is fail-fast: the first conflicting or malformed route
/// aborts the build so misconfigurations never reach dispatch.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Two handlers register the same (method, pattern) pair without one
    /// shadowing the other through inheritance.
    #[error("duplicate route {method} {pattern}: declared by both `{first}` and `{second}`")]
    DuplicateRoute {
        /// The HTTP method of the conflicting route.
        method: Method,
        /// The full, mount-joined pattern.
        pattern: String,
        /// The handler key that registered the route first.
        first: String,
        /// The handler key that collided with it.
        second: String,
    },

    /// A route pattern does not parse.
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The offending pattern as declared.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl BuildError {
    pub(crate) fn invalid(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}
