//! Error types for Trellis.
//!
//! Every failure inside a dispatched request funnels into [`TrellisError`]:
//! a parameter binding that fails to resolve, a handler that returns an
//! error (or whose future rejects), or a middleware that short-circuits.
//! The framework never retries or recovers; it guarantees forwarding only.
//! Recovery — rendering a friendly error page, say — belongs to error
//! handlers registered on a controller, or to the embedding host.

use http::StatusCode;
use thiserror::Error;

/// Result type alias using [`TrellisError`].
pub type TrellisResult<T> = Result<T, TrellisError>;

/// The single error funnel for request processing.
///
/// # Example
///
/// ```
/// use trellis_core::TrellisError;
/// use http::StatusCode;
///
/// let err = TrellisError::not_found("that project doesn't exist");
/// assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
/// ```
#[derive(Error, Debug)]
pub enum TrellisError {
    /// A parameter binding failed while building the handler's arguments.
    /// The handler is never invoked when this occurs.
    #[error("parameter resolution failed at argument {index}: {message}")]
    ParameterResolution {
        /// Zero-based argument position of the failing binding.
        index: usize,
        /// What went wrong.
        message: String,
    },

    /// A handler returned an error, either synchronously or by rejecting
    /// its future.
    #[error("handler failed: {source}")]
    Handler {
        /// The underlying failure.
        #[source]
        source: anyhow::Error,
    },

    /// A middleware signalled an error, short-circuiting the rest of the
    /// chain for this request.
    #[error("middleware `{name}` failed: {source}")]
    Middleware {
        /// The middleware's registered name.
        name: String,
        /// The underlying failure.
        #[source]
        source: anyhow::Error,
    },

    /// The handler's future did not settle within the configured deadline.
    #[error("handler exceeded deadline of {deadline_ms} ms")]
    Timeout {
        /// The deadline that was exceeded, in milliseconds.
        deadline_ms: u64,
    },

    /// The view renderer rejected a finalized payload.
    #[error("rendering view `{view}` failed: {message}")]
    Render {
        /// The view identifier passed to the renderer.
        view: String,
        /// What went wrong.
        message: String,
    },

    /// A second send was attempted on an already-sent response.
    #[error("response already sent")]
    ResponseAlreadySent,

    /// An application-level error carrying an explicit HTTP status, thrown
    /// by handler code (`not_found`, `bad_request`, ...).
    #[error("{message}")]
    Status {
        /// The HTTP status to respond with.
        status: StatusCode,
        /// Human-readable error message.
        message: String,
    },
}

impl TrellisError {
    /// Creates a parameter-resolution error for the given argument index.
    #[must_use]
    pub fn parameter(index: usize, message: impl Into<String>) -> Self {
        Self::ParameterResolution {
            index,
            message: message.into(),
        }
    }

    /// Wraps a handler failure.
    #[must_use]
    pub fn handler(source: impl Into<anyhow::Error>) -> Self {
        Self::Handler {
            source: source.into(),
        }
    }

    /// Wraps a middleware failure under the middleware's name.
    #[must_use]
    pub fn middleware(name: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Middleware {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Creates a render error for the given view.
    #[must_use]
    pub fn render(view: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            view: view.into(),
            message: message.into(),
        }
    }

    /// Creates a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::status(StatusCode::BAD_REQUEST, message)
    }

    /// Creates a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::status(StatusCode::UNAUTHORIZED, message)
    }

    /// Creates a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::status(StatusCode::FORBIDDEN, message)
    }

    /// Creates a 404 Not Found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::status(StatusCode::NOT_FOUND, message)
    }

    /// Creates a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::status(StatusCode::CONFLICT, message)
    }

    /// Creates a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Creates an error with an arbitrary HTTP status.
    #[must_use]
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Returns the HTTP status code this error maps to.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ParameterResolution { .. } => StatusCode::BAD_REQUEST,
            Self::Handler { .. }
            | Self::Middleware { .. }
            | Self::Render { .. }
            | Self::ResponseAlreadySent => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Status { status, .. } => *status,
        }
    }
}
