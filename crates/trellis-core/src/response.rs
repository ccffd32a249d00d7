//! The shared, send-once response buffer.
//!
//! Handlers and middleware write to a [`ResponseWriter`]. The writer is
//! cheaply cloneable (all clones share one underlying state), and it
//! enforces the single-send invariant: once a body has been sent, further
//! sends fail with [`TrellisError::ResponseAlreadySent`] instead of
//! clobbering what was already written. The dispatcher's finalization step
//! checks [`ResponseWriter::is_sent`] before serializing a handler payload,
//! which is what prevents a double response when a handler both returns a
//! value and writes directly.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use http::{HeaderMap, Response, StatusCode};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::{TrellisError, TrellisResult};

#[derive(Debug)]
struct ResponseState {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    sent: bool,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            sent: false,
        }
    }
}

/// A cloneable handle to the per-request response being assembled.
///
/// # Example
///
/// ```
/// use trellis_core::ResponseWriter;
/// use http::StatusCode;
///
/// let res = ResponseWriter::new();
/// res.status(StatusCode::CREATED);
/// res.send_json(&serde_json::json!({ "id": 7 })).unwrap();
///
/// assert!(res.is_sent());
/// assert!(res.send_text("again").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResponseWriter {
    state: Arc<Mutex<ResponseState>>,
}

impl ResponseWriter {
    /// Creates a new writer with status 200 and an empty body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the response status.
    pub fn status(&self, status: StatusCode) -> &Self {
        self.state.lock().status = status;
        self
    }

    /// Sets a response header. Invalid header names or values are ignored.
    pub fn header(&self, name: &str, value: &str) -> &Self {
        let mut state = self.state.lock();
        if let (Ok(name), Ok(value)) = (
            name.parse::<HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            state.headers.insert(name, value);
        }
        self
    }

    /// Returns true once a body (or redirect, or bare status) has been sent.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.state.lock().sent
    }

    /// Sends a JSON body, setting `Content-Type: application/json`.
    pub fn send_json<T: Serialize>(&self, value: &T) -> TrellisResult<()> {
        let body = serde_json::to_vec(value)
            .map_err(|e| TrellisError::internal(format!("JSON serialization failed: {e}")))?;
        self.send_with_content_type("application/json", Bytes::from(body))
    }

    /// Sends an HTML body.
    pub fn send_html(&self, html: impl Into<String>) -> TrellisResult<()> {
        self.send_with_content_type("text/html; charset=utf-8", Bytes::from(html.into()))
    }

    /// Sends a plain-text body.
    pub fn send_text(&self, text: impl Into<String>) -> TrellisResult<()> {
        self.send_with_content_type("text/plain; charset=utf-8", Bytes::from(text.into()))
    }

    /// Sends raw bytes with an explicit content type.
    pub fn send_bytes(&self, content_type: &str, body: impl Into<Bytes>) -> TrellisResult<()> {
        self.send_with_content_type(content_type, body.into())
    }

    /// Sends a bare status with no body.
    pub fn send_status(&self, status: StatusCode) -> TrellisResult<()> {
        let mut state = self.state.lock();
        if state.sent {
            return Err(TrellisError::ResponseAlreadySent);
        }
        state.status = status;
        state.sent = true;
        Ok(())
    }

    /// Sends a 302 redirect to the given location.
    pub fn redirect(&self, location: &str) -> TrellisResult<()> {
        let mut state = self.state.lock();
        if state.sent {
            return Err(TrellisError::ResponseAlreadySent);
        }
        state.status = StatusCode::FOUND;
        if let Ok(value) = HeaderValue::from_str(location) {
            state.headers.insert(LOCATION, value);
        }
        state.sent = true;
        Ok(())
    }

    fn send_with_content_type(&self, content_type: &str, body: Bytes) -> TrellisResult<()> {
        let mut state = self.state.lock();
        if state.sent {
            return Err(TrellisError::ResponseAlreadySent);
        }
        if let Ok(value) = HeaderValue::from_str(content_type) {
            state.headers.insert(CONTENT_TYPE, value);
        }
        state.body = body;
        state.sent = true;
        Ok(())
    }

    /// Consumes the accumulated state into an `http::Response`.
    ///
    /// Returns `None` if nothing was sent. After this call the writer is
    /// reset; it is not meant to be reused.
    #[must_use]
    pub fn take_response(&self) -> Option<Response<Bytes>> {
        let mut state = self.state.lock();
        if !state.sent {
            return None;
        }
        let state = std::mem::take(&mut *state);
        let mut response = Response::new(state.body);
        *response.status_mut() = state.status;
        *response.headers_mut() = state.headers;
        Some(response)
    }
}
