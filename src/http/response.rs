//! Response building and the write-once response slot.
//!
//! # Responsibilities
//! - Represent a fully buffered response (`Reply`) that tests can inspect
//! - Guard against committing more than one response per request
//! - Convert into an axum response at the HTTP boundary
//!
//! # Design Decisions
//! - Handlers that take the response object write into a shared
//!   `ResponseSlot`; the dispatcher reads the same slot afterwards
//! - A second commit is rejected with `CommitError` instead of overwriting

use std::borrow::Cow;
use std::sync::{Arc, Mutex, PoisonError};

use axum::body::{Body, Bytes};
use axum::http::header::{self, HeaderName, HeaderValue, InvalidHeaderValue};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

pub const HTML_UTF8: &str = "text/html;charset=UTF-8";
pub const TEXT_UTF8: &str = "text/plain;charset=UTF-8";
pub const JSON_UTF8: &str = "application/json;charset=UTF-8";

/// A buffered HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Reply {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Empty `200 OK`.
    pub fn empty() -> Self {
        Self::new(StatusCode::OK)
    }

    fn with_body(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let mut reply = Self::new(status);
        reply
            .headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        reply.body = body.into();
        reply
    }

    pub fn html(status: StatusCode, body: impl Into<String>) -> Self {
        Self::with_body(status, HTML_UTF8, body.into())
    }

    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::with_body(status, TEXT_UTF8, body.into())
    }

    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::with_body(status, JSON_UTF8, serde_json::to_vec(value)?))
    }

    pub fn bytes(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        Self::with_body(status, content_type, body)
    }

    /// `302 Found` pointing at `location`.
    pub fn redirect(location: &str) -> Result<Self, InvalidHeaderValue> {
        let mut reply = Self::new(StatusCode::FOUND);
        reply
            .headers
            .insert(header::LOCATION, HeaderValue::from_str(location)?);
        Ok(reply)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

impl Default for Reply {
    fn default() -> Self {
        Self::empty()
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Attempt to commit a second response.
#[derive(Debug, Error)]
#[error("response already committed with status {0}")]
pub struct CommitError(pub StatusCode);

#[derive(Debug, Default)]
struct SlotState {
    committed: bool,
    reply: Option<Reply>,
}

/// Write-once response shared between the dispatcher and a handler.
#[derive(Debug, Clone, Default)]
pub struct ResponseSlot {
    inner: Arc<Mutex<SlotState>>,
}

impl ResponseSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Commit `reply`. Fails if a response was already committed.
    pub fn commit(&self, reply: Reply) -> Result<(), CommitError> {
        let mut state = self.state();
        if state.committed {
            let status = state.reply.as_ref().map_or(StatusCode::OK, |r| r.status);
            return Err(CommitError(status));
        }
        state.committed = true;
        state.reply = Some(reply);
        Ok(())
    }

    pub fn is_committed(&self) -> bool {
        self.state().committed
    }

    /// Status of the committed response, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.state().reply.as_ref().map(|r| r.status)
    }

    pub fn write_html(&self, status: StatusCode, body: impl Into<String>) -> Result<(), CommitError> {
        self.commit(Reply::html(status, body))
    }

    pub fn write_text(&self, status: StatusCode, body: impl Into<String>) -> Result<(), CommitError> {
        self.commit(Reply::text(status, body))
    }

    /// Remove the committed reply. The slot stays committed.
    pub fn take(&self) -> Option<Reply> {
        self.state().reply.take()
    }

    pub fn same_as(&self, other: &ResponseSlot) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for ResponseSlot {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_is_write_once() {
        let slot = ResponseSlot::new();
        assert!(!slot.is_committed());

        slot.write_text(StatusCode::OK, "first").unwrap();
        let err = slot.write_text(StatusCode::INTERNAL_SERVER_ERROR, "second").unwrap_err();
        assert_eq!(err.0, StatusCode::OK);

        let reply = slot.take().unwrap();
        assert_eq!(reply.body_text(), "first");
        assert!(slot.is_committed());
        assert!(slot.take().is_none());
        assert!(slot.commit(Reply::empty()).is_err());
    }

    #[test]
    fn test_clones_share_state() {
        let slot = ResponseSlot::new();
        let handler_view = slot.clone();
        handler_view.write_html(StatusCode::CREATED, "<p>done</p>").unwrap();
        assert!(slot.is_committed());
        assert_eq!(slot.status(), Some(StatusCode::CREATED));
        assert_eq!(slot, handler_view);
        assert_ne!(slot, ResponseSlot::new());
    }

    #[test]
    fn test_redirect_sets_location() {
        let reply = Reply::redirect("/app/login").unwrap();
        assert_eq!(reply.status, StatusCode::FOUND);
        assert_eq!(reply.location(), Some("/app/login"));
        assert!(Reply::redirect("/bad\nheader").is_err());
    }

    #[test]
    fn test_json_reply() {
        let reply = Reply::json(StatusCode::OK, &serde_json::json!({"a": 1})).unwrap();
        assert_eq!(reply.content_type(), Some(JSON_UTF8));
        assert_eq!(reply.body_text(), r#"{"a":1}"#);
    }
}
