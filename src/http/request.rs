//! Request model handed to the dispatcher.
//!
//! # Responsibilities
//! - Hold the method and context-relative path used for routing
//! - Keep query and form parameters with their multiplicity and order
//! - Carry request-scoped attributes, uploaded files and the session id
//!
//! # Design Decisions
//! - Independent of axum types beyond `http` primitives, so the dispatcher
//!   can be driven directly in tests
//! - Parameters keep first-seen order; positional binding relies on it

use std::collections::HashMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::{Map, Value};

use crate::http::multipart::UploadedFile;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Multi-valued parameters in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMultiMap {
    entries: Vec<(String, Vec<String>)>,
}

impl ParamMultiMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` string.
    pub fn from_query(raw: &str) -> Self {
        let mut params = Self::new();
        params.extend_from_query(raw);
        params
    }

    pub fn extend_from_query(&mut self, raw: &str) {
        for (name, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            self.append(name.into_owned(), value.into_owned());
        }
    }

    /// Add a value, keeping earlier values for the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.all(name).first().map(String::as_str)
    }

    pub fn all(&self, name: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A request as seen by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub method: Method,
    /// Path relative to the application context, always starting with `/`.
    pub path: String,
    pub headers: HeaderMap,
    /// Query string and form body parameters.
    pub params: ParamMultiMap,
    /// Values set by upstream processing for this request only.
    pub attributes: Map<String, Value>,
    /// Uploaded files by form field name.
    pub files: HashMap<String, Vec<UploadedFile>>,
    /// Session id presented by the client, if any.
    pub session_id: Option<String>,
    pub request_id: Option<String>,
}

impl DispatchRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            params: ParamMultiMap::new(),
            attributes: Map::new(),
            files: HashMap::new(),
            session_id: None,
            request_id: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.append(name, value);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_session(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.files
            .entry(file.field_name.clone())
            .or_default()
            .push(file);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// First file uploaded under the given field name.
    pub fn uploaded_file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name).and_then(|files| files.first())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parsing_keeps_order_and_multiplicity() {
        let params = ParamMultiMap::from_query("b=2&a=1&b=3&name=J%C3%A9r%C3%B4me+K");
        let names: Vec<_> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["b", "a", "name"]);
        assert_eq!(params.all("b"), &["2".to_string(), "3".to_string()]);
        assert_eq!(params.first("name"), Some("Jérôme K"));
        assert!(params.all("missing").is_empty());
    }

    #[test]
    fn test_builder_helpers() {
        let req = DispatchRequest::post("/upload")
            .with_param("title", "x")
            .with_attribute("tenant", "acme")
            .with_session("abc");
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.params.first("title"), Some("x"));
        assert_eq!(req.attributes.get("tenant"), Some(&Value::from("acme")));
        assert_eq!(req.session_id.as_deref(), Some("abc"));
    }
}
