//! Resolved handler arguments.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::http::multipart::UploadedFile;
use crate::http::request::DispatchRequest;
use crate::http::response::ResponseSlot;
use crate::session::Session;

/// One resolved argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Request(Arc<DispatchRequest>),
    Response(ResponseSlot),
    Session(Session),
    Map(Map<String, Value>),
    /// Converted scalar, bound object, or null.
    Value(Value),
    File(Option<UploadedFile>),
}

/// Arguments in declaration order, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    entries: Vec<(String, Argument)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, argument: Argument) {
        self.entries.push((name.into(), argument));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Argument at a declared position.
    pub fn at(&self, index: usize) -> Option<&Argument> {
        self.entries.get(index).map(|(_, a)| a)
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.entries.iter().map(|(n, a)| (n.as_str(), a))
    }

    /// Scalar or object value; `None` for null and non-value kinds.
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.get(name) {
            Some(Argument::Value(Value::Null)) | None => None,
            Some(Argument::Value(v)) => Some(v),
            Some(_) => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Value::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.value(name).and_then(Value::as_i64)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.value(name).and_then(Value::as_f64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.value(name).and_then(Value::as_bool)
    }

    /// Deserialize a bound value into `T`.
    pub fn object<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.value(name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn map(&self, name: &str) -> Option<&Map<String, Value>> {
        match self.get(name) {
            Some(Argument::Map(map)) => Some(map),
            _ => None,
        }
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        match self.get(name) {
            Some(Argument::File(file)) => file.as_ref(),
            _ => None,
        }
    }

    pub fn request(&self) -> Option<&DispatchRequest> {
        self.entries.iter().find_map(|(_, a)| match a {
            Argument::Request(req) => Some(req.as_ref()),
            _ => None,
        })
    }

    pub fn response(&self) -> Option<&ResponseSlot> {
        self.entries.iter().find_map(|(_, a)| match a {
            Argument::Response(slot) => Some(slot),
            _ => None,
        })
    }

    pub fn session(&self) -> Option<&Session> {
        self.entries.iter().find_map(|(_, a)| match a {
            Argument::Session(session) => Some(session),
            _ => None,
        })
    }
}
