//! Handler return values and failures.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// A named view plus the model it is rendered with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelView {
    view: String,
    model: Map<String, Value>,
}

impl ModelView {
    pub fn new(view: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            model: Map::new(),
        }
    }

    /// Add a model entry. Values that fail to serialize are stored as null.
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.model.insert(key.into(), value);
        self
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn model(&self) -> &Map<String, Value> {
        &self.model
    }

    pub fn into_parts(self) -> (String, Map<String, Value>) {
        (self.view, self.model)
    }
}

/// What a handler returns.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutput {
    /// Body written as `text/html`.
    Text(String),
    View(ModelView),
    /// Payload for JSON-marked handlers.
    Json(Value),
    /// Nothing to write; also used after writing to the response slot.
    Empty,
}

impl HandlerOutput {
    pub fn json(value: impl Serialize) -> Result<Self, HandlerError> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }
}

impl From<String> for HandlerOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for HandlerOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<ModelView> for HandlerOutput {
    fn from(view: ModelView) -> Self {
        Self::View(view)
    }
}

impl From<Value> for HandlerOutput {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<()> for HandlerOutput {
    fn from(_: ()) -> Self {
        Self::Empty
    }
}

/// The dispatcher's classification of a completed invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchResult {
    Text(String),
    View(ModelView),
    Json(Value),
    /// The handler took the response slot; the return value is dropped.
    Handled,
    Empty,
}

impl DispatchResult {
    /// Classify `output`. `handled` is true when the handler declared the
    /// response slot, whether or not it wrote to it.
    pub fn classify(output: HandlerOutput, handled: bool) -> Self {
        if handled {
            return Self::Handled;
        }
        match output {
            HandlerOutput::Text(text) => Self::Text(text),
            HandlerOutput::View(view) => Self::View(view),
            HandlerOutput::Json(value) => Self::Json(value),
            HandlerOutput::Empty => Self::Empty,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::View(_) => "view",
            Self::Json(_) => "json",
            Self::Handled => "handled",
            Self::Empty => "empty",
        }
    }
}

/// Failure raised by a handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct HandlerError {
    /// Short machine-readable category, reported as `error_kind`.
    pub kind: String,
    pub message: String,
}

impl HandlerError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn msg(message: impl Into<String>) -> Self {
        Self::new("HandlerError", message)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new("SerializationError", err.to_string())
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::new("IoError", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handled_wins_over_returned_value() {
        let out = HandlerOutput::from("ignored");
        assert_eq!(DispatchResult::classify(out.clone(), true), DispatchResult::Handled);
        assert_eq!(
            DispatchResult::classify(out, false),
            DispatchResult::Text("ignored".into())
        );
        assert_eq!(DispatchResult::classify(().into(), false).kind(), "empty");
    }

    #[test]
    fn test_model_view_builder() {
        let mv = ModelView::new("users/show").with("id", 42).with("name", "ann");
        assert_eq!(mv.view(), "users/show");
        assert_eq!(mv.model().get("id"), Some(&Value::from(42)));
        let (view, model) = mv.into_parts();
        assert_eq!(view, "users/show");
        assert_eq!(model.len(), 2);
    }

    #[test]
    fn test_error_display() {
        let err = HandlerError::new("NotFound", "no such user");
        assert_eq!(err.to_string(), "NotFound: no such user");
        assert_eq!(HandlerError::msg("boom").kind, "HandlerError");
    }
}
