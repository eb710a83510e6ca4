//! View rendering seam.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("view '{0}' not found")]
    NotFound(String),

    #[error("failed to render view '{view}': {message}")]
    Render { view: String, message: String },
}

/// Turns a view name and model into an HTML body.
pub trait ViewRenderer: Send + Sync + 'static {
    fn render(&self, view: &str, model: &Map<String, Value>) -> Result<String, ViewError>;
}

impl<F> ViewRenderer for F
where
    F: Fn(&str, &Map<String, Value>) -> Result<String, ViewError> + Send + Sync + 'static,
{
    fn render(&self, view: &str, model: &Map<String, Value>) -> Result<String, ViewError> {
        self(view, model)
    }
}

/// Renderer used when none is configured; every view is missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoViewRenderer;

impl ViewRenderer for NoViewRenderer {
    fn render(&self, view: &str, _model: &Map<String, Value>) -> Result<String, ViewError> {
        Err(ViewError::NotFound(view.to_string()))
    }
}
