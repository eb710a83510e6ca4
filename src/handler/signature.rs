//! Handler parameter metadata.
//!
//! Captured once when a route is registered; the resolver reads it on every
//! request and never inspects the handler itself.

use crate::binding::object::ObjectSchema;

/// Primitive types a textual request value can be converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Text,
    Int,
    Long,
    Float,
    Double,
    Bool,
}

/// Declared kind of a handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// The incoming request.
    Request,
    /// The write-once response slot.
    Response,
    /// The client session, created on demand.
    Session,
    /// The aggregate parameter map.
    Map,
    Scalar(ScalarKind),
    /// A structured value built by the object binder.
    Object(ObjectSchema),
    /// An uploaded file from a multipart request.
    File,
}

/// Where a parameter's value comes from, when declared explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSource {
    /// No declaration: injected by kind or bound by position.
    Inferred,
    /// A named path/query value with an optional literal default.
    Named {
        name: String,
        required: bool,
        default: Option<String>,
    },
    /// A session attribute, written when the request carries the same name.
    SessionAttribute { name: String, required: bool },
}

/// One declared handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    pub name: String,
    pub kind: ParamKind,
    pub source: ParamSource,
}

impl ParamDescriptor {
    fn inferred(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            source: ParamSource::Inferred,
        }
    }

    pub fn request() -> Self {
        Self::inferred("request", ParamKind::Request)
    }

    pub fn response() -> Self {
        Self::inferred("response", ParamKind::Response)
    }

    pub fn session() -> Self {
        Self::inferred("session", ParamKind::Session)
    }

    pub fn map(name: impl Into<String>) -> Self {
        Self::inferred(name, ParamKind::Map)
    }

    /// A scalar bound by position.
    pub fn positional(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self::inferred(name, ParamKind::Scalar(kind))
    }

    /// A scalar bound by name; required unless relaxed with
    /// [`optional`](Self::optional) or [`with_default`](Self::with_default).
    pub fn named(name: impl Into<String>, kind: ScalarKind) -> Self {
        let name = name.into();
        Self {
            source: ParamSource::Named {
                name: name.clone(),
                required: true,
                default: None,
            },
            name,
            kind: ParamKind::Scalar(kind),
        }
    }

    /// A session attribute of the given kind; optional unless marked
    /// [`required`](Self::required).
    pub fn session_attribute(name: impl Into<String>, kind: ParamKind) -> Self {
        let name = name.into();
        Self {
            source: ParamSource::SessionAttribute {
                name: name.clone(),
                required: false,
            },
            name,
            kind,
        }
    }

    pub fn object(name: impl Into<String>, schema: ObjectSchema) -> Self {
        Self::inferred(name, ParamKind::Object(schema))
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self::inferred(name, ParamKind::File)
    }

    /// Bind from a source name that differs from the parameter name.
    pub fn from_source(mut self, source_name: impl Into<String>) -> Self {
        let source_name = source_name.into();
        self.source = match self.source {
            ParamSource::Inferred => ParamSource::Named {
                name: source_name,
                required: true,
                default: None,
            },
            ParamSource::Named { required, default, .. } => ParamSource::Named {
                name: source_name,
                required,
                default,
            },
            ParamSource::SessionAttribute { required, .. } => ParamSource::SessionAttribute {
                name: source_name,
                required,
            },
        };
        self
    }

    pub fn optional(mut self) -> Self {
        match &mut self.source {
            ParamSource::Named { required, .. } | ParamSource::SessionAttribute { required, .. } => {
                *required = false
            }
            ParamSource::Inferred => {}
        }
        self
    }

    pub fn required(mut self) -> Self {
        match &mut self.source {
            ParamSource::Named { required, .. } | ParamSource::SessionAttribute { required, .. } => {
                *required = true
            }
            ParamSource::Inferred => {}
        }
        self
    }

    /// Literal fallback for a named binding. Makes the binding optional.
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        if let ParamSource::Named { required, default, .. } = &mut self.source {
            *required = false;
            *default = Some(value.into());
        }
        self
    }

    /// Name used to look the value up in the request.
    pub fn source_name(&self) -> &str {
        match &self.source {
            ParamSource::Inferred => &self.name,
            ParamSource::Named { name, .. } | ParamSource::SessionAttribute { name, .. } => name,
        }
    }
}

/// The full parameter list of a handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerSignature {
    params: Vec<ParamDescriptor>,
}

impl HandlerSignature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, param: ParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// True if the handler asks for the response slot.
    pub fn injects_response(&self) -> bool {
        self.params.iter().any(|p| p.kind == ParamKind::Response)
    }
}

impl FromIterator<ParamDescriptor> for HandlerSignature {
    fn from_iter<I: IntoIterator<Item = ParamDescriptor>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}
