//! Structured values from flat dotted/indexed parameters.
//!
//! `user.name=ann&user.tags[0]=a&user.tags[1]=b&user.address.city=Oslo`
//! binds against a schema describing `user` into
//! `{"name":"ann","tags":["a","b"],"address":{"city":"Oslo"}}`.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::binding::convert::convert_scalar;
use crate::handler::signature::ScalarKind;

/// Shape of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    Object(ObjectSchema),
    /// Indexed sequence: `field[0]`, `field[1]`, ...
    List(Box<FieldKind>),
}

impl FieldKind {
    /// Value a field holds before binding.
    pub fn default_value(&self) -> Value {
        match self {
            FieldKind::Scalar(kind) => kind.zero(),
            FieldKind::Object(schema) => schema.default_value(),
            FieldKind::List(_) => Value::Array(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub kind: FieldKind,
}

/// Declared fields of a bindable type.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    pub name: String,
    pub fields: Vec<FieldSchema>,
}

impl ObjectSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(self, name: impl Into<String>, kind: ScalarKind) -> Self {
        self.with_field(name, FieldKind::Scalar(kind))
    }

    pub fn nested(self, name: impl Into<String>, schema: ObjectSchema) -> Self {
        self.with_field(name, FieldKind::Object(schema))
    }

    pub fn list(self, name: impl Into<String>, element: FieldKind) -> Self {
        self.with_field(name, FieldKind::List(Box::new(element)))
    }

    pub fn with_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSchema {
            name: name.into(),
            kind,
        });
        self
    }

    /// Every field at its default.
    pub fn default_value(&self) -> Value {
        let object = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.kind.default_value()))
            .collect::<Map<_, _>>();
        Value::Object(object)
    }
}

/// Bind `schema` from `params`, reading keys under `prefix` (empty for top level).
pub fn bind_object(schema: &ObjectSchema, params: &Map<String, Value>, prefix: &str) -> Value {
    let mut object = Map::new();
    for field in &schema.fields {
        let key = join(prefix, &field.name);
        object.insert(field.name.clone(), bind_field(&field.kind, params, &key));
    }
    Value::Object(object)
}

/// Bind and deserialize into `T`. `None` if the bound value does not fit `T`.
pub fn bind_as<T: DeserializeOwned>(
    schema: &ObjectSchema,
    params: &Map<String, Value>,
    prefix: &str,
) -> Option<T> {
    match serde_json::from_value(bind_object(schema, params, prefix)) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(schema = %schema.name, error = %err, "Bound value does not fit target type");
            None
        }
    }
}

fn bind_field(kind: &FieldKind, params: &Map<String, Value>, key: &str) -> Value {
    match kind {
        FieldKind::Scalar(scalar) => match params.get(key) {
            Some(raw) => convert_scalar(*scalar, raw),
            None => scalar.zero(),
        },
        FieldKind::Object(schema) => bind_object(schema, params, key),
        FieldKind::List(element) => {
            let mut items = Vec::new();
            for index in 0usize.. {
                let base = format!("{key}[{index}]");
                if !has_entry(params, &base) {
                    break;
                }
                items.push(bind_field(element, params, &base));
            }
            Value::Array(items)
        }
    }
}

/// True if `base` itself or any key below it is present.
fn has_entry(params: &Map<String, Value>, base: &str) -> bool {
    params.keys().any(|k| {
        k.strip_prefix(base)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.') || rest.starts_with('['))
    })
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
