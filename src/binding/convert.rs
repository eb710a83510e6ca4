//! Lenient text-to-scalar conversion.
//!
//! Empty or unparsable input yields the kind's zero value, never an error.

use serde_json::Value;

use crate::handler::signature::{ParamKind, ScalarKind};

impl ScalarKind {
    /// `0`, `0.0`, `false` or `""`.
    pub fn zero(self) -> Value {
        match self {
            ScalarKind::Text => Value::String(String::new()),
            ScalarKind::Int | ScalarKind::Long => Value::from(0),
            ScalarKind::Float | ScalarKind::Double => Value::from(0.0),
            ScalarKind::Bool => Value::Bool(false),
        }
    }

    pub fn convert(self, raw: &str) -> Value {
        let trimmed = raw.trim();
        match self {
            ScalarKind::Text => Value::String(raw.to_string()),
            ScalarKind::Int => trimmed
                .parse::<i32>()
                .map(Value::from)
                .unwrap_or_else(|_| self.zero()),
            ScalarKind::Long => trimmed
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| self.zero()),
            ScalarKind::Float => trimmed
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| Value::from(f64::from(v)))
                .unwrap_or_else(|| self.zero()),
            ScalarKind::Double => trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Value::from)
                .unwrap_or_else(|| self.zero()),
            ScalarKind::Bool => Value::Bool(trimmed.eq_ignore_ascii_case("true")),
        }
    }
}

/// Text form of a parameter value. Sequences contribute their first element.
pub fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(first_text),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Object(_) => None,
    }
}

/// Convert an arbitrary value to a scalar kind.
pub fn convert_scalar(kind: ScalarKind, value: &Value) -> Value {
    match first_text(value) {
        Some(text) => kind.convert(&text),
        None => kind.zero(),
    }
}

/// Convert a value to a declared parameter kind. Non-scalar kinds pass through.
pub fn convert_value(kind: &ParamKind, value: &Value) -> Value {
    match kind {
        ParamKind::Scalar(scalar) => convert_scalar(*scalar, value),
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_numbers() {
        assert_eq!(ScalarKind::Int.convert("42"), Value::from(42));
        assert_eq!(ScalarKind::Int.convert(""), Value::from(0));
        assert_eq!(ScalarKind::Int.convert("abc"), Value::from(0));
        assert_eq!(ScalarKind::Int.convert("3000000000"), Value::from(0));
        assert_eq!(ScalarKind::Long.convert("3000000000"), Value::from(3_000_000_000i64));
        assert_eq!(ScalarKind::Double.convert("2.5"), Value::from(2.5));
        assert_eq!(ScalarKind::Double.convert("x"), Value::from(0.0));
        assert_eq!(ScalarKind::Float.convert("0.5"), Value::from(0.5));
    }

    #[test]
    fn test_bool_is_true_only_for_true() {
        assert_eq!(ScalarKind::Bool.convert("TRUE"), Value::Bool(true));
        assert_eq!(ScalarKind::Bool.convert("yes"), Value::Bool(false));
        assert_eq!(ScalarKind::Bool.convert("1"), Value::Bool(false));
    }

    #[test]
    fn test_text_is_untouched() {
        assert_eq!(ScalarKind::Text.convert(" a b "), Value::from(" a b "));
        assert_eq!(ScalarKind::Text.zero(), Value::from(""));
    }

    #[test]
    fn test_convert_from_values() {
        let multi = serde_json::json!(["7", "8"]);
        assert_eq!(convert_scalar(ScalarKind::Int, &multi), Value::from(7));
        assert_eq!(convert_scalar(ScalarKind::Text, &Value::from(12)), Value::from("12"));
        assert_eq!(convert_scalar(ScalarKind::Bool, &Value::Null), Value::Bool(false));

        let obj = serde_json::json!({"a": 1});
        assert_eq!(convert_value(&ParamKind::Map, &obj), obj);
    }
}
