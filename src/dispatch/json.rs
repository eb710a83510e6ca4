//! JSON envelope for JSON-marked handlers.
//!
//! Success: `{"status":"success","code":200,"data":...,"count":N}` where
//! `count` is present only for arrays and objects.
//! Failure: `{"status":"error","code":500,"message":"...","error_kind":"..."}`.

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JsonEnvelope {
    pub status: &'static str,
    pub code: u16,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl JsonEnvelope {
    pub fn success(data: Value) -> Self {
        let count = match &data {
            Value::Array(items) => Some(items.len()),
            Value::Object(fields) => Some(fields.len()),
            _ => None,
        };
        Self {
            status: "success",
            code: StatusCode::OK.as_u16(),
            data,
            count,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JsonError {
    pub status: &'static str,
    pub code: u16,
    pub message: String,
    pub error_kind: String,
}

impl JsonError {
    pub fn new(code: StatusCode, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: "error",
            code: code.as_u16(),
            message: message.into(),
            error_kind: kind.into(),
        }
    }
}
