//! Wire format for the remote line backend
//!
//! Newline-delimited JSON. Every request carries an id; the backend answers
//! with zero or more `data` messages for that id followed by exactly one
//! message holding either `result` or `error`.

use crate::model::PatchOperation;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

pub const METHOD_FETCH_RANGE: &str = "fetch_range";
pub const METHOD_APPLY_PATCHES: &str = "apply_patches";

/// Request sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRequest {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl RangeRequest {
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            id,
            method: method.to_string(),
            params,
        }
    }

    /// Serialize as one protocol line, newline included.
    pub fn to_json_line(&self) -> String {
        // Serializing a struct of plain fields cannot fail.
        let mut line = serde_json::to_string(self).unwrap_or_default();
        line.push('\n');
        line
    }
}

/// Message received from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeResponse {
    pub id: u64,
    /// Streamed partial payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Final payload; ends the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure message; ends the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RangeResponse {
    pub fn data(id: u64, data: Value) -> Self {
        Self {
            id,
            data: Some(data),
            result: None,
            error: None,
        }
    }

    pub fn result(id: u64, result: Value) -> Self {
        Self {
            id,
            data: None,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: u64, error: impl Into<String>) -> Self {
        Self {
            id,
            data: None,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn to_json_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_default();
        line.push('\n');
        line
    }
}

/// Streamed chunk of a `fetch_range` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinesData {
    pub lines: Vec<String>,
}

pub fn fetch_range_params(path: &Path, start_line: usize, end_line: usize) -> Value {
    json!({
        "path": path.to_string_lossy(),
        "startLine": start_line,
        "endLine": end_line,
    })
}

pub fn apply_patches_params(path: &Path, patches: &[PatchOperation]) -> Value {
    json!({
        "path": path.to_string_lossy(),
        "patches": patches,
    })
}
