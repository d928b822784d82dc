//! Typed access to dynamically-typed gateway rows
//!
//! Rows come back as JSON objects with no compile-time schema. Each accessor
//! checks the runtime type of the cell and fails with a [`RowError`] naming
//! the column instead of falling back to a default.

use super::gateway::Row;
use crate::{time, uuid_utils};
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// A cell was missing or could not be coerced to the requested type
#[derive(Debug, Error, Clone, PartialEq)]
#[error("column `{column}`: {reason}")]
pub struct RowError {
    pub column: String,
    pub reason: String,
}

impl RowError {
    pub fn new(column: &str, reason: impl Into<String>) -> Self {
        Self {
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}

/// Name of the JSON type of `value`, for error messages
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Cell value; absent and JSON `null` are both errors
pub fn required<'a>(row: &'a Row, column: &str) -> Result<&'a Value, RowError> {
    match row.get(column) {
        None => Err(RowError::new(column, "missing")),
        Some(Value::Null) => Err(RowError::new(column, "is null")),
        Some(value) => Ok(value),
    }
}

pub fn get_str<'a>(row: &'a Row, column: &str) -> Result<&'a str, RowError> {
    match required(row, column)? {
        Value::String(s) => Ok(s),
        other => Err(RowError::new(
            column,
            format!("expected string, got {}", value_kind(other)),
        )),
    }
}

/// Identifier cell: text in canonical UUID form
pub fn get_uuid(row: &Row, column: &str) -> Result<Uuid, RowError> {
    let raw = get_str(row, column)?;
    uuid_utils::parse_canonical(raw).map_err(|e| RowError::new(column, e.to_string()))
}

/// Timestamp cell: text in any layout accepted by [`time::parse_db_timestamp`]
pub fn get_timestamp(row: &Row, column: &str) -> Result<DateTime<Utc>, RowError> {
    let raw = get_str(row, column)?;
    time::parse_db_timestamp(raw).map_err(|e| RowError::new(column, e.to_string()))
}

/// Structured cell (json/jsonb column), returned as-is
pub fn get_json(row: &Row, column: &str) -> Result<Value, RowError> {
    required(row, column).cloned()
}
