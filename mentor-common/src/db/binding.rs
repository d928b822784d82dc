//! Binding abstraction: the indirect channel to the database

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Operation understood by the database binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingOperation {
    /// Statement whose rows are returned
    Query,
    /// Statement whose rows (if any) are discarded
    Exec,
}

impl BindingOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingOperation::Query => "query",
            BindingOperation::Exec => "exec",
        }
    }
}

/// One call to the binding
#[derive(Debug, Clone, PartialEq)]
pub struct BindingRequest {
    pub operation: BindingOperation,
    /// SQL text, sent verbatim
    pub sql: String,
    /// Positional parameters, already serialized as a JSON array
    pub params: String,
}

/// Transport-level failure reported by a binding
#[derive(Debug, Error)]
pub enum BindingError {
    /// The binding could not be reached or the call did not complete
    #[error("binding transport failed: {0}")]
    Transport(String),

    /// The binding answered with a non-success status
    #[error("binding returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Request/response channel to the database
///
/// Implementations must be safe to share between concurrently running
/// requests; one handle lives for the whole process.
#[async_trait]
pub trait Binding: Send + Sync {
    /// Invoke the binding and return the raw response body
    async fn invoke(&self, request: BindingRequest) -> Result<Vec<u8>, BindingError>;
}
