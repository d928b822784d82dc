//! SQL gateway over a request/response binding
//!
//! # Row recovery
//!
//! The PostgreSQL binding answers a `query` with positional value arrays
//! (`[[v1, v2], [v1, v2]]`) and drops the column names. To get named rows
//! back, [`BindingGateway::query`] wraps the caller's statement so the
//! database serializes its own result set:
//!
//! ```sql
//! WITH gateway_rows AS (<statement>)
//! SELECT COALESCE(json_agg(gateway_rows), '[]'::json)::text FROM gateway_rows
//! ```
//!
//! A CTE (not a sub-select) is used so `INSERT ... RETURNING` works as well as
//! `SELECT`. The binding response is then always one row holding one text
//! cell, and it is decoded in two steps:
//!
//! 1. outer: `[["<json text>"]]`, anything else is a [`GatewayError::Decode`]
//! 2. inner: the text must parse as a JSON array of objects
//!
//! `json_agg` has no `ORDER BY` of its own. PostgreSQL normally aggregates in
//! the CTE's output order, but that is not guaranteed, so callers that need an
//! ordering must re-sort the decoded rows.
//!
//! Everything about this workaround lives in this file. A direct driver can
//! replace [`BindingGateway`] behind [`SqlGateway`] without touching callers.

use super::binding::{Binding, BindingError, BindingOperation, BindingRequest};
use super::row::value_kind;
use crate::context::{CallContext, Interrupted};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// One result row, keyed by column name
pub type Row = serde_json::Map<String, Value>;

/// Alias of the CTE wrapping the caller's statement
const ROWS_ALIAS: &str = "gateway_rows";

/// Connectivity probe; never routed through the aggregation wrapper
const PING_STATEMENT: &str = "SELECT 1";

/// Gateway failure
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The binding could not be invoked (network/RPC fault)
    #[error("database binding unavailable: {0}")]
    Unavailable(#[from] BindingError),

    /// The response did not have the shape the row-recovery protocol expects
    #[error("failed to decode binding response: {reason} (payload shape: {shape})")]
    Decode { reason: String, shape: String },

    /// The statement or its parameters were rejected before invoking the binding
    #[error("invalid statement: {0}")]
    InvalidStatement(String),

    /// The caller cancelled the call
    #[error("database call cancelled")]
    Cancelled,

    /// The caller's deadline passed before the binding answered
    #[error("database call timed out")]
    TimedOut,
}

impl GatewayError {
    /// Whether retrying the same call may succeed
    ///
    /// Decode failures are protocol violations and are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_) | GatewayError::TimedOut)
    }

    fn decode(reason: impl Into<String>, shape: impl Into<String>) -> Self {
        GatewayError::Decode {
            reason: reason.into(),
            shape: shape.into(),
        }
    }
}

impl From<Interrupted> for GatewayError {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Cancelled => GatewayError::Cancelled,
            Interrupted::DeadlineExceeded => GatewayError::TimedOut,
        }
    }
}

/// Executes parameterized SQL and returns named rows
#[async_trait]
pub trait SqlGateway: Send + Sync {
    /// Run a single statement and return its rows (empty when there are none)
    async fn query(
        &self,
        ctx: &CallContext,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, GatewayError>;

    /// Run a single statement, discarding any rows
    async fn exec(&self, ctx: &CallContext, sql: &str, params: &[Value])
        -> Result<(), GatewayError>;

    /// Check that the database is reachable
    async fn ping(&self, ctx: &CallContext) -> Result<(), GatewayError>;
}

/// [`SqlGateway`] that talks to the database through a [`Binding`]
#[derive(Clone)]
pub struct BindingGateway {
    binding: Arc<dyn Binding>,
}

impl BindingGateway {
    pub fn new(binding: Arc<dyn Binding>) -> Self {
        Self { binding }
    }

    async fn invoke(
        &self,
        ctx: &CallContext,
        operation: BindingOperation,
        sql: String,
        params: &[Value],
    ) -> Result<Vec<u8>, GatewayError> {
        let request = BindingRequest {
            operation,
            sql,
            params: encode_params(params)?,
        };
        let response = ctx.run(self.binding.invoke(request)).await??;
        Ok(response)
    }
}

#[async_trait]
impl SqlGateway for BindingGateway {
    async fn query(
        &self,
        ctx: &CallContext,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, GatewayError> {
        let statement = single_statement(sql)?;
        let payload = self
            .invoke(ctx, BindingOperation::Query, wrap_json_rows(statement), params)
            .await?;

        let rows = decode_rows(&payload).inspect_err(|e| {
            warn!(error = %e, "Binding response violated the row-recovery protocol");
        })?;
        debug!(rows = rows.len(), "query complete");
        Ok(rows)
    }

    async fn exec(
        &self,
        ctx: &CallContext,
        sql: &str,
        params: &[Value],
    ) -> Result<(), GatewayError> {
        let statement = single_statement(sql)?;
        self.invoke(ctx, BindingOperation::Exec, statement.to_string(), params)
            .await?;
        debug!("exec complete");
        Ok(())
    }

    async fn ping(&self, ctx: &CallContext) -> Result<(), GatewayError> {
        self.exec(ctx, PING_STATEMENT, &[]).await
    }
}

/// Trim the statement and make sure it is exactly one statement
///
/// One trailing `;` is allowed. Values belong in `params`, so a `;` anywhere
/// else means more than one statement.
fn single_statement(sql: &str) -> Result<&str, GatewayError> {
    let trimmed = sql.trim();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();

    if trimmed.is_empty() {
        return Err(GatewayError::InvalidStatement("empty statement".to_string()));
    }
    if trimmed.contains(';') {
        return Err(GatewayError::InvalidStatement(
            "only a single statement may be sent per call".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Serialize positional parameters; only scalars can be bound
fn encode_params(params: &[Value]) -> Result<String, GatewayError> {
    if let Some((index, value)) = params
        .iter()
        .enumerate()
        .find(|(_, v)| matches!(v, Value::Array(_) | Value::Object(_)))
    {
        return Err(GatewayError::InvalidStatement(format!(
            "parameter ${} is {}; serialize structured values to text first",
            index + 1,
            value_kind(value)
        )));
    }
    Ok(Value::Array(params.to_vec()).to_string())
}

/// Ask the database to return the result set as one JSON text cell
pub fn wrap_json_rows(statement: &str) -> String {
    format!(
        "WITH {alias} AS ({statement}) \
         SELECT COALESCE(json_agg({alias}), '[]'::json)::text FROM {alias}",
        alias = ROWS_ALIAS,
        statement = statement
    )
}

/// Decode a binding `query` response produced by [`wrap_json_rows`]
pub fn decode_rows(payload: &[u8]) -> Result<Vec<Row>, GatewayError> {
    let outer: Value = serde_json::from_slice(payload).map_err(|e| {
        GatewayError::decode(
            format!("outer payload is not JSON: {}", e),
            format!("{} bytes of non-JSON", payload.len()),
        )
    })?;

    let cell = match &outer {
        Value::Array(rows) if rows.len() == 1 => match &rows[0] {
            Value::Array(cells) if cells.len() == 1 => &cells[0],
            _ => return Err(outer_shape_error(&outer)),
        },
        _ => return Err(outer_shape_error(&outer)),
    };

    let text = match cell {
        Value::String(text) => text,
        _ => return Err(outer_shape_error(&outer)),
    };

    let inner: Value = serde_json::from_str(text).map_err(|e| {
        GatewayError::decode(
            format!("inner cell is not JSON: {}", e),
            format!("text of {} bytes", text.len()),
        )
    })?;

    match inner {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(row) => Ok(row),
                other => Err(GatewayError::decode(
                    format!("inner row {} is not an object", index),
                    describe_shape(&other),
                )),
            })
            .collect(),
        other => Err(GatewayError::decode(
            "inner value is not an array of rows",
            describe_shape(&other),
        )),
    }
}

fn outer_shape_error(outer: &Value) -> GatewayError {
    GatewayError::decode(
        "expected exactly one row with one text cell",
        describe_shape(outer),
    )
}

/// Compact description of a JSON value's structure, without its data
pub fn describe_shape(value: &Value) -> String {
    match value {
        Value::Array(items) => match items.first() {
            Some(first) => format!("array[{}] of {}", items.len(), describe_shape(first)),
            None => "array[0]".to_string(),
        },
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).take(8).collect();
            format!("object{{{}}}", keys.join(","))
        }
        scalar => value_kind(scalar).to_string(),
    }
}
