//! Shared test fixtures
//!
//! `FakePostgres` stands in for the Dapr PostgreSQL binding. It understands
//! only the feedback statements, and only in their row-recovery wrapped form,
//! answering the way the real binding does: one row holding one text cell.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use chrono::{DateTime, SubsecRound, Utc};
use mentor_api::feedback::{FeedbackPipeline, GatewayFeedbackRepository};
use mentor_api::strategy::KeywordClassifier;
use mentor_api::{build_router, AppState};
use mentor_common::db::{
    Binding, BindingError, BindingGateway, BindingOperation, BindingRequest, SqlGateway,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

const WRAPPED_PREFIX: &str = "WITH gateway_rows AS (";

#[derive(Debug, Clone)]
struct StoredRow {
    seq: u64,
    id: Uuid,
    student_id: String,
    message: String,
    perceived_difficulty: String,
    strategy_snapshot: Value,
    created_at: DateTime<Utc>,
}

impl StoredRow {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id.to_string(),
            "student_id": self.student_id,
            "message": self.message,
            "perceived_difficulty": self.perceived_difficulty,
            "strategy_snapshot": self.strategy_snapshot,
            "created_at": pg_timestamp(&self.created_at),
        })
    }
}

/// Render a timestamp the way PostgreSQL's json output does
fn pg_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// In-memory binding that emulates the feedback table
#[derive(Default)]
pub struct FakePostgres {
    rows: Mutex<Vec<StoredRow>>,
    requests: Mutex<Vec<BindingRequest>>,
    down: AtomicBool,
}

impl FakePostgres {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every following call fail at the transport level
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<BindingRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Insert a row directly, bypassing the service
    pub fn seed(&self, student_id: Uuid, message: &str, difficulty: &str, created_at: DateTime<Utc>) {
        let mut rows = self.rows.lock().unwrap();
        let seq = rows.len() as u64;
        rows.push(StoredRow {
            seq,
            id: Uuid::new_v4(),
            student_id: student_id.to_string(),
            message: message.to_string(),
            perceived_difficulty: difficulty.to_string(),
            strategy_snapshot: json!({}),
            created_at: created_at.trunc_subsecs(6),
        });
    }

    fn insert(&self, params: &[Value]) -> Result<Vec<Value>, BindingError> {
        let text = |i: usize| -> Result<String, BindingError> {
            params
                .get(i)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| status(format!("parameter ${} must be text", i + 1)))
        };

        let snapshot: Value = serde_json::from_str(&text(3)?)
            .map_err(|e| status(format!("invalid input syntax for type json: {}", e)))?;

        let mut rows = self.rows.lock().unwrap();
        let row = StoredRow {
            seq: rows.len() as u64,
            id: Uuid::new_v4(),
            student_id: text(0)?,
            message: text(1)?,
            perceived_difficulty: text(2)?,
            strategy_snapshot: snapshot,
            created_at: Utc::now().trunc_subsecs(6),
        };
        let returned = json!({
            "id": row.id.to_string(),
            "created_at": pg_timestamp(&row.created_at),
        });
        rows.push(row);
        Ok(vec![returned])
    }

    fn select_latest(&self, params: &[Value]) -> Result<Vec<Value>, BindingError> {
        let student_id = params
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| status("parameter $1 must be text"))?;
        let limit = params
            .get(1)
            .and_then(Value::as_u64)
            .ok_or_else(|| status("parameter $2 must be an integer"))?;

        let mut matching: Vec<StoredRow> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.created_at, b.seq).cmp(&(a.created_at, a.seq)));

        Ok(matching
            .iter()
            .take(limit as usize)
            .map(StoredRow::to_json)
            .collect())
    }
}

fn status(body: impl Into<String>) -> BindingError {
    BindingError::Status {
        status: 500,
        body: body.into(),
    }
}

#[async_trait]
impl Binding for FakePostgres {
    async fn invoke(&self, request: BindingRequest) -> Result<Vec<u8>, BindingError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.down.load(Ordering::SeqCst) {
            return Err(BindingError::Transport("connection refused".to_string()));
        }

        let params: Vec<Value> = serde_json::from_str(&request.params)
            .map_err(|e| status(format!("invalid params: {}", e)))?;

        match request.operation {
            BindingOperation::Exec => Ok(Vec::new()),
            BindingOperation::Query => {
                if !request.sql.starts_with(WRAPPED_PREFIX) {
                    return Err(status("fake binding only answers wrapped queries"));
                }
                let rows = if request.sql.contains("INSERT INTO feedback") {
                    self.insert(&params)?
                } else if request.sql.contains("FROM feedback") {
                    self.select_latest(&params)?
                } else {
                    return Err(status(format!("unsupported statement: {}", request.sql)));
                };

                let inner = Value::Array(rows).to_string();
                Ok(json!([[inner]]).to_string().into_bytes())
            }
        }
    }
}

/// Test helper: gateway over a fresh fake database
pub fn gateway(db: &Arc<FakePostgres>) -> Arc<dyn SqlGateway> {
    Arc::new(BindingGateway::new(db.clone()))
}

/// Test helper: full router wired the way `main` wires it
pub fn setup_app(db: &Arc<FakePostgres>) -> axum::Router {
    let gateway = gateway(db);
    let repository = Arc::new(GatewayFeedbackRepository::new(gateway.clone()));
    let pipeline = Arc::new(FeedbackPipeline::new(
        repository,
        Arc::new(KeywordClassifier::new()),
    ));
    build_router(AppState::new(pipeline, gateway, Duration::from_secs(5)))
}

/// Test helper: JSON request
pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: request without a body
pub fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: extract JSON body from response
pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
