//! Request logging and panic recovery through the full router
//!
//! Each test installs a thread-local subscriber writing into a buffer, so the
//! captured lines belong to that test only (tokio tests run on one thread).

mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::{extract_json, json_request, setup_app, test_request, FakePostgres};
use mentor_api::feedback::{
    FeedbackError, FeedbackRecord, FeedbackRequest, FeedbackService, StrategyUpdate,
};
use mentor_api::{build_router, AppState};
use mentor_common::CallContext;
use serde_json::json;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot` method
use uuid::Uuid;

/// Writer that appends to a shared buffer
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn request_lines(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| line.contains(": request status="))
            .collect()
    }
}

/// Install an INFO-level subscriber for the current thread
fn capture_logs() -> (Captured, tracing::subscriber::DefaultGuard) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (captured, guard)
}

/// Service whose handlers always panic
struct PanickingService;

#[async_trait]
impl FeedbackService for PanickingService {
    async fn process_feedback(
        &self,
        _ctx: &CallContext,
        _request: &FeedbackRequest,
    ) -> Result<StrategyUpdate, FeedbackError> {
        panic!("classifier state corrupted");
    }

    async fn latest_feedback(
        &self,
        _ctx: &CallContext,
        _student_id: Uuid,
        _limit: u32,
    ) -> Result<Vec<FeedbackRecord>, FeedbackError> {
        panic!("unreachable store");
    }
}

#[tokio::test]
async fn test_requests_are_logged_at_info_with_status_and_request_id() {
    let (captured, _guard) = capture_logs();
    let app = setup_app(&FakePostgres::new());

    let request = json_request(
        "POST",
        "/api/v1/feedback",
        &json!({"student_id": Uuid::new_v4(), "task_id": "t", "message": "too hard"}),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(test_request("GET", "/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let lines = captured.request_lines();
    assert_eq!(lines.len(), 2, "{:?}", captured.lines());

    assert!(lines[0].contains("INFO"), "{}", lines[0]);
    assert!(lines[0].contains("status=200"), "{}", lines[0]);
    assert!(lines[0].contains("path=/api/v1/feedback"), "{}", lines[0]);
    assert!(lines[0].contains("latency_ms="), "{}", lines[0]);
    assert!(lines[0].contains("request_id="), "{}", lines[0]);
    assert!(!lines[0].contains("request_id=-"), "{}", lines[0]);

    assert!(lines[1].contains("WARN"), "{}", lines[1]);
    assert!(lines[1].contains("status=404"), "{}", lines[1]);
    assert!(lines[1].contains("path=/nope"), "{}", lines[1]);
}

#[tokio::test]
async fn test_successful_health_probes_are_not_logged() {
    let (captured, _guard) = capture_logs();
    let db = FakePostgres::new();
    let app = setup_app(&db);

    for uri in ["/health/startup", "/health/liveness", "/health/ready"] {
        let response = app.clone().oneshot(test_request("GET", uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert!(captured.request_lines().is_empty(), "{:?}", captured.lines());

    db.set_down(true);
    let response = app.oneshot(test_request("GET", "/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let lines = captured.request_lines();
    assert_eq!(lines.len(), 1, "{:?}", captured.lines());
    assert!(lines[0].contains("ERROR"), "{}", lines[0]);
    assert!(lines[0].contains("status=503"), "{}", lines[0]);
}

#[tokio::test]
async fn test_handler_panic_becomes_logged_internal_error() {
    let (captured, _guard) = capture_logs();
    let db = FakePostgres::new();
    let state = AppState::new(
        Arc::new(PanickingService),
        common::gateway(&db),
        Duration::from_secs(5),
    );
    let app = build_router(state);

    let request = json_request(
        "POST",
        "/api/v1/feedback",
        &json!({"student_id": Uuid::new_v4(), "task_id": "t", "message": "hard"}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        extract_json(response.into_body()).await,
        json!({"code": "INTERNAL_ERROR", "message": "failed to process feedback"})
    );

    let lines = captured.lines();
    assert!(
        lines
            .iter()
            .any(|l| l.contains("panic recovered") && l.contains("classifier state corrupted")),
        "{:?}",
        lines
    );
    assert!(
        captured.request_lines().iter().any(|l| l.contains("status=500")),
        "{:?}",
        lines
    );
}
