//! HTTP API handlers for mentor-api

pub mod feedback;
pub mod health;
pub mod middleware;

pub use feedback::{feedback_routes, latest_feedback, submit_feedback};
pub use health::health_routes;
pub use middleware::{handle_panic, log_requests};
