//! # Mentor Common Library
//!
//! Shared code for the mentor services including:
//! - Relational gateway over the Dapr database binding
//! - Per-call context (deadline and cancellation)
//! - Configuration loading
//! - Timestamp and UUID helpers

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use context::{CallContext, Interrupted};
pub use error::{Error, Result};
