//! Relational gateway
//!
//! The database is not reachable directly. Every statement goes through a
//! [`Binding`] (the Dapr PostgreSQL output binding in production) and the
//! [`BindingGateway`] turns its positional responses back into named rows.

pub mod binding;
pub mod dapr;
pub mod gateway;
pub mod row;

pub use binding::{Binding, BindingError, BindingOperation, BindingRequest};
pub use dapr::DaprHttpBinding;
pub use gateway::{BindingGateway, GatewayError, Row, SqlGateway};
pub use row::RowError;
