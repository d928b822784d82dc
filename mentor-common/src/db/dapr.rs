//! Dapr PostgreSQL output binding over the sidecar HTTP API
//!
//! Endpoint: `POST {base_url}/v1.0/bindings/{name}`
//!
//! The binding reads its connection string from a secret managed on the
//! sidecar side, so the service never handles database credentials.

use super::binding::{Binding, BindingError, BindingOperation, BindingRequest};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Longest response body echoed back in an error
const MAX_ERROR_BODY: usize = 512;

#[derive(Serialize)]
struct InvokeBody<'a> {
    operation: BindingOperation,
    metadata: InvokeMetadata<'a>,
}

#[derive(Serialize)]
struct InvokeMetadata<'a> {
    sql: &'a str,
    params: &'a str,
}

/// [`Binding`] backed by the Dapr sidecar
///
/// `reqwest::Client` pools connections internally and is cheap to clone, so
/// one instance serves every request.
#[derive(Debug, Clone)]
pub struct DaprHttpBinding {
    http_client: Client,
    url: String,
}

impl DaprHttpBinding {
    /// Create a binding client for `binding_name` on the sidecar at `base_url`
    ///
    /// `timeout` bounds each HTTP exchange independently of the caller's
    /// context deadline.
    pub fn new(base_url: &str, binding_name: &str, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url: format!(
                "{}/v1.0/bindings/{}",
                base_url.trim_end_matches('/'),
                binding_name
            ),
        })
    }

    /// Full invocation URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Binding for DaprHttpBinding {
    async fn invoke(&self, request: BindingRequest) -> std::result::Result<Vec<u8>, BindingError> {
        let body = InvokeBody {
            operation: request.operation,
            metadata: InvokeMetadata {
                sql: &request.sql,
                params: &request.params,
            },
        };

        let response = self
            .http_client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BindingError::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BindingError::Transport(format!("failed to read response body: {}", e)))?;

        debug!(
            operation = request.operation.as_str(),
            status = status.as_u16(),
            bytes = bytes.len(),
            "Dapr binding responded"
        );

        if !status.is_success() {
            let mut text = String::from_utf8_lossy(&bytes).into_owned();
            if text.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| text.is_char_boundary(*i))
                    .unwrap_or(0);
                text.truncate(cut);
            }
            return Err(BindingError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(bytes.to_vec())
    }
}
