//! Per-call context: deadline and cancellation
//!
//! Every gateway call receives a [`CallContext`] from its caller. The context
//! is raced against the in-flight binding call, so a cancelled or expired
//! caller aborts the call instead of waiting for it to finish.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a call was interrupted before it completed
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    /// The caller's cancellation token fired
    #[error("call cancelled by caller")]
    Cancelled,

    /// The caller's deadline passed
    #[error("call deadline exceeded")]
    DeadlineExceeded,
}

/// Deadline and cancellation handle passed explicitly down the call chain
#[derive(Debug, Clone)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::background()
    }
}

impl CallContext {
    /// Context with no deadline and a fresh, never-fired token
    pub fn background() -> Self {
        Self {
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().deadline_at(Instant::now() + timeout)
    }

    /// Replace the deadline
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Tie this context to an existing cancellation token
    pub fn cancelled_by(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fire the cancellation token (affects every clone of this context)
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Run `fut` under this context
    ///
    /// Returns `Err` as soon as the token fires or the deadline passes; `fut`
    /// is dropped at that point, which aborts whatever it was doing.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        if self.cancel.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }

        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, fut)
                    .await
                    .map_err(|_| Interrupted::DeadlineExceeded),
                None => Ok(fut.await),
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            out = bounded => out,
        }
    }
}
