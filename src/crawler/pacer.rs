//! Cancellable waits between and within symbols

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// A wait that was cut short by cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("wait interrupted by cancellation")]
pub struct Interrupted;

/// Imposes real or simulated delays
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Waits for `duration`, returning early with [`Interrupted`] when
    /// `cancel` fires
    async fn pause(&self, duration: Duration, cancel: &CancellationToken) -> Result<(), Interrupted>;
}

/// Wall-clock pacer backed by `tokio::time::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration, cancel: &CancellationToken) -> Result<(), Interrupted> {
        if cancel.is_cancelled() {
            return Err(Interrupted);
        }
        if duration.is_zero() {
            return Ok(());
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(Interrupted),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
