//! Retry and pacing around per-symbol extraction
//!
//! Every extraction failure is retryable. A symbol gets at most
//! [`RetryPolicy::max_attempts`] attempts, separated by a short pause; after
//! that the last failure is reported and the run moves on.

use crate::adapters::{ExtractionAdapter, ExtractionError, RawRecord};
use crate::browser::PageHandle;
use crate::crawler::pacer::{Interrupted, Pacer};
use crate::symbols::Symbol;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Default number of attempts per symbol (one retry)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Default pause between attempts of one symbol
pub const DEFAULT_RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Bounded retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_pause: DEFAULT_RETRY_PAUSE,
        }
    }
}

/// Why a symbol produced no raw record
#[derive(Debug, Clone, Error)]
pub enum SymbolFailure {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: ExtractionError },

    #[error("cancelled")]
    Cancelled,
}

impl From<Interrupted> for SymbolFailure {
    fn from(_: Interrupted) -> Self {
        SymbolFailure::Cancelled
    }
}

/// Runs extraction attempts and inter-symbol waits
#[derive(Clone)]
pub struct RetryPaceController {
    policy: RetryPolicy,
    pacer: Arc<dyn Pacer>,
}

impl RetryPaceController {
    pub fn new(policy: RetryPolicy, pacer: Arc<dyn Pacer>) -> Self {
        Self { policy, pacer }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Extracts one symbol with bounded retries
    ///
    /// # Arguments
    ///
    /// * `symbol` - The symbol to extract
    /// * `adapter` - Category-specific extraction
    /// * `page` - The session's page, re-navigated on every attempt
    /// * `wait_timeout` - Upper bound for each content wait inside an attempt
    /// * `cancel` - Stops the current attempt or retry pause when fired
    ///
    /// # Returns
    ///
    /// * `Ok(RawRecord)` - An attempt succeeded
    /// * `Err(SymbolFailure::Exhausted)` - All attempts failed
    /// * `Err(SymbolFailure::Cancelled)` - Cancelled before an attempt succeeded
    pub async fn process_symbol(
        &self,
        symbol: &Symbol,
        adapter: &dyn ExtractionAdapter,
        page: &dyn PageHandle,
        wait_timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RawRecord, SymbolFailure> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(SymbolFailure::Cancelled);
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SymbolFailure::Cancelled),
                outcome = adapter.extract(symbol, page, wait_timeout) => outcome,
            };

            match outcome {
                Ok(record) => {
                    if attempt > 1 {
                        tracing::info!(symbol = %symbol.code, attempt, "Succeeded on retry");
                    }
                    return Ok(record);
                }
                Err(last) if attempt >= max_attempts => {
                    return Err(SymbolFailure::Exhausted {
                        attempts: attempt,
                        last,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        symbol = %symbol.code,
                        attempt,
                        adapter = adapter.name(),
                        "Extraction failed, retrying: {}",
                        err
                    );
                    self.pacer.pause(self.policy.retry_pause, cancel).await?;
                    attempt += 1;
                }
            }
        }
    }

    /// Waits the inter-symbol delay
    pub async fn pace(&self, delay: Duration, cancel: &CancellationToken) -> Result<(), Interrupted> {
        tracing::debug!("Pacing {:?} before next symbol", delay);
        self.pacer.pause(delay, cancel).await
    }
}
