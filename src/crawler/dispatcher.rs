//! Crawl dispatcher - run-level orchestration
//!
//! One run walks the whole symbol universe through a single browser session:
//! resolve the category pipeline, open the session, extract and transform each
//! symbol in order, release the session, then export whatever was collected.

use crate::adapters::{ExtractionAdapter, FinancialIndexAdapter, InvestInfoAdapter};
use crate::browser::{BrowserEngine, LaunchOptions, PageHandle};
use crate::config::{resolve_request, validate_request, Category, ConfigSources, CrawlRequest};
use crate::crawler::controller::{RetryPaceController, RetryPolicy, SymbolFailure};
use crate::crawler::pacer::{Pacer, TokioPacer};
use crate::crawler::session::SessionManager;
use crate::export::{ExportTarget, ExportWriter};
use crate::report::{CrawlTally, FailureStage, InvocationResponse, RunResult};
use crate::storage::ObjectStore;
use crate::symbols::SymbolUniverse;
use crate::transform::{CanonicalRecord, RecordTransformer, ReportPeriod};
use crate::{CrawlError, Result};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Offset of Korea Standard Time from UTC, in hours
const KST_OFFSET_HOURS: i64 = 9;

/// Source of the partition date
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Today's date in Korea Standard Time
pub fn kst_today() -> NaiveDate {
    (Utc::now() + chrono::Duration::hours(KST_OFFSET_HOURS)).date_naive()
}

/// The adapter and transformer bound to one category
struct Pipeline {
    adapter: Arc<dyn ExtractionAdapter>,
    transformer: RecordTransformer,
}

/// Adapters replacing the production ones, one slot per category
#[derive(Default)]
struct AdapterOverrides {
    daily: Option<Arc<dyn ExtractionAdapter>>,
    quarter: Option<Arc<dyn ExtractionAdapter>>,
    annual: Option<Arc<dyn ExtractionAdapter>>,
}

impl AdapterOverrides {
    fn slot(&mut self, category: Category) -> &mut Option<Arc<dyn ExtractionAdapter>> {
        match category {
            Category::Daily => &mut self.daily,
            Category::Quarter => &mut self.quarter,
            Category::Annual => &mut self.annual,
        }
    }
}

impl Pipeline {
    /// Binds `category` to its adapter and transformer
    fn bind(category: Category, overrides: &AdapterOverrides, pacer: &Arc<dyn Pacer>) -> Self {
        let financial = |period: ReportPeriod, custom: &Option<Arc<dyn ExtractionAdapter>>| Pipeline {
            adapter: custom.clone().unwrap_or_else(|| {
                Arc::new(FinancialIndexAdapter::new(period).with_pacer(pacer.clone()))
            }),
            transformer: RecordTransformer::FinancialIndex(period),
        };

        match category {
            Category::Daily => Pipeline {
                adapter: overrides
                    .daily
                    .clone()
                    .unwrap_or_else(|| Arc::new(InvestInfoAdapter::new())),
                transformer: RecordTransformer::InvestInfo,
            },
            Category::Quarter => financial(ReportPeriod::Quarter, &overrides.quarter),
            Category::Annual => financial(ReportPeriod::Annual, &overrides.annual),
        }
    }
}

/// Runs crawls end to end
pub struct Dispatcher {
    sessions: SessionManager,
    exporter: ExportWriter,
    controller: RetryPaceController,
    pacer: Arc<dyn Pacer>,
    overrides: AdapterOverrides,
    clock: Clock,
}

impl Dispatcher {
    /// Creates a dispatcher with the production adapters, a wall-clock pacer
    /// and the default retry policy
    pub fn new(engine: Arc<dyn BrowserEngine>, store: Arc<dyn ObjectStore>) -> Self {
        let pacer: Arc<dyn Pacer> = Arc::new(TokioPacer);
        Self {
            sessions: SessionManager::new(engine),
            exporter: ExportWriter::new(store),
            controller: RetryPaceController::new(RetryPolicy::default(), pacer.clone()),
            pacer,
            overrides: AdapterOverrides::default(),
            clock: Arc::new(kst_today),
        }
    }

    /// Routes every wait of the run, including adapter settle pauses,
    /// through `pacer`
    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.controller = RetryPaceController::new(self.controller.policy(), pacer.clone());
        self.pacer = pacer;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy, pacer: Arc<dyn Pacer>) -> Self {
        self.controller = RetryPaceController::new(policy, pacer.clone());
        self.pacer = pacer;
        self
    }

    /// Replaces the extraction adapter used for `category`
    pub fn with_adapter(mut self, category: Category, adapter: Arc<dyn ExtractionAdapter>) -> Self {
        *self.overrides.slot(category) = Some(adapter);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn pipeline(&self, category: Category) -> Pipeline {
        Pipeline::bind(category, &self.overrides, &self.pacer)
    }

    /// Runs a crawl without an external cancellation signal
    pub async fn run(&self, request: &CrawlRequest, universe: &SymbolUniverse) -> Result<RunResult> {
        self.run_with_cancel(request, universe, &CancellationToken::new())
            .await
    }

    /// Runs a crawl for `request` over every symbol in `universe`
    ///
    /// Per-symbol failures are recorded in the result and never abort the
    /// run. The browser session is released before this returns, whatever the
    /// outcome.
    ///
    /// # Returns
    ///
    /// * `Ok(RunResult)` - The export landed
    /// * `Err(CrawlError)` - Invalid request, launch failure, cancellation or
    ///   export failure
    pub async fn run_with_cancel(
        &self,
        request: &CrawlRequest,
        universe: &SymbolUniverse,
        cancel: &CancellationToken,
    ) -> Result<RunResult> {
        validate_request(request)?;

        let started = Instant::now();
        let pipeline = self.pipeline(request.category);
        tracing::info!(
            category = %request.category,
            adapter = pipeline.adapter.name(),
            "Starting crawl of {} symbols",
            universe.len()
        );

        let options = LaunchOptions::lambda_safe(request.headless)
            .with_executable(request.browser_executable.clone());
        let mut session = self
            .sessions
            .acquire(&options)
            .await
            .map_err(CrawlError::SessionLaunch)?;

        let crawled = self
            .crawl_symbols(&pipeline, request, universe, session.page(), cancel)
            .await;

        if let Err(e) = session.release().await {
            tracing::warn!("Failed to close browser cleanly: {}", e);
        }

        // A cancel that lands after the last symbol still exports the full
        // batch; cancels mid-run were already surfaced by crawl_symbols.
        let (tally, records) = crawled?;
        if cancel.is_cancelled() {
            tracing::info!(
                "Cancellation arrived after all {} symbols were processed, exporting",
                tally.processed()
            );
        }

        let target = ExportTarget::new(request, (self.clock)());
        let schema = pipeline.transformer.schema();
        let receipt = match self.exporter.write(&target, &schema, &records).await {
            Ok(receipt) => receipt,
            Err(source) => {
                tracing::error!("Export failed: {}", source);
                return Err(CrawlError::Export {
                    path: self.exporter.location(&target),
                    source,
                    tally,
                });
            }
        };

        tracing::info!(
            category = %request.category,
            "Crawl finished in {:.1}s: {}/{} symbols succeeded ({:.1}%)",
            started.elapsed().as_secs_f64(),
            tally.succeeded_count,
            tally.total_symbols,
            tally.success_rate()
        );

        Ok(RunResult::new(tally, receipt))
    }

    async fn crawl_symbols(
        &self,
        pipeline: &Pipeline,
        request: &CrawlRequest,
        universe: &SymbolUniverse,
        page: &dyn PageHandle,
        cancel: &CancellationToken,
    ) -> Result<(CrawlTally, Vec<CanonicalRecord>)> {
        let total = universe.len();
        let mut tally = CrawlTally::new(request.category, total);
        let mut records = Vec::with_capacity(total);

        for (index, symbol) in universe.iter().enumerate() {
            tracing::info!("[{}/{}] Processing {}", index + 1, total, symbol);

            let outcome = self
                .controller
                .process_symbol(
                    symbol,
                    pipeline.adapter.as_ref(),
                    page,
                    request.wait_timeout(),
                    cancel,
                )
                .await;

            match outcome {
                Ok(raw) => match pipeline.transformer.transform(&raw) {
                    Ok(record) => {
                        tally.record_success();
                        records.push(record);
                    }
                    Err(e) => {
                        tracing::warn!(symbol = %symbol.code, "Transformation failed: {}", e);
                        tally.record_failure(&symbol.code, e.to_string(), FailureStage::Transformation);
                    }
                },
                Err(SymbolFailure::Exhausted { attempts, last }) => {
                    tracing::warn!(
                        symbol = %symbol.code,
                        attempts,
                        "Extraction failed: {}",
                        last
                    );
                    tally.record_failure(&symbol.code, last.to_string(), FailureStage::Extraction);
                }
                Err(SymbolFailure::Cancelled) => {
                    tracing::warn!("Cancelled while processing {}", symbol);
                    return Err(CrawlError::Cancelled {
                        processed: tally.processed(),
                        total,
                    });
                }
            }

            if index + 1 < total
                && self
                    .controller
                    .pace(request.per_symbol_delay(), cancel)
                    .await
                    .is_err()
            {
                return Err(CrawlError::Cancelled {
                    processed: tally.processed(),
                    total,
                });
            }
        }

        Ok((tally, records))
    }

    /// Resolves the request from `sources`, runs it and wraps the outcome in
    /// a status-coded response
    pub async fn invoke(
        &self,
        sources: &ConfigSources,
        universe: &SymbolUniverse,
        cancel: &CancellationToken,
    ) -> InvocationResponse {
        let outcome = match resolve_request(sources) {
            Ok(request) => self.run_with_cancel(&request, universe, cancel).await,
            Err(e) => Err(CrawlError::from(e)),
        };

        if let Err(e) = &outcome {
            tracing::error!("Crawl failed: {}", e);
        }
        InvocationResponse::from_outcome(&outcome)
    }
}
