//! Integration tests for the crawler
//!
//! These tests drive the dispatcher end to end with a fake browser engine,
//! scripted extraction adapters and in-memory object stores.

use async_trait::async_trait;
use chrono::NaiveDate;
use naver_finance_crawler::adapters::{ExtractionAdapter, ExtractionError, RawRecord, RawTable};
use naver_finance_crawler::browser::{
    BrowserEngine, BrowserError, BrowserResult, BrowserSession, LaunchOptions, PageHandle,
};
use naver_finance_crawler::config::{Category, ConfigSources, CrawlRequest, InvocationEvent};
use naver_finance_crawler::crawler::{Dispatcher, Interrupted, Pacer};
use naver_finance_crawler::export::UTF8_BOM;
use naver_finance_crawler::storage::{MemoryStore, ObjectStore, StorageError, StorageResult};
use naver_finance_crawler::transform::{Schema, PER_EPS_TABLE};
use naver_finance_crawler::{CrawlError, Symbol, SymbolUniverse};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const BUCKET: &str = "stock-bucket";
const DAILY_KEY: &str =
    "l0/ver=1/sys=naver/loc=common/period=daily/year=2025/mmdd=0115/stock_invest_info.csv";

/// Launch and close counters shared with the test body
#[derive(Default)]
struct EngineStats {
    launches: AtomicUsize,
    closes: AtomicUsize,
}

struct FakeEngine {
    stats: Arc<EngineStats>,
    launch_fails: bool,
}

struct FakeBrowser {
    stats: Arc<EngineStats>,
}

struct FakePage;

#[async_trait]
impl BrowserEngine for FakeEngine {
    async fn launch(&self, _options: &LaunchOptions) -> BrowserResult<Box<dyn BrowserSession>> {
        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        if self.launch_fails {
            return Err(BrowserError::Launch("chromium not found".to_string()));
        }
        Ok(Box::new(FakeBrowser {
            stats: self.stats.clone(),
        }))
    }
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn new_page(&mut self) -> BrowserResult<Box<dyn PageHandle>> {
        Ok(Box::new(FakePage))
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl PageHandle for FakePage {
    async fn goto(&self, _url: &str, _timeout: Duration) -> BrowserResult<()> {
        Ok(())
    }

    async fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> BrowserResult<()> {
        Ok(())
    }

    async fn read_text(&self, _selector: &str) -> BrowserResult<Option<String>> {
        Ok(None)
    }

    async fn content(&self) -> BrowserResult<String> {
        Ok(String::new())
    }

    async fn evaluate(&self, _script: &str) -> BrowserResult<Value> {
        Ok(Value::Null)
    }
}

/// How the scripted adapter treats one symbol
#[derive(Clone, Copy)]
enum Script {
    /// Fail this many attempts, then succeed
    FailFirst(usize),
    /// Fail every attempt
    AlwaysFail,
    /// Succeed with a structurally malformed table
    Malformed,
}

/// Returns raw records, failing according to a per-symbol script
#[derive(Default)]
struct ScriptedAdapter {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<String>>,
    financial: bool,
    cancel_on_symbol: Option<(String, CancellationToken)>,
}

impl ScriptedAdapter {
    fn with_script(mut self, code: &str, script: Script) -> Self {
        self.scripts.insert(code.to_string(), script);
        self
    }

    /// Serve financial ratio tables instead of the daily PER/EPS table
    fn financial(mut self) -> Self {
        self.financial = true;
        self
    }

    /// Cancel `token` while extracting `code`
    fn cancel_during(mut self, code: &str, token: CancellationToken) -> Self {
        self.cancel_on_symbol = Some((code.to_string(), token));
        self
    }

    fn calls_for(&self, code: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == code).count()
    }
}

fn daily_raw_record(symbol: &Symbol) -> RawRecord {
    RawRecord::new(symbol.clone())
        .with_text("company_name", format!("Company {}", symbol.code))
        .with_table(RawTable {
            name: PER_EPS_TABLE.to_string(),
            header: vec![],
            rows: vec![vec![
                "PER l EPS(2024.12)".to_string(),
                "12.34배 l 5,678원".to_string(),
            ]],
        })
}

fn financial_raw_record(symbol: &Symbol) -> RawRecord {
    let header = ["항목", "2023/12(IFRS연결)", "2024/12(IFRS연결)", "2025/12(E)(IFRS연결)", "전년대비 (YoY)"];
    let row = |cells: &[&str]| cells.iter().map(|c| c.to_string()).collect::<Vec<_>>();
    RawRecord::new(symbol.clone())
        .with_text("company_name", format!("Company {}", symbol.code))
        .with_table(RawTable {
            name: "수익성".to_string(),
            header: row(&header),
            rows: vec![
                row(&["매출총이익률", "31.20", "32.50", "33.00", "1.30"]),
                row(&["ROE", "10.00", "11.00", "12.00", "1.00"]),
            ],
        })
}

#[async_trait]
impl ExtractionAdapter for ScriptedAdapter {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn extract(
        &self,
        symbol: &Symbol,
        _page: &dyn PageHandle,
        wait_timeout: Duration,
    ) -> Result<RawRecord, ExtractionError> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(symbol.code.clone());
            calls.iter().filter(|c| **c == symbol.code).count()
        };

        if let Some((code, token)) = &self.cancel_on_symbol {
            if *code == symbol.code {
                token.cancel();
            }
        }

        let timeout = ExtractionError::Timeout {
            target: "#aside_invest_info".to_string(),
            timeout_ms: wait_timeout.as_millis() as u64,
        };
        match self.scripts.get(&symbol.code) {
            Some(Script::FailFirst(n)) if attempt <= *n => Err(timeout),
            Some(Script::AlwaysFail) => Err(timeout),
            Some(Script::Malformed) => Ok(RawRecord::new(symbol.clone()).with_table(RawTable {
                name: PER_EPS_TABLE.to_string(),
                header: vec![],
                rows: vec![vec!["배당수익률".to_string(), "1% l 2% l 3%".to_string()]],
            })),
            _ if self.financial => Ok(financial_raw_record(symbol)),
            _ => Ok(daily_raw_record(symbol)),
        }
    }
}

/// Records every pause; optionally cancels the run on the nth pause
#[derive(Default)]
struct RecordingPacer {
    pauses: Mutex<Vec<Duration>>,
    cancel_on: Option<(usize, CancellationToken)>,
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, duration: Duration, cancel: &CancellationToken) -> Result<(), Interrupted> {
        let count = {
            let mut pauses = self.pauses.lock().unwrap();
            pauses.push(duration);
            pauses.len()
        };
        if let Some((nth, token)) = &self.cancel_on {
            if count == *nth {
                token.cancel();
            }
        }
        if cancel.is_cancelled() {
            return Err(Interrupted);
        }
        Ok(())
    }
}

struct FailingStore;

#[async_trait]
impl ObjectStore for FailingStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        _body: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<()> {
        Err(StorageError::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: "access denied".to_string(),
        })
    }
}

/// Everything a test needs to inspect after a run
struct Harness {
    dispatcher: Dispatcher,
    stats: Arc<EngineStats>,
    adapter: Arc<ScriptedAdapter>,
    pacer: Arc<RecordingPacer>,
}

fn create_test_harness(
    adapter: ScriptedAdapter,
    pacer: RecordingPacer,
    store: Arc<dyn ObjectStore>,
    launch_fails: bool,
) -> Harness {
    let stats = Arc::new(EngineStats::default());
    let adapter = Arc::new(adapter);
    let pacer = Arc::new(pacer);
    let engine = Arc::new(FakeEngine {
        stats: stats.clone(),
        launch_fails,
    });

    let dispatcher = Dispatcher::new(engine, store)
        .with_pacer(pacer.clone())
        .with_clock(Arc::new(|| NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()))
        .with_adapter(Category::Daily, adapter.clone())
        .with_adapter(Category::Quarter, adapter.clone())
        .with_adapter(Category::Annual, adapter.clone());

    Harness {
        dispatcher,
        stats,
        adapter,
        pacer,
    }
}

fn create_test_request(category: Category) -> CrawlRequest {
    CrawlRequest::new(category, BUCKET)
}

fn universe(codes: &[&str]) -> SymbolUniverse {
    SymbolUniverse::from_codes(codes.iter().copied()).unwrap()
}

fn csv_body(store: &MemoryStore, key: &str) -> String {
    let object = store.get(BUCKET, key).expect("export should exist");
    assert!(object.body.starts_with(UTF8_BOM));
    String::from_utf8(object.body[UTF8_BOM.len()..].to_vec()).unwrap()
}

#[tokio::test]
async fn test_success_and_exhausted_symbol() {
    let store = Arc::new(MemoryStore::new());
    let harness = create_test_harness(
        ScriptedAdapter::default().with_script("B", Script::AlwaysFail),
        RecordingPacer::default(),
        store.clone(),
        false,
    );

    let result = harness
        .dispatcher
        .run(&create_test_request(Category::Daily), &universe(&["A", "B"]))
        .await
        .unwrap();

    assert_eq!(result.category, "daily");
    assert_eq!(result.total_symbols, 2);
    assert_eq!(result.succeeded_count, 1);
    assert_eq!(result.failed_symbols.len(), 1);
    assert_eq!(result.failed_symbols[0].symbol, "B");
    assert!(result.failed_symbols[0].reason.contains("timed out"));
    assert!(result.export_path.contains("period=daily"));
    assert_eq!(result.rows_written, 1);

    assert_eq!(harness.adapter.calls_for("B"), 2);
    assert_eq!(harness.stats.launches.load(Ordering::SeqCst), 1);
    assert_eq!(harness.stats.closes.load(Ordering::SeqCst), 1);

    let body = csv_body(&store, DAILY_KEY);
    let mut lines = body.lines();
    assert_eq!(lines.next(), Some(Schema::daily().columns().join(",").as_str()));
    assert_eq!(
        lines.next(),
        Some("A,Company A,12.34,5678.00,2024.12,,,,,,,,")
    );
    assert_eq!(lines.next(), None);
}

#[tokio::test]
async fn test_retry_then_success_is_not_a_failure() {
    let store = Arc::new(MemoryStore::new());
    let harness = create_test_harness(
        ScriptedAdapter::default().with_script("X", Script::FailFirst(1)),
        RecordingPacer::default(),
        store,
        false,
    );

    let result = harness
        .dispatcher
        .run(&create_test_request(Category::Daily), &universe(&["X"]))
        .await
        .unwrap();

    assert_eq!(result.succeeded_count, 1);
    assert!(result.failed_symbols.is_empty());
    assert_eq!(harness.adapter.calls_for("X"), 2);
}

#[tokio::test]
async fn test_output_order_matches_universe() {
    let store = Arc::new(MemoryStore::new());
    let harness = create_test_harness(
        ScriptedAdapter::default()
            .with_script("C", Script::FailFirst(1))
            .with_script("A", Script::FailFirst(1)),
        RecordingPacer::default(),
        store.clone(),
        false,
    );

    harness
        .dispatcher
        .run(&create_test_request(Category::Daily), &universe(&["C", "A", "B"]))
        .await
        .unwrap();

    let body = csv_body(&store, DAILY_KEY);
    let codes: Vec<&str> = body
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap())
        .collect();
    assert_eq!(codes, vec!["C", "A", "B"]);
}

#[tokio::test]
async fn test_transformation_failure_is_recorded() {
    let store = Arc::new(MemoryStore::new());
    let harness = create_test_harness(
        ScriptedAdapter::default().with_script("M", Script::Malformed),
        RecordingPacer::default(),
        store,
        false,
    );

    let result = harness
        .dispatcher
        .run(&create_test_request(Category::Daily), &universe(&["M", "N"]))
        .await
        .unwrap();

    assert_eq!(result.succeeded_count, 1);
    assert_eq!(result.failed_symbols[0].symbol, "M");
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["failedSymbols"][0]["stage"], "transformation");
    assert_eq!(harness.adapter.calls_for("M"), 1);
}

#[tokio::test]
async fn test_all_failed_writes_header_only_export() {
    let store = Arc::new(MemoryStore::new());
    let harness = create_test_harness(
        ScriptedAdapter::default()
            .with_script("A", Script::AlwaysFail)
            .with_script("B", Script::AlwaysFail),
        RecordingPacer::default(),
        store.clone(),
        false,
    );

    let result = harness
        .dispatcher
        .run(&create_test_request(Category::Quarter), &universe(&["A", "B"]))
        .await
        .unwrap();

    assert_eq!(result.rows_written, 0);
    assert_eq!(result.failed_symbols.len(), 2);
    assert!(result.export_path.contains("period=quarter"));

    let key = result
        .export_path
        .strip_prefix(&format!("s3://{}/", BUCKET))
        .unwrap()
        .to_string();
    let body = csv_body(&store, &key);
    assert_eq!(body, format!("{}\n", Schema::financial().columns().join(",")));
}

#[tokio::test]
async fn test_quarter_run_exports_financial_schema() {
    let store = Arc::new(MemoryStore::new());
    let harness = create_test_harness(
        ScriptedAdapter::default()
            .financial()
            .with_script("B", Script::AlwaysFail),
        RecordingPacer::default(),
        store.clone(),
        false,
    );

    let result = harness
        .dispatcher
        .run(&create_test_request(Category::Quarter), &universe(&["A", "B"]))
        .await
        .unwrap();

    assert_eq!(result.succeeded_count, 1);
    assert_eq!(result.failed_symbols[0].symbol, "B");
    assert!(result.export_path.ends_with(
        "period=quarter/year=2025/mmdd=0115/financial_data_transformed.csv"
    ));

    let key = result
        .export_path
        .strip_prefix(&format!("s3://{}/", BUCKET))
        .unwrap()
        .to_string();
    let body = csv_body(&store, &key);
    let mut lines = body.lines();
    let header: Vec<&str> = lines.next().unwrap().split(',').collect();
    assert_eq!(header, Schema::financial().columns());

    let cells: Vec<&str> = lines.next().unwrap().split(',').collect();
    assert_eq!(lines.next(), None);
    assert_eq!(cells.len(), header.len());
    let row: HashMap<&str, &str> = header.iter().copied().zip(cells).collect();

    assert_eq!(row["stock_code"], "A");
    assert_eq!(row["company_name"], "Company A");
    assert_eq!(row["report_period"], "quarter");
    assert_eq!(row["period_p1"], "");
    assert_eq!(row["period_p4"], "2023/12");
    assert_eq!(row["period_p5"], "2024/12");
    assert_eq!(row["gross_margin_p4"], "31.20");
    assert_eq!(row["gross_margin_p5"], "32.50");
    assert_eq!(row["roe_p4"], "10.00");
    assert_eq!(row["roe_p5"], "11.00");
    assert_eq!(row["debt_ratio_p5"], "");
}

#[tokio::test]
async fn test_empty_universe_still_exports() {
    let store = Arc::new(MemoryStore::new());
    let harness = create_test_harness(
        ScriptedAdapter::default(),
        RecordingPacer::default(),
        store.clone(),
        false,
    );

    let result = harness
        .dispatcher
        .run(&create_test_request(Category::Daily), &universe(&[]))
        .await
        .unwrap();

    assert_eq!(result.total_symbols, 0);
    assert_eq!(store.len(), 1);
    assert_eq!(harness.stats.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_repeated_runs_are_byte_identical() {
    let store = Arc::new(MemoryStore::new());
    let harness = create_test_harness(
        ScriptedAdapter::default(),
        RecordingPacer::default(),
        store.clone(),
        false,
    );
    let request = create_test_request(Category::Daily);
    let symbols = universe(&["A", "B"]);

    let first = harness.dispatcher.run(&request, &symbols).await.unwrap();
    let first_body = store.get(BUCKET, DAILY_KEY).unwrap().body;
    let second = harness.dispatcher.run(&request, &symbols).await.unwrap();
    let second_body = store.get(BUCKET, DAILY_KEY).unwrap().body;

    assert_eq!(first_body, second_body);
    assert_eq!(first.checksum, second.checksum);
}

#[tokio::test]
async fn test_pacing_between_symbols_only() {
    let store = Arc::new(MemoryStore::new());
    let harness = create_test_harness(
        ScriptedAdapter::default(),
        RecordingPacer::default(),
        store,
        false,
    );
    let mut request = create_test_request(Category::Daily);
    request.per_symbol_delay_seconds = 3;

    harness
        .dispatcher
        .run(&request, &universe(&["A", "B", "C"]))
        .await
        .unwrap();

    assert_eq!(
        *harness.pacer.pauses.lock().unwrap(),
        vec![Duration::from_secs(3), Duration::from_secs(3)]
    );
}

#[tokio::test]
async fn test_launch_failure_is_fatal() {
    let store = Arc::new(MemoryStore::new());
    let harness = create_test_harness(
        ScriptedAdapter::default(),
        RecordingPacer::default(),
        store.clone(),
        true,
    );

    let err = harness
        .dispatcher
        .run(&create_test_request(Category::Daily), &universe(&["A"]))
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::SessionLaunch(_)));
    assert!(store.is_empty());
    assert_eq!(harness.adapter.calls_for("A"), 0);
}

#[tokio::test]
async fn test_export_failure_keeps_tally_and_releases_session() {
    let harness = create_test_harness(
        ScriptedAdapter::default().with_script("B", Script::AlwaysFail),
        RecordingPacer::default(),
        Arc::new(FailingStore),
        false,
    );

    let err = harness
        .dispatcher
        .run(&create_test_request(Category::Daily), &universe(&["A", "B"]))
        .await
        .unwrap_err();

    match err {
        CrawlError::Export { path, tally, .. } => {
            assert!(path.starts_with("s3://stock-bucket/"));
            assert_eq!(tally.succeeded_count, 1);
            assert_eq!(tally.failed_symbols[0].symbol, "B");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(harness.stats.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancellation_releases_session_without_export() {
    let store = Arc::new(MemoryStore::new());
    let cancel = CancellationToken::new();
    let harness = create_test_harness(
        ScriptedAdapter::default(),
        RecordingPacer {
            cancel_on: Some((1, cancel.clone())),
            ..Default::default()
        },
        store.clone(),
        false,
    );

    let err = harness
        .dispatcher
        .run_with_cancel(
            &create_test_request(Category::Daily),
            &universe(&["A", "B", "C"]),
            &cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CrawlError::Cancelled {
            processed: 1,
            total: 3
        }
    ));
    assert!(store.is_empty());
    assert_eq!(harness.adapter.calls_for("B"), 0);
    assert_eq!(harness.stats.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_after_last_symbol_still_exports() {
    let store = Arc::new(MemoryStore::new());
    let cancel = CancellationToken::new();
    let harness = create_test_harness(
        ScriptedAdapter::default().cancel_during("C", cancel.clone()),
        RecordingPacer::default(),
        store.clone(),
        false,
    );

    let result = harness
        .dispatcher
        .run_with_cancel(
            &create_test_request(Category::Daily),
            &universe(&["A", "B", "C"]),
            &cancel,
        )
        .await
        .unwrap();

    assert!(cancel.is_cancelled());
    assert_eq!(result.succeeded_count, 3);
    assert_eq!(result.rows_written, 3);
    assert_eq!(csv_body(&store, DAILY_KEY).lines().count(), 4);
    assert_eq!(harness.stats.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invoke_unknown_category_never_launches() {
    let store = Arc::new(MemoryStore::new());
    let harness = create_test_harness(
        ScriptedAdapter::default(),
        RecordingPacer::default(),
        store.clone(),
        false,
    );
    let sources = ConfigSources {
        event: InvocationEvent::from_json(r#"{"crawler_type": "weekly", "s3_bucket": "stock-bucket"}"#)
            .unwrap(),
        ..Default::default()
    };

    let response = harness
        .dispatcher
        .invoke(&sources, &universe(&["A"]), &CancellationToken::new())
        .await;

    assert_eq!(response.status_code, 400);
    assert_eq!(harness.stats.launches.load(Ordering::SeqCst), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_invoke_success_response() {
    let store = Arc::new(MemoryStore::new());
    let harness = create_test_harness(
        ScriptedAdapter::default(),
        RecordingPacer::default(),
        store,
        false,
    );
    let sources = ConfigSources {
        event: InvocationEvent::from_json(
            r#"{"crawler_type": "daily_info", "s3_bucket": "stock-bucket", "delay_between_stocks": "0"}"#,
        )
        .unwrap(),
        ..Default::default()
    };

    let response = harness
        .dispatcher
        .invoke(&sources, &universe(&["A", "B"]), &CancellationToken::new())
        .await;

    assert!(response.is_success());
    assert_eq!(response.body["result"]["succeededCount"], 2);
    assert_eq!(
        response.body["result"]["exportPath"],
        format!("s3://{}/{}", BUCKET, DAILY_KEY)
    );
}
