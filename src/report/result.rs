use crate::config::Category;
use crate::export::ExportReceipt;
use serde::Serialize;
use std::fmt;

/// Pipeline stage at which a symbol failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Extraction,
    Transformation,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Extraction => f.write_str("extraction"),
            FailureStage::Transformation => f.write_str("transformation"),
        }
    }
}

/// A symbol that produced no export row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSymbol {
    pub symbol: String,
    pub reason: String,
    pub stage: FailureStage,
}

/// Running per-symbol counts of a crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlTally {
    pub category: String,
    pub total_symbols: usize,
    pub succeeded_count: usize,
    pub failed_symbols: Vec<FailedSymbol>,
}

impl CrawlTally {
    pub fn new(category: Category, total_symbols: usize) -> Self {
        Self {
            category: category.as_str().to_string(),
            total_symbols,
            succeeded_count: 0,
            failed_symbols: Vec::new(),
        }
    }

    pub fn record_success(&mut self) {
        self.succeeded_count += 1;
    }

    pub fn record_failure(&mut self, symbol: &str, reason: impl Into<String>, stage: FailureStage) {
        self.failed_symbols.push(FailedSymbol {
            symbol: symbol.to_string(),
            reason: reason.into(),
            stage,
        });
    }

    /// Symbols processed so far
    pub fn processed(&self) -> usize {
        self.succeeded_count + self.failed_symbols.len()
    }

    /// Share of all symbols that succeeded, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total_symbols == 0 {
            0.0
        } else {
            self.succeeded_count as f64 / self.total_symbols as f64 * 100.0
        }
    }
}

/// The summary of a completed run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub category: String,
    pub total_symbols: usize,
    pub succeeded_count: usize,
    pub failed_symbols: Vec<FailedSymbol>,
    pub export_path: String,
    pub rows_written: usize,
    pub checksum: String,
}

impl RunResult {
    pub fn new(tally: CrawlTally, receipt: ExportReceipt) -> Self {
        Self {
            category: tally.category,
            total_symbols: tally.total_symbols,
            succeeded_count: tally.succeeded_count,
            failed_symbols: tally.failed_symbols,
            export_path: receipt.location,
            rows_written: receipt.rows,
            checksum: receipt.checksum,
        }
    }

    pub fn failed_count(&self) -> usize {
        self.failed_symbols.len()
    }
}
