//! Extraction adapters
//!
//! An adapter knows the page layout of one data category. Given a symbol and
//! a live page it navigates, waits for the expected content and returns the
//! raw, uncleaned field set. Adapters never parse numbers; that is the
//! transformer's job.

mod financial_index;
mod invest_info;
mod table;

pub use financial_index::FinancialIndexAdapter;
pub use invest_info::InvestInfoAdapter;
pub use table::{find_table, parse_tables, HtmlTable};

use crate::browser::{BrowserError, PageHandle};
use crate::symbols::Symbol;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// A failed extraction attempt; every variant is retryable
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("timed out after {timeout_ms}ms waiting for {target}")]
    Timeout { target: String, timeout_ms: u64 },

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("malformed field {field}: {message}")]
    MalformedField { field: String, message: String },

    #[error("browser error: {0}")]
    Browser(String),
}

impl From<BrowserError> for ExtractionError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::Timeout { target, timeout_ms } => {
                ExtractionError::Timeout { target, timeout_ms }
            }
            BrowserError::Navigation { url, message } => {
                ExtractionError::Navigation(format!("{}: {}", url, message))
            }
            other => ExtractionError::Browser(other.to_string()),
        }
    }
}

/// A raw scalar as read from the page
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Number(f64),
}

impl RawValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(text) => Some(text),
            RawValue::Number(_) => None,
        }
    }
}

/// A scraped table: a named header row plus data rows of cell text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Everything one extraction attempt read for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub symbol: Symbol,
    pub fields: BTreeMap<String, RawValue>,
    pub tables: Vec<RawTable>,
}

impl RawRecord {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            fields: BTreeMap::new(),
            tables: Vec::new(),
        }
    }

    pub fn with_text(mut self, field: &str, value: impl Into<String>) -> Self {
        self.fields
            .insert(field.to_string(), RawValue::Text(value.into()));
        self
    }

    pub fn with_table(mut self, table: RawTable) -> Self {
        self.tables.push(table);
        self
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(RawValue::as_text)
    }

    pub fn table(&self, name: &str) -> Option<&RawTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Company name from the record, falling back to the symbol's own name
    pub fn company_name(&self) -> Option<&str> {
        self.text("company_name")
            .or(self.symbol.name.as_deref())
            .filter(|name| !name.trim().is_empty())
    }
}

/// Page-specific extraction for one data category
#[async_trait]
pub trait ExtractionAdapter: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Navigates `page` to the symbol's page and reads its raw fields
    async fn extract(
        &self,
        symbol: &Symbol,
        page: &dyn PageHandle,
        wait_timeout: Duration,
    ) -> Result<RawRecord, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_error_mapping() {
        let timeout: ExtractionError = BrowserError::Timeout {
            target: "#aside_invest_info".to_string(),
            timeout_ms: 15_000,
        }
        .into();
        assert!(matches!(timeout, ExtractionError::Timeout { timeout_ms: 15_000, .. }));

        let nav: ExtractionError = BrowserError::Navigation {
            url: "https://finance.naver.com".to_string(),
            message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
        }
        .into();
        assert!(matches!(nav, ExtractionError::Navigation(ref m) if m.contains("ERR_NAME")));

        let closed: ExtractionError = BrowserError::Closed.into();
        assert!(matches!(closed, ExtractionError::Browser(_)));
    }

    #[test]
    fn test_company_name_fallback() {
        let record = RawRecord::new(Symbol::with_name("004150", "한솔홀딩스"));
        assert_eq!(record.company_name(), Some("한솔홀딩스"));

        let record = record.with_text("company_name", "Hansol Holdings");
        assert_eq!(record.company_name(), Some("Hansol Holdings"));

        assert_eq!(RawRecord::new(Symbol::new("005930")).company_name(), None);
    }
}
