//! Daily investment indicator adapter
//!
//! Reads the `PER/EPS 정보` table of the Naver Finance main item page plus the
//! live `#_per`, `#_eps`, `#_pbr` and `#_bps` elements.

use crate::adapters::table::{find_table, HtmlTable};
use crate::adapters::{ExtractionAdapter, ExtractionError, RawRecord, RawTable};
use crate::browser::PageHandle;
use crate::symbols::Symbol;
use crate::transform::PER_EPS_TABLE;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Naver Finance item page
pub const MAIN_URL: &str = "https://finance.naver.com/item/main.naver";

/// Element whose presence marks a rendered investment info section
const READY_SELECTOR: &str = "#aside_invest_info, table[summary*=\"PER\"]";

const PER_EPS_SELECTOR: &str = "#aside_invest_info table[summary=\"PER/EPS 정보\"]";
const COMPANY_NAME_SELECTOR: &str = "div.wrap_company h2 a";
const ELEMENT_IDS: &[&str] = &["per", "eps", "pbr", "bps"];

pub struct InvestInfoAdapter {
    base_url: String,
}

impl InvestInfoAdapter {
    pub fn new() -> Self {
        Self::with_base_url(MAIN_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn page_url(&self, code: &str) -> Result<Url, ExtractionError> {
        Url::parse_with_params(&self.base_url, &[("code", code)])
            .map_err(|e| ExtractionError::Navigation(format!("{}: {}", self.base_url, e)))
    }
}

impl Default for InvestInfoAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExtractionAdapter for InvestInfoAdapter {
    fn name(&self) -> &'static str {
        "invest_info"
    }

    async fn extract(
        &self,
        symbol: &Symbol,
        page: &dyn PageHandle,
        wait_timeout: Duration,
    ) -> Result<RawRecord, ExtractionError> {
        let url = self.page_url(&symbol.code)?;
        tracing::debug!("Navigating to {}", url);

        page.goto(url.as_str(), wait_timeout).await?;
        page.wait_for_selector(READY_SELECTOR, wait_timeout).await?;

        let html = page.content().await?;
        let table = locate_per_eps_table(&html)?
            .ok_or_else(|| ExtractionError::MissingField(format!("{} table", PER_EPS_TABLE)))?;

        let rows: Vec<Vec<String>> = table.rows.into_iter().filter(|r| r.len() >= 2).collect();
        if rows.is_empty() {
            return Err(ExtractionError::MalformedField {
                field: PER_EPS_TABLE.to_string(),
                message: "table has no label/value rows".to_string(),
            });
        }

        let mut record = RawRecord::new(symbol.clone()).with_table(RawTable {
            name: PER_EPS_TABLE.to_string(),
            header: Vec::new(),
            rows,
        });

        for id in ELEMENT_IDS {
            if let Some(text) = page.read_text(&format!("#_{}", id)).await? {
                if !text.is_empty() {
                    record = record.with_text(id, text);
                }
            }
        }

        if symbol.name.is_none() {
            if let Some(name) = page.read_text(COMPANY_NAME_SELECTOR).await? {
                record = record.with_text("company_name", name);
            }
        }

        Ok(record)
    }
}

/// Finds the PER/EPS table, falling back to any table whose summary names PER or EPS
fn locate_per_eps_table(html: &str) -> Result<Option<HtmlTable>, ExtractionError> {
    let malformed = |message: String| ExtractionError::MalformedField {
        field: "page".to_string(),
        message,
    };

    if let Some(table) = find_table(html, PER_EPS_SELECTOR, |_| true).map_err(malformed)? {
        return Ok(Some(table));
    }

    find_table(html, "table[summary]", |t| {
        t.summary
            .as_deref()
            .map_or(false, |s| s.contains("PER") || s.contains("EPS"))
    })
    .map_err(malformed)
}
