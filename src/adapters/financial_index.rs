//! Financial ratio index adapter
//!
//! The WiseReport company analysis page renders one ratio matrix per analysis
//! tab. The adapter switches the page to consolidated K-IFRS figures and the
//! requested period granularity, then visits each tab in turn and captures the
//! table holding that tab's key metric.
//!
//! Each page interaction is followed by a settle pause taken through the
//! injected [`Pacer`]. The attempt as a whole is raced against run
//! cancellation by the retry controller, so the pauses use a local token.

use crate::adapters::table::find_table;
use crate::adapters::{ExtractionAdapter, ExtractionError, RawRecord, RawTable};
use crate::browser::PageHandle;
use crate::crawler::{Pacer, TokioPacer};
use crate::symbols::Symbol;
use crate::transform::ReportPeriod;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// WiseReport company ratio page
pub const INDEX_URL: &str = "https://navercomp.wisereport.co.kr/v2/company/c1040001.aspx";

const TABLE_SELECTOR: &str = "table.gHead01.all-width.data-list";
const CONSOLIDATED: &str = "K-IFRS(연결)";
const DEFAULT_SETTLE: Duration = Duration::from_millis(1500);

/// Analysis tabs and the row labels identifying each tab's table
const TABS: &[(&str, &[&str])] = &[
    ("수익성", &["매출총이익률"]),
    ("성장성", &["매출액증가율"]),
    ("안정성", &["부채비율"]),
    ("활동성", &["총자산회전율", "자기자본회전율"]),
];

pub struct FinancialIndexAdapter {
    period: ReportPeriod,
    base_url: String,
    settle: Duration,
    pacer: Arc<dyn Pacer>,
}

impl FinancialIndexAdapter {
    pub fn new(period: ReportPeriod) -> Self {
        Self {
            period,
            base_url: INDEX_URL.to_string(),
            settle: DEFAULT_SETTLE,
            pacer: Arc::new(TokioPacer),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the pause after each page interaction
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Routes settle pauses through `pacer`
    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn period(&self) -> ReportPeriod {
        self.period
    }

    fn page_url(&self, code: &str) -> Result<Url, ExtractionError> {
        Url::parse_with_params(
            &self.base_url,
            &[("cn", ""), ("cmp_cd", code), ("menuType", "block")],
        )
        .map_err(|e| ExtractionError::Navigation(format!("{}: {}", self.base_url, e)))
    }

    async fn settle(&self) -> Result<(), ExtractionError> {
        self.pacer
            .pause(self.settle, &CancellationToken::new())
            .await
            .map_err(|e| ExtractionError::Browser(e.to_string()))
    }

    /// Runs a page action script; a `false` result means the control was not found
    async fn act(&self, page: &dyn PageHandle, script: &str, what: &str) -> Result<(), ExtractionError> {
        let applied = page.evaluate(script).await?.as_bool().unwrap_or(false);
        if !applied {
            tracing::warn!("Could not apply '{}' on page, using page default", what);
        }
        self.settle().await
    }
}

#[async_trait]
impl ExtractionAdapter for FinancialIndexAdapter {
    fn name(&self) -> &'static str {
        "financial_index"
    }

    async fn extract(
        &self,
        symbol: &Symbol,
        page: &dyn PageHandle,
        wait_timeout: Duration,
    ) -> Result<RawRecord, ExtractionError> {
        let url = self.page_url(&symbol.code)?;
        tracing::debug!("Navigating to {} ({})", url, self.period);

        page.goto(url.as_str(), wait_timeout).await?;
        page.wait_for_selector(TABLE_SELECTOR, wait_timeout).await?;

        self.act(page, &select_option_script("finGubun", CONSOLIDATED), CONSOLIDATED)
            .await?;
        let period_label = self.period.page_label();
        self.act(page, &radio_script(period_label), period_label)
            .await?;

        let mut record = RawRecord::new(symbol.clone());
        for (tab, keywords) in TABS {
            self.act(page, &click_tab_script(tab), tab).await?;

            let html = page.content().await?;
            let table = find_table(&html, TABLE_SELECTOR, |t| {
                keywords.iter().any(|keyword| t.contains(keyword))
            })
            .map_err(|message| ExtractionError::MalformedField {
                field: "page".to_string(),
                message,
            })?
            .ok_or_else(|| ExtractionError::MissingField(format!("{} table", tab)))?;

            let (header, rows) = table.into_header_and_rows();
            if rows.is_empty() {
                return Err(ExtractionError::MalformedField {
                    field: format!("{} table", tab),
                    message: "table has no data rows".to_string(),
                });
            }

            tracing::trace!("{}: {} rows from '{}' tab", symbol.code, rows.len(), tab);
            record = record.with_table(RawTable {
                name: tab.to_string(),
                header,
                rows,
            });
        }

        Ok(record)
    }
}

/// JSON-encodes `text` as a JavaScript string literal
fn js_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

fn select_option_script(select_id: &str, label: &str) -> String {
    format!(
        r#"(() => {{
  const id = {id};
  const label = {label};
  const select = document.getElementById(id) || document.querySelector(`select[name*="${{id}}"]`);
  if (!select) return false;
  const option = Array.from(select.options).find(o => o.text.includes(label) || o.value.includes(label));
  if (!option) return false;
  select.value = option.value;
  select.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return true;
}})()"#,
        id = js_string(select_id),
        label = js_string(label),
    )
}

fn radio_script(label: &str) -> String {
    format!(
        r#"(() => {{
  const label = {label};
  const text = el => (el && el.textContent) || '';
  const radio = Array.from(document.querySelectorAll('input[type="radio"]')).find(r =>
    (r.value || '').includes(label) ||
    Array.from(r.labels || []).some(l => text(l).includes(label)) ||
    text(r.nextSibling).includes(label));
  if (!radio) return false;
  radio.click();
  return true;
}})()"#,
        label = js_string(label),
    )
}

fn click_tab_script(name: &str) -> String {
    format!(
        r#"(() => {{
  const name = {name};
  const target = Array.from(document.querySelectorAll('a, span, button, td'))
    .find(el => el.textContent && el.textContent.trim() === name);
  if (!target) return false;
  target.click();
  return true;
}})()"#,
        name = js_string(name),
    )
}
