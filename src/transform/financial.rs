//! Quarterly and annual financial ratio transformation
//!
//! The raw record holds one table per analysis tab (수익성, 성장성, 안정성,
//! 활동성). Each table has a header row with one column per reporting period
//! (`2023/12`), possibly followed by estimate columns (`2025/12(E)`) and
//! year-over-year analysis columns, which are skipped.
//!
//! Periods are taken from the first table, ordered oldest to newest and
//! right-aligned into the fixed period slots so the most recent period is
//! always `_p5`.
//!
//! Rows are read against the header positions: a cell missing from a short
//! row is null and cells past the header width are ignored.

use crate::adapters::{RawRecord, RawTable};
use crate::transform::numeric::clean_item_label;
use crate::transform::schema::{FINANCIAL_METRICS, PERIOD_SLOTS};
use crate::transform::{CanonicalRecord, Schema, TransformError, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

static PERIOD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}/\d{2}").unwrap());

/// Reporting period granularity of a financial export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportPeriod {
    Annual,
    Quarter,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Annual => "annual",
            ReportPeriod::Quarter => "quarter",
        }
    }

    /// Label of the period radio button on the source page
    pub fn page_label(&self) -> &'static str {
        match self {
            ReportPeriod::Annual => "연간",
            ReportPeriod::Quarter => "분기",
        }
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a financial raw record onto the financial schema
pub fn transform_financial(
    raw: &RawRecord,
    period: ReportPeriod,
) -> Result<CanonicalRecord, TransformError> {
    let first = raw.tables.first().ok_or(TransformError::NoTables)?;

    let periods = canonical_periods(first)?;
    let offset = PERIOD_SLOTS - periods.len();

    let mut record = CanonicalRecord::empty(Schema::financial());
    record.set("stock_code", Value::Text(raw.symbol.code.clone()));
    if let Some(name) = raw.company_name() {
        record.set("company_name", Value::text(name));
    }
    record.set("report_period", Value::Text(period.as_str().to_string()));
    for (idx, label) in periods.iter().enumerate() {
        record.set(&format!("period_p{}", offset + idx + 1), Value::Text(label.clone()));
    }

    let mut filled: Vec<&str> = Vec::new();
    for table in &raw.tables {
        let columns = period_columns(table);
        for row in &table.rows {
            let Some(label) = row.first() else { continue };
            let Some(stem) = metric_stem(&clean_item_label(label)) else {
                continue;
            };
            if filled.contains(&stem) {
                continue;
            }
            filled.push(stem);

            for (idx, period_label) in periods.iter().enumerate() {
                let value = columns
                    .get(period_label.as_str())
                    .and_then(|&col| row.get(col))
                    .map_or(Value::Null, |cell| Value::number(cell));
                record.set(&format!("{}_p{}", stem, offset + idx + 1), value);
            }
        }
    }

    let missing = FINANCIAL_METRICS.len() - filled.len();
    if missing > 0 {
        tracing::debug!(
            "{} of {} metrics missing for {}",
            missing,
            FINANCIAL_METRICS.len(),
            raw.symbol.code
        );
    }

    Ok(record)
}

/// Maps each actual (non-estimate) period label to its column index
fn period_columns(table: &RawTable) -> HashMap<&str, usize> {
    let mut columns = HashMap::new();
    for (idx, cell) in table.header.iter().enumerate() {
        if cell.contains("(E)") {
            continue;
        }
        if let Some(m) = PERIOD.find(cell) {
            columns.entry(m.as_str()).or_insert(idx);
        }
    }
    columns
}

/// The most recent actual periods of `table`, oldest first
fn canonical_periods(table: &RawTable) -> Result<Vec<String>, TransformError> {
    let mut periods: Vec<String> = period_columns(table)
        .into_keys()
        .map(str::to_string)
        .collect();
    if periods.is_empty() {
        return Err(TransformError::NoPeriods(table.name.clone()));
    }

    periods.sort();
    let skip = periods.len().saturating_sub(PERIOD_SLOTS);
    Ok(periods.split_off(skip))
}

fn metric_stem(label: &str) -> Option<&'static str> {
    FINANCIAL_METRICS
        .iter()
        .find(|(_, source, _)| source.eq_ignore_ascii_case(label))
        .map(|(_, _, stem)| *stem)
}
