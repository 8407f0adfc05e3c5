//! Daily investment indicator transformation
//!
//! Source rows come from the `PER/EPS 정보` table. Each row pairs a label cell
//! with a value cell, both optionally holding two items separated by `l`:
//!
//! | label                  | value              |
//! |------------------------|--------------------|
//! | `PER l EPS(2024.12)`   | `12.34배 l 5,678원` |
//! | `추정PER l EPS(2025.12)` | `10.10배 l 6,500원` |
//! | `PBR l BPS (2024.12)`  | `1.20배 l 50,000원` |
//! | `배당수익률 l 2024.12`   | `2.51%`            |

use crate::adapters::RawRecord;
use crate::transform::numeric::split_pair;
use crate::transform::{CanonicalRecord, Schema, TransformError, Value};
use once_cell::sync::Lazy;
use regex::Regex;

/// Name of the source table produced by the daily adapter
pub const PER_EPS_TABLE: &str = "PER/EPS 정보";

static PAREN_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d{4}\.\d{2})\)").unwrap());
static BARE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}\.\d{2}").unwrap());

/// Page element fallbacks, used when the table leaves a value empty
const ELEMENT_FALLBACKS: &[(&str, &str)] =
    &[("per", "per"), ("eps", "eps"), ("pbr", "pbr"), ("bps", "bps")];

/// Maps a daily raw record onto the daily schema
pub fn transform_daily(raw: &RawRecord) -> Result<CanonicalRecord, TransformError> {
    if raw.tables.is_empty() {
        return Err(TransformError::NoTables);
    }
    let table = raw
        .table(PER_EPS_TABLE)
        .ok_or_else(|| TransformError::MissingTable(PER_EPS_TABLE.to_string()))?;

    let mut record = CanonicalRecord::empty(Schema::daily());
    record.set("stock_code", Value::Text(raw.symbol.code.clone()));
    if let Some(name) = raw.company_name() {
        record.set("company_name", Value::text(name));
    }

    for row in &table.rows {
        if row.len() < 2 {
            continue;
        }
        apply_row(&mut record, &row[0], &row[1])?;
    }

    for (field, column) in ELEMENT_FALLBACKS {
        let missing = record.get(column).map_or(false, Value::is_null);
        if let (true, Some(text)) = (missing, raw.text(field)) {
            record.set(column, Value::number(text));
        }
    }

    Ok(record)
}

fn apply_row(record: &mut CanonicalRecord, label: &str, value: &str) -> Result<(), TransformError> {
    let date = PAREN_DATE
        .captures(label)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let clean_label = PAREN_DATE.replace_all(label, "");

    let labels = split_pair(&clean_label);
    let values = split_pair(value);
    if values.len() > labels.len() {
        return Err(TransformError::PairCountMismatch {
            label: label.trim().to_string(),
            labels: labels.len(),
            values: values.len(),
        });
    }

    let value_at = |idx: usize| values.get(idx).map_or(Value::Null, |v| Value::number(v));
    let date_value = || date.as_deref().map_or(Value::Null, Value::text);

    match labels[0].as_str() {
        "PER" => {
            record.set("per", value_at(0));
            record.set("eps", value_at(1));
            record.set("per_eps_date", date_value());
        }
        "추정PER" => {
            record.set("estimated_per", value_at(0));
            record.set("estimated_eps", value_at(1));
            record.set("estimated_per_eps_date", date_value());
        }
        "PBR" => {
            record.set("pbr", value_at(0));
            record.set("bps", value_at(1));
            record.set("pbr_bps_date", date_value());
        }
        "배당수익률" => {
            record.set("dividend_yield", value_at(0));
            let sub_date = labels
                .get(1)
                .and_then(|sub| BARE_DATE.find(sub))
                .map(|m| Value::Text(m.as_str().to_string()));
            record.set("dividend_date", sub_date.unwrap_or_else(date_value));
        }
        other => {
            tracing::trace!("Ignoring investment info row '{}'", other);
        }
    }

    Ok(())
}
