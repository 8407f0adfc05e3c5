//! Record transformation
//!
//! This module maps a category-specific [`RawRecord`] onto the fixed export
//! schema of its category:
//! - numeric cleanup (separators, units, absent markers)
//! - daily investment indicators into one flat row
//! - quarterly/annual ratio matrices into period-slotted columns
//!
//! Transformation is pure. Only structural mismatches in the raw record are
//! errors; unparseable values become explicit nulls.

mod daily;
mod financial;
mod numeric;
mod schema;

pub use daily::{transform_daily, PER_EPS_TABLE};
pub use financial::{transform_financial, ReportPeriod};
pub use numeric::{clean_item_label, collapse_whitespace, parse_number, split_pair};
pub use schema::{Schema, FINANCIAL_METRICS, PERIOD_SLOTS};

use crate::adapters::RawRecord;
use crate::config::Category;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Structural problems that make a raw record impossible to map
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("record has no source tables")]
    NoTables,

    #[error("source table '{0}' is missing")]
    MissingTable(String),

    #[error("'{label}' has {labels} labels but {values} values")]
    PairCountMismatch {
        label: String,
        labels: usize,
        values: usize,
    },

    #[error("table '{0}' has no period columns")]
    NoPeriods(String),
}

/// A normalized scalar
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Null,
}

impl Value {
    /// Parses a scraped cell as a number, null when absent or unparseable
    pub fn number(raw: &str) -> Self {
        parse_number(raw).map_or(Value::Null, Value::Number)
    }

    /// Non-empty trimmed text, null otherwise
    pub fn text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Value::Null
        } else {
            Value::Text(trimmed.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    /// Export rendering: two decimals for numbers, empty for null
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => f.write_str(text),
            Value::Number(n) => write!(f, "{:.2}", n),
            Value::Null => Ok(()),
        }
    }
}

/// One export row conforming to a fixed schema
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl CanonicalRecord {
    /// Creates an all-null record for the schema
    pub fn empty(schema: Arc<Schema>) -> Self {
        let values = vec![Value::Null; schema.len()];
        Self { schema, values }
    }

    /// Sets a column; unknown columns are a programming error and ignored in release
    pub fn set(&mut self, column: &str, value: Value) {
        match self.schema.index_of(column) {
            Some(idx) => self.values[idx] = value,
            None => debug_assert!(false, "unknown column {}", column),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.schema.index_of(column).map(|idx| &self.values[idx])
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// The transformer bound to a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordTransformer {
    InvestInfo,
    FinancialIndex(ReportPeriod),
}

impl RecordTransformer {
    pub fn for_category(category: Category) -> Self {
        match category {
            Category::Daily => RecordTransformer::InvestInfo,
            Category::Quarter => RecordTransformer::FinancialIndex(ReportPeriod::Quarter),
            Category::Annual => RecordTransformer::FinancialIndex(ReportPeriod::Annual),
        }
    }

    pub fn schema(&self) -> Arc<Schema> {
        match self {
            RecordTransformer::InvestInfo => Schema::daily(),
            RecordTransformer::FinancialIndex(_) => Schema::financial(),
        }
    }

    pub fn transform(&self, raw: &RawRecord) -> Result<CanonicalRecord, TransformError> {
        match self {
            RecordTransformer::InvestInfo => transform_daily(raw),
            RecordTransformer::FinancialIndex(period) => transform_financial(raw, *period),
        }
    }
}

/// Maps a raw record onto the schema of `category`
pub fn transform(raw: &RawRecord, category: Category) -> Result<CanonicalRecord, TransformError> {
    RecordTransformer::for_category(category).transform(raw)
}
