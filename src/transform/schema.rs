//! Fixed export schemas

use once_cell::sync::Lazy;
use std::sync::Arc;

/// Number of period slots in the financial schema
pub const PERIOD_SLOTS: usize = 5;

/// Financial ratio metrics: (source tab, source row label, column stem)
pub const FINANCIAL_METRICS: &[(&str, &str, &str)] = &[
    ("수익성", "매출총이익률", "gross_margin"),
    ("수익성", "영업이익률", "operating_margin"),
    ("수익성", "순이익률", "net_margin"),
    ("수익성", "ROE", "roe"),
    ("수익성", "ROA", "roa"),
    ("성장성", "매출액증가율", "revenue_growth"),
    ("성장성", "영업이익증가율", "operating_income_growth"),
    ("성장성", "순이익증가율", "net_income_growth"),
    ("성장성", "EPS증가율", "eps_growth"),
    ("안정성", "부채비율", "debt_ratio"),
    ("안정성", "유동비율", "current_ratio"),
    ("안정성", "이자보상배율", "interest_coverage"),
    ("활동성", "총자산회전율", "total_asset_turnover"),
    ("활동성", "재고자산회전율", "inventory_turnover"),
    ("활동성", "매출채권회전율", "receivables_turnover"),
];

const DAILY_COLUMNS: &[&str] = &[
    "stock_code",
    "company_name",
    "per",
    "eps",
    "per_eps_date",
    "estimated_per",
    "estimated_eps",
    "estimated_per_eps_date",
    "pbr",
    "bps",
    "pbr_bps_date",
    "dividend_yield",
    "dividend_date",
];

static DAILY: Lazy<Arc<Schema>> =
    Lazy::new(|| Arc::new(Schema::new(DAILY_COLUMNS.iter().map(|c| c.to_string()))));

static FINANCIAL: Lazy<Arc<Schema>> = Lazy::new(|| {
    let mut columns = vec![
        "stock_code".to_string(),
        "company_name".to_string(),
        "report_period".to_string(),
    ];
    columns.extend((1..=PERIOD_SLOTS).map(|slot| format!("period_p{}", slot)));
    for (_, _, stem) in FINANCIAL_METRICS {
        columns.extend((1..=PERIOD_SLOTS).map(|slot| format!("{}_p{}", stem, slot)));
    }
    Arc::new(Schema::new(columns))
});

/// An ordered list of column names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    pub fn new(columns: impl IntoIterator<Item = String>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
        }
    }

    /// Schema of the daily investment info export
    pub fn daily() -> Arc<Schema> {
        Arc::clone(&DAILY)
    }

    /// Schema of the quarterly and annual financial ratio exports
    pub fn financial() -> Arc<Schema> {
        Arc::clone(&FINANCIAL)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}
