use crate::config::Category;
use chrono::{Datelike, NaiveDate};

/// Fixed key prefix of the landing zone
const KEY_PREFIX: &str = "l0/ver=1/sys=naver/loc=common";

/// File name of the export object for a category
pub fn export_file_name(category: Category) -> &'static str {
    match category {
        Category::Daily => "stock_invest_info.csv",
        Category::Quarter | Category::Annual => "financial_data_transformed.csv",
    }
}

/// Builds the object key of an export
///
/// The key is a pure function of category and date:
/// `l0/ver=1/sys=naver/loc=common/period={category}/year={YYYY}/mmdd={MMDD}/{file}`
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use naver_finance_crawler::config::Category;
/// use naver_finance_crawler::export::partition_key;
///
/// let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
/// assert_eq!(
///     partition_key(Category::Daily, date),
///     "l0/ver=1/sys=naver/loc=common/period=daily/year=2025/mmdd=0105/stock_invest_info.csv"
/// );
/// ```
pub fn partition_key(category: Category, date: NaiveDate) -> String {
    format!(
        "{}/period={}/year={:04}/mmdd={:02}{:02}/{}",
        KEY_PREFIX,
        category.as_str(),
        date.year(),
        date.month(),
        date.day(),
        export_file_name(category)
    )
}
