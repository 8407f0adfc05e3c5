//! HTML table parsing for rendered pages
//!
//! This module turns rendered HTML into plain cell grids:
//! - every `<tr>` becomes a row of `<td>`/`<th>` texts
//! - cell text is whitespace-collapsed
//! - rows with no text at all are dropped

use crate::transform::collapse_whitespace;
use scraper::{ElementRef, Html, Selector};

/// A parsed HTML table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtmlTable {
    /// The `summary` attribute, if any
    pub summary: Option<String>,

    /// Rows of cell text, header rows included
    pub rows: Vec<Vec<String>>,
}

impl HtmlTable {
    /// Returns true if any cell contains `keyword`
    pub fn contains(&self, keyword: &str) -> bool {
        self.rows
            .iter()
            .any(|row| row.iter().any(|cell| cell.contains(keyword)))
    }

    /// Splits off the first row as header
    pub fn into_header_and_rows(mut self) -> (Vec<String>, Vec<Vec<String>>) {
        if self.rows.is_empty() {
            return (Vec::new(), Vec::new());
        }
        let header = self.rows.remove(0);
        (header, self.rows)
    }
}

/// Parses every table matching `selector` in `html`
///
/// # Arguments
///
/// * `html` - Rendered page HTML
/// * `selector` - CSS selector for the tables, e.g. `table.gHead01`
///
/// # Returns
///
/// * `Ok(Vec<HtmlTable>)` - Matching tables in document order
/// * `Err(String)` - The selector is not valid CSS
///
/// # Example
///
/// ```
/// use naver_finance_crawler::adapters::parse_tables;
///
/// let html = r#"<table summary="PER/EPS 정보"><tr><th>PER</th><td>12.3배</td></tr></table>"#;
/// let tables = parse_tables(html, "table[summary]").unwrap();
/// assert_eq!(tables[0].rows, vec![vec!["PER".to_string(), "12.3배".to_string()]]);
/// ```
pub fn parse_tables(html: &str, selector: &str) -> Result<Vec<HtmlTable>, String> {
    let document = Html::parse_document(html);
    let table_selector = css(selector)?;
    let row_selector = css("tr")?;
    let cell_selector = css("td, th")?;

    Ok(document
        .select(&table_selector)
        .map(|table| parse_table(&table, &row_selector, &cell_selector))
        .collect())
}

/// Finds the first table matching `selector` for which `accept` holds
pub fn find_table<F>(html: &str, selector: &str, accept: F) -> Result<Option<HtmlTable>, String>
where
    F: Fn(&HtmlTable) -> bool,
{
    Ok(parse_tables(html, selector)?.into_iter().find(|t| accept(t)))
}

fn css(selector: &str) -> Result<Selector, String> {
    Selector::parse(selector).map_err(|e| format!("invalid selector '{}': {:?}", selector, e))
}

fn parse_table(
    table: &ElementRef<'_>,
    row_selector: &Selector,
    cell_selector: &Selector,
) -> HtmlTable {
    let rows = table
        .select(row_selector)
        .map(|row| {
            row.select(cell_selector)
                .map(|cell| collapse_whitespace(&cell.text().collect::<String>()))
                .collect::<Vec<_>>()
        })
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .collect();

    HtmlTable {
        summary: table.value().attr("summary").map(str::to_string),
        rows,
    }
}
