//! Run reporting
//!
//! This module provides the outcome types of a crawl run:
//! - [`CrawlTally`]: per-symbol counts accumulated during the crawl
//! - [`RunResult`]: the immutable summary of a completed run
//! - [`InvocationResponse`]: the status-coded envelope returned to callers

mod response;
mod result;

pub use response::InvocationResponse;
pub use result::{CrawlTally, FailedSymbol, FailureStage, RunResult};

use std::time::Duration;

/// Prints a run summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `result` - The completed run
/// * `elapsed` - Wall-clock duration of the run
pub fn print_summary(result: &RunResult, elapsed: Duration) {
    println!("=== Crawl Summary ({}) ===\n", result.category);

    println!("Overview:");
    println!("  Total symbols: {}", result.total_symbols);
    println!("  Succeeded: {}", result.succeeded_count);
    println!("  Failed: {}", result.failed_count());
    println!("  Elapsed: {:.1}s", elapsed.as_secs_f64());
    println!();

    if !result.failed_symbols.is_empty() {
        println!("Failed Symbols ({}):", result.failed_count());
        for failed in &result.failed_symbols {
            println!("  - {} [{}]: {}", failed.symbol, failed.stage, failed.reason);
        }
        println!();
    }

    println!("Export:");
    println!("  Path: {}", result.export_path);
    println!("  Rows: {}", result.rows_written);
    println!("  SHA-256: {}", result.checksum);
    println!();

    let success_rate = if result.total_symbols > 0 {
        result.succeeded_count as f64 / result.total_symbols as f64 * 100.0
    } else {
        0.0
    };
    println!(
        "Success Rate: {:.1}% ({} / {} symbols)",
        success_rate, result.succeeded_count, result.total_symbols
    );
}
