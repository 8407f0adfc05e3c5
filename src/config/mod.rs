//! Configuration module for the crawler
//!
//! This module resolves the immutable [`CrawlRequest`] of one invocation from
//! the process environment, the invocation event and an optional TOML file.
//!
//! # Example
//!
//! ```no_run
//! use naver_finance_crawler::config::{resolve_request, ConfigSources, InvocationEvent};
//!
//! let event = InvocationEvent::from_json(r#"{"crawler_type": "daily", "s3_bucket": "stocks"}"#).unwrap();
//! let request = resolve_request(&ConfigSources::from_process_env(event, None)).unwrap();
//! println!("Crawling category: {}", request.category);
//! ```

mod parser;
mod sources;
mod types;
mod validation;

pub use types::{
    BrowserSection, Category, CrawlRequest, CrawlSection, FileConfig, StorageSection,
    DEFAULT_DELAY_SECONDS, DEFAULT_WAIT_TIMEOUT_MS,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, load_event};
pub use sources::{
    resolve_request, ConfigSources, InvocationEvent, ENV_CHROME_EXECUTABLE, ENV_CRAWLER_TYPE,
    ENV_DELAY, ENV_HEADLESS, ENV_S3_BUCKET, ENV_WAIT_TIMEOUT,
};
pub use validation::validate_request;
