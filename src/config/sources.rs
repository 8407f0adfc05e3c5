//! Layered resolution of a [`CrawlRequest`]
//!
//! Precedence, highest first:
//! 1. Process environment (`CRAWLER_TYPE`, `S3_BUCKET`, `DELAY_BETWEEN_STOCKS`,
//!    `HEADLESS`, `WAIT_TIMEOUT`, `CHROME_EXECUTABLE`)
//! 2. Invocation event (`crawler_type`, `s3_bucket`, `delay_between_stocks`,
//!    `headless`, `wait_timeout`)
//! 3. Optional TOML file
//! 4. Built-in defaults
//!
//! Empty strings count as unset at every layer.

use crate::config::types::{
    Category, CrawlRequest, FileConfig, DEFAULT_DELAY_SECONDS, DEFAULT_WAIT_TIMEOUT_MS,
};
use crate::config::validation::validate_request;
use crate::{ConfigError, ConfigResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

pub const ENV_CRAWLER_TYPE: &str = "CRAWLER_TYPE";
pub const ENV_S3_BUCKET: &str = "S3_BUCKET";
pub const ENV_DELAY: &str = "DELAY_BETWEEN_STOCKS";
pub const ENV_HEADLESS: &str = "HEADLESS";
pub const ENV_WAIT_TIMEOUT: &str = "WAIT_TIMEOUT";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";

/// The invocation event payload
///
/// Numeric and boolean settings are accepted either as JSON scalars or as
/// strings, since schedulers commonly template them as text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvocationEvent {
    pub crawler_type: Option<String>,
    pub s3_bucket: Option<String>,
    pub delay_between_stocks: Option<Value>,
    pub headless: Option<Value>,
    pub wait_timeout: Option<Value>,
}

impl InvocationEvent {
    /// Parses an event from JSON text; an empty document is an empty event
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(text)?)
    }
}

/// All configuration inputs of one invocation
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub env: HashMap<String, String>,
    pub event: InvocationEvent,
    pub file: Option<FileConfig>,
}

impl ConfigSources {
    /// Captures the process environment with the given event and file layers
    pub fn from_process_env(event: InvocationEvent, file: Option<FileConfig>) -> Self {
        Self {
            env: std::env::vars().collect(),
            event,
            file,
        }
    }

    fn env(&self, key: &str) -> Option<&str> {
        self.env
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Merges all sources into a validated [`CrawlRequest`]
///
/// # Returns
///
/// * `Ok(CrawlRequest)` - Every required setting was present and valid
/// * `Err(ConfigError)` - A setting is missing, unknown or out of range
pub fn resolve_request(sources: &ConfigSources) -> ConfigResult<CrawlRequest> {
    let file = sources.file.clone().unwrap_or_default();
    let event = &sources.event;

    let category = sources
        .env(ENV_CRAWLER_TYPE)
        .map(str::to_string)
        .or_else(|| non_empty(event.crawler_type.as_deref()))
        .or_else(|| non_empty(file.crawl.category.as_deref()))
        .ok_or(ConfigError::Missing("crawler_type"))?;
    let category = Category::parse(&category)?;

    let storage_bucket = sources
        .env(ENV_S3_BUCKET)
        .map(str::to_string)
        .or_else(|| non_empty(event.s3_bucket.as_deref()))
        .or_else(|| non_empty(file.crawl.storage_bucket.as_deref()))
        .ok_or(ConfigError::Missing("s3_bucket"))?;

    let per_symbol_delay_seconds = match sources.env(ENV_DELAY) {
        Some(raw) => parse_u64("delay_between_stocks", raw)?,
        None => match json_u64("delay_between_stocks", event.delay_between_stocks.as_ref())? {
            Some(v) => v,
            None => file
                .crawl
                .per_symbol_delay_seconds
                .unwrap_or(DEFAULT_DELAY_SECONDS),
        },
    };

    let wait_timeout_ms = match sources.env(ENV_WAIT_TIMEOUT) {
        Some(raw) => parse_u64("wait_timeout", raw)?,
        None => match json_u64("wait_timeout", event.wait_timeout.as_ref())? {
            Some(v) => v,
            None => file.crawl.wait_timeout_ms.unwrap_or(DEFAULT_WAIT_TIMEOUT_MS),
        },
    };

    let headless = match sources.env(ENV_HEADLESS) {
        Some(raw) => parse_bool("headless", raw)?,
        None => match json_bool("headless", event.headless.as_ref())? {
            Some(v) => v,
            None => file.crawl.headless.unwrap_or(true),
        },
    };

    let browser_executable = sources
        .env(ENV_CHROME_EXECUTABLE)
        .map(PathBuf::from)
        .or(file.browser.executable);

    let request = CrawlRequest {
        category,
        storage_bucket,
        per_symbol_delay_seconds,
        wait_timeout_ms,
        headless,
        browser_executable,
    };

    validate_request(&request)?;

    Ok(request)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_u64(key: &'static str, raw: &str) -> ConfigResult<u64> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

fn parse_bool(key: &'static str, raw: &str) -> ConfigResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}

fn json_u64(key: &'static str, value: Option<&Value>) -> ConfigResult<Option<u64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => parse_u64(key, s).map(Some),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidValue {
                key,
                value: n.to_string(),
            }),
        Some(other) => Err(ConfigError::InvalidValue {
            key,
            value: other.to_string(),
        }),
    }
}

fn json_bool(key: &'static str, value: Option<&Value>) -> ConfigResult<Option<bool>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => parse_bool(key, s).map(Some),
        Some(other) => Err(ConfigError::InvalidValue {
            key,
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::CrawlSection;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn event(value: serde_json::Value) -> InvocationEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_event_only_uses_defaults() {
        let sources = ConfigSources {
            event: event(json!({"crawler_type": "daily", "s3_bucket": "stock-bucket"})),
            ..Default::default()
        };

        let request = resolve_request(&sources).unwrap();
        assert_eq!(request.category, Category::Daily);
        assert_eq!(request.storage_bucket, "stock-bucket");
        assert_eq!(request.per_symbol_delay_seconds, 2);
        assert_eq!(request.wait_timeout_ms, 15_000);
        assert!(request.headless);
        assert!(request.browser_executable.is_none());
    }

    #[test]
    fn test_env_overrides_event() {
        let sources = ConfigSources {
            env: env(&[
                ("CRAWLER_TYPE", "annual"),
                ("S3_BUCKET", "env-bucket"),
                ("DELAY_BETWEEN_STOCKS", "5"),
                ("HEADLESS", "false"),
            ]),
            event: event(json!({
                "crawler_type": "daily",
                "s3_bucket": "event-bucket",
                "delay_between_stocks": 1,
                "headless": true
            })),
            file: None,
        };

        let request = resolve_request(&sources).unwrap();
        assert_eq!(request.category, Category::Annual);
        assert_eq!(request.storage_bucket, "env-bucket");
        assert_eq!(request.per_symbol_delay_seconds, 5);
        assert!(!request.headless);
    }

    #[test]
    fn test_event_overrides_file() {
        let file = FileConfig {
            crawl: CrawlSection {
                category: Some("quarter".to_string()),
                storage_bucket: Some("file-bucket".to_string()),
                wait_timeout_ms: Some(30_000),
                ..Default::default()
            },
            ..Default::default()
        };
        let sources = ConfigSources {
            env: HashMap::new(),
            event: event(json!({"s3_bucket": "event-bucket", "wait_timeout": "20000"})),
            file: Some(file),
        };

        let request = resolve_request(&sources).unwrap();
        assert_eq!(request.category, Category::Quarter);
        assert_eq!(request.storage_bucket, "event-bucket");
        assert_eq!(request.wait_timeout_ms, 20_000);
    }

    #[test]
    fn test_empty_env_value_is_unset() {
        let sources = ConfigSources {
            env: env(&[("CRAWLER_TYPE", "  "), ("S3_BUCKET", "")]),
            event: event(json!({"crawler_type": "quarter", "s3_bucket": "stock-bucket"})),
            file: None,
        };

        let request = resolve_request(&sources).unwrap();
        assert_eq!(request.category, Category::Quarter);
        assert_eq!(request.storage_bucket, "stock-bucket");
    }

    #[test]
    fn test_unknown_category_rejected() {
        let sources = ConfigSources {
            event: event(json!({"crawler_type": "weekly", "s3_bucket": "stock-bucket"})),
            ..Default::default()
        };

        let err = resolve_request(&sources).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCategory(ref c) if c == "weekly"));
    }

    #[test]
    fn test_missing_category_rejected() {
        let sources = ConfigSources {
            event: event(json!({"s3_bucket": "stock-bucket"})),
            ..Default::default()
        };

        let err = resolve_request(&sources).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("crawler_type")));
    }

    #[test]
    fn test_missing_bucket_rejected() {
        let sources = ConfigSources {
            event: event(json!({"crawler_type": "daily"})),
            ..Default::default()
        };

        assert!(matches!(
            resolve_request(&sources),
            Err(ConfigError::Missing("s3_bucket"))
        ));
    }

    #[test]
    fn test_non_numeric_delay_rejected() {
        let sources = ConfigSources {
            env: env(&[("DELAY_BETWEEN_STOCKS", "two")]),
            event: event(json!({"crawler_type": "daily", "s3_bucket": "stock-bucket"})),
            file: None,
        };

        assert!(matches!(
            resolve_request(&sources),
            Err(ConfigError::InvalidValue { key: "delay_between_stocks", .. })
        ));
    }

    #[test]
    fn test_daily_info_alias() {
        let sources = ConfigSources {
            event: event(json!({"crawler_type": "daily_info", "s3_bucket": "stock-bucket"})),
            ..Default::default()
        };

        assert_eq!(resolve_request(&sources).unwrap().category, Category::Daily);
    }

    #[test]
    fn test_executable_from_env() {
        let sources = ConfigSources {
            env: env(&[("CHROME_EXECUTABLE", "/opt/chrome/chrome")]),
            event: event(json!({"crawler_type": "daily", "s3_bucket": "stock-bucket"})),
            file: None,
        };

        let request = resolve_request(&sources).unwrap();
        assert_eq!(
            request.browser_executable,
            Some(PathBuf::from("/opt/chrome/chrome"))
        );
    }

    #[test]
    fn test_empty_event_text() {
        let event = InvocationEvent::from_json("  ").unwrap();
        assert!(event.crawler_type.is_none());
    }
}
