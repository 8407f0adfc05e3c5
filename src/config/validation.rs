use crate::config::types::{CrawlRequest, FileConfig, StorageSection};
use crate::ConfigError;
use url::Url;

/// Upper bound for the inter-symbol pause (one hour)
const MAX_DELAY_SECONDS: u64 = 3_600;

/// Upper bound for the element wait (five minutes)
const MAX_WAIT_TIMEOUT_MS: u64 = 300_000;

/// Validates a fully resolved crawl request
pub fn validate_request(request: &CrawlRequest) -> Result<(), ConfigError> {
    validate_bucket_name(&request.storage_bucket)?;

    if request.per_symbol_delay_seconds > MAX_DELAY_SECONDS {
        return Err(ConfigError::Validation(format!(
            "delay_between_stocks must be <= {}s, got {}s",
            MAX_DELAY_SECONDS, request.per_symbol_delay_seconds
        )));
    }

    if request.wait_timeout_ms == 0 || request.wait_timeout_ms > MAX_WAIT_TIMEOUT_MS {
        return Err(ConfigError::Validation(format!(
            "wait_timeout must be between 1 and {}ms, got {}ms",
            MAX_WAIT_TIMEOUT_MS, request.wait_timeout_ms
        )));
    }

    if let Some(path) = &request.browser_executable {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "browser executable path cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates the parts of a TOML file that are not merged into the request
pub fn validate_file(config: &FileConfig) -> Result<(), ConfigError> {
    validate_storage_section(&config.storage)?;

    if let Some(bucket) = &config.crawl.storage_bucket {
        validate_bucket_name(bucket)?;
    }

    Ok(())
}

fn validate_storage_section(storage: &StorageSection) -> Result<(), ConfigError> {
    if let Some(endpoint) = &storage.endpoint {
        let url = Url::parse(endpoint).map_err(|e| {
            ConfigError::Validation(format!("Invalid storage endpoint '{}': {}", endpoint, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Storage endpoint '{}' must use http or https",
                endpoint
            )));
        }
    }

    if let Some(region) = &storage.region {
        if region.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage region cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates an S3-style bucket name
///
/// Rules: 3-63 characters, lowercase ASCII letters, digits, `-` and `.`,
/// starting and ending with a letter or digit.
fn validate_bucket_name(bucket: &str) -> Result<(), ConfigError> {
    if bucket.len() < 3 || bucket.len() > 63 {
        return Err(ConfigError::Validation(format!(
            "bucket name must be 3-63 characters, got '{}'",
            bucket
        )));
    }

    if !bucket
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(ConfigError::Validation(format!(
            "bucket name may only contain lowercase letters, digits, '-' and '.', got '{}'",
            bucket
        )));
    }

    let edge_ok = |c: Option<char>| c.map_or(false, |c| c.is_ascii_alphanumeric());
    if !edge_ok(bucket.chars().next()) || !edge_ok(bucket.chars().last()) {
        return Err(ConfigError::Validation(format!(
            "bucket name must start and end with a letter or digit, got '{}'",
            bucket
        )));
    }

    Ok(())
}
