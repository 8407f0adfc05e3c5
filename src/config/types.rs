use crate::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default pause between two symbols, in seconds
pub const DEFAULT_DELAY_SECONDS: u64 = 2;

/// Default wait for the expected page element, in milliseconds
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 15_000;

/// The data category a run crawls
///
/// The set is closed: every category binds exactly one extraction adapter,
/// one record transformer and one export file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Per-symbol investment indicators (PER, EPS, PBR, BPS, dividend yield)
    Daily,
    /// Quarterly financial ratio matrix
    Quarter,
    /// Annual financial ratio matrix
    Annual,
}

impl Category {
    /// All categories, in a stable order
    pub const ALL: [Category; 3] = [Category::Daily, Category::Quarter, Category::Annual];

    /// The canonical name, also used as the `period=` partition segment
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Daily => "daily",
            Category::Quarter => "quarter",
            Category::Annual => "annual",
        }
    }

    /// Parses a category name as accepted from any configuration source
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    /// `daily_info` is accepted as an alias of `daily`, `quarterly` of `quarter`.
    pub fn parse(value: &str) -> ConfigResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" | "daily_info" => Ok(Category::Daily),
            "quarter" | "quarterly" => Ok(Category::Quarter),
            "annual" => Ok(Category::Annual),
            _ => Err(ConfigError::UnknownCategory(value.to_string())),
        }
    }

    /// Returns true for the financial ratio categories
    pub fn is_financial(&self) -> bool {
        !matches!(self, Category::Daily)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::parse(s)
    }
}

/// The resolved, immutable parameters of one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlRequest {
    pub category: Category,
    pub storage_bucket: String,
    pub per_symbol_delay_seconds: u64,
    pub wait_timeout_ms: u64,
    pub headless: bool,

    /// Chromium binary to launch; `None` lets the browser engine detect one
    pub browser_executable: Option<PathBuf>,
}

impl CrawlRequest {
    /// Creates a request with default pacing and browser settings
    pub fn new(category: Category, storage_bucket: impl Into<String>) -> Self {
        Self {
            category,
            storage_bucket: storage_bucket.into(),
            per_symbol_delay_seconds: DEFAULT_DELAY_SECONDS,
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            headless: true,
            browser_executable: None,
        }
    }

    pub fn per_symbol_delay(&self) -> Duration {
        Duration::from_secs(self.per_symbol_delay_seconds)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

/// Optional TOML configuration file
///
/// Every setting is optional; environment variables and the invocation event
/// take precedence over anything set here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub crawl: CrawlSection,

    #[serde(default)]
    pub browser: BrowserSection,

    #[serde(default)]
    pub storage: StorageSection,
}

/// `[crawl]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrawlSection {
    /// One of `daily`, `quarter`, `annual`
    pub category: Option<String>,

    /// Destination bucket for the export
    #[serde(rename = "storage-bucket")]
    pub storage_bucket: Option<String>,

    /// Pause between symbols (seconds)
    #[serde(rename = "per-symbol-delay-seconds")]
    pub per_symbol_delay_seconds: Option<u64>,

    /// Wait for the expected page element (milliseconds)
    #[serde(rename = "wait-timeout-ms")]
    pub wait_timeout_ms: Option<u64>,

    pub headless: Option<bool>,

    /// Path to the symbol universe JSON file
    pub symbols: Option<PathBuf>,
}

/// `[browser]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowserSection {
    /// Chromium executable path
    pub executable: Option<PathBuf>,
}

/// `[storage]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSection {
    /// Custom S3-compatible endpoint (e.g. MinIO)
    pub endpoint: Option<String>,

    pub region: Option<String>,

    /// Use path-style bucket addressing
    #[serde(rename = "path-style", default)]
    pub path_style: bool,

    /// Write exports below this directory instead of object storage
    #[serde(rename = "local-dir")]
    pub local_dir: Option<PathBuf>,
}
