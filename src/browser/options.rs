use std::path::PathBuf;
use std::time::Duration;

/// Desktop Chrome user agent presented to the target site
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Fixed viewport size
pub const VIEWPORT: (u32, u32) = (1920, 1080);

/// Chromium flags safe for sandboxed, single-process serverless hosts
const LAMBDA_SAFE_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--single-process",
    "--no-zygote",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-web-security",
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-extensions",
    "--disable-background-networking",
    "--disable-component-extensions-with-background-pages",
];

/// Launch parameters for a browser session
///
/// Only `headless` and the executable path are tunable; the flag set, user
/// agent and viewport are fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOptions {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub args: Vec<String>,
    pub user_agent: String,
    pub viewport: (u32, u32),
    /// Upper bound for a single DevTools protocol request
    pub request_timeout: Duration,
}

impl LaunchOptions {
    /// The fixed option set with the given headless mode
    pub fn lambda_safe(headless: bool) -> Self {
        Self {
            headless,
            executable: None,
            args: LAMBDA_SAFE_ARGS.iter().map(|a| a.to_string()).collect(),
            user_agent: DESKTOP_USER_AGENT.to_string(),
            viewport: VIEWPORT,
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_executable(mut self, executable: Option<PathBuf>) -> Self {
        self.executable = executable;
        self
    }
}
