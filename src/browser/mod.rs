//! Headless browser contract
//!
//! The crawl engine only needs a narrow slice of a browser:
//! - launching one session with fixed options
//! - opening a page and navigating it
//! - waiting for, reading and evaluating against the rendered DOM
//!
//! [`ChromiumEngine`] implements the contract over the Chrome DevTools
//! protocol; tests substitute their own engines.

mod chromium;
mod options;

pub use chromium::ChromiumEngine;
pub use options::{LaunchOptions, DESKTOP_USER_AGENT, VIEWPORT};

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a browser engine
#[derive(Debug, Clone, Error)]
pub enum BrowserError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out after {timeout_ms}ms waiting for {target}")]
    Timeout { target: String, timeout_ms: u64 },

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Browser protocol error: {0}")]
    Protocol(String),

    #[error("Browser session is closed")]
    Closed,
}

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// Launches browser sessions
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> BrowserResult<Box<dyn BrowserSession>>;
}

/// A running browser process
#[async_trait]
pub trait BrowserSession: Send {
    /// Opens a blank page configured with the session's user agent
    async fn new_page(&mut self) -> BrowserResult<Box<dyn PageHandle>>;

    /// Shuts the browser down; calling it twice is a no-op
    async fn close(&mut self) -> BrowserResult<()>;
}

/// A live page inside a session
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Navigates to `url` and waits for the load event
    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()>;

    /// Waits until `selector` matches an element
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowserResult<()>;

    /// Returns the inner text of the first match, `None` if nothing matches
    async fn read_text(&self, selector: &str) -> BrowserResult<Option<String>>;

    /// Returns the rendered HTML of the document
    async fn content(&self) -> BrowserResult<String>;

    /// Evaluates a JavaScript expression and returns its JSON value
    async fn evaluate(&self, script: &str) -> BrowserResult<Value>;
}
