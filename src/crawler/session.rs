//! Browser session lifecycle

use crate::browser::{BrowserEngine, BrowserResult, BrowserSession, LaunchOptions, PageHandle};
use std::sync::Arc;

/// Opens browser sessions for crawl runs
#[derive(Clone)]
pub struct SessionManager {
    engine: Arc<dyn BrowserEngine>,
}

impl SessionManager {
    pub fn new(engine: Arc<dyn BrowserEngine>) -> Self {
        Self { engine }
    }

    /// Launches a browser and opens the single page used for every symbol
    ///
    /// If the page cannot be opened the browser is closed before the error is
    /// returned.
    pub async fn acquire(&self, options: &LaunchOptions) -> BrowserResult<Session> {
        tracing::info!(
            headless = options.headless,
            "Launching browser ({}x{})",
            options.viewport.0,
            options.viewport.1
        );
        let mut browser = self.engine.launch(options).await?;

        match browser.new_page().await {
            Ok(page) => Ok(Session {
                browser,
                page,
                released: false,
            }),
            Err(err) => {
                if let Err(close_err) = browser.close().await {
                    tracing::warn!("Failed to close browser after page error: {}", close_err);
                }
                Err(err)
            }
        }
    }
}

/// An open browser plus its page, owned by one run
pub struct Session {
    browser: Box<dyn BrowserSession>,
    page: Box<dyn PageHandle>,
    released: bool,
}

impl Session {
    pub fn page(&self) -> &dyn PageHandle {
        self.page.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Closes the browser; later calls are no-ops
    pub async fn release(&mut self) -> BrowserResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        tracing::info!("Closing browser session");
        self.browser.close().await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!("Browser session dropped without release");
        }
    }
}
