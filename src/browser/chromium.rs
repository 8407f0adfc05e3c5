//! Chromium implementation of the browser contract
//!
//! Sessions drive a local Chromium over the DevTools protocol. The protocol
//! handler stream runs on its own tokio task for the lifetime of the session
//! and is joined when the session closes.

use crate::browser::{
    BrowserEngine, BrowserError, BrowserResult, BrowserSession, LaunchOptions, PageHandle,
};
use async_trait::async_trait;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde_json::Value;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Interval between selector polls while waiting for an element
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Launches Chromium processes
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumEngine;

impl ChromiumEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn launch(&self, options: &LaunchOptions) -> BrowserResult<Box<dyn BrowserSession>> {
        let (width, height) = options.viewport;

        let mut builder = BrowserConfig::builder()
            .args(options.args.iter().cloned())
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                ..Default::default()
            })
            .request_timeout(options.request_timeout);

        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.executable {
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(BrowserError::Launch)?;

        tracing::debug!(
            "Launching Chromium (headless: {}, executable: {:?})",
            options.headless,
            options.executable
        );

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            handler_task: Some(handler_task),
            user_agent: options.user_agent.clone(),
            closed: false,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    handler_task: Option<JoinHandle<()>>,
    user_agent: String,
    closed: bool,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&mut self) -> BrowserResult<Box<dyn PageHandle>> {
        if self.closed {
            return Err(BrowserError::Closed);
        }

        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(protocol)?;
        page.set_user_agent(self.user_agent.as_str())
            .await
            .map_err(protocol)?;

        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(&mut self) -> BrowserResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let close_result = self.browser.close().await.map_err(protocol);
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("Waiting for browser exit failed: {}", e);
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
            let _ = task.await;
        }

        close_result.map(|_| ())
    }
}

struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(BrowserError::Timeout {
                target: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        let poll = async {
            loop {
                if self.page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| BrowserError::Timeout {
                target: selector.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })
    }

    async fn read_text(&self, selector: &str) -> BrowserResult<Option<String>> {
        let element = match self.page.find_element(selector).await {
            Ok(element) => element,
            Err(e) => {
                tracing::trace!("No element for {}: {}", selector, e);
                return Ok(None);
            }
        };

        let text = element.inner_text().await.map_err(protocol)?;
        Ok(text.map(|t| t.trim().to_string()))
    }

    async fn content(&self) -> BrowserResult<String> {
        self.page.content().await.map_err(protocol)
    }

    async fn evaluate(&self, script: &str) -> BrowserResult<Value> {
        let result = self
            .page
            .evaluate_expression(EvaluateParams::new(script))
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;

        Ok(result.value().cloned().unwrap_or(Value::Null))
    }
}

fn protocol(e: chromiumoxide::error::CdpError) -> BrowserError {
    BrowserError::Protocol(e.to_string())
}
