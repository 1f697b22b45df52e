//! # Headless Browser Module
//!
//! Narrow interface over a headless browser engine. The crawl engine only
//! needs three things from a browser: open a session with a user agent,
//! navigate a URL within a timeout, and read the rendered markup back. Those
//! are expressed as the `BrowserEngine` and `PageSession` traits so the
//! engine can run against a WebDriver-backed implementation in production
//! and a scripted fake in tests.
//!
//! The WebDriver implementation connects to a remote chromedriver-compatible
//! endpoint, runs Chrome headless, and considers navigation "arrived" once
//! the document structure is available. A short best-effort settle window
//! waits for `document.readyState == "complete"` and proceeds regardless if
//! that window lapses.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use thiserror::Error;
use thirtyfour::prelude::*;
use tracing::{debug, warn};

/// Best-effort wait for subordinate activity after navigation
const SETTLE_WINDOW: Duration = Duration::from_secs(10);

/// Poll interval while waiting for the document to settle
const SETTLE_POLL: Duration = Duration::from_millis(250);

/// Error type for browser operations
#[derive(Debug, Error)]
pub enum BrowserError {
    /// WebDriver protocol error
    #[error("WebDriver error: {0}")]
    WebDriver(#[from] WebDriverError),

    /// Session lifecycle error
    #[error("Session error: {0}")]
    Session(String),

    /// Navigation did not complete within the timeout
    #[error("Navigation timed out after {0:?}")]
    Timeout(Duration),

    /// Navigation failure reported by the browser
    #[error("Navigation error: {0}")]
    Navigation(String),
}

/// Outcome of a completed navigation
#[derive(Debug, Clone, Copy)]
pub struct NavigationStatus {
    /// HTTP status of the main document, when the browser exposes it
    pub http_status: Option<u16>,
}

/// One open page within a browser session
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Navigate to a URL, bounded by the given timeout.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<NavigationStatus, BrowserError>;

    /// Read the rendered markup of the current page.
    async fn rendered_html(&self) -> Result<String, BrowserError>;

    /// Close the session, releasing the underlying browser resources.
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// A browser engine that can open page sessions
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Open a new session presenting the given user agent.
    async fn open_session(&self, user_agent: &str) -> Result<Box<dyn PageSession>, BrowserError>;
}

/// WebDriver-backed browser engine
///
/// Talks to a chromedriver-compatible endpoint (e.g. `http://localhost:9515`).
pub struct WebDriverEngine {
    server_url: String,
}

impl WebDriverEngine {
    /// Create an engine pointing at a WebDriver server.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
        }
    }
}

#[async_trait]
impl BrowserEngine for WebDriverEngine {
    async fn open_session(&self, user_agent: &str) -> Result<Box<dyn PageSession>, BrowserError> {
        let mut caps = DesiredCapabilities::chrome();
        caps.set_headless()?;
        caps.add_chrome_arg(&format!("--user-agent={}", user_agent))?;
        caps.add_chrome_arg("--no-sandbox")?;
        caps.add_chrome_arg("--disable-dev-shm-usage")?;

        let driver = WebDriver::new(&self.server_url, caps).await?;
        debug!("Opened WebDriver session against {}", self.server_url);

        Ok(Box::new(WebDriverSession {
            driver: Some(driver),
        }))
    }
}

/// One page within a WebDriver session
pub struct WebDriverSession {
    driver: Option<WebDriver>,
}

impl WebDriverSession {
    fn driver(&self) -> Result<&WebDriver, BrowserError> {
        self.driver
            .as_ref()
            .ok_or_else(|| BrowserError::Session("session already closed".to_string()))
    }

    /// Wait up to the settle window for the document to finish loading.
    ///
    /// Structural content is already available once navigation returns, so a
    /// lapsed window is not an error.
    async fn settle(&self, driver: &WebDriver) {
        let started = Instant::now();
        while started.elapsed() < SETTLE_WINDOW {
            let ready = driver
                .execute("return document.readyState;", Vec::new())
                .await
                .ok()
                .and_then(|ret| ret.convert::<String>().ok());
            if ready.as_deref() == Some("complete") {
                return;
            }
            tokio::time::sleep(SETTLE_POLL).await;
        }
        debug!("Settle window lapsed, proceeding with current document");
    }

    /// Read the main document's HTTP status through the performance API.
    async fn http_status(&self, driver: &WebDriver) -> Option<u16> {
        let script = "const e = performance.getEntriesByType('navigation');\
                      return e.length ? (e[0].responseStatus || 0) : 0;";
        let status = driver
            .execute(script, Vec::new())
            .await
            .ok()
            .and_then(|ret| ret.convert::<u64>().ok())
            .unwrap_or(0);
        if status == 0 {
            None
        } else {
            Some(status as u16)
        }
    }
}

#[async_trait]
impl PageSession for WebDriverSession {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<NavigationStatus, BrowserError> {
        let driver = self.driver()?;

        debug!("Navigating to {}", url);
        match tokio::time::timeout(timeout, driver.goto(url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(BrowserError::Navigation(e.to_string())),
            Err(_) => return Err(BrowserError::Timeout(timeout)),
        }

        self.settle(driver).await;
        let http_status = self.http_status(driver).await;

        Ok(NavigationStatus { http_status })
    }

    async fn rendered_html(&self) -> Result<String, BrowserError> {
        let driver = self.driver()?;
        Ok(driver.source().await?)
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.quit().await {
                warn!("Error closing browser session: {}", e);
            }
            debug!("Browser session closed");
        }
        Ok(())
    }
}
