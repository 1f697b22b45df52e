//! # Crawl Configuration Module
//!
//! This module provides configuration options for a crawl job, including
//! controls for crawl depth, page budget, politeness delay, per-page timeout
//! and wall-clock runtime. It uses a builder pattern for flexible
//! configuration.
//!
//! ## Key Components
//!
//! - `CrawlConfig`: The main configuration struct with crawl parameters
//! - `CrawlConfigBuilder`: Builder pattern implementation for easier configuration
//!
//! ## Features
//!
//! - Default configurations suitable for polite crawling
//! - Fine-grained control over crawl behavior (depth, pages, delays, budgets)
//! - User-agent customization
//! - Serializable so it can be persisted with the job record

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a crawl job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Maximum depth to crawl from the base URL
    pub max_depth: u32,

    /// Maximum number of pages to process
    pub max_pages: u32,

    /// Delay in milliseconds between consecutive page requests
    pub delay_ms: u64,

    /// Per-navigation timeout in milliseconds
    pub timeout_ms: u64,

    /// Wall-clock budget for the whole run, in seconds
    pub max_runtime_secs: u64,

    /// User agent presented by the browser session
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 100,
            delay_ms: 1000,
            timeout_ms: 30_000,
            max_runtime_secs: 3600,
            user_agent: format!("docrawl/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for CrawlConfig
#[derive(Debug, Default)]
pub struct CrawlConfigBuilder {
    config: CrawlConfig,
}

impl CrawlConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlConfig::default(),
        }
    }

    /// Set the maximum depth to crawl
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Set the maximum number of pages to process
    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Set the delay in milliseconds between requests
    pub fn delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.delay_ms = delay_ms;
        self
    }

    /// Set the per-navigation timeout in milliseconds
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.timeout_ms = timeout_ms;
        self
    }

    /// Set the wall-clock budget for the run, in seconds
    pub fn max_runtime_secs(mut self, max_runtime_secs: u64) -> Self {
        self.config.max_runtime_secs = max_runtime_secs;
        self
    }

    /// Set the user agent presented by the browser session
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlConfig {
        self.config
    }
}

impl CrawlConfig {
    /// Create a new builder
    pub fn builder() -> CrawlConfigBuilder {
        CrawlConfigBuilder::new()
    }

    /// Get the politeness delay as a Duration
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Get the per-navigation timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get the wall-clock budget as a Duration
    pub fn max_runtime(&self) -> Duration {
        Duration::from_secs(self.max_runtime_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CrawlConfig::default();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.max_pages, 100);
        assert_eq!(config.delay_ms, 1000);
        assert!(config.user_agent.starts_with("docrawl/"));
    }

    #[test]
    fn test_builder() {
        let config = CrawlConfig::builder()
            .max_depth(5)
            .max_pages(10)
            .delay_ms(50)
            .timeout_ms(5000)
            .max_runtime_secs(60)
            .user_agent("test-agent/1.0")
            .build();

        assert_eq!(config.max_depth, 5);
        assert_eq!(config.max_pages, 10);
        assert_eq!(config.delay(), Duration::from_millis(50));
        assert_eq!(config.timeout(), Duration::from_millis(5000));
        assert_eq!(config.max_runtime(), Duration::from_secs(60));
        assert_eq!(config.user_agent, "test-agent/1.0");
    }
}
