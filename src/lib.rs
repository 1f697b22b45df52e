//! # docrawl - Documentation Site Crawler
//!
//! This crate crawls documentation websites through a headless browser,
//! extracts structured content, tracks content changes across revisits,
//! reconstructs page hierarchy from breadcrumb trails, and produces vector
//! embeddings for semantic search.
//!
//! ## Key Components
//!
//! - [`engine::CrawlEngine`]: the frontier/scheduler that drives a crawl run
//! - [`extract`]: pure, fallback-driven content extraction from rendered HTML
//! - [`fetch`]: navigation with bounded retries and increasing backoff
//! - [`embedding`]: text-to-vector pipeline with truncation and normalization
//! - [`store`]: typed job/document persistence behind injectable traits
//! - [`browser`]: narrow interface over a headless WebDriver session
//!
//! ## Design
//!
//! One crawl job runs as a single sequential pipeline per browser session:
//! each page is fetched and fully processed before the next is dequeued.
//! Per-page failures are recorded and never abort the run; cancellation is
//! cooperative and observed at a fixed page cadence. All external
//! collaborators (store, embedder, browser) are constructor-injected trait
//! handles so the engine can be exercised against fakes.

mod error;

pub mod browser;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod extract;
pub mod fetch;
pub mod store;

pub use config::CrawlConfig;
pub use engine::CrawlEngine;
pub use error::Error;

/// Re-export of common types for public use
pub mod prelude {
    pub use crate::config::CrawlConfig;
    pub use crate::engine::{CrawlEngine, CrawlSummary};
    pub use crate::error::{Error, Result};
    pub use crate::store::{CrawlJob, CrawlStats, Document, JobStatus};
}
