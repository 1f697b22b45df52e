//! # Crawl Engine Module
//!
//! Orchestrates one crawl run end to end: drives a breadth-first frontier
//! through a headless browser session, extracts structured content from each
//! rendered page, reconciles documents against the store with change
//! detection, and keeps the job record's status and stats current.
//!
//! ## Run Lifecycle
//!
//! 1. Transition the job to `running` and open a browser session
//! 2. Process the frontier breadth-first within the depth, page-count and
//!    wall-clock budgets
//! 3. Record page-level failures in the error log and keep going
//! 4. Every tenth URL, flush a stats snapshot and poll for external
//!    cancellation
//! 5. Close the session and classify the terminal status
//!
//! A run that processed zero pages while recording at least one error is
//! classified `failed`; anything that made progress completes normally even
//! if some pages failed.

mod reconcile;

use crate::browser::{BrowserEngine, PageSession};
use crate::config::CrawlConfig;
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::extract::PageExtraction;
use crate::fetch::{RetryPolicy, fetch_page};
use crate::store::{CrawlJob, CrawlStats, DocumentStore, ErrorSink, JobStatus, JobStore};
use reconcile::{reconcile_document, resolve_parent};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

/// URLs between stats flushes and cancellation polls
const PROGRESS_INTERVAL: u32 = 10;

/// Terminal outcome of a crawl run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    /// Status the job ended in
    pub status: JobStatus,

    /// Final stats snapshot
    pub stats: CrawlStats,
}

/// Executes one crawl job against injected collaborators
pub struct CrawlEngine {
    tenant_id: String,
    app_id: String,
    job_id: Uuid,
    base_url: Url,
    allowed_host: String,
    config: CrawlConfig,
    retry: RetryPolicy,
    jobs: Arc<dyn JobStore>,
    documents: Arc<dyn DocumentStore>,
    errors: Arc<dyn ErrorSink>,
    embedder: Arc<dyn Embedder>,
    browser: Arc<dyn BrowserEngine>,
}

impl CrawlEngine {
    /// Build an engine for a persisted job.
    ///
    /// Fails if the job's base URL does not parse or has no host.
    pub fn new(
        job: &CrawlJob,
        jobs: Arc<dyn JobStore>,
        documents: Arc<dyn DocumentStore>,
        errors: Arc<dyn ErrorSink>,
        embedder: Arc<dyn Embedder>,
        browser: Arc<dyn BrowserEngine>,
    ) -> Result<Self> {
        let base_url = Url::parse(&job.base_url)?;
        let allowed_host = base_url
            .host_str()
            .ok_or_else(|| Error::InvalidRequest(format!("base URL has no host: {}", job.base_url)))?
            .to_string();

        Ok(Self {
            tenant_id: job.tenant_id.clone(),
            app_id: job.app_id.clone(),
            job_id: job.id,
            base_url,
            allowed_host,
            config: job.config.clone(),
            retry: RetryPolicy::default(),
            jobs,
            documents,
            errors,
            embedder,
            browser,
        })
    }

    /// Override the per-URL retry schedule.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run the crawl to completion and return its terminal outcome.
    ///
    /// The job record is left in a terminal status in every case, including
    /// when an unexpected error escapes the crawl loop.
    pub async fn run(&self) -> Result<CrawlSummary> {
        info!(
            "Starting crawl job {} for {} (tenant={}, app={})",
            self.job_id, self.base_url, self.tenant_id, self.app_id
        );
        self.jobs
            .update_status(self.job_id, JobStatus::Running, None)
            .await?;

        let mut stats = CrawlStats::default();

        let mut session = match self.browser.open_session(&self.config.user_agent).await {
            Ok(session) => session,
            Err(e) => {
                let err = Error::Browser(e.to_string());
                error!("Crawl job {} could not open a session: {}", self.job_id, err);
                stats.last_error = Some(err.to_string());
                let _ = self
                    .jobs
                    .update_status(self.job_id, JobStatus::Failed, Some(&stats))
                    .await;
                return Err(err);
            }
        };

        let outcome = self.crawl_loop(session.as_ref(), &mut stats).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }

        match outcome {
            Ok(status) => {
                self.jobs
                    .update_status(self.job_id, status, Some(&stats))
                    .await?;
                info!(
                    "Crawl job {} finished: {} ({} pages, {} errors)",
                    self.job_id, status, stats.pages_crawled, stats.errors_count
                );
                Ok(CrawlSummary { status, stats })
            }
            Err(e) => {
                error!("Crawl job {} aborted: {}", self.job_id, e);
                stats.last_error = Some(e.to_string());
                let _ = self
                    .jobs
                    .update_status(self.job_id, JobStatus::Failed, Some(&stats))
                    .await;
                Err(e)
            }
        }
    }

    async fn crawl_loop(
        &self,
        session: &dyn PageSession,
        stats: &mut CrawlStats,
    ) -> Result<JobStatus> {
        let started = Instant::now();
        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<(String, u32)> = VecDeque::new();
        let mut url_to_doc_id: HashMap<String, Uuid> = HashMap::new();

        frontier.push_back((normalize_url(self.base_url.clone()), 0));

        let mut timed_out = false;
        let mut cancelled = false;

        while let Some((url, depth)) = frontier.pop_front() {
            if stats.pages_crawled >= self.config.max_pages {
                info!("Page budget reached ({}), stopping", self.config.max_pages);
                break;
            }
            if started.elapsed() >= self.config.max_runtime() {
                warn!(
                    "Wall-clock budget exceeded after {:?}, stopping",
                    started.elapsed()
                );
                timed_out = true;
                break;
            }
            if !visited.insert(url.clone()) {
                continue;
            }

            stats.urls_visited += 1;
            stats.current_url = Some(url.clone());

            match fetch_page(session, &url, self.config.timeout(), &self.retry).await {
                Ok(html) => {
                    let page_url = Url::parse(&url)?;
                    let extraction =
                        PageExtraction::from_html(&html, &page_url, &self.allowed_host);
                    let parent_id = resolve_parent(&extraction.breadcrumbs, &url_to_doc_id);

                    let doc_id = reconcile_document(
                        self.documents.as_ref(),
                        self.embedder.as_ref(),
                        &self.tenant_id,
                        &self.app_id,
                        self.job_id,
                        parent_id,
                        &url,
                        &extraction,
                    )
                    .await?;
                    url_to_doc_id.insert(url.clone(), doc_id);
                    stats.pages_crawled += 1;

                    if depth < self.config.max_depth {
                        for link in &extraction.links {
                            if !visited.contains(link) {
                                frontier.push_back((link.clone(), depth + 1));
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("Failed to fetch {}: {}", url, e);
                    stats.errors_count += 1;
                    self.errors
                        .append(self.job_id, &url, &e.code(), &e.to_string())
                        .await?;
                }
            }

            stats.elapsed_secs = started.elapsed().as_secs();

            if stats.urls_visited % PROGRESS_INTERVAL == 0 {
                self.jobs.update_stats(self.job_id, stats).await?;
                if let Some(job) = self.jobs.get(self.job_id).await? {
                    if job.status == JobStatus::Cancelled {
                        info!("Crawl job {} cancelled externally", self.job_id);
                        cancelled = true;
                        break;
                    }
                }
            }

            tokio::time::sleep(self.config.delay()).await;
        }

        stats.current_url = None;
        stats.elapsed_secs = started.elapsed().as_secs();

        let status = if cancelled {
            JobStatus::Cancelled
        } else if timed_out {
            stats.timeout = true;
            JobStatus::Timeout
        } else if stats.pages_crawled == 0 && stats.errors_count > 0 {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };

        Ok(status)
    }
}

fn normalize_url(mut url: Url) -> String {
    url.set_fragment(None);
    url.set_query(None);
    url.to_string()
}
