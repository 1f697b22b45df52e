//! # Store Module
//!
//! Typed persistence model for crawl jobs, documents, version history and
//! page-level error records, behind injectable trait interfaces. The crawl
//! engine only ever talks to [`JobStore`], [`DocumentStore`] and
//! [`ErrorSink`]; production uses the libsql-backed [`Database`], tests use
//! the in-memory [`MemoryStore`].
//!
//! Document identity is the `(tenant_id, app_id, source_url)` tuple: a
//! re-crawl of the same URL updates the same document rather than creating a
//! duplicate, and conflicting writes to one key are serialized by the
//! store's per-key upsert.

mod database;
pub mod error;
mod memory;
mod schema;

pub use database::Database;
pub use error::StoreError;
pub use memory::MemoryStore;

use crate::config::CrawlConfig;
use crate::extract::{Breadcrumb, PageMetadata};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle state of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, not yet picked up by the engine
    Pending,
    /// Engine is processing the frontier
    Running,
    /// Run finished with at least one processed page
    Completed,
    /// Run produced nothing useful or aborted
    Failed,
    /// Externally cancelled, observed at the polling cadence
    Cancelled,
    /// Wall-clock budget exceeded
    Timeout,
}

impl JobStatus {
    /// Whether this status ends the job lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled | JobStatus::Timeout
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

impl FromStr for JobStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            "timeout" => Ok(JobStatus::Timeout),
            other => Err(StoreError::Data(format!("unknown job status: {}", other))),
        }
    }
}

/// Running counters for one crawl run, periodically flushed to the job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlStats {
    /// Pages successfully processed
    pub pages_crawled: u32,

    /// Page-level failures recorded
    pub errors_count: u32,

    /// URLs dequeued in this run
    pub urls_visited: u32,

    /// Elapsed wall-clock time in seconds
    pub elapsed_secs: u64,

    /// URL being processed when the snapshot was taken
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_url: Option<String>,

    /// Set when the run ended by exceeding its wall-clock budget
    #[serde(default)]
    pub timeout: bool,

    /// Text of the error that aborted the run, when it ended fatally
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// One crawl run over a documentation site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlJob {
    /// Job id
    pub id: Uuid,

    /// Owning tenant
    pub tenant_id: String,

    /// Owning application
    pub app_id: String,

    /// Root URL of the crawl
    pub base_url: String,

    /// Crawl parameters
    pub config: CrawlConfig,

    /// Current lifecycle state
    pub status: JobStatus,

    /// Last persisted stats snapshot
    pub stats: Option<CrawlStats>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Stamped when the engine transitions the job to running
    pub started_at: Option<DateTime<Utc>>,

    /// Stamped on any terminal transition
    pub finished_at: Option<DateTime<Utc>>,
}

impl CrawlJob {
    /// Create a new pending job.
    pub fn new(
        tenant_id: impl Into<String>,
        app_id: impl Into<String>,
        base_url: impl Into<String>,
        config: CrawlConfig,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            app_id: app_id.into(),
            base_url: base_url.into(),
            config,
            status: JobStatus::Pending,
            stats: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }
}

/// Content fields written on document create/update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFields {
    /// Owning tenant
    pub tenant_id: String,

    /// Owning application
    pub app_id: String,

    /// Last job that touched this document
    pub job_id: Uuid,

    /// Logical parent resolved from breadcrumbs, if any
    pub parent_id: Option<Uuid>,

    /// Page title
    pub title: String,

    /// Flattened content text
    pub content_text: String,

    /// Cleaned content markup
    pub content_html: String,

    /// Digest of the cleaned markup
    pub content_hash: String,

    /// Canonical source URL
    pub source_url: String,

    /// Breadcrumb trail at extraction time
    pub breadcrumbs: Vec<Breadcrumb>,

    /// Scraped page metadata
    pub metadata: PageMetadata,
}

/// Persisted logical page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Document id
    pub id: Uuid,

    /// Owning tenant
    pub tenant_id: String,

    /// Owning application
    pub app_id: String,

    /// Last job that touched this document
    pub job_id: Uuid,

    /// Logical parent, if resolved
    pub parent_id: Option<Uuid>,

    /// Page title
    pub title: String,

    /// Flattened content text
    pub content_text: String,

    /// Cleaned content markup
    pub content_html: String,

    /// Digest of the currently stored markup
    pub content_hash: String,

    /// Canonical source URL
    pub source_url: String,

    /// Breadcrumb trail
    pub breadcrumbs: Vec<Breadcrumb>,

    /// Scraped page metadata
    pub metadata: PageMetadata,

    /// Embedding computed from the content text at the stored hash, if any
    pub embedding: Option<Vec<f32>>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Build a fresh document from its content fields.
    pub fn from_fields(fields: DocumentFields) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: fields.tenant_id,
            app_id: fields.app_id,
            job_id: fields.job_id,
            parent_id: fields.parent_id,
            title: fields.title,
            content_text: fields.content_text,
            content_html: fields.content_html,
            content_hash: fields.content_hash,
            source_url: fields.source_url,
            breadcrumbs: fields.breadcrumbs,
            metadata: fields.metadata,
            embedding: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply content fields in place, refreshing the update timestamp.
    pub fn apply_fields(&mut self, fields: DocumentFields) {
        self.job_id = fields.job_id;
        self.parent_id = fields.parent_id;
        self.title = fields.title;
        self.content_text = fields.content_text;
        self.content_html = fields.content_html;
        self.content_hash = fields.content_hash;
        self.breadcrumbs = fields.breadcrumbs;
        self.metadata = fields.metadata;
        self.updated_at = Utc::now();
    }
}

/// Immutable snapshot of a document's prior content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentVersion {
    /// Version id
    pub id: Uuid,

    /// Document this version belongs to
    pub document_id: Uuid,

    /// Markup before the change
    pub content_html: String,

    /// Hash before the change
    pub content_hash: String,

    /// Human-readable change note
    pub note: String,

    /// Snapshot timestamp
    pub created_at: DateTime<Utc>,
}

/// One page-level failure within a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlErrorRecord {
    /// Job the failure belongs to
    pub job_id: Uuid,

    /// URL that failed
    pub url: String,

    /// Classified error code
    pub error_code: String,

    /// Failure detail
    pub error_message: String,

    /// Record timestamp
    pub created_at: DateTime<Utc>,
}

/// Persistence for crawl jobs
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new job record.
    async fn create(&self, job: &CrawlJob) -> Result<(), StoreError>;

    /// Fetch a job by id.
    async fn get(&self, job_id: Uuid) -> Result<Option<CrawlJob>, StoreError>;

    /// Transition a job's status, optionally attaching a stats snapshot.
    ///
    /// Setting `running` stamps `started_at`; any terminal status stamps
    /// `finished_at`.
    async fn update_status(
        &self,
        job_id: Uuid,
        status: JobStatus,
        stats: Option<&CrawlStats>,
    ) -> Result<(), StoreError>;

    /// Flush a progress snapshot without touching status or timestamps.
    async fn update_stats(&self, job_id: Uuid, stats: &CrawlStats) -> Result<(), StoreError>;
}

/// Persistence for documents and their version history
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Look up a document by its identity tuple.
    async fn get_by_source_url(
        &self,
        tenant_id: &str,
        app_id: &str,
        source_url: &str,
    ) -> Result<Option<Document>, StoreError>;

    /// Create a new document.
    async fn create(&self, fields: DocumentFields) -> Result<Document, StoreError>;

    /// Update an existing document's content fields in place.
    async fn update(&self, id: Uuid, fields: DocumentFields) -> Result<Document, StoreError>;

    /// Append an immutable version snapshot of prior content.
    async fn append_version(
        &self,
        document_id: Uuid,
        prior_html: &str,
        prior_hash: &str,
        note: &str,
    ) -> Result<(), StoreError>;

    /// Store a freshly computed embedding for a document.
    async fn update_embedding(&self, id: Uuid, embedding: &[f32]) -> Result<(), StoreError>;

    /// List version snapshots for a document, oldest first.
    async fn versions(&self, document_id: Uuid) -> Result<Vec<DocumentVersion>, StoreError>;
}

/// Append-only sink for page-level failures
#[async_trait]
pub trait ErrorSink: Send + Sync {
    /// Record one page-level failure.
    async fn append(
        &self,
        job_id: Uuid,
        url: &str,
        error_code: &str,
        message: &str,
    ) -> Result<(), StoreError>;

    /// List failures recorded for a job.
    async fn list(&self, job_id: Uuid) -> Result<Vec<CrawlErrorRecord>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_round_trip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
            JobStatus::Timeout,
        ] {
            let parsed: JobStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("bogus".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(JobStatus::Timeout.is_terminal());
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = CrawlJob::new("t1", "a1", "https://docs.example.com", CrawlConfig::default());
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.started_at.is_none());
        assert!(job.finished_at.is_none());
        assert!(job.stats.is_none());
    }

    #[test]
    fn test_document_apply_fields_keeps_identity() {
        let fields = DocumentFields {
            tenant_id: "t1".to_string(),
            app_id: "a1".to_string(),
            job_id: Uuid::new_v4(),
            parent_id: None,
            title: "Setup".to_string(),
            content_text: "text".to_string(),
            content_html: "<main>text</main>".to_string(),
            content_hash: "abc".to_string(),
            source_url: "https://docs.example.com/setup".to_string(),
            breadcrumbs: Vec::new(),
            metadata: PageMetadata::default(),
        };
        let mut doc = Document::from_fields(fields.clone());
        let original_id = doc.id;
        let created = doc.created_at;

        let mut changed = fields;
        changed.title = "Setup v2".to_string();
        changed.content_hash = "def".to_string();
        doc.apply_fields(changed);

        assert_eq!(doc.id, original_id);
        assert_eq!(doc.created_at, created);
        assert_eq!(doc.title, "Setup v2");
        assert_eq!(doc.content_hash, "def");
    }
}
