//! LibSQL-backed store implementation
//!
//! One local database file carries jobs, documents, version history and the
//! error log. Document writes go through an upsert keyed on the identity
//! tuple so concurrent jobs touching the same page are serialized per key by
//! the store rather than by engine-side locking.

use crate::store::error::StoreError;
use crate::store::schema;
use crate::store::{
    CrawlErrorRecord, CrawlJob, CrawlStats, Document, DocumentFields, DocumentStore,
    DocumentVersion, ErrorSink, JobStatus, JobStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Row, Value, params};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Database manager for crawl persistence
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database manager over an existing connection
    #[instrument(skip(conn))]
    pub async fn new(conn: Connection) -> Result<Self, StoreError> {
        schema::initialize_schema(&conn).await?;
        Ok(Self { conn })
    }

    /// Create a new database manager from a path
    pub async fn new_from_path(path: &str) -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to connect to database: {}", e)))?;

        Self::new(conn).await
    }

    async fn get_document_by_id(&self, id: Uuid) -> Result<Option<Document>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, tenant_id, app_id, job_id, parent_id, title, content_text,
                        content_html, content_hash, source_url, breadcrumbs, metadata,
                        embedding, created_at, updated_at
                 FROM documents WHERE id = ?",
                params![id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to query document: {}", e)))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(document_from_row(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("Failed to read document row: {}", e))),
        }
    }
}

#[async_trait]
impl JobStore for Database {
    async fn create(&self, job: &CrawlJob) -> Result<(), StoreError> {
        let config = serde_json::to_string(&job.config)?;
        let stats = job.stats.as_ref().map(serde_json::to_string).transpose()?;

        self.conn
            .execute(
                "INSERT INTO crawl_jobs
                 (id, tenant_id, app_id, base_url, config, status, stats, created_at, started_at, finished_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    job.id.to_string(),
                    job.tenant_id.clone(),
                    job.app_id.clone(),
                    job.base_url.clone(),
                    config,
                    job.status.to_string(),
                    stats,
                    job.created_at.to_rfc3339(),
                    job.started_at.map(|t| t.to_rfc3339()),
                    job.finished_at.map(|t| t.to_rfc3339()),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to create job: {}", e)))?;

        debug!("Created crawl job {}", job.id);
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<CrawlJob>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, tenant_id, app_id, base_url, config, status, stats,
                        created_at, started_at, finished_at
                 FROM crawl_jobs WHERE id = ?",
                params![job_id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to query job: {}", e)))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(job_from_row(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("Failed to read job row: {}", e))),
        }
    }

    async fn update_status(
        &self,
        job_id: Uuid,
        status: JobStatus,
        stats: Option<&CrawlStats>,
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let stats_json = stats.map(serde_json::to_string).transpose()?;

        let affected = if status == JobStatus::Running {
            self.conn
                .execute(
                    "UPDATE crawl_jobs
                     SET status = ?, started_at = ?, stats = COALESCE(?, stats)
                     WHERE id = ?",
                    params![status.to_string(), now, stats_json, job_id.to_string()],
                )
                .await
        } else if status.is_terminal() {
            self.conn
                .execute(
                    "UPDATE crawl_jobs
                     SET status = ?, finished_at = ?, stats = COALESCE(?, stats)
                     WHERE id = ?",
                    params![status.to_string(), now, stats_json, job_id.to_string()],
                )
                .await
        } else {
            self.conn
                .execute(
                    "UPDATE crawl_jobs SET status = ?, stats = COALESCE(?, stats) WHERE id = ?",
                    params![status.to_string(), stats_json, job_id.to_string()],
                )
                .await
        }
        .map_err(|e| StoreError::Query(format!("Failed to update job status: {}", e)))?;

        if affected == 0 {
            return Err(StoreError::NotFound(format!("crawl job {}", job_id)));
        }
        Ok(())
    }

    async fn update_stats(&self, job_id: Uuid, stats: &CrawlStats) -> Result<(), StoreError> {
        let stats_json = serde_json::to_string(stats)?;
        self.conn
            .execute(
                "UPDATE crawl_jobs SET stats = ? WHERE id = ?",
                params![stats_json, job_id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to update job stats: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for Database {
    async fn get_by_source_url(
        &self,
        tenant_id: &str,
        app_id: &str,
        source_url: &str,
    ) -> Result<Option<Document>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, tenant_id, app_id, job_id, parent_id, title, content_text,
                        content_html, content_hash, source_url, breadcrumbs, metadata,
                        embedding, created_at, updated_at
                 FROM documents WHERE tenant_id = ? AND app_id = ? AND source_url = ?",
                params![tenant_id, app_id, source_url],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to query document: {}", e)))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(document_from_row(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("Failed to read document row: {}", e))),
        }
    }

    async fn create(&self, fields: DocumentFields) -> Result<Document, StoreError> {
        let doc = Document::from_fields(fields);
        let breadcrumbs = serde_json::to_string(&doc.breadcrumbs)?;
        let metadata = serde_json::to_string(&doc.metadata)?;

        // Upsert on the identity tuple: if another job created this page
        // concurrently, the existing row wins and is refreshed in place.
        self.conn
            .execute(
                "INSERT INTO documents
                 (id, tenant_id, app_id, job_id, parent_id, title, content_text,
                  content_html, content_hash, source_url, breadcrumbs, metadata,
                  created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(tenant_id, app_id, source_url) DO UPDATE SET
                 job_id = excluded.job_id,
                 parent_id = excluded.parent_id,
                 title = excluded.title,
                 content_text = excluded.content_text,
                 content_html = excluded.content_html,
                 content_hash = excluded.content_hash,
                 breadcrumbs = excluded.breadcrumbs,
                 metadata = excluded.metadata,
                 updated_at = excluded.updated_at",
                params![
                    doc.id.to_string(),
                    doc.tenant_id.clone(),
                    doc.app_id.clone(),
                    doc.job_id.to_string(),
                    doc.parent_id.map(|p| p.to_string()),
                    doc.title.clone(),
                    doc.content_text.clone(),
                    doc.content_html.clone(),
                    doc.content_hash.clone(),
                    doc.source_url.clone(),
                    breadcrumbs,
                    metadata,
                    doc.created_at.to_rfc3339(),
                    doc.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to create document: {}", e)))?;

        // Re-read by identity so the caller gets the surviving row.
        self.get_by_source_url(&doc.tenant_id, &doc.app_id, &doc.source_url)
            .await?
            .ok_or_else(|| StoreError::Data("document vanished after upsert".to_string()))
    }

    async fn update(&self, id: Uuid, fields: DocumentFields) -> Result<Document, StoreError> {
        let breadcrumbs = serde_json::to_string(&fields.breadcrumbs)?;
        let metadata = serde_json::to_string(&fields.metadata)?;

        let affected = self
            .conn
            .execute(
                "UPDATE documents SET
                 job_id = ?, parent_id = ?, title = ?, content_text = ?,
                 content_html = ?, content_hash = ?, breadcrumbs = ?, metadata = ?,
                 updated_at = ?
                 WHERE id = ?",
                params![
                    fields.job_id.to_string(),
                    fields.parent_id.map(|p| p.to_string()),
                    fields.title,
                    fields.content_text,
                    fields.content_html,
                    fields.content_hash,
                    breadcrumbs,
                    metadata,
                    Utc::now().to_rfc3339(),
                    id.to_string(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to update document: {}", e)))?;

        if affected == 0 {
            return Err(StoreError::NotFound(format!("document {}", id)));
        }

        self.get_document_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("document {}", id)))
    }

    async fn append_version(
        &self,
        document_id: Uuid,
        prior_html: &str,
        prior_hash: &str,
        note: &str,
    ) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO document_versions
                 (id, document_id, content_html, content_hash, note, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    Uuid::new_v4().to_string(),
                    document_id.to_string(),
                    prior_html,
                    prior_hash,
                    note,
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to append version: {}", e)))?;
        Ok(())
    }

    async fn update_embedding(&self, id: Uuid, embedding: &[f32]) -> Result<(), StoreError> {
        let affected = self
            .conn
            .execute(
                "UPDATE documents SET embedding = ? WHERE id = ?",
                params![embedding_to_blob(embedding), id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to update embedding: {}", e)))?;

        if affected == 0 {
            return Err(StoreError::NotFound(format!("document {}", id)));
        }
        Ok(())
    }

    async fn versions(&self, document_id: Uuid) -> Result<Vec<DocumentVersion>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, document_id, content_html, content_hash, note, created_at
                 FROM document_versions WHERE document_id = ? ORDER BY created_at ASC",
                params![document_id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to query versions: {}", e)))?;

        let mut versions = Vec::new();
        loop {
            match rows.next().await {
                Ok(Some(row)) => versions.push(DocumentVersion {
                    id: parse_uuid(&row.get::<String>(0).map_err(row_err)?)?,
                    document_id: parse_uuid(&row.get::<String>(1).map_err(row_err)?)?,
                    content_html: row.get::<String>(2).map_err(row_err)?,
                    content_hash: row.get::<String>(3).map_err(row_err)?,
                    note: row.get::<String>(4).map_err(row_err)?,
                    created_at: parse_timestamp(&row.get::<String>(5).map_err(row_err)?)?,
                }),
                Ok(None) => break,
                Err(e) => return Err(StoreError::Query(format!("Failed to read version row: {}", e))),
            }
        }
        Ok(versions)
    }
}

#[async_trait]
impl ErrorSink for Database {
    async fn append(
        &self,
        job_id: Uuid,
        url: &str,
        error_code: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO crawl_errors (job_id, url, error_code, error_message, created_at)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    job_id.to_string(),
                    url,
                    error_code,
                    message,
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to append crawl error: {}", e)))?;
        Ok(())
    }

    async fn list(&self, job_id: Uuid) -> Result<Vec<CrawlErrorRecord>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT job_id, url, error_code, error_message, created_at
                 FROM crawl_errors WHERE job_id = ? ORDER BY id ASC",
                params![job_id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to query crawl errors: {}", e)))?;

        let mut records = Vec::new();
        loop {
            match rows.next().await {
                Ok(Some(row)) => records.push(CrawlErrorRecord {
                    job_id: parse_uuid(&row.get::<String>(0).map_err(row_err)?)?,
                    url: row.get::<String>(1).map_err(row_err)?,
                    error_code: row.get::<String>(2).map_err(row_err)?,
                    error_message: row.get::<String>(3).map_err(row_err)?,
                    created_at: parse_timestamp(&row.get::<String>(4).map_err(row_err)?)?,
                }),
                Ok(None) => break,
                Err(e) => return Err(StoreError::Query(format!("Failed to read error row: {}", e))),
            }
        }
        Ok(records)
    }
}

fn row_err(e: libsql::Error) -> StoreError {
    StoreError::Data(format!("Failed to read column: {}", e))
}

fn parse_uuid(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Data(format!("Invalid uuid '{}': {}", raw, e)))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Data(format!("Invalid timestamp '{}': {}", raw, e)))
}

fn opt_text(row: &Row, idx: i32) -> Result<Option<String>, StoreError> {
    match row.get_value(idx).map_err(row_err)? {
        Value::Null => Ok(None),
        Value::Text(s) => Ok(Some(s)),
        other => Err(StoreError::Data(format!(
            "Expected text or null at column {}, got {:?}",
            idx, other
        ))),
    }
}

fn opt_blob(row: &Row, idx: i32) -> Result<Option<Vec<u8>>, StoreError> {
    match row.get_value(idx).map_err(row_err)? {
        Value::Null => Ok(None),
        Value::Blob(b) => Ok(Some(b)),
        other => Err(StoreError::Data(format!(
            "Expected blob or null at column {}, got {:?}",
            idx, other
        ))),
    }
}

/// Serialize an embedding as little-endian f32 bytes.
fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize an embedding from little-endian f32 bytes.
fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    let mut values = Vec::with_capacity(blob.len() / 4);
    for chunk in blob.chunks_exact(4) {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(chunk);
        values.push(f32::from_le_bytes(bytes));
    }
    values
}

fn job_from_row(row: &Row) -> Result<CrawlJob, StoreError> {
    let config_json = row.get::<String>(4).map_err(row_err)?;
    let stats_json = opt_text(row, 6)?;

    Ok(CrawlJob {
        id: parse_uuid(&row.get::<String>(0).map_err(row_err)?)?,
        tenant_id: row.get::<String>(1).map_err(row_err)?,
        app_id: row.get::<String>(2).map_err(row_err)?,
        base_url: row.get::<String>(3).map_err(row_err)?,
        config: serde_json::from_str(&config_json)?,
        status: row.get::<String>(5).map_err(row_err)?.parse()?,
        stats: stats_json.map(|s| serde_json::from_str(&s)).transpose()?,
        created_at: parse_timestamp(&row.get::<String>(7).map_err(row_err)?)?,
        started_at: opt_text(row, 8)?.map(|t| parse_timestamp(&t)).transpose()?,
        finished_at: opt_text(row, 9)?.map(|t| parse_timestamp(&t)).transpose()?,
    })
}

fn document_from_row(row: &Row) -> Result<Document, StoreError> {
    let breadcrumbs_json = row.get::<String>(10).map_err(row_err)?;
    let metadata_json = row.get::<String>(11).map_err(row_err)?;

    Ok(Document {
        id: parse_uuid(&row.get::<String>(0).map_err(row_err)?)?,
        tenant_id: row.get::<String>(1).map_err(row_err)?,
        app_id: row.get::<String>(2).map_err(row_err)?,
        job_id: parse_uuid(&row.get::<String>(3).map_err(row_err)?)?,
        parent_id: opt_text(row, 4)?.map(|p| parse_uuid(&p)).transpose()?,
        title: row.get::<String>(5).map_err(row_err)?,
        content_text: row.get::<String>(6).map_err(row_err)?,
        content_html: row.get::<String>(7).map_err(row_err)?,
        content_hash: row.get::<String>(8).map_err(row_err)?,
        source_url: row.get::<String>(9).map_err(row_err)?,
        breadcrumbs: serde_json::from_str(&breadcrumbs_json)?,
        metadata: serde_json::from_str(&metadata_json)?,
        embedding: opt_blob(row, 12)?.map(|b| blob_to_embedding(&b)),
        created_at: parse_timestamp(&row.get::<String>(13).map_err(row_err)?)?,
        updated_at: parse_timestamp(&row.get::<String>(14).map_err(row_err)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlConfig;
    use crate::extract::PageMetadata;

    async fn test_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::new_from_path(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn sample_fields(job_id: Uuid, url: &str) -> DocumentFields {
        DocumentFields {
            tenant_id: "t1".to_string(),
            app_id: "a1".to_string(),
            job_id,
            parent_id: None,
            title: "Setup".to_string(),
            content_text: "Install the thing.".to_string(),
            content_html: "<main>Install the thing.</main>".to_string(),
            content_hash: "hash-1".to_string(),
            source_url: url.to_string(),
            breadcrumbs: Vec::new(),
            metadata: PageMetadata::default(),
        }
    }

    #[tokio::test]
    async fn test_job_round_trip() {
        let (db, _dir) = test_db().await;
        let job = CrawlJob::new("t1", "a1", "https://docs.example.com", CrawlConfig::default());
        JobStore::create(&db, &job).await.unwrap();

        let loaded = db.get(job.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, job.id);
        assert_eq!(loaded.status, JobStatus::Pending);
        assert_eq!(loaded.base_url, "https://docs.example.com");
        assert_eq!(loaded.config.max_pages, job.config.max_pages);
    }

    #[tokio::test]
    async fn test_status_transitions_stamp_timestamps() {
        let (db, _dir) = test_db().await;
        let job = CrawlJob::new("t1", "a1", "https://docs.example.com", CrawlConfig::default());
        JobStore::create(&db, &job).await.unwrap();

        db.update_status(job.id, JobStatus::Running, None).await.unwrap();
        let running = db.get(job.id).await.unwrap().unwrap();
        assert_eq!(running.status, JobStatus::Running);
        assert!(running.started_at.is_some());
        assert!(running.finished_at.is_none());

        let stats = CrawlStats {
            pages_crawled: 4,
            ..Default::default()
        };
        db.update_status(job.id, JobStatus::Completed, Some(&stats))
            .await
            .unwrap();
        let done = db.get(job.id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert!(done.finished_at.is_some());
        assert_eq!(done.stats.unwrap().pages_crawled, 4);
    }

    #[tokio::test]
    async fn test_update_stats_preserves_status() {
        let (db, _dir) = test_db().await;
        let job = CrawlJob::new("t1", "a1", "https://docs.example.com", CrawlConfig::default());
        JobStore::create(&db, &job).await.unwrap();
        db.update_status(job.id, JobStatus::Running, None).await.unwrap();

        let stats = CrawlStats {
            pages_crawled: 2,
            urls_visited: 3,
            ..Default::default()
        };
        db.update_stats(job.id, &stats).await.unwrap();

        let loaded = db.get(job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Running);
        assert_eq!(loaded.stats.unwrap().urls_visited, 3);
    }

    #[tokio::test]
    async fn test_document_create_and_identity_lookup() {
        let (db, _dir) = test_db().await;
        let job_id = Uuid::new_v4();
        let doc = DocumentStore::create(&db, sample_fields(job_id, "https://docs.example.com/setup"))
            .await
            .unwrap();

        let found = db
            .get_by_source_url("t1", "a1", "https://docs.example.com/setup")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, doc.id);
        assert_eq!(found.content_hash, "hash-1");
        assert!(found.embedding.is_none());

        let missing = db
            .get_by_source_url("t1", "a1", "https://docs.example.com/other")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_document_upsert_keeps_single_row() {
        let (db, _dir) = test_db().await;
        let job_id = Uuid::new_v4();
        let url = "https://docs.example.com/setup";

        let first = DocumentStore::create(&db, sample_fields(job_id, url)).await.unwrap();

        let mut second_fields = sample_fields(job_id, url);
        second_fields.content_hash = "hash-2".to_string();
        let second = DocumentStore::create(&db, second_fields).await.unwrap();

        // The conflicting insert refreshes the existing row.
        assert_eq!(second.id, first.id);
        assert_eq!(second.content_hash, "hash-2");
    }

    #[tokio::test]
    async fn test_document_update_and_versions() {
        let (db, _dir) = test_db().await;
        let job_id = Uuid::new_v4();
        let doc = DocumentStore::create(&db, sample_fields(job_id, "https://docs.example.com/setup"))
            .await
            .unwrap();

        db.append_version(doc.id, &doc.content_html, &doc.content_hash, "Updated")
            .await
            .unwrap();

        let mut fields = sample_fields(job_id, "https://docs.example.com/setup");
        fields.title = "Setup v2".to_string();
        fields.content_hash = "hash-2".to_string();
        let updated = db.update(doc.id, fields).await.unwrap();
        assert_eq!(updated.title, "Setup v2");
        assert_eq!(updated.content_hash, "hash-2");

        let versions = db.versions(doc.id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].content_hash, "hash-1");
    }

    #[tokio::test]
    async fn test_embedding_blob_round_trip() {
        let (db, _dir) = test_db().await;
        let job_id = Uuid::new_v4();
        let doc = DocumentStore::create(&db, sample_fields(job_id, "https://docs.example.com/setup"))
            .await
            .unwrap();

        let vector = vec![0.1_f32, -0.5, 0.75];
        db.update_embedding(doc.id, &vector).await.unwrap();

        let loaded = db
            .get_by_source_url("t1", "a1", "https://docs.example.com/setup")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.embedding.unwrap(), vector);
    }

    #[tokio::test]
    async fn test_error_sink() {
        let (db, _dir) = test_db().await;
        let job_id = Uuid::new_v4();

        db.append(job_id, "https://docs.example.com/bad", "404", "HTTP 404")
            .await
            .unwrap();
        db.append(job_id, "https://docs.example.com/worse", "MAX_RETRIES_EXCEEDED", "timeout")
            .await
            .unwrap();

        let errors = db.list(job_id).await.unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].error_code, "404");
        assert_eq!(errors[1].error_code, "MAX_RETRIES_EXCEEDED");

        let other = db.list(Uuid::new_v4()).await.unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn test_blob_conversion() {
        let original = vec![1.0_f32, 2.5, -3.25];
        let blob = embedding_to_blob(&original);
        assert_eq!(blob.len(), 12);
        assert_eq!(blob_to_embedding(&blob), original);
    }
}
