//! In-memory store used by engine tests
//!
//! Mirrors the libsql-backed store's observable behavior, including the
//! identity upsert on document create and timestamp stamping on status
//! transitions. Lock scopes stay synchronous so the store is safe to share
//! across tasks.

use crate::store::{
    CrawlErrorRecord, CrawlJob, CrawlStats, Document, DocumentFields, DocumentStore,
    DocumentVersion, ErrorSink, JobStatus, JobStore, StoreError,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Thread-safe in-memory implementation of all three store traits
#[derive(Default)]
pub struct MemoryStore {
    jobs: Mutex<HashMap<Uuid, CrawlJob>>,
    documents: Mutex<HashMap<Uuid, Document>>,
    versions: Mutex<Vec<DocumentVersion>>,
    errors: Mutex<Vec<CrawlErrorRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored.
    pub fn document_count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create(&self, job: &CrawlJob) -> Result<(), StoreError> {
        self.jobs.lock().unwrap().insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<CrawlJob>, StoreError> {
        Ok(self.jobs.lock().unwrap().get(&job_id).cloned())
    }

    async fn update_status(
        &self,
        job_id: Uuid,
        status: JobStatus,
        stats: Option<&CrawlStats>,
    ) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| StoreError::NotFound(format!("crawl job {}", job_id)))?;

        job.status = status;
        if status == JobStatus::Running {
            job.started_at = Some(Utc::now());
        }
        if status.is_terminal() {
            job.finished_at = Some(Utc::now());
        }
        if let Some(stats) = stats {
            job.stats = Some(stats.clone());
        }
        Ok(())
    }

    async fn update_stats(&self, job_id: Uuid, stats: &CrawlStats) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| StoreError::NotFound(format!("crawl job {}", job_id)))?;
        job.stats = Some(stats.clone());
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_by_source_url(
        &self,
        tenant_id: &str,
        app_id: &str,
        source_url: &str,
    ) -> Result<Option<Document>, StoreError> {
        let documents = self.documents.lock().unwrap();
        Ok(documents
            .values()
            .find(|d| {
                d.tenant_id == tenant_id && d.app_id == app_id && d.source_url == source_url
            })
            .cloned())
    }

    async fn create(&self, fields: DocumentFields) -> Result<Document, StoreError> {
        let mut documents = self.documents.lock().unwrap();

        // Same identity upsert the database performs.
        let existing = documents
            .values()
            .find(|d| {
                d.tenant_id == fields.tenant_id
                    && d.app_id == fields.app_id
                    && d.source_url == fields.source_url
            })
            .map(|d| d.id);

        if let Some(id) = existing {
            let doc = documents.get_mut(&id).unwrap();
            doc.apply_fields(fields);
            return Ok(doc.clone());
        }

        let doc = Document::from_fields(fields);
        documents.insert(doc.id, doc.clone());
        Ok(doc)
    }

    async fn update(&self, id: Uuid, fields: DocumentFields) -> Result<Document, StoreError> {
        let mut documents = self.documents.lock().unwrap();
        let doc = documents
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("document {}", id)))?;
        doc.apply_fields(fields);
        Ok(doc.clone())
    }

    async fn append_version(
        &self,
        document_id: Uuid,
        prior_html: &str,
        prior_hash: &str,
        note: &str,
    ) -> Result<(), StoreError> {
        self.versions.lock().unwrap().push(DocumentVersion {
            id: Uuid::new_v4(),
            document_id,
            content_html: prior_html.to_string(),
            content_hash: prior_hash.to_string(),
            note: note.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn update_embedding(&self, id: Uuid, embedding: &[f32]) -> Result<(), StoreError> {
        let mut documents = self.documents.lock().unwrap();
        let doc = documents
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("document {}", id)))?;
        doc.embedding = Some(embedding.to_vec());
        Ok(())
    }

    async fn versions(&self, document_id: Uuid) -> Result<Vec<DocumentVersion>, StoreError> {
        Ok(self
            .versions
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.document_id == document_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ErrorSink for MemoryStore {
    async fn append(
        &self,
        job_id: Uuid,
        url: &str,
        error_code: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        self.errors.lock().unwrap().push(CrawlErrorRecord {
            job_id,
            url: url.to_string(),
            error_code: error_code.to_string(),
            error_message: message.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list(&self, job_id: Uuid) -> Result<Vec<CrawlErrorRecord>, StoreError> {
        Ok(self
            .errors
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.job_id == job_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlConfig;
    use crate::extract::PageMetadata;

    fn fields(url: &str) -> DocumentFields {
        DocumentFields {
            tenant_id: "t1".to_string(),
            app_id: "a1".to_string(),
            job_id: Uuid::new_v4(),
            parent_id: None,
            title: "Page".to_string(),
            content_text: "text".to_string(),
            content_html: "<main>text</main>".to_string(),
            content_hash: "h1".to_string(),
            source_url: url.to_string(),
            breadcrumbs: Vec::new(),
            metadata: PageMetadata::default(),
        }
    }

    #[tokio::test]
    async fn test_create_is_identity_upsert() {
        let store = MemoryStore::new();
        let first = DocumentStore::create(&store, fields("https://docs.example.com/a"))
            .await
            .unwrap();

        let mut changed = fields("https://docs.example.com/a");
        changed.content_hash = "h2".to_string();
        let second = DocumentStore::create(&store, changed).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.content_hash, "h2");
        assert_eq!(store.document_count(), 1);
    }

    #[tokio::test]
    async fn test_status_transition_stamps() {
        let store = MemoryStore::new();
        let job = CrawlJob::new("t1", "a1", "https://docs.example.com", CrawlConfig::default());
        JobStore::create(&store, &job).await.unwrap();

        store
            .update_status(job.id, JobStatus::Running, None)
            .await
            .unwrap();
        let running = store.get(job.id).await.unwrap().unwrap();
        assert!(running.started_at.is_some());
        assert!(running.finished_at.is_none());

        store
            .update_status(job.id, JobStatus::Cancelled, None)
            .await
            .unwrap();
        let done = store.get(job.id).await.unwrap().unwrap();
        assert!(done.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_versions_filtered_by_document() {
        let store = MemoryStore::new();
        let doc = DocumentStore::create(&store, fields("https://docs.example.com/a"))
            .await
            .unwrap();
        store
            .append_version(doc.id, "<main>old</main>", "h0", "Updated")
            .await
            .unwrap();
        store
            .append_version(Uuid::new_v4(), "<main>x</main>", "hx", "Updated")
            .await
            .unwrap();

        let versions = store.versions(doc.id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].content_hash, "h0");
    }
}
