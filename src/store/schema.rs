//! # Database Schema Module
//!
//! Defines and manages the database schema for crawl persistence: jobs,
//! documents, version history and page-level errors.
//!
//! ## Schema Design
//!
//! 1. `crawl_jobs` - one row per crawl run with status, config and stats
//! 2. `documents` - logical pages, unique on `(tenant_id, app_id, source_url)`
//!    so re-crawls upsert instead of duplicating
//! 3. `document_versions` - append-only snapshots of prior content
//! 4. `crawl_errors` - page-level failures per job
//!
//! Structured columns (config, stats, breadcrumbs, metadata) are stored as
//! JSON text; embeddings are stored as little-endian f32 blobs.

use crate::store::error::StoreError;
use libsql::{Connection, params};

/// Initialize the database schema
pub async fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS crawl_jobs (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            app_id TEXT NOT NULL,
            base_url TEXT NOT NULL,
            config TEXT NOT NULL,
            status TEXT NOT NULL,
            stats TEXT,
            created_at TEXT NOT NULL,
            started_at TEXT,
            finished_at TEXT
        )",
        params![],
    )
    .await
    .map_err(|e| StoreError::Schema(format!("Failed to create crawl_jobs table: {}", e)))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            app_id TEXT NOT NULL,
            job_id TEXT NOT NULL,
            parent_id TEXT,
            title TEXT NOT NULL,
            content_text TEXT NOT NULL,
            content_html TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            source_url TEXT NOT NULL,
            breadcrumbs TEXT NOT NULL,
            metadata TEXT NOT NULL,
            embedding BLOB,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(tenant_id, app_id, source_url)
        )",
        params![],
    )
    .await
    .map_err(|e| StoreError::Schema(format!("Failed to create documents table: {}", e)))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS document_versions (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            content_html TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            note TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
        )",
        params![],
    )
    .await
    .map_err(|e| StoreError::Schema(format!("Failed to create document_versions table: {}", e)))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS crawl_errors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id TEXT NOT NULL,
            url TEXT NOT NULL,
            error_code TEXT NOT NULL,
            error_message TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        params![],
    )
    .await
    .map_err(|e| StoreError::Schema(format!("Failed to create crawl_errors table: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documents_identity
         ON documents(tenant_id, app_id, source_url)",
        params![],
    )
    .await
    .map_err(|e| StoreError::Schema(format!("Failed to create index on documents: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_versions_document
         ON document_versions(document_id)",
        params![],
    )
    .await
    .map_err(|e| StoreError::Schema(format!("Failed to create index on document_versions: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_errors_job ON crawl_errors(job_id)",
        params![],
    )
    .await
    .map_err(|e| StoreError::Schema(format!("Failed to create index on crawl_errors: {}", e)))?;

    Ok(())
}
