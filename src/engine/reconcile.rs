//! Document reconciliation and change detection
//!
//! Decides, for one freshly extracted page, whether to create a document,
//! snapshot-and-update an existing one, or leave it untouched. The decision
//! is driven entirely by the content hash: a changed hash archives the prior
//! markup as an immutable version before the document is rewritten in place.
//!
//! Embedding is best-effort. A failed embedding call downgrades to a warning
//! and the document persists without a vector; the next content change will
//! attempt again.

use crate::embedding::Embedder;
use crate::extract::{Breadcrumb, PageExtraction};
use crate::store::{DocumentFields, DocumentStore, StoreError};
use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Resolve a page's logical parent from its breadcrumb trail.
///
/// The last crumb is the page itself, so the parent is the second-to-last
/// entry. Trails with fewer than two entries have no parent, as do trails
/// whose parent URL has not been crawled yet; hierarchy links only point
/// backwards within a run.
pub(crate) fn resolve_parent(
    breadcrumbs: &[Breadcrumb],
    url_to_doc_id: &HashMap<String, Uuid>,
) -> Option<Uuid> {
    if breadcrumbs.len() < 2 {
        return None;
    }
    let parent_href = &breadcrumbs[breadcrumbs.len() - 2].href;
    let normalized = normalize_href(parent_href)?;
    url_to_doc_id.get(&normalized).copied()
}

fn normalize_href(href: &str) -> Option<String> {
    let mut url = Url::parse(href).ok()?;
    url.set_fragment(None);
    url.set_query(None);
    Some(url.to_string())
}

/// Reconcile one extracted page against the document store.
///
/// Returns the id of the document that now represents the page.
pub(crate) async fn reconcile_document(
    documents: &dyn DocumentStore,
    embedder: &dyn Embedder,
    tenant_id: &str,
    app_id: &str,
    job_id: Uuid,
    parent_id: Option<Uuid>,
    source_url: &str,
    extraction: &PageExtraction,
) -> Result<Uuid, StoreError> {
    let fields = DocumentFields {
        tenant_id: tenant_id.to_string(),
        app_id: app_id.to_string(),
        job_id,
        parent_id,
        title: extraction.title.clone(),
        content_text: extraction.content_text.clone(),
        content_html: extraction.content_html.clone(),
        content_hash: extraction.content_hash.clone(),
        source_url: source_url.to_string(),
        breadcrumbs: extraction.breadcrumbs.clone(),
        metadata: extraction.metadata.clone(),
    };

    let existing = documents
        .get_by_source_url(tenant_id, app_id, source_url)
        .await?;

    match existing {
        None => {
            let doc = documents.create(fields).await?;
            info!("Created document {} for {}", doc.id, source_url);
            embed_document(documents, embedder, doc.id, &extraction.content_text).await?;
            Ok(doc.id)
        }
        Some(prior) if prior.content_hash != extraction.content_hash => {
            documents
                .append_version(
                    prior.id,
                    &prior.content_html,
                    &prior.content_hash,
                    &format!("Content updated {}", Utc::now().to_rfc3339()),
                )
                .await?;
            let doc = documents.update(prior.id, fields).await?;
            info!("Updated document {} for {} (content changed)", doc.id, source_url);
            embed_document(documents, embedder, doc.id, &extraction.content_text).await?;
            Ok(doc.id)
        }
        Some(prior) => {
            debug!("Unchanged content for {}, skipping", source_url);
            Ok(prior.id)
        }
    }
}

async fn embed_document(
    documents: &dyn DocumentStore,
    embedder: &dyn Embedder,
    document_id: Uuid,
    content_text: &str,
) -> Result<(), StoreError> {
    if content_text.trim().is_empty() {
        debug!("No content text for {}, skipping embedding", document_id);
        return Ok(());
    }

    match embedder.embed(content_text).await {
        Ok(vector) => documents.update_embedding(document_id, &vector).await,
        Err(e) => {
            warn!("Embedding failed for {}: {}", document_id, e);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbedError;
    use crate::extract::PageMetadata;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    struct FixedEmbedder {
        fail: bool,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            if self.fail {
                Err(EmbedError::UnexpectedResponse("down".to_string()))
            } else {
                Ok(vec![0.6, 0.8])
            }
        }

        async fn embed_batch(
            &self,
            texts: &[String],
        ) -> Result<Vec<Option<Vec<f32>>>, EmbedError> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await.ok());
            }
            Ok(out)
        }
    }

    fn extraction(hash: &str) -> PageExtraction {
        PageExtraction {
            title: "Setup".to_string(),
            breadcrumbs: Vec::new(),
            content_text: "Install the thing.".to_string(),
            content_html: format!("<main>{}</main>", hash),
            content_hash: hash.to_string(),
            links: Vec::new(),
            metadata: PageMetadata::default(),
        }
    }

    #[tokio::test]
    async fn test_new_page_creates_and_embeds() {
        let store = MemoryStore::new();
        let embedder = FixedEmbedder { fail: false };
        let job_id = Uuid::new_v4();

        let id = reconcile_document(
            &store,
            &embedder,
            "t1",
            "a1",
            job_id,
            None,
            "https://docs.example.com/setup",
            &extraction("h1"),
        )
        .await
        .unwrap();

        let doc = store
            .get_by_source_url("t1", "a1", "https://docs.example.com/setup")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.id, id);
        assert_eq!(doc.embedding, Some(vec![0.6, 0.8]));
        assert!(store.versions(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unchanged_content_is_noop() {
        let store = MemoryStore::new();
        let embedder = FixedEmbedder { fail: false };
        let job_id = Uuid::new_v4();
        let url = "https://docs.example.com/setup";

        let first = reconcile_document(
            &store, &embedder, "t1", "a1", job_id, None, url, &extraction("h1"),
        )
        .await
        .unwrap();
        let second = reconcile_document(
            &store, &embedder, "t1", "a1", job_id, None, url, &extraction("h1"),
        )
        .await
        .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.document_count(), 1);
        assert!(store.versions(first).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_changed_content_archives_one_version() {
        let store = MemoryStore::new();
        let embedder = FixedEmbedder { fail: false };
        let job_id = Uuid::new_v4();
        let url = "https://docs.example.com/setup";

        let id = reconcile_document(
            &store, &embedder, "t1", "a1", job_id, None, url, &extraction("h1"),
        )
        .await
        .unwrap();
        reconcile_document(
            &store, &embedder, "t1", "a1", job_id, None, url, &extraction("h2"),
        )
        .await
        .unwrap();

        let versions = store.versions(id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].content_hash, "h1");
        assert_eq!(versions[0].content_html, "<main>h1</main>");

        let doc = store
            .get_by_source_url("t1", "a1", url)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.content_hash, "h2");
    }

    #[tokio::test]
    async fn test_embedding_failure_keeps_document() {
        let store = MemoryStore::new();
        let embedder = FixedEmbedder { fail: true };
        let job_id = Uuid::new_v4();

        let id = reconcile_document(
            &store,
            &embedder,
            "t1",
            "a1",
            job_id,
            None,
            "https://docs.example.com/setup",
            &extraction("h1"),
        )
        .await
        .unwrap();

        let doc = store
            .get_by_source_url("t1", "a1", "https://docs.example.com/setup")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.id, id);
        assert!(doc.embedding.is_none());
    }

    #[test]
    fn test_resolve_parent_from_breadcrumbs() {
        let mut map = HashMap::new();
        let root_id = Uuid::new_v4();
        map.insert("https://docs.example.com/".to_string(), root_id);

        let crumbs = vec![
            Breadcrumb {
                text: "Home".to_string(),
                href: "https://docs.example.com/".to_string(),
            },
            Breadcrumb {
                text: "Setup".to_string(),
                href: "https://docs.example.com/setup".to_string(),
            },
        ];
        assert_eq!(resolve_parent(&crumbs, &map), Some(root_id));
    }

    #[test]
    fn test_resolve_parent_requires_two_crumbs() {
        let mut map = HashMap::new();
        map.insert("https://docs.example.com/".to_string(), Uuid::new_v4());

        let crumbs = vec![Breadcrumb {
            text: "Home".to_string(),
            href: "https://docs.example.com/".to_string(),
        }];
        assert_eq!(resolve_parent(&crumbs, &map), None);
        assert_eq!(resolve_parent(&[], &map), None);
    }

    #[test]
    fn test_resolve_parent_uncrawled_url_is_none() {
        let map = HashMap::new();
        let crumbs = vec![
            Breadcrumb {
                text: "Home".to_string(),
                href: "https://docs.example.com/".to_string(),
            },
            Breadcrumb {
                text: "Setup".to_string(),
                href: "https://docs.example.com/setup".to_string(),
            },
        ];
        assert_eq!(resolve_parent(&crumbs, &map), None);
    }

    #[test]
    fn test_resolve_parent_normalizes_fragments() {
        let mut map = HashMap::new();
        let guides_id = Uuid::new_v4();
        map.insert("https://docs.example.com/guides".to_string(), guides_id);

        let crumbs = vec![
            Breadcrumb {
                text: "Home".to_string(),
                href: "https://docs.example.com/".to_string(),
            },
            Breadcrumb {
                text: "Guides".to_string(),
                href: "https://docs.example.com/guides#top".to_string(),
            },
            Breadcrumb {
                text: "Setup".to_string(),
                href: "https://docs.example.com/guides/setup".to_string(),
            },
        ];
        assert_eq!(resolve_parent(&crumbs, &map), Some(guides_id));
    }
}
