//! # Content Extraction Module
//!
//! Pure, deterministic extraction of structured content from a rendered
//! documentation page. Every sub-extraction walks an ordered list of
//! candidate strategies and takes the first that yields a non-empty result;
//! if all fail it degrades to a safe default rather than raising.
//!
//! ## Key Components
//!
//! - `PageExtraction`: the full result of parsing one page
//! - `extract_title`: first `h1`, else `<title>` with trailing suffix stripped
//! - `extract_breadcrumbs`: ordered selector fallbacks over common themes
//! - `extract_main_content`: content-region selectors with a boilerplate denylist
//! - `extract_links`: same-host documentation links, de-duplicated
//! - `extract_metadata`: best-effort meta tag scrape
//! - `content_hash`: SHA-256 digest of the cleaned markup for change detection

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::warn;
use url::Url;

/// Default title when no heading or title tag is present
pub const DEFAULT_TITLE: &str = "Untitled";

/// Ordered selectors for breadcrumb navigation across documentation themes
const BREADCRUMB_SELECTORS: &[&str] = &[
    ".breadcrumb a",
    ".breadcrumbs a",
    "[aria-label='breadcrumb'] a",
    "nav[aria-label='Breadcrumb'] a",
    ".navigation-breadcrumb a",
    "ol.breadcrumb a",
    ".docs-breadcrumb a",
];

/// Ordered selectors for the main content region across documentation themes
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    ".content",
    ".main-content",
    "#content",
    ".documentation",
    ".doc-content",
    ".md-content",               // MkDocs
    ".page-inner",               // GitBook
    ".document",                 // Sphinx
    ".theme-default-content",    // VuePress
    ".article-content",
    "[role='main']",
];

/// Element names always stripped from the content region
const EXCLUDED_TAGS: &[&str] = &["nav", "header", "footer", "script", "style", "iframe"];

/// Class names marking non-content regions stripped from the content region
const EXCLUDED_CLASSES: &[&str] = &[
    "navigation",
    "sidebar",
    "menu",
    "toc",
    "table-of-contents",
    "ad",
    "advertisement",
    "cookie-banner",
    "edit-this-page",
    "feedback",
    "comments",
];

/// URL substrings marking non-documentation targets
const SKIP_LINK_PATTERNS: &[&str] = &[
    "/api/", "/auth/", "/login", "/signup", "/search", ".pdf", ".zip", ".tar", ".png", ".jpg",
    ".gif", ".svg",
];

/// One entry of a breadcrumb trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    /// Visible label of the entry
    pub text: String,

    /// Absolute-resolved link target
    pub href: String,
}

/// Best-effort metadata scraped from document meta tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// Page description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Page keywords
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,

    /// Last-modified marker, checked across several attribute variants
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,

    /// Page author
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Ephemeral result of parsing one rendered page
#[derive(Debug, Clone)]
pub struct PageExtraction {
    /// Page title
    pub title: String,

    /// Breadcrumb trail, in document order
    pub breadcrumbs: Vec<Breadcrumb>,

    /// Flattened text of the main content region
    pub content_text: String,

    /// Cleaned markup of the main content region
    pub content_html: String,

    /// SHA-256 hex digest of the cleaned markup
    pub content_hash: String,

    /// Discovered same-host links, absolute, fragment-stripped, sorted
    pub links: Vec<String>,

    /// Scraped meta tag values
    pub metadata: PageMetadata,
}

impl PageExtraction {
    /// Parse a rendered page into its structured parts.
    ///
    /// Deterministic in everything but never fails: each sub-extraction
    /// falls back to a safe default when no strategy matches.
    pub fn from_html(html: &str, page_url: &Url, allowed_host: &str) -> Self {
        let document = Html::parse_document(html);

        let title = extract_title(&document);
        let breadcrumbs = extract_breadcrumbs(&document, page_url);
        let (content_text, content_html) = extract_main_content(&document);
        let content_hash = content_hash(&content_html);
        let links = extract_links(&document, page_url, allowed_host);
        let metadata = extract_metadata(&document);

        Self {
            title,
            breadcrumbs,
            content_text,
            content_html,
            content_hash,
            links,
            metadata,
        }
    }
}

fn selector(raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!("Invalid selector '{}': {:?}", raw, e);
            None
        }
    }
}

/// Extract the page title with fallback strategies.
pub fn extract_title(document: &Html) -> String {
    // Strategy 1: primary heading
    if let Some(sel) = selector("h1") {
        if let Some(h1) = document.select(&sel).next() {
            let text = collapse_whitespace(&h1.text().collect::<String>());
            if !text.is_empty() {
                return text;
            }
        }
    }

    // Strategy 2: title tag, stripped of trailing " | Docs"-style suffixes
    if let Some(sel) = selector("title") {
        if let Some(tag) = document.select(&sel).next() {
            let text = collapse_whitespace(&tag.text().collect::<String>());
            if !text.is_empty() {
                let suffix = Regex::new(r"\s*[|\-–]\s*.*$").expect("static regex");
                let stripped = suffix.replace(&text, "").trim().to_string();
                if !stripped.is_empty() {
                    return stripped;
                }
                return text;
            }
        }
    }

    DEFAULT_TITLE.to_string()
}

/// Extract the breadcrumb trail with ordered selector fallbacks.
///
/// Returns the first candidate set that yields at least one non-empty-text
/// entry, with hrefs resolved against the page URL; otherwise empty.
pub fn extract_breadcrumbs(document: &Html, page_url: &Url) -> Vec<Breadcrumb> {
    for raw in BREADCRUMB_SELECTORS {
        let Some(sel) = selector(raw) else { continue };

        let mut crumbs = Vec::new();
        for el in document.select(&sel) {
            let text = collapse_whitespace(&el.text().collect::<String>());
            if text.is_empty() {
                continue;
            }
            let href = el
                .value()
                .attr("href")
                .and_then(|h| page_url.join(h).ok())
                .map(|u| u.to_string())
                .unwrap_or_default();
            crumbs.push(Breadcrumb { text, href });
        }

        if !crumbs.is_empty() {
            return crumbs;
        }
    }

    Vec::new()
}

/// Extract the main content region as (flattened text, cleaned markup).
///
/// Tries the content-region selectors in order, falls back to `<body>`, then
/// strips the boilerplate denylist from the selected subtree before
/// serializing.
pub fn extract_main_content(document: &Html) -> (String, String) {
    let region = CONTENT_SELECTORS
        .iter()
        .filter_map(|raw| selector(raw))
        .find_map(|sel| document.select(&sel).next())
        .or_else(|| {
            selector("body").and_then(|sel| document.select(&sel).next())
        });

    let Some(region) = region else {
        return (String::new(), String::new());
    };

    let mut html = String::new();
    render_clean(region, &mut html);

    let mut lines = Vec::new();
    collect_text(region, &mut lines);
    let text = lines.join("\n");
    let blank_runs = Regex::new(r"\n{3,}").expect("static regex");
    let text = blank_runs.replace_all(&text, "\n\n").trim().to_string();

    (text, html)
}

fn is_excluded(el: &ElementRef) -> bool {
    let name = el.value().name();
    if EXCLUDED_TAGS.contains(&name) {
        return true;
    }
    el.value()
        .classes()
        .any(|class| EXCLUDED_CLASSES.contains(&class))
}

/// Serialize an element subtree, skipping denylisted descendants.
fn render_clean(el: ElementRef, out: &mut String) {
    if is_excluded(&el) {
        return;
    }

    out.push('<');
    out.push_str(el.value().name());
    for (key, value) in el.value().attrs() {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&value.replace('"', "&quot;"));
        out.push('"');
    }
    out.push('>');

    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            render_clean(child_el, out);
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }

    out.push_str("</");
    out.push_str(el.value().name());
    out.push('>');
}

/// Collect trimmed text fragments from a subtree, skipping denylisted descendants.
fn collect_text(el: ElementRef, out: &mut Vec<String>) {
    if is_excluded(&el) {
        return;
    }

    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            collect_text(child_el, out);
        } else if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        }
    }
}

/// Extract same-host documentation links, absolute and fragment-stripped.
///
/// Fragment/javascript/mailto/tel targets are skipped, as are a fixed set of
/// non-documentation path and extension patterns. The result is
/// de-duplicated and sorted for determinism.
pub fn extract_links(document: &Html, page_url: &Url, allowed_host: &str) -> Vec<String> {
    let Some(sel) = selector("a") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    for el in document.select(&sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }

        let Ok(mut absolute) = page_url.join(href) else {
            continue;
        };
        if absolute.host_str() != Some(allowed_host) {
            continue;
        }

        absolute.set_fragment(None);
        absolute.set_query(None);

        let clean = absolute.to_string();
        let lower = clean.to_lowercase();
        if SKIP_LINK_PATTERNS.iter().any(|p| lower.contains(p)) {
            continue;
        }

        seen.insert(clean);
    }

    let mut links: Vec<String> = seen.into_iter().collect();
    links.sort();
    links
}

/// Scrape description, keywords, last-modified and author from meta tags.
pub fn extract_metadata(document: &Html) -> PageMetadata {
    let meta_content = |attr: &str, value: &str| -> Option<String> {
        let sel = selector(&format!("meta[{}='{}']", attr, value))?;
        document
            .select(&sel)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|s| s.to_string())
    };

    let mut metadata = PageMetadata {
        description: meta_content("name", "description"),
        keywords: meta_content("name", "keywords"),
        last_modified: None,
        author: meta_content("name", "author"),
    };

    for variant in ["dateModified", "date-modified", "last-modified"] {
        if let Some(value) =
            meta_content("name", variant).or_else(|| meta_content("property", variant))
        {
            metadata.last_modified = Some(value);
            break;
        }
    }

    metadata
}

/// SHA-256 hex digest of the cleaned markup, used solely for change detection.
pub fn content_hash(content_html: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content_html.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
