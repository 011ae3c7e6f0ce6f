//! Paginated document discovery against the Federal Register API.

use std::collections::HashSet;

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::types::IngestError;

/// Production listing endpoint base. Tests point at a mock server instead.
pub const FEDERAL_REGISTER_API_BASE: &str = "https://www.federalregister.gov/api/v1/";

/// Maximum number of distinct documents collected per fetch pass.
pub const DEFAULT_DOCUMENT_LIMIT: usize = 50;

/// An agency attribution on a document record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agency {
    pub name: String,
}

/// One regulatory publication record from the listing endpoint.
///
/// Immutable once fetched; lives for a single orchestration pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub document_number: String,
    pub title: String,
    pub publication_date: NaiveDate,
    pub html_url: String,
    #[serde(default)]
    pub full_text_xml_url: Option<String>,
    #[serde(default)]
    pub agencies: Vec<Agency>,
}

impl Document {
    /// Name of the first listed agency, if any.
    pub fn primary_agency(&self) -> Option<&str> {
        self.agencies.first().map(|agency| agency.name.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct DocumentsPage {
    #[serde(default)]
    results: Vec<Document>,
    #[serde(default)]
    count: Option<u64>,
}

/// Filter for one listing fetch.
#[derive(Debug, Clone)]
pub struct FetchQuery {
    /// Lower bound (inclusive) on publication date.
    pub since: NaiveDate,
    pub per_page: u32,
    /// First page requested; pagination continues from here.
    pub page: u32,
    pub keywords: Vec<String>,
    pub allowed_types: Vec<String>,
}

impl FetchQuery {
    /// Pipe-joined keyword disjunction, as the source API expects it.
    fn term(&self) -> Option<String> {
        if self.keywords.is_empty() {
            None
        } else {
            Some(self.keywords.join("|"))
        }
    }
}

/// Result of offering a document to a [`DocumentSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Added,
    /// Same `document_number` was already collected (page overlap).
    Duplicate,
    /// The set is at capacity; the document was rejected.
    Full,
}

/// Ordered, capacity-capped accumulator keyed by `document_number`.
///
/// Preserves first-seen order, which for a newest-first listing is also
/// processing order. Capacity is fixed up front so a runaway listing cannot
/// grow the buffer past the limiter.
#[derive(Debug)]
pub struct DocumentSet {
    capacity: usize,
    seen: HashSet<String>,
    documents: Vec<Document>,
}

impl DocumentSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: HashSet::with_capacity(capacity),
            documents: Vec::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, document: Document) -> Admission {
        if self.seen.contains(&document.document_number) {
            return Admission::Duplicate;
        }
        if self.documents.len() >= self.capacity {
            return Admission::Full;
        }
        self.seen.insert(document.document_number.clone());
        self.documents.push(document);
        Admission::Added
    }

    pub fn is_full(&self) -> bool {
        self.documents.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }
}

/// Client for the documents-list endpoint.
pub struct SourceClient {
    client: Client,
    base_url: Url,
    limit: usize,
}

impl SourceClient {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self {
            client,
            base_url,
            limit: DEFAULT_DOCUMENT_LIMIT,
        }
    }

    /// Overrides the distinct-document limiter.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Fetches pages newest-first until the limiter fills, a short page
    /// signals the end of results, or a transport error cuts the stream.
    ///
    /// Transport errors are logged and end pagination; whatever was collected
    /// up to that point is returned. Each page gets exactly one attempt.
    pub async fn fetch_documents(&self, query: &FetchQuery) -> Vec<Document> {
        let mut set = DocumentSet::new(self.limit);
        let mut page = query.page.max(1);

        loop {
            let listing = match self.fetch_page(query, page).await {
                Ok(listing) => listing,
                Err(err) => {
                    warn!(page, error = %err, "listing request failed; returning partial results");
                    break;
                }
            };
            if let Some(count) = listing.count {
                debug!(page, count, "listing page fetched");
            }

            let page_len = listing.results.len();
            let mut rejected = false;
            for document in listing.results {
                if set.insert(document) == Admission::Full {
                    rejected = true;
                    break;
                }
            }

            if rejected || set.is_full() || page_len < query.per_page as usize {
                break;
            }
            page += 1;
        }

        let documents = set.into_documents();
        info!(documents = documents.len(), "document listing collected");
        documents
    }

    async fn fetch_page(&self, query: &FetchQuery, page: u32) -> Result<DocumentsPage, IngestError> {
        let url = self
            .base_url
            .join("documents.json")
            .map_err(|err| IngestError::InvalidDocument(err.to_string()))?;

        let mut params: Vec<(&str, String)> = vec![
            ("per_page", query.per_page.to_string()),
            ("page", page.to_string()),
            ("order", "newest".to_string()),
            (
                "conditions[publication_date][gte]",
                query.since.format("%Y-%m-%d").to_string(),
            ),
        ];
        if let Some(term) = query.term() {
            params.push(("conditions[term]", term));
        }
        for doc_type in &query.allowed_types {
            params.push(("conditions[type][]", doc_type.clone()));
        }

        let listing = self
            .client
            .get(url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json::<DocumentsPage>()
            .await?;
        Ok(listing)
    }
}
