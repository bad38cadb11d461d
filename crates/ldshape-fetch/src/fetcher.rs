//! Resource fetcher trait

use ldshape_core::Graph;

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Fetch error types
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{iri} returned status {status}")]
    Status { iri: String, status: u16 },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to parse {iri}: {reason}")]
    Parse { iri: String, reason: String },

    #[error("unsupported content type {content_type} for {iri}")]
    UnsupportedContentType { iri: String, content_type: String },

    #[error("invalid iri {iri}: {reason}")]
    InvalidIri { iri: String, reason: String },

    #[error("not found: {0}")]
    NotFound(String),
}

/// Something that can turn a resource IRI into the graph describing it.
///
/// Implementations never see fragment identifiers: callers strip them, or
/// skip fragment IRIs altogether when the document is already loaded.
#[async_trait::async_trait]
pub trait ResourceFetcher: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, iri: &str) -> FetchResult<Graph>;
}

/// The document part of an IRI.
pub fn strip_fragment(iri: &str) -> &str {
    iri.split_once('#').map_or(iri, |(document, _)| document)
}
