//! In-memory fetcher
//!
//! Serves preloaded graphs by document IRI. Failures can be injected per
//! IRI, and responses can be held back behind a gate until released, which
//! lets callers interleave passes deterministically.

use crate::fetcher::{strip_fragment, FetchError, FetchResult, ResourceFetcher};
use crate::parse::parse_turtle;
use dashmap::DashMap;
use ldshape_core::Graph;
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Default)]
pub struct MemoryFetcher {
    graphs: DashMap<String, Graph>,
    failures: DashMap<String, u16>,
    gates: DashMap<String, Arc<Notify>>,
    calls: DashMap<String, usize>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, iri: &str, graph: Graph) {
        self.graphs.insert(strip_fragment(iri).to_string(), graph);
    }

    pub fn insert_turtle(&self, iri: &str, turtle: &str) -> FetchResult<()> {
        let document = strip_fragment(iri);
        let graph = parse_turtle(document, turtle)?;
        self.insert(document, graph);
        Ok(())
    }

    /// Make every fetch of `iri` fail with `status`.
    pub fn fail(&self, iri: &str, status: u16) {
        self.failures.insert(strip_fragment(iri).to_string(), status);
    }

    pub fn recover(&self, iri: &str) {
        self.failures.remove(strip_fragment(iri));
    }

    /// Hold fetches of `iri` until `release` is called.
    pub fn gate(&self, iri: &str) {
        self.gates
            .insert(strip_fragment(iri).to_string(), Arc::new(Notify::new()));
    }

    pub fn release(&self, iri: &str) {
        if let Some((_, gate)) = self.gates.remove(strip_fragment(iri)) {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    pub fn calls(&self, iri: &str) -> usize {
        self.calls
            .get(strip_fragment(iri))
            .map(|c| *c)
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|c| *c.value()).sum()
    }
}

#[async_trait::async_trait]
impl ResourceFetcher for MemoryFetcher {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch(&self, iri: &str) -> FetchResult<Graph> {
        let document = strip_fragment(iri).to_string();
        *self.calls.entry(document.clone()).or_insert(0) += 1;

        let gate = self.gates.get(&document).map(|g| Arc::clone(g.value()));
        if let Some(gate) = gate {
            tracing::debug!(iri = %document, "Fetch held at gate");
            gate.notified().await;
        }

        if let Some(status) = self.failures.get(&document).map(|s| *s) {
            return Err(FetchError::Status {
                iri: document,
                status,
            });
        }

        self.graphs
            .get(&document)
            .map(|g| g.value().clone())
            .ok_or(FetchError::NotFound(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_documents_by_iri_without_fragment() {
        let fetcher = MemoryFetcher::new();
        fetcher
            .insert_turtle(
                "http://example.org/card",
                "<#me> <http://xmlns.com/foaf/0.1/name> \"Me\" .",
            )
            .unwrap();
        let g = fetcher.fetch("http://example.org/card#me").await.unwrap();
        assert_eq!(g.len(), 1);
        assert_eq!(fetcher.calls("http://example.org/card"), 1);
    }

    #[tokio::test]
    async fn unknown_document_is_not_found() {
        let fetcher = MemoryFetcher::new();
        let err = fetcher.fetch("http://example.org/nothing").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }
}
