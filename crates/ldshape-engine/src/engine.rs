//! Shared collaborators for every node of a shape tree

use crate::node::TreeNode;
use crate::resolve::Resolver;
use crate::surface::Surface;
use ldshape_core::oxrdf::NamedNode;
use ldshape_core::{EngineConfig, Focus, NodeAddress, Shape};
use ldshape_fetch::{FetchError, FetchResult, ResourceFetcher};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct Engine {
    resolver: Resolver,
    surface: Arc<dyn Surface>,
    config: EngineConfig,
    /// Parent of every node's token; cancelling it stops all timers.
    shutdown: CancellationToken,
}

impl Engine {
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        surface: Arc<dyn Surface>,
        config: EngineConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            resolver: Resolver::new(fetcher),
            surface,
            config,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn fetcher(&self) -> &Arc<dyn ResourceFetcher> {
        self.resolver.fetcher()
    }

    pub fn surface(&self) -> &Arc<dyn Surface> {
        &self.surface
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create the root node of a shape tree.
    pub fn mount(self: &Arc<Self>, shape: Arc<Shape>) -> Arc<TreeNode> {
        TreeNode::new(
            NodeAddress::root(),
            shape,
            Arc::clone(self),
            self.shutdown.child_token(),
        )
    }

    /// Dereference `iri` and bind it as the root focus of a new tree.
    pub async fn bind(self: &Arc<Self>, shape: Arc<Shape>, iri: &str) -> FetchResult<Arc<TreeNode>> {
        let resource = NamedNode::new(iri).map_err(|e| FetchError::InvalidIri {
            iri: iri.to_string(),
            reason: e.to_string(),
        })?;
        let graph = self.fetcher().fetch(iri).await?;
        info!(iri, triples = graph.len(), "Binding resource");

        let root = self.mount(shape);
        root.set_focus(Some(Focus::new(graph, resource))).await;
        Ok(root)
    }

    /// Cancel every timer of every tree this engine mounted.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
