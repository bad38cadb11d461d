//! Core types for ldshape

use crate::graph::Graph;
use oxrdf::NamedOrBlankNode;
use std::sync::Arc;

/// Identity of one materialized item - cheaply cloneable.
///
/// Generated fresh for every resolved item, so two passes over the same
/// graph never share identities.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ItemId(Arc<str>);

impl ItemId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    /// A fresh `ld-` prefixed identity.
    pub fn generate() -> Self {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        Self::new(format!("ld-{}", &raw[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Position of a tree node inside one shape tree.
/// e.g. "/root/ld-3f2a9c0d11e84b6a/1"
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeAddress(Arc<str>);

impl NodeAddress {
    pub fn root() -> Self {
        Self(Arc::from("/root"))
    }

    pub fn child(&self, segment: impl std::fmt::Display) -> Self {
        Self(Arc::from(format!("{}/{}", self.0, segment)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of segments below the root.
    pub fn depth(&self) -> usize {
        self.0.matches('/').count().saturating_sub(1)
    }
}

impl std::fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a tree node is looking at: a graph and the resource inside it.
#[derive(Clone, Debug)]
pub struct Focus {
    pub graph: Graph,
    pub resource: NamedOrBlankNode,
}

impl Focus {
    pub fn new(graph: Graph, resource: impl Into<NamedOrBlankNode>) -> Self {
        Self {
            graph,
            resource: resource.into(),
        }
    }
}
