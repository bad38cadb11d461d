//! Resolution engine
//!
//! One pass: match `(focus, path, ?o)`, classify each object, dereference
//! remote resources concurrently, merge what came back into a per-item
//! working graph, filter by class, then order. Fetch failures become
//! tombstones that are dropped before anything leaves this module.

use futures::future::join_all;
use ldshape_core::oxrdf::{Literal, NamedOrBlankNode, NamedOrBlankNodeRef, Term, TermRef};
use ldshape_core::{term_value, Graph, ItemId, Shape, SortDirection};
use ldshape_fetch::ResourceFetcher;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

/// One outcome of a resolution pass.
#[derive(Clone, Debug)]
pub enum ResolvedItem {
    Literal {
        id: ItemId,
        value: Literal,
    },
    Node {
        id: ItemId,
        /// Working graph for this item; always a superset of the pass input.
        graph: Graph,
        resource: NamedOrBlankNode,
        sort_key: Option<String>,
    },
}

impl ResolvedItem {
    pub fn id(&self) -> &ItemId {
        match self {
            Self::Literal { id, .. } | Self::Node { id, .. } => id,
        }
    }

    /// Literals sort by their own value.
    pub fn sort_key(&self) -> Option<&str> {
        match self {
            Self::Literal { value, .. } => Some(value.value()),
            Self::Node { sort_key, .. } => sort_key.as_deref(),
        }
    }

    /// The object term this item was resolved from.
    pub fn term(&self) -> Term {
        match self {
            Self::Literal { value, .. } => value.clone().into(),
            Self::Node { resource, .. } => resource.clone().into(),
        }
    }

    /// Lexical value, as written by a bind target.
    pub fn value(&self) -> String {
        match self {
            Self::Literal { value, .. } => value.value().to_string(),
            Self::Node { resource, .. } => term_value(resource.as_ref().into()),
        }
    }
}

pub struct Resolver {
    fetcher: Arc<dyn ResourceFetcher>,
}

impl Resolver {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &Arc<dyn ResourceFetcher> {
        &self.fetcher
    }

    /// Resolve `shape.path` from `focus`. `refresh` forces non-fragment
    /// resources to be dereferenced even when the graph already has them.
    pub async fn resolve(
        &self,
        graph: &Graph,
        focus: &NamedOrBlankNode,
        shape: &Shape,
        refresh: bool,
    ) -> Vec<ResolvedItem> {
        let Some(path) = shape.path.as_ref() else {
            return Vec::new();
        };

        let objects: Vec<Term> = graph
            .objects(focus.as_ref(), path.as_ref())
            .map(TermRef::into_owned)
            .collect();
        match objects.len() {
            0 => {
                debug!(focus = %focus, path = %path, "No matches");
                return Vec::new();
            }
            1 => {}
            n => debug!(focus = %focus, path = %path, matches = n, "Multiple matches"),
        }

        let pending = objects
            .into_iter()
            .map(|object| self.resolve_object(graph, object, shape, refresh));
        let mut items: Vec<ResolvedItem> = join_all(pending).await.into_iter().flatten().collect();

        if shape.sort_path.is_some() {
            sort_items(&mut items, shape.sort_direction);
        }
        items
    }

    async fn resolve_object(
        &self,
        graph: &Graph,
        object: Term,
        shape: &Shape,
        refresh: bool,
    ) -> Option<ResolvedItem> {
        let (resource, working) = match object {
            Term::Literal(value) => {
                return Some(ResolvedItem::Literal {
                    id: ItemId::generate(),
                    value,
                });
            }
            Term::BlankNode(node) => (NamedOrBlankNode::from(node), graph.clone()),
            Term::NamedNode(node) => {
                // A fragment IRI lives in a document that is already loaded.
                let remote = !node.as_str().contains('#')
                    && (refresh || !graph.has_subject(node.as_ref().into()));
                let working = if remote {
                    match self.fetcher.fetch(node.as_str()).await {
                        Ok(fetched) if fetched.is_empty() => {
                            warn!(iri = %node, "Fetched resource is empty, dropping");
                            return None;
                        }
                        Ok(fetched) => graph.merge(&fetched),
                        Err(e) => {
                            warn!(iri = %node, error = %e, "Fetch failed, dropping");
                            return None;
                        }
                    }
                } else {
                    graph.clone()
                };
                (NamedOrBlankNode::from(node), working)
            }
            #[allow(unreachable_patterns)]
            other => {
                debug!(term = %other, "Unsupported object term");
                return None;
            }
        };

        if !working.has_subject(resource.as_ref()) {
            debug!(resource = %resource, "Resource not described in graph, dropping");
            return None;
        }
        if let Some(class) = &shape.target_class {
            if !working.has_type(resource.as_ref(), class.as_ref()) {
                return None;
            }
        }

        let sort_key = shape.sort_path.as_ref().and_then(|sort_path| {
            working
                .object(resource.as_ref(), sort_path.as_ref())
                .map(term_value)
        });

        Some(ResolvedItem::Node {
            id: ItemId::generate(),
            graph: working,
            resource,
            sort_key,
        })
    }
}

/// Stable sort. Missing keys compare equal to each other and below any key.
pub fn sort_items(items: &mut [ResolvedItem], direction: SortDirection) {
    items.sort_by(|a, b| {
        let ordering: Ordering = a.sort_key().cmp(&b.sort_key());
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

/// The resource a container hands to its children: the focus itself when
/// it qualifies, else the first instance of the target class.
pub fn locate(
    graph: &Graph,
    focus: &NamedOrBlankNode,
    shape: &Shape,
) -> Option<NamedOrBlankNode> {
    match &shape.target_class {
        None => Some(focus.clone()),
        Some(class) if graph.has_type(focus.as_ref(), class.as_ref()) => Some(focus.clone()),
        Some(class) => graph
            .first_instance_of(class.as_ref())
            .map(NamedOrBlankNodeRef::into_owned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldshape_core::oxrdf::{NamedNode, Triple};
    use ldshape_core::{PrefixMap, ShapeConfig};
    use ldshape_fetch::MemoryFetcher;

    fn ex(s: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{}", s))
    }

    fn shape(config: ShapeConfig) -> Shape {
        config
            .compile(&PrefixMap::default().with_prefix("ex", "http://example.org/"))
            .unwrap()
    }

    fn literal(id: &str, value: &str) -> ResolvedItem {
        ResolvedItem::Literal {
            id: id.into(),
            value: Literal::new_simple_literal(value),
        }
    }

    fn keyed(id: &str, key: Option<&str>) -> ResolvedItem {
        ResolvedItem::Node {
            id: id.into(),
            graph: Graph::new(),
            resource: ex(id).into(),
            sort_key: key.map(str::to_string),
        }
    }

    fn ids(items: &[ResolvedItem]) -> Vec<&str> {
        items.iter().map(|i| i.id().as_str()).collect()
    }

    #[test]
    fn sort_is_stable_with_missing_keys_first() {
        let mut items = vec![
            keyed("a", Some("b")),
            keyed("b", None),
            keyed("c", Some("a")),
            keyed("d", None),
            keyed("e", Some("b")),
        ];
        sort_items(&mut items, SortDirection::Asc);
        assert_eq!(ids(&items), vec!["b", "d", "c", "a", "e"]);
    }

    #[test]
    fn sort_descending_keeps_ties_in_match_order() {
        let mut items = vec![literal("x", "m"), literal("y", "z"), literal("z", "m")];
        sort_items(&mut items, SortDirection::Desc);
        assert_eq!(ids(&items), vec!["y", "x", "z"]);
    }

    #[tokio::test]
    async fn literal_items_keep_match_order_without_sort_path() {
        let graph = Graph::from_triples(vec![
            Triple::new(ex("a"), ex("label"), Literal::new_simple_literal("Bravo")),
            Triple::new(ex("a"), ex("label"), Literal::new_simple_literal("Alpha")),
        ]);
        let resolver = Resolver::new(Arc::new(MemoryFetcher::new()));
        let items = resolver
            .resolve(&graph, &ex("a").into(), &shape(ShapeConfig::property("ex:label")), false)
            .await;
        let values: Vec<String> = items.iter().map(ResolvedItem::value).collect();
        assert_eq!(values, vec!["Bravo", "Alpha"]);
    }

    #[tokio::test]
    async fn fragment_iris_are_never_fetched() {
        let fetcher = Arc::new(MemoryFetcher::new());
        let me = NamedNode::new_unchecked("http://example.org/card#me");
        let friend = NamedNode::new_unchecked("http://example.org/card#friend");
        let graph = Graph::from_triples(vec![
            Triple::new(me.clone(), ex("knows"), friend.clone()),
            Triple::new(friend, ex("name"), Literal::new_simple_literal("F")),
        ]);
        let resolver = Resolver::new(fetcher.clone());
        let items = resolver
            .resolve(&graph, &me.into(), &shape(ShapeConfig::property("ex:knows")), true)
            .await;
        assert_eq!(items.len(), 1);
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn blank_node_objects_resolve_locally() {
        let fetcher = Arc::new(MemoryFetcher::new());
        let b = ldshape_core::oxrdf::BlankNode::new_unchecked("addr");
        let graph = Graph::from_triples(vec![
            Triple::new(ex("a"), ex("address"), b.clone()),
            Triple::new(b, ex("city"), Literal::new_simple_literal("Ghent")),
        ]);
        let resolver = Resolver::new(fetcher.clone());
        let items = resolver
            .resolve(&graph, &ex("a").into(), &shape(ShapeConfig::property("ex:address")), false)
            .await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], ResolvedItem::Node { .. }));
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[test]
    fn locate_prefers_focus_when_typed() {
        let graph = Graph::from_triples(vec![
            Triple::new(ex("x"), ldshape_core::vocab::RDF_TYPE, ex("Person")),
            Triple::new(ex("y"), ldshape_core::vocab::RDF_TYPE, ex("Person")),
        ]);
        let container = shape(ShapeConfig::container("ex:Person"));
        let found = locate(&graph, &ex("y").into(), &container);
        assert_eq!(found, Some(NamedOrBlankNode::from(ex("y"))));
        let found = locate(&graph, &ex("doc").into(), &container);
        assert_eq!(found, Some(NamedOrBlankNode::from(ex("x"))));
    }
}
