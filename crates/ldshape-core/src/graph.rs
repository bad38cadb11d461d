//! Immutable triple set with pattern matching and union merge
//!
//! A `Graph` is a value: cloning is an `Arc` bump and `merge` always returns
//! a new graph, so a graph handed to one tree node can never change under
//! another. Iteration and match results follow first-insertion order.

use crate::vocab::RDF_TYPE;
use oxrdf::{NamedNodeRef, NamedOrBlankNode, NamedOrBlankNodeRef, TermRef, Triple};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct Graph {
    inner: Arc<GraphInner>,
}

#[derive(Default)]
struct GraphInner {
    triples: Vec<Triple>,
    members: HashSet<Triple>,
    by_subject: HashMap<NamedOrBlankNode, Vec<usize>>,
}

impl GraphInner {
    fn insert(&mut self, triple: Triple) -> bool {
        if self.members.contains(&triple) {
            return false;
        }
        let index = self.triples.len();
        self.by_subject
            .entry(triple.subject.clone())
            .or_default()
            .push(index);
        self.members.insert(triple.clone());
        self.triples.push(triple);
        true
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_triples(triples: impl IntoIterator<Item = Triple>) -> Self {
        let mut inner = GraphInner::default();
        for triple in triples {
            inner.insert(triple);
        }
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.triples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.inner.triples.iter()
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.inner.members.contains(triple)
    }

    /// Pattern match; `None` in any position is a wildcard.
    pub fn matches(
        &self,
        subject: Option<NamedOrBlankNodeRef<'_>>,
        predicate: Option<NamedNodeRef<'_>>,
        object: Option<TermRef<'_>>,
    ) -> Vec<&Triple> {
        let keep = |t: &&Triple| {
            predicate.map_or(true, |p| t.predicate.as_ref() == p)
                && object.map_or(true, |o| t.object.as_ref() == o)
        };
        match subject {
            Some(s) => self.subject_triples(s).filter(keep).collect(),
            None => self.inner.triples.iter().filter(keep).collect(),
        }
    }

    /// Objects of `(subject, predicate, ?)` in match order.
    pub fn objects<'a>(
        &'a self,
        subject: NamedOrBlankNodeRef<'a>,
        predicate: NamedNodeRef<'a>,
    ) -> impl Iterator<Item = TermRef<'a>> + 'a {
        self.subject_triples(subject)
            .filter(move |t| t.predicate.as_ref() == predicate)
            .map(|t| t.object.as_ref())
    }

    /// First object of `(subject, predicate, ?)`.
    pub fn object<'a>(
        &'a self,
        subject: NamedOrBlankNodeRef<'a>,
        predicate: NamedNodeRef<'a>,
    ) -> Option<TermRef<'a>> {
        self.objects(subject, predicate).next()
    }

    /// Whether the graph describes `subject` at all.
    pub fn has_subject(&self, subject: NamedOrBlankNodeRef<'_>) -> bool {
        self.inner.by_subject.contains_key(&subject.into_owned())
    }

    /// Whether the graph asserts `subject rdf:type class`.
    pub fn has_type(&self, subject: NamedOrBlankNodeRef<'_>, class: NamedNodeRef<'_>) -> bool {
        let class = TermRef::from(class);
        self.subject_triples(subject)
            .any(|t| t.predicate.as_ref() == RDF_TYPE && t.object.as_ref() == class)
    }

    /// First subject asserted to be an instance of `class`.
    pub fn first_instance_of(&self, class: NamedNodeRef<'_>) -> Option<NamedOrBlankNodeRef<'_>> {
        let class = TermRef::from(class);
        self.inner
            .triples
            .iter()
            .find(|t| t.predicate.as_ref() == RDF_TYPE && t.object.as_ref() == class)
            .map(|t| t.subject.as_ref())
    }

    /// Set union. Merging a graph into itself, or merging a subset, returns
    /// the receiver unchanged.
    pub fn merge(&self, other: &Graph) -> Graph {
        if Arc::ptr_eq(&self.inner, &other.inner) || other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        if other.iter().all(|t| self.contains(t)) {
            return self.clone();
        }
        let mut inner = GraphInner {
            triples: Vec::with_capacity(self.len() + other.len()),
            ..Default::default()
        };
        for triple in self.iter().chain(other.iter()) {
            inner.insert(triple.clone());
        }
        Graph {
            inner: Arc::new(inner),
        }
    }

    /// Whether this graph holds exactly the same triples as `other`.
    pub fn same_triples(&self, other: &Graph) -> bool {
        self.len() == other.len() && self.iter().all(|t| other.contains(t))
    }

    fn subject_triples<'a>(
        &'a self,
        subject: NamedOrBlankNodeRef<'_>,
    ) -> impl Iterator<Item = &'a Triple> {
        self.inner
            .by_subject
            .get(&subject.into_owned())
            .into_iter()
            .flatten()
            .map(move |&i| &self.inner.triples[i])
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.same_triples(other)
    }
}

impl Eq for Graph {}

impl FromIterator<Triple> for Graph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Self::from_triples(iter)
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph").field("len", &self.len()).finish()
    }
}

/// N-Triples, one statement per line.
impl std::fmt::Display for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for triple in self.iter() {
            writeln!(f, "{} .", triple)?;
        }
        Ok(())
    }
}

/// Lexical value of a term: the IRI, the blank node id, or the literal value.
pub fn term_value(term: TermRef<'_>) -> String {
    match term {
        TermRef::NamedNode(n) => n.as_str().to_string(),
        TermRef::BlankNode(b) => b.as_str().to_string(),
        TermRef::Literal(l) => l.value().to_string(),
        #[allow(unreachable_patterns)]
        other => other.to_string(),
    }
}
