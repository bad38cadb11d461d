//! CURIE expansion (`foaf:knows` -> full IRI)
//!
//! The mapping is an explicit value handed to whoever compiles shapes; there
//! is no process-wide prefix table.

use std::collections::BTreeMap;

const DEFAULT_PREFIXES: &[(&str, &str)] = &[
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("schema", "http://schema.org/"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("ldp", "http://www.w3.org/ns/ldp#"),
    ("as", "https://www.w3.org/ns/activitystreams#"),
    ("sh", "http://www.w3.org/ns/shacl#"),
];

#[derive(Clone, Debug)]
pub struct PrefixMap {
    prefixes: BTreeMap<String, String>,
}

impl Default for PrefixMap {
    fn default() -> Self {
        let mut map = Self::empty();
        for (prefix, namespace) in DEFAULT_PREFIXES {
            map.insert(*prefix, *namespace);
        }
        map
    }
}

impl PrefixMap {
    pub fn empty() -> Self {
        Self {
            prefixes: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.insert(prefix, namespace);
        self
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// Expand an abbreviation. `None` when `value` is not `prefix:local` for
    /// a known prefix (full IRIs like `http://...` also yield `None`).
    pub fn resolve(&self, value: &str) -> Option<String> {
        let (prefix, local) = value.split_once(':')?;
        if local.starts_with("//") {
            return None;
        }
        self.namespace(prefix)
            .map(|namespace| format!("{}{}", namespace, local))
    }

    /// Resolve, or keep the value verbatim when it is not an abbreviation.
    pub fn expand(&self, value: &str) -> String {
        self.resolve(value).unwrap_or_else(|| value.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, n)| (p.as_str(), n.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for PrefixMap {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (prefix, namespace) in iter {
            self.insert(prefix, namespace);
        }
    }
}
