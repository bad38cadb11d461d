//! Tests for ldshape-core: identities, graphs, prefixes, shape documents, errors

use ldshape_core::oxrdf::{BlankNode, Literal, NamedNode, NamedOrBlankNode, Triple};
use ldshape_core::*;
use std::io::Write;

fn iri(s: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://example.org/{}", s))
}

// ===========================================================================
// ItemId / NodeAddress
// ===========================================================================

#[test]
fn item_id_generate_is_prefixed_and_unique() {
    let a = ItemId::generate();
    let b = ItemId::generate();
    assert!(a.as_str().starts_with("ld-"));
    assert_eq!(a.as_str().len(), 19);
    assert_ne!(a, b);
}

#[test]
fn item_id_from_str_and_display() {
    let id: ItemId = "ld-fixed".into();
    assert_eq!(id.as_str(), "ld-fixed");
    assert_eq!(format!("{}", id), "ld-fixed");
}

#[test]
fn node_address_child_and_depth() {
    let root = NodeAddress::root();
    assert_eq!(root.depth(), 0);
    let child = root.child("ld-1").child(0);
    assert_eq!(child.as_str(), "/root/ld-1/0");
    assert_eq!(child.depth(), 2);
}

// ===========================================================================
// Graph
// ===========================================================================

#[test]
fn graph_merge_is_union_and_leaves_inputs_alone() {
    let a = Graph::from_triples(vec![Triple::new(iri("a"), iri("p"), iri("b"))]);
    let b = Graph::from_triples(vec![
        Triple::new(iri("a"), iri("p"), iri("b")),
        Triple::new(iri("b"), iri("p"), iri("c")),
    ]);
    let merged = a.merge(&b);
    assert_eq!(merged.len(), 2);
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 2);
    assert_eq!(merged, b);
}

#[test]
fn graph_merge_subset_returns_receiver() {
    let big = Graph::from_triples(vec![
        Triple::new(iri("a"), iri("p"), iri("b")),
        Triple::new(iri("b"), iri("p"), iri("c")),
    ]);
    let small = Graph::from_triples(vec![Triple::new(iri("b"), iri("p"), iri("c"))]);
    assert_eq!(big.merge(&small), big);
    assert_eq!(small.merge(&Graph::new()), small);
    assert_eq!(Graph::new().merge(&small), small);
}

#[test]
fn graph_blank_node_subjects() {
    let b = BlankNode::new_unchecked("n1");
    let g = Graph::from_triples(vec![Triple::new(
        b.clone(),
        iri("name"),
        Literal::new_simple_literal("anon"),
    )]);
    let subject = NamedOrBlankNode::from(b);
    assert!(g.has_subject(subject.as_ref()));
    let name = iri("name");
    let value = g.object(subject.as_ref(), name.as_ref()).map(term_value);
    assert_eq!(value.as_deref(), Some("anon"));
}

#[test]
fn graph_display_is_ntriples() {
    let g = Graph::from_triples(vec![Triple::new(
        iri("a"),
        iri("name"),
        Literal::new_simple_literal("Alice"),
    )]);
    assert_eq!(
        g.to_string(),
        "<http://example.org/a> <http://example.org/name> \"Alice\" .\n"
    );
}

#[test]
fn term_value_of_each_kind() {
    let n = iri("x");
    assert_eq!(term_value(n.as_ref().into()), "http://example.org/x");
    let l = Literal::new_simple_literal("hello");
    assert_eq!(term_value(l.as_ref().into()), "hello");
}

// ===========================================================================
// PrefixMap
// ===========================================================================

#[test]
fn prefix_map_defaults_cover_ldp_and_as() {
    let map = PrefixMap::default();
    assert_eq!(
        map.expand("ldp:contains"),
        "http://www.w3.org/ns/ldp#contains"
    );
    assert_eq!(
        map.expand("as:Note"),
        "https://www.w3.org/ns/activitystreams#Note"
    );
}

#[test]
fn prefix_map_extend_overrides() {
    let mut map = PrefixMap::default();
    map.extend([("foaf", "urn:foaf:")]);
    assert_eq!(map.expand("foaf:name"), "urn:foaf:name");
}

// ===========================================================================
// ShapeDocument
// ===========================================================================

const DOCUMENT: &str = r#"
[prefixes]
ex = "http://example.org/"

[engine.inbox]
first_poll_secs = 2

[shape]
target_class = "foaf:Person"

[[shape.children]]
path = "foaf:name"
bind_to = "h1"
hide_empty = true

[[shape.children]]
path = "foaf:knows"
sort_path = "foaf:name"
sort_direction = "desc"
refresh_secs = 30

[[shape.children.children]]
path = "ex:nick"
bind_to = "../a[title]"
singleton = true
"#;

#[test]
fn shape_document_compiles_nested_tree() {
    let doc = ShapeDocument::from_toml_str(DOCUMENT).unwrap();
    let shape = doc.compile().unwrap();
    assert!(shape.is_container());
    assert_eq!(
        shape.target_class.as_ref().unwrap().as_str(),
        "http://xmlns.com/foaf/0.1/Person"
    );
    assert_eq!(shape.children.len(), 2);

    let name = &shape.children[0];
    assert!(name.hide_when_empty);
    assert_eq!(name.bind.as_ref().unwrap().selector, "h1");

    let knows = &shape.children[1];
    assert_eq!(knows.sort_direction, SortDirection::Desc);
    assert_eq!(knows.refresh, Some(std::time::Duration::from_secs(30)));

    let nick = &knows.children[0];
    assert_eq!(nick.path.as_ref().unwrap().as_str(), "http://example.org/nick");
    assert!(nick.singleton);
    let bind = nick.bind.as_ref().unwrap();
    assert!(bind.parent);
    assert_eq!(bind.attribute.as_deref(), Some("title"));
}

#[test]
fn shape_document_engine_defaults_fill_gaps() {
    let doc = ShapeDocument::from_toml_str(DOCUMENT).unwrap();
    assert_eq!(doc.engine.inbox.first_poll_secs, 2);
    assert_eq!(doc.engine.inbox.second_poll_secs, 10);
    assert!(doc.engine.http.accept.contains("text/turtle"));
}

#[test]
fn shape_document_accepts_legacy_attribute_names() {
    let doc = ShapeDocument::from_toml_str(
        r#"
[shape]
path = "foaf:knows"
sortpath = "foaf:name"
sortdirection = "DESC"
hideempty = true
ldnenabled = true
inbox = "http://example.org/inbox/"
"#,
    )
    .unwrap();
    let shape = doc.compile().unwrap();
    assert_eq!(shape.sort_direction, SortDirection::Desc);
    assert!(shape.hide_when_empty);
    assert!(shape.is_growth_only());
}

#[test]
fn shape_document_rejects_bad_iri() {
    let doc = ShapeDocument::from_toml_str(
        r#"
[shape]
path = "not an iri"
"#,
    )
    .unwrap();
    let err = doc.compile().unwrap_err();
    assert!(matches!(err, Error::InvalidIri { .. }));
}

#[test]
fn shape_document_without_shape_is_config_error() {
    let err = ShapeDocument::from_toml_str("[prefixes]\n").unwrap_err();
    assert!(matches!(err, Error::ConfigError(_)));
}

#[test]
fn shape_document_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(DOCUMENT.as_bytes()).unwrap();
    let doc = ShapeDocument::load(file.path()).unwrap();
    assert_eq!(doc.shape.children.len(), 2);
}

#[test]
fn shape_document_missing_file_is_io_error() {
    let err = ShapeDocument::load(std::path::Path::new("/nonexistent/shape.toml")).unwrap_err();
    assert!(matches!(err, Error::IoError(_)));
}

// ===========================================================================
// EngineConfig
// ===========================================================================

#[test]
fn engine_config_load_falls_back_to_defaults() {
    let config = EngineConfig::load(std::path::Path::new("/nonexistent/engine.toml"));
    assert_eq!(config.inbox.poll_delays()[0].as_secs(), 5);
    assert_eq!(config.inbox.poll_delays()[1].as_secs(), 10);
}

#[test]
fn engine_config_toml_roundtrip() {
    let mut config = EngineConfig::default();
    config.inbox.second_poll_secs = 42;
    let text = config.to_toml();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    let back = EngineConfig::load(file.path());
    assert_eq!(back.inbox.second_poll_secs, 42);
    assert_eq!(back.http.user_agent, config.http.user_agent);
}

#[test]
fn engine_config_invalid_toml_uses_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"inbox = [[[").unwrap();
    let config = EngineConfig::load(file.path());
    assert_eq!(config.inbox.first_poll_secs, 5);
}

// ===========================================================================
// Error
// ===========================================================================

#[test]
fn error_display() {
    let e = Error::invalid_iri("bad", "no scheme");
    assert_eq!(e.to_string(), "invalid iri: bad - no scheme");
    let e = Error::invalid_shape("oops");
    assert_eq!(e.to_string(), "invalid shape: oops");
}
