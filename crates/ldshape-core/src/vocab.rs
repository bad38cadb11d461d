//! IRIs the engine itself depends on

use oxrdf::NamedNodeRef;

pub use oxrdf::vocab::rdf::TYPE as RDF_TYPE;

/// Membership predicate of an LDN inbox container.
pub const LDP_CONTAINS: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#contains");
