//! RDF document parsing and content-type negotiation

use crate::fetcher::{FetchError, FetchResult};
use ldshape_core::oxrdf::Triple;
use ldshape_core::Graph;
use oxrdfio::{RdfFormat, RdfParser};

/// Pick a parser for a response.
///
/// Generic or missing content types fall back to the IRI's file extension,
/// then to Turtle.
pub fn format_for(content_type: Option<&str>, iri: &str) -> FetchResult<RdfFormat> {
    let media_type = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty());

    match media_type.as_deref() {
        None | Some("text/plain") | Some("application/octet-stream") => {
            Ok(guess_from_extension(iri).unwrap_or(RdfFormat::Turtle))
        }
        Some(mt) => RdfFormat::from_media_type(mt).ok_or_else(|| {
            FetchError::UnsupportedContentType {
                iri: iri.to_string(),
                content_type: mt.to_string(),
            }
        }),
    }
}

fn guess_from_extension(iri: &str) -> Option<RdfFormat> {
    let path = iri.split(['?', '#']).next().unwrap_or(iri);
    let file = path.rsplit('/').next()?;
    let (_, extension) = file.rsplit_once('.')?;
    RdfFormat::from_extension(extension)
}

/// Parse a document into a graph. Named graphs of dataset formats are
/// flattened into one triple set.
pub fn parse_graph(format: RdfFormat, base: Option<&str>, data: &[u8]) -> FetchResult<Graph> {
    let source = base.unwrap_or("<inline>");
    let mut parser = RdfParser::from_format(format).rename_blank_nodes();
    if let Some(base) = base {
        parser = parser.with_base_iri(base).map_err(|e| FetchError::InvalidIri {
            iri: base.to_string(),
            reason: e.to_string(),
        })?;
    }

    let mut triples = Vec::new();
    for quad in parser.for_reader(data) {
        let quad = quad.map_err(|e| FetchError::Parse {
            iri: source.to_string(),
            reason: e.to_string(),
        })?;
        triples.push(Triple::new(quad.subject, quad.predicate, quad.object));
    }
    tracing::debug!(iri = source, triples = triples.len(), "Parsed document");
    Ok(Graph::from_triples(triples))
}

pub fn parse_turtle(base: &str, text: &str) -> FetchResult<Graph> {
    parse_graph(RdfFormat::Turtle, Some(base), text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_parameters_are_ignored() {
        let f = format_for(Some("text/turtle; charset=utf-8"), "http://x/a").unwrap();
        assert_eq!(f, RdfFormat::Turtle);
    }

    #[test]
    fn generic_content_type_uses_extension() {
        let f = format_for(Some("text/plain"), "http://x/data.nt").unwrap();
        assert_eq!(f, RdfFormat::NTriples);
        let f = format_for(None, "http://x/profile").unwrap();
        assert_eq!(f, RdfFormat::Turtle);
    }

    #[test]
    fn json_ld_is_recognized() {
        let f = format_for(Some("application/ld+json; charset=utf-8"), "http://x/inbox/").unwrap();
        assert!(matches!(f, RdfFormat::JsonLd { .. }));
        let f = format_for(None, "http://x/note.jsonld").unwrap();
        assert!(matches!(f, RdfFormat::JsonLd { .. }));
    }

    #[test]
    fn json_ld_relative_ids_use_base() {
        let format = format_for(Some("application/ld+json"), "http://example.org/card").unwrap();
        let g = parse_graph(
            format,
            Some("http://example.org/card"),
            br##"{"@context": {"name": "http://xmlns.com/foaf/0.1/name"}, "@id": "#me", "name": "Me"}"##,
        )
        .unwrap();
        assert_eq!(g.len(), 1);
        let t = g.iter().next().unwrap();
        assert_eq!(t.subject.to_string(), "<http://example.org/card#me>");
    }

    #[test]
    fn html_is_unsupported() {
        let err = format_for(Some("text/html"), "http://x/").unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedContentType { .. }));
    }

    #[test]
    fn turtle_relative_iris_use_base() {
        let g = parse_turtle(
            "http://example.org/card",
            "<#me> <http://xmlns.com/foaf/0.1/name> \"Me\" .",
        )
        .unwrap();
        assert_eq!(g.len(), 1);
        let t = g.iter().next().unwrap();
        assert_eq!(t.subject.to_string(), "<http://example.org/card#me>");
    }

    #[test]
    fn syntax_error_is_parse_error() {
        let err = parse_turtle("http://example.org/", "<a> <b> .").unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }
}
