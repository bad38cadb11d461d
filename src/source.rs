//! Where a root focus comes from: a remote document or a local file

use anyhow::{anyhow, Context};
use ldshape_core::oxrdf::NamedNode;
use ldshape_core::{Focus, Shape};
use ldshape_engine::{Engine, TreeNode};
use ldshape_fetch::{format_for, parse_graph};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Remote(String),
    File(PathBuf),
}

impl Source {
    /// `http(s)://` arguments are dereferenced, anything else is a path.
    pub fn parse(arg: &str) -> Self {
        match Url::parse(arg) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Remote(arg.to_string()),
            _ => Self::File(PathBuf::from(arg)),
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(iri) => f.write_str(iri),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Mount `shape` and focus it on `source`.
///
/// `resource` picks the focus resource inside the document; it defaults to
/// the document itself.
pub async fn bind_source(
    engine: &Arc<Engine>,
    shape: Arc<Shape>,
    source: &Source,
    resource: Option<&str>,
) -> anyhow::Result<Arc<TreeNode>> {
    match (source, resource) {
        (Source::Remote(iri), None) => Ok(engine.bind(shape, iri).await?),
        (Source::Remote(iri), Some(resource)) => {
            let resource = parse_resource(resource)?;
            let graph = engine.fetcher().fetch(iri).await?;
            info!(iri = %iri, triples = graph.len(), "Binding resource");
            let root = engine.mount(shape);
            root.set_focus(Some(Focus::new(graph, resource))).await;
            Ok(root)
        }
        (Source::File(path), resource) => {
            let path = path
                .canonicalize()
                .with_context(|| format!("cannot open {}", path.display()))?;
            let base = Url::from_file_path(&path)
                .map_err(|_| anyhow!("cannot turn {} into a file URL", path.display()))?;
            let data = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let format = format_for(None, base.as_str())?;
            let graph = parse_graph(format, Some(base.as_str()), &data)?;
            let resource = parse_resource(resource.unwrap_or(base.as_str()))?;
            info!(file = %path.display(), triples = graph.len(), "Binding local document");

            let root = engine.mount(shape);
            root.set_focus(Some(Focus::new(graph, resource))).await;
            Ok(root)
        }
    }
}

fn parse_resource(iri: &str) -> anyhow::Result<NamedNode> {
    NamedNode::new(iri).map_err(|e| anyhow!("invalid resource IRI {iri}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_and_https_are_remote() {
        assert_eq!(
            Source::parse("https://example.org/card"),
            Source::Remote("https://example.org/card".into())
        );
        assert_eq!(
            Source::parse("http://localhost:3000/a.ttl"),
            Source::Remote("http://localhost:3000/a.ttl".into())
        );
    }

    #[test]
    fn other_arguments_are_files() {
        assert_eq!(Source::parse("card.ttl"), Source::File("card.ttl".into()));
        assert_eq!(
            Source::parse("/tmp/data/card.ttl"),
            Source::File("/tmp/data/card.ttl".into())
        );
        assert!(matches!(Source::parse("ftp://example.org/x"), Source::File(_)));
    }

    #[test]
    fn display_matches_argument() {
        assert_eq!(Source::parse("https://example.org/").to_string(), "https://example.org/");
        assert_eq!(Source::parse("card.ttl").to_string(), "card.ttl");
    }
}
