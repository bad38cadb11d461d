//! Shape configuration and engine settings
//!
//! `ShapeConfig` is the serde form a shape document is written in (CURIEs
//! allowed). `ShapeConfig::compile` expands it against a `PrefixMap` into an
//! immutable `Shape` tree with validated IRIs, which is what tree nodes hold.

use crate::error::{Error, Result};
use crate::prefix::PrefixMap;
use oxrdf::NamedNode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ============================================================
// Shape configuration (serde form)
// ============================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    /// Predicate to follow from the focus resource. Absent on the root
    /// container, which selects its resource by `target_class` instead.
    pub path: Option<String>,
    #[serde(alias = "target-class")]
    pub target_class: Option<String>,
    #[serde(alias = "sortpath")]
    pub sort_path: Option<String>,
    #[serde(alias = "sortdirection")]
    pub sort_direction: SortDirection,
    /// `selector`, `selector[attr]`, optionally prefixed with `../`.
    #[serde(alias = "bind-to")]
    pub bind_to: Option<String>,
    pub singleton: bool,
    #[serde(alias = "hideempty")]
    pub hide_empty: bool,
    #[serde(alias = "refresh")]
    pub refresh_secs: Option<u64>,
    pub inbox: Option<String>,
    #[serde(alias = "ldnenabled")]
    pub ldn_enabled: bool,
    #[serde(alias = "ldn-style")]
    pub ldn_style: Option<String>,
    /// Shapes declared inside this shape's template.
    pub children: Vec<ShapeConfig>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "ASC")]
    Asc,
    #[serde(alias = "DESC")]
    Desc,
}

/// Where a literal lands inside a slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindTarget {
    /// Sub-selector inside the slot; empty means the slot element itself.
    pub selector: String,
    /// Attribute to write; `None` writes text content.
    pub attribute: Option<String>,
    /// `../` prefix: the working node is the parent of the shape element.
    pub parent: bool,
}

impl BindTarget {
    pub fn parse(raw: &str) -> Self {
        let (parent, rest) = match raw.strip_prefix("../") {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        match (rest.rfind('['), rest.rfind(']')) {
            (Some(l), Some(r)) if r > l => Self {
                selector: rest[..l].trim().to_string(),
                attribute: Some(rest[l + 1..r].trim().to_string()),
                parent,
            },
            _ => Self {
                selector: rest.trim().to_string(),
                attribute: None,
                parent,
            },
        }
    }
}

impl std::fmt::Display for BindTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.parent {
            write!(f, "../")?;
        }
        write!(f, "{}", self.selector)?;
        if let Some(attr) = &self.attribute {
            write!(f, "[{}]", attr)?;
        }
        Ok(())
    }
}

// ============================================================
// Compiled shape
// ============================================================

/// Immutable per-node binding rules, IRIs fully expanded.
#[derive(Clone, Debug)]
pub struct Shape {
    pub path: Option<NamedNode>,
    pub target_class: Option<NamedNode>,
    pub sort_path: Option<NamedNode>,
    pub sort_direction: SortDirection,
    pub bind: Option<BindTarget>,
    pub singleton: bool,
    pub hide_when_empty: bool,
    pub refresh: Option<Duration>,
    pub inbox: Option<NamedNode>,
    pub ldn_enabled: bool,
    pub ldn_style: Option<String>,
    pub children: Vec<Arc<Shape>>,
}

impl Shape {
    /// Root container: no property path.
    pub fn is_container(&self) -> bool {
        self.path.is_none()
    }

    /// Inbox polling needs both an inbox and the LDN switch.
    pub fn inbox_target(&self) -> Option<&NamedNode> {
        self.inbox.as_ref().filter(|_| self.ldn_enabled)
    }

    pub fn is_growth_only(&self) -> bool {
        self.inbox_target().is_some()
    }
}

impl ShapeConfig {
    /// A property shape following `path`.
    pub fn property(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// A root container selecting instances of `class`.
    pub fn container(class: impl Into<String>) -> Self {
        Self {
            target_class: Some(class.into()),
            ..Default::default()
        }
    }

    pub fn with_child(mut self, child: ShapeConfig) -> Self {
        self.children.push(child);
        self
    }

    pub fn compile(&self, prefixes: &PrefixMap) -> Result<Shape> {
        let iri = |value: &Option<String>| -> Result<Option<NamedNode>> {
            value
                .as_deref()
                .map(|v| {
                    let expanded = prefixes.expand(v);
                    NamedNode::new(expanded.as_str()).map_err(|e| Error::invalid_iri(expanded, e))
                })
                .transpose()
        };

        let path = iri(&self.path)?;
        if path.is_none() {
            let misplaced = [
                ("sort_path", self.sort_path.is_some()),
                ("bind_to", self.bind_to.is_some()),
                ("singleton", self.singleton),
                ("inbox", self.inbox.is_some()),
            ];
            if let Some((field, _)) = misplaced.iter().find(|(_, set)| *set) {
                return Err(Error::invalid_shape(format!(
                    "{} requires a property path",
                    field
                )));
            }
        }
        if self.refresh_secs == Some(0) {
            return Err(Error::invalid_shape("refresh interval must be at least one second"));
        }

        let children = self
            .children
            .iter()
            .map(|c| c.compile(prefixes).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        Ok(Shape {
            path,
            target_class: iri(&self.target_class)?,
            sort_path: iri(&self.sort_path)?,
            sort_direction: self.sort_direction,
            bind: self.bind_to.as_deref().map(BindTarget::parse),
            singleton: self.singleton,
            hide_when_empty: self.hide_empty,
            refresh: self.refresh_secs.map(Duration::from_secs),
            inbox: iri(&self.inbox)?,
            ldn_enabled: self.ldn_enabled,
            ldn_style: self.ldn_style.clone(),
            children,
        })
    }
}

// ============================================================
// Engine settings
// ============================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub inbox: InboxConfig,
    pub http: HttpConfig,
}

/// Inbox polling schedule. Two polls at distinct delays give late
/// notifications a second chance to show up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxConfig {
    pub first_poll_secs: u64,
    pub second_poll_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    /// Accept header sent with every dereference.
    pub accept: String,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            first_poll_secs: 5,
            second_poll_secs: 10,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("ldshape/{}", env!("CARGO_PKG_VERSION")),
            accept: "text/turtle, application/ld+json;q=0.9, application/n-triples;q=0.9, \
                     application/rdf+xml;q=0.8, application/n-quads;q=0.7, application/trig;q=0.7"
                .into(),
        }
    }
}

impl InboxConfig {
    pub fn poll_delays(&self) -> [Duration; 2] {
        [
            Duration::from_secs(self.first_poll_secs),
            Duration::from_secs(self.second_poll_secs),
        ]
    }
}

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded engine config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No engine config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

// ============================================================
// Shape document
// ============================================================

/// A shape file: prefixes, optional engine settings, and the shape tree.
#[derive(Debug, Clone, Deserialize)]
pub struct ShapeDocument {
    #[serde(default)]
    pub prefixes: BTreeMap<String, String>,
    #[serde(default)]
    pub engine: EngineConfig,
    pub shape: ShapeConfig,
}

impl ShapeDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigError(e.to_string()))
    }

    /// Built-in prefixes overlaid with the document's own.
    pub fn prefix_map(&self) -> PrefixMap {
        let mut map = PrefixMap::default();
        map.extend(self.prefixes.clone());
        map
    }

    pub fn compile(&self) -> Result<Shape> {
        self.shape.compile(&self.prefix_map())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_target_attribute() {
        let b = BindTarget::parse("a.profile[href]");
        assert_eq!(b.selector, "a.profile");
        assert_eq!(b.attribute.as_deref(), Some("href"));
        assert!(!b.parent);
    }

    #[test]
    fn bind_target_parent_text() {
        let b = BindTarget::parse("../h1");
        assert!(b.parent);
        assert_eq!(b.selector, "h1");
        assert!(b.attribute.is_none());
        assert_eq!(b.to_string(), "../h1");
    }

    #[test]
    fn bind_target_self_attribute() {
        let b = BindTarget::parse("[src]");
        assert_eq!(b.selector, "");
        assert_eq!(b.attribute.as_deref(), Some("src"));
    }

    #[test]
    fn compile_expands_curies() {
        let shape = ShapeConfig::property("foaf:knows")
            .compile(&PrefixMap::default())
            .unwrap();
        assert_eq!(
            shape.path.unwrap().as_str(),
            "http://xmlns.com/foaf/0.1/knows"
        );
    }

    #[test]
    fn container_rejects_property_options() {
        let config = ShapeConfig {
            singleton: true,
            ..ShapeConfig::container("foaf:Person")
        };
        let err = config.compile(&PrefixMap::default()).unwrap_err();
        assert!(err.to_string().contains("singleton"));
    }

    #[test]
    fn zero_refresh_is_rejected() {
        let config = ShapeConfig {
            refresh_secs: Some(0),
            ..ShapeConfig::property("foaf:name")
        };
        assert!(config.compile(&PrefixMap::default()).is_err());
    }

    #[test]
    fn inbox_requires_ldn_switch() {
        let config = ShapeConfig {
            inbox: Some("http://example.org/inbox/".into()),
            ..ShapeConfig::property("as:items")
        };
        let shape = config.compile(&PrefixMap::default()).unwrap();
        assert!(shape.inbox_target().is_none());
        assert!(!shape.is_growth_only());
    }
}
