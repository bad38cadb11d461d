//! ldshape core - Graph values, shape configuration, and error handling

pub mod config;
pub mod error;
pub mod graph;
pub mod prefix;
pub mod types;
pub mod vocab;

pub use config::{
    BindTarget, EngineConfig, HttpConfig, InboxConfig, Shape, ShapeConfig, ShapeDocument,
    SortDirection,
};
pub use error::{Error, Result};
pub use graph::{term_value, Graph};
pub use prefix::PrefixMap;
pub use types::*;

pub use oxrdf;
