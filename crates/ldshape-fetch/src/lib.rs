//! ldshape fetch - dereferencing remote RDF resources into graphs

pub mod fetcher;
pub mod http;
pub mod memory;
pub mod parse;

pub use fetcher::{strip_fragment, FetchError, FetchResult, ResourceFetcher};
pub use http::HttpFetcher;
pub use memory::MemoryFetcher;
pub use parse::{format_for, parse_graph, parse_turtle};
