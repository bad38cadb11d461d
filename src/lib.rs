//! ldshape command-line support: logging setup and source loading

pub mod logging;
pub mod source;
