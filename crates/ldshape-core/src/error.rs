//! Error types for ldshape

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid iri: {value} - {reason}")]
    InvalidIri { value: String, reason: String },

    #[error("invalid shape: {0}")]
    InvalidShape(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_iri(value: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidIri {
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_shape(message: impl Into<String>) -> Self {
        Self::InvalidShape(message.into())
    }
}
