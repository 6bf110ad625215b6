// src/error.rs
use std::io;
use thiserror::Error;

/// Result type used throughout the exporter
pub type Result<T> = std::result::Result<T, ExporterError>;

/// Custom Error type for the spindle exporter
#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Collection error: {0}")]
    Collection(String),

    #[error("Exposition error: {0}")]
    Exposition(String),

    #[error("Retry error: {0}")]
    Retry(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<prometheus::Error> for ExporterError {
    fn from(err: prometheus::Error) -> Self {
        ExporterError::Exposition(err.to_string())
    }
}
