//! Error types for lepsel

use thiserror::Error;

/// lepsel error type
#[derive(Error, Debug)]
pub enum Error {
    /// A name (scope, category, quality, ...) that is not part of the vocabulary
    #[error("Parse error: {0}")]
    Parse(String),

    /// Semantically invalid configuration
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
