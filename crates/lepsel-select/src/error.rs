//! Error types for lepsel-select

use thiserror::Error;

/// lepsel-select error type.
///
/// Only run-level failures (unreadable configuration, a missing weight
/// column, ...) are errors. Problems with a single cut, variable or region
/// are reported as [`crate::Diagnostic`]s instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Vocabulary or config-file error
    #[error(transparent)]
    Core(#[from] lepsel_core::Error),

    /// Event graph error
    #[error(transparent)]
    Frame(#[from] lepsel_frame::FrameError),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A macro pattern could not be built
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Semantically invalid configuration
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
