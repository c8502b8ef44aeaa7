//! Error types for pydiscoverlib

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during discovery
#[derive(Error, Debug)]
pub enum DiscoverError {
    /// Malformed or unsupported input (bad source, unsupported shape,
    /// directory missing or not a package)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A module could not be loaded; `source` says why
    #[error("failed to import module '{module}': {source}")]
    ImportFailure {
        module: String,
        #[source]
        source: Box<DiscoverError>,
    },

    /// No search root holds a file for the dotted name
    #[error("no module named '{0}'")]
    ModuleNotFound(String),

    /// Python syntax error found while loading a module
    #[error("invalid syntax at line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Invalid glob pattern
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl DiscoverError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn import_failure(module: &str, source: DiscoverError) -> Self {
        Self::ImportFailure {
            module: module.to_string(),
            source: Box::new(source),
        }
    }
}
