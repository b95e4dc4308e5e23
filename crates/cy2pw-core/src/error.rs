//! Error types for test conversion.
//!
//! Only filesystem and process failures surface as hard errors. Syntax errors
//! become [`ConversionResult::Failure`](crate::pipeline::ConversionResult),
//! config problems are logged and skipped, and formatter failures fall back to
//! the unformatted text.

use std::path::PathBuf;
use std::process::ExitStatus;

use swc_core::common::Span;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Install { command: String, status: ExitStatus },
}

impl ConvertError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A syntax error reported by the tree engine.
///
/// `line` is 1-based and `column` is 0-based, matching what editors and most
/// JavaScript tooling print.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({line}:{column})")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// Raised by a rewrite pass that cannot continue.
///
/// Built-in passes never fail; a shape they do not recognize is left alone.
/// Extension passes may return this to abort the conversion of one file.
#[derive(Debug, Clone, Error)]
#[error("Pass `{pass}` failed: {message}")]
pub struct PassError {
    pub pass: String,
    pub message: String,
    /// Location of the offending node, if known.
    pub span: Option<Span>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No Cypress config found in {}", root.display())]
    SourceNotFound { root: PathBuf },

    #[error("Could not read Cypress config {}: {message}", path.display())]
    SourceParse { path: PathBuf, message: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render Playwright config: {0}")]
    Render(#[from] serde_json::Error),
}
