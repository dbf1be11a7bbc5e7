//! Error types shared by the collectors.
//!
//! Only malformed source content is an error. Missing pseudo-files and failed
//! external commands are absorbed inside the collectors and replaced with
//! sentinel values, so they never show up here.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for micro-format parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

/// Hard failure of a discovery scan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectError {
    /// A source was read but its content does not match the expected format.
    #[error("malformed {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

impl CollectError {
    /// Attaches the offending source path to a parse error.
    pub fn parse(path: impl Into<PathBuf>, source: ParseError) -> Self {
        CollectError::Parse {
            path: path.into(),
            source,
        }
    }
}
