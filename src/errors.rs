//! Error types for result parsing and cache access.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A result entry that does not match what the experiment harness writes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown outcome '{0}', expected one of build-fail, test-fail, test-pass, test-skipped")]
    InvalidOutcome(String),
    #[error("unknown source kind '{0}', expected 'reg' or 'gh'")]
    UnknownSourceKind(String),
    #[error("result directory '{0}' does not end in <source-kind>/<package>")]
    MalformedPath(String),
}

/// Failure reading or writing a cache artifact.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cache artifact '{key}' is not valid JSON: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cache lock poisoned")]
    Poisoned,
}
