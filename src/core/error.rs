// src/core/error.rs

//! Error types for the scan engine.
//!
//! Two families live here. `EngineError` covers everything that stops a run
//! (or a single scanner's pool) from proceeding. `ScanError` is what a scanner
//! returns for one domain; the scheduler logs it and moves on.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort the run at startup, or abort one scanner's pool mid-run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The scanner list was empty.
    #[error("no scanners specified")]
    NoScanners,

    /// A requested scanner name has no registered implementation.
    #[error("unknown scanner '{name}'")]
    UnknownScanner {
        /// The name as given on the command line.
        name: String,
    },

    /// A scanner declares an external command that is not on the host.
    #[error("scanner '{scanner}' requires '{command}', which was not found on PATH")]
    MissingDependency {
        /// Scanner declaring the dependency.
        scanner: String,
        /// Command that could not be resolved.
        command: String,
    },

    /// The same scanner was requested more than once.
    #[error("scanner '{name}' is listed more than once")]
    DuplicateScanner {
        /// The repeated name.
        name: String,
    },

    /// A scanner name cannot be used as a result file name.
    #[error("scanner name '{name}' is not a valid file name")]
    InvalidScannerName {
        /// The offending name.
        name: String,
    },

    /// A scanner's readiness hook returned a negative answer.
    #[error("scanner '{scanner}' refused to initialize")]
    InitRejected {
        /// Scanner whose hook rejected the run.
        scanner: String,
    },

    /// A scanner's readiness hook itself failed.
    #[error("scanner '{scanner}' failed to initialize: {source}")]
    InitFailed {
        /// Scanner whose hook failed.
        scanner: String,
        /// The underlying failure.
        #[source]
        source: ScanError,
    },

    /// The domain source could not be opened.
    #[error("input '{}' is unreachable: {source}", path.display())]
    InputUnreachable {
        /// Path that was tried.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Fetching a remote domain list failed.
    #[error("failed to download '{url}': {message}")]
    Download {
        /// URL that was requested.
        url: String,
        /// What went wrong.
        message: String,
    },

    /// A worker task died outside of a scan call.
    #[error("worker pool for '{scanner}' failed: {message}")]
    Pool {
        /// Scanner whose pool failed.
        scanner: String,
        /// Description of the failure.
        message: String,
    },

    /// An I/O error on the results directory or a sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A CSV read or write failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Run metadata could not be serialized.
    #[error("metadata serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Atomic replacement of a sorted file failed.
    #[error("failed to replace '{}': {source}", path.display())]
    Persist {
        /// The file that was to be replaced.
        path: PathBuf,
        /// The I/O failure behind the rename.
        #[source]
        source: std::io::Error,
    },
}

/// A failure while scanning one domain.
///
/// Never fatal: the scheduler records it and the domain contributes no rows.
#[derive(Debug, Error)]
pub enum ScanError {
    /// An HTTP request failed.
    #[error("network error: {0}")]
    Network(String),

    /// A DNS lookup failed outright.
    #[error("DNS error: {0}")]
    Dns(String),

    /// A TLS connection or certificate parse failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The scan operation panicked.
    #[error("scan panicked: {0}")]
    Panicked(String),

    /// Any other failure reported by a scanner.
    #[error("{0}")]
    Failed(String),
}

impl ScanError {
    /// Creates a generic `Failed` error.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}
