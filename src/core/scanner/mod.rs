// src/core/scanner/mod.rs

//! The scanner contract and the built-in scanners.
//!
//! A scanner inspects one domain and returns zero or more rows matching the
//! columns it declares. One instance is shared by every worker of its pool, so
//! implementations take `&self` and must not mutate shared state while
//! scanning.

pub mod dns_scanner;
pub mod fingerprint_scanner;
pub mod headers_scanner;
pub mod noop_scanner;
pub mod registry;
pub mod tls_scanner;

use crate::config::ScanOptions;
use crate::core::error::ScanError;
use crate::core::models::ResultRow;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

pub use registry::Registry;

/// User agent sent by the HTTP-based scanners unless `user_agent` is set.
pub const DEFAULT_USER_AGENT: &str = "domain-sweep/0.1";

/// Request timeout used by the network scanners unless `timeout` is set.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Optional traits a scanner can declare. Everything is absent by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// An external command that must be on `PATH` before the run starts.
    pub command: Option<&'static str>,
    /// Preferred worker count, overridden by serial mode.
    pub workers: Option<usize>,
}

/// A pluggable unit that scans one domain at a time.
#[async_trait]
pub trait Scanner: Send + Sync + Debug {
    /// Stable identifier; also the result file name.
    fn name(&self) -> &str;

    /// Output columns, without the leading `Domain` and `Base Domain`.
    fn headers(&self) -> &[&'static str];

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Readiness check, called once before any domain is scanned.
    ///
    /// `Ok(false)` rejects the run.
    async fn init(&self, _options: &ScanOptions) -> Result<bool, ScanError> {
        Ok(true)
    }

    /// Scans a single domain.
    async fn scan(&self, domain: &str, options: &ScanOptions) -> Result<Vec<ResultRow>, ScanError>;
}

/// Shared handle to a loaded scanner.
pub type ArcScanner = Arc<dyn Scanner>;

/// Timeout for network calls, from the `timeout` option.
pub(crate) fn timeout_from(options: &ScanOptions) -> Duration {
    Duration::from_secs(options.get_u64("timeout").unwrap_or(DEFAULT_TIMEOUT_SECS))
}

/// Builds the HTTP client shared by the header and fingerprint scanners.
pub(crate) fn http_client(options: &ScanOptions) -> Result<reqwest::Client, ScanError> {
    let user_agent = options.get("user_agent").unwrap_or(DEFAULT_USER_AGENT);
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout_from(options))
        .build()
        .map_err(|e| ScanError::Network(format!("Failed to build HTTP client: {e}")))
}
