// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Result Rows ---

/// One output row as produced by a scanner, without the leading domain columns.
pub type ResultRow = Vec<String>;

/// The two columns every result stream starts with.
pub const LEADING_HEADERS: [&str; 2] = ["Domain", "Base Domain"];

// --- Findings ---

// Severity of a finding reported by one of the built-in scanners.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

// A single finding, identified by a stable machine-readable code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisFinding {
    pub severity: Severity,
    pub code: String,
}

impl AnalysisFinding {
    pub fn new(severity: Severity, code: &str) -> Self {
        Self { severity, code: code.to_string() }
    }
}

impl fmt::Display for AnalysisFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.severity, self.code)
    }
}

/// Renders findings into a single CSV cell, `;`-separated.
pub fn findings_cell(findings: &[AnalysisFinding]) -> String {
    findings.iter().map(|f| f.to_string()).collect::<Vec<_>>().join("; ")
}

// --- Run Bookkeeping ---

/// Counters collected by one scanner's worker pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Domains handed to workers.
    pub domains: usize,
    /// Rows appended to the sink.
    pub rows: usize,
    /// Domains whose scan failed or panicked.
    pub failures: usize,
}

/// How one scanner's pass went.
#[derive(Debug, Clone, Serialize)]
pub struct ScannerOutcome {
    pub scanner: String,
    pub stats: PoolStats,
    /// Set when the pool was aborted by a sink or input error.
    pub error: Option<String>,
}

impl ScannerOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Written once per run as `meta.json` in the results directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunMetadata {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub command: String,
    pub scanners: Vec<String>,
    pub domain_source: String,
}

/// Everything the engine learned during a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub metadata: RunMetadata,
    pub outcomes: Vec<ScannerOutcome>,
}

impl RunReport {
    /// True when every scanner completed without a fatal pool error.
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(ScannerOutcome::is_ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn findings_render_into_one_cell() {
        let findings = vec![
            AnalysisFinding::new(Severity::Critical, "DNS_DMARC_MISSING"),
            AnalysisFinding::new(Severity::Info, "DNS_CAA_MISSING"),
        ];
        assert_eq!(
            findings_cell(&findings),
            "Critical:DNS_DMARC_MISSING; Info:DNS_CAA_MISSING"
        );
        assert_eq!(findings_cell(&[]), "");
    }
}
