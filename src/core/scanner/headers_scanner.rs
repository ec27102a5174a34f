// src/core/scanner/headers_scanner.rs

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tracing::{debug, info, warn};

use crate::config::ScanOptions;
use crate::core::error::ScanError;
use crate::core::models::{findings_cell, AnalysisFinding, ResultRow, Severity};
use crate::core::scanner::{http_client, Scanner};

/// Security headers inspected on the HTTPS landing page, in column order.
const CHECKED_HEADERS: [&str; 4] = [
    "strict-transport-security",
    "content-security-policy",
    "x-frame-options",
    "x-content-type-options",
];

/// Fetches `https://<domain>` and reports on common security headers.
#[derive(Debug, Default)]
pub struct HeadersScanner;

#[async_trait]
impl Scanner for HeadersScanner {
    fn name(&self) -> &str {
        "headers"
    }

    fn headers(&self) -> &[&'static str] {
        &["Status", "HSTS", "CSP", "X-Frame-Options", "X-Content-Type-Options", "Findings"]
    }

    async fn scan(&self, domain: &str, options: &ScanOptions) -> Result<Vec<ResultRow>, ScanError> {
        info!(domain, "Starting headers scan.");
        let client = http_client(options)?;
        let url = format!("https://{domain}");

        let response = client.get(&url).send().await?;
        info!(status = %response.status(), "Received HTTP response for headers scan.");

        let values: Vec<Option<String>> = CHECKED_HEADERS
            .iter()
            .map(|name| check_header(response.headers(), name))
            .collect();
        let findings = analyze_headers(&values);
        debug!(findings = findings.len(), "Headers scan finished.");

        let mut row = Vec::with_capacity(CHECKED_HEADERS.len() + 2);
        row.push(response.status().as_u16().to_string());
        row.extend(values.into_iter().map(Option::unwrap_or_default));
        row.push(findings_cell(&findings));
        Ok(vec![row])
    }
}

/// Value of a header if present. Non-UTF-8 values are reported as a placeholder.
fn check_header(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?;
    match value.to_str() {
        Ok(s) => {
            debug!(header_name = name, value = s, "Header found.");
            Some(s.to_string())
        }
        Err(_) => {
            warn!(header_name = name, "Header found but contained invalid UTF-8.");
            Some("[Invalid UTF-8]".to_string())
        }
    }
}

/// Missing-header findings, in the same order as `CHECKED_HEADERS`.
fn analyze_headers(values: &[Option<String>]) -> Vec<AnalysisFinding> {
    const MISSING: [(Severity, &str); 4] = [
        (Severity::Warning, "HEADERS_HSTS_MISSING"),
        (Severity::Warning, "HEADERS_CSP_MISSING"),
        (Severity::Warning, "HEADERS_X_FRAME_OPTIONS_MISSING"),
        (Severity::Info, "HEADERS_X_CONTENT_TYPE_OPTIONS_MISSING"),
    ];
    values
        .iter()
        .zip(MISSING)
        .filter(|(value, _)| value.is_none())
        .map(|(_, (severity, code))| AnalysisFinding::new(severity, code))
        .collect()
}
