// src/core/scanner/noop_scanner.rs

use async_trait::async_trait;
use tracing::debug;

use crate::config::ScanOptions;
use crate::core::error::ScanError;
use crate::core::models::ResultRow;
use crate::core::scanner::Scanner;

/// Does no network work. Useful for smoke-testing a domain list and the
/// output pipeline. Setting `noop.fail=<domain>` makes that domain fail.
#[derive(Debug, Default)]
pub struct NoopScanner;

#[async_trait]
impl Scanner for NoopScanner {
    fn name(&self) -> &str {
        "noop"
    }

    fn headers(&self) -> &[&'static str] {
        &["Completed"]
    }

    async fn scan(&self, domain: &str, options: &ScanOptions) -> Result<Vec<ResultRow>, ScanError> {
        if options.get("noop.fail") == Some(domain) {
            return Err(ScanError::failed(format!("configured to fail on {domain}")));
        }
        debug!(domain, "noop scan.");
        Ok(vec![vec!["true".to_string()]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_single_row() {
        let rows = NoopScanner.scan("a.com", &ScanOptions::new()).await.unwrap();
        assert_eq!(rows, vec![vec!["true".to_string()]]);
    }

    #[tokio::test]
    async fn fails_on_configured_domain() {
        let options = ScanOptions::new().with("noop.fail", "b.com");
        assert!(NoopScanner.scan("b.com", &options).await.is_err());
        assert!(NoopScanner.scan("a.com", &options).await.is_ok());
    }
}
