// src/core/scanner/tls_scanner.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tokio::task::spawn_blocking;
use tracing::{debug, error, info};
use x509_parser::prelude::*;

use crate::config::ScanOptions;
use crate::core::error::ScanError;
use crate::core::models::{findings_cell, AnalysisFinding, ResultRow, Severity};
use crate::core::scanner::{timeout_from, Capabilities, Scanner};

/// Days before expiry at which a certificate is flagged.
const EXPIRY_WARNING_DAYS: i64 = 30;

#[derive(Debug, Clone)]
struct CertificateInfo {
    subject_name: String,
    issuer_name: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    days_until_expiry: i64,
    is_valid: bool,
}

/// Connects to port 443 and reports on the leaf certificate.
#[derive(Debug, Default)]
pub struct TlsScanner;

#[async_trait]
impl Scanner for TlsScanner {
    fn name(&self) -> &str {
        "tls"
    }

    fn headers(&self) -> &[&'static str] {
        &["Subject", "Issuer", "Not Before", "Not After", "Days Until Expiry", "Valid", "Findings"]
    }

    // Each scan parks a blocking thread for the whole handshake.
    fn capabilities(&self) -> Capabilities {
        Capabilities { workers: Some(5), ..Capabilities::default() }
    }

    async fn scan(&self, domain: &str, options: &ScanOptions) -> Result<Vec<ResultRow>, ScanError> {
        info!(domain, "Starting TLS scan.");
        let domain_owned = domain.to_string();
        let timeout = timeout_from(options);

        let certificate = spawn_blocking(move || perform_tls_scan(&domain_owned, timeout))
            .await
            .map_err(|e| {
                error!(panic = %e, "Blocking TLS scan task panicked!");
                ScanError::Panicked(e.to_string())
            })??;

        let findings = analyze_certificate(certificate.as_ref());
        info!(findings = findings.len(), "TLS scan finished.");

        let mut row = match &certificate {
            Some(cert) => vec![
                cert.subject_name.clone(),
                cert.issuer_name.clone(),
                cert.not_before.to_rfc3339(),
                cert.not_after.to_rfc3339(),
                cert.days_until_expiry.to_string(),
                cert.is_valid.to_string(),
            ],
            None => vec![String::new(); 6],
        };
        row.push(findings_cell(&findings));
        Ok(vec![row])
    }
}

fn perform_tls_scan(domain: &str, timeout: Duration) -> Result<Option<CertificateInfo>, ScanError> {
    let connector = TlsConnector::new().map_err(|e| ScanError::Tls(format!("TlsConnector: {e}")))?;

    debug!(domain, "Connecting TCP stream to port 443.");
    let addr = (domain, 443)
        .to_socket_addrs()
        .map_err(|e| ScanError::Tls(format!("resolve: {e}")))?
        .next()
        .ok_or_else(|| ScanError::Tls(format!("no address for {domain}")))?;
    let stream = TcpStream::connect_timeout(&addr, timeout)
        .map_err(|e| ScanError::Tls(format!("TCP connection: {e}")))?;
    stream
        .set_read_timeout(Some(timeout))
        .and_then(|_| stream.set_write_timeout(Some(timeout)))
        .map_err(|e| ScanError::Tls(format!("socket timeout: {e}")))?;

    debug!(domain, "Performing TLS handshake.");
    let stream = connector
        .connect(domain, stream)
        .map_err(|e| ScanError::Tls(format!("handshake: {e}")))?;

    let cert = match stream.peer_certificate() {
        Ok(Some(c)) => c,
        Ok(None) => {
            debug!("TLS connection successful, but no peer certificate provided.");
            return Ok(None);
        }
        Err(e) => return Err(ScanError::Tls(format!("peer certificate: {e}"))),
    };

    let cert_der = cert
        .to_der()
        .map_err(|e| ScanError::Tls(format!("DER conversion: {e}")))?;
    let (_, x509) = parse_x509_certificate(&cert_der)
        .map_err(|e| ScanError::Tls(format!("X.509 parse: {e}")))?;
    debug!(subject = %x509.subject(), issuer = %x509.issuer(), "Parsed certificate.");

    let validity = x509.validity();
    let not_after = asn1_time_to_chrono_utc(&validity.not_after);
    let not_before = asn1_time_to_chrono_utc(&validity.not_before);
    let now = Utc::now();

    Ok(Some(CertificateInfo {
        subject_name: x509.subject().to_string(),
        issuer_name: x509.issuer().to_string(),
        not_before,
        not_after,
        days_until_expiry: not_after.signed_duration_since(now).num_days(),
        is_valid: now > not_before && now < not_after,
    }))
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

fn analyze_certificate(certificate: Option<&CertificateInfo>) -> Vec<AnalysisFinding> {
    let mut analyses = Vec::new();
    let Some(cert) = certificate else {
        analyses.push(AnalysisFinding::new(Severity::Warning, "SSL_NO_CERTIFICATE_FOUND"));
        return analyses;
    };
    if !cert.is_valid {
        analyses.push(AnalysisFinding::new(Severity::Critical, "SSL_EXPIRED"));
    }
    if (0..=EXPIRY_WARNING_DAYS).contains(&cert.days_until_expiry) {
        analyses.push(AnalysisFinding::new(Severity::Warning, "SSL_EXPIRING_SOON"));
    }
    analyses
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn certificate(days_left: i64) -> CertificateInfo {
        let now = Utc::now();
        let not_after = now + ChronoDuration::days(days_left);
        CertificateInfo {
            subject_name: "CN=example.gov".into(),
            issuer_name: "CN=Test CA".into(),
            not_before: now - ChronoDuration::days(60),
            not_after,
            days_until_expiry: days_left,
            is_valid: now < not_after,
        }
    }

    #[test]
    fn healthy_certificate_has_no_findings() {
        assert!(analyze_certificate(Some(&certificate(200))).is_empty());
    }

    #[test]
    fn flags_expiring_and_expired() {
        let codes: Vec<_> = analyze_certificate(Some(&certificate(10))).into_iter().map(|f| f.code).collect();
        assert_eq!(codes, vec!["SSL_EXPIRING_SOON"]);

        let codes: Vec<_> = analyze_certificate(Some(&certificate(-3))).into_iter().map(|f| f.code).collect();
        assert_eq!(codes, vec!["SSL_EXPIRED"]);
    }

    #[test]
    fn missing_certificate_is_flagged() {
        let codes: Vec<_> = analyze_certificate(None).into_iter().map(|f| f.code).collect();
        assert_eq!(codes, vec!["SSL_NO_CERTIFICATE_FOUND"]);
    }
}
