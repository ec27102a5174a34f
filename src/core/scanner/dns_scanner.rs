// src/core/scanner/dns_scanner.rs

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;
use tracing::{debug, info, warn};

use crate::config::ScanOptions;
use crate::core::error::ScanError;
use crate::core::models::{findings_cell, AnalysisFinding, ResultRow, Severity};
use crate::core::scanner::{timeout_from, Scanner};

/// A list of common DKIM selectors to check for when a specific one is not known.
const COMMON_DKIM_SELECTORS: &[&str] = &["google", "selector1", "selector2", "default", "dkim"];

/// Outcome of one lookup: a record, no record, or a resolver error message.
type Lookup<T> = Result<Option<T>, String>;

#[derive(Debug, Clone, PartialEq)]
struct DmarcData {
    record: String,
    policy: Option<String>,
}

/// Email-authentication and CAA records for a domain.
#[derive(Debug, Default)]
pub struct DnsScanner;

#[async_trait]
impl Scanner for DnsScanner {
    fn name(&self) -> &str {
        "dns"
    }

    fn headers(&self) -> &[&'static str] {
        &["SPF", "DMARC", "DMARC Policy", "DKIM Selectors", "CAA", "Findings"]
    }

    async fn scan(&self, domain: &str, options: &ScanOptions) -> Result<Vec<ResultRow>, ScanError> {
        // These records live on the zone apex, not on www.
        let root = domain.strip_prefix("www.").unwrap_or(domain);
        info!(domain = %root, "Starting DNS scan.");

        let mut opts = ResolverOpts::default();
        opts.timeout = timeout_from(options);
        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), opts);

        let (spf, dmarc, dkim, caa) = tokio::join!(
            lookup_spf(&resolver, root),
            lookup_dmarc(&resolver, root),
            lookup_dkim(&resolver, root),
            lookup_caa(&resolver, root)
        );

        // The apex itself did not resolve and nothing else answered: treat the
        // domain as failed rather than writing a row of blanks.
        if let (Err(e), Ok(None), Ok(None)) = (&spf, &dmarc, &caa) {
            return Err(ScanError::Dns(e.clone()));
        }

        let findings = analyze_dns(&spf, &dmarc, &dkim, &caa);
        info!(findings = findings.len(), "DNS scan finished.");

        let policy = match &dmarc {
            Ok(Some(d)) => d.policy.clone().unwrap_or_default(),
            _ => String::new(),
        };
        Ok(vec![vec![
            cell(&spf, Clone::clone),
            cell(&dmarc, |d| d.record.clone()),
            policy,
            cell(&dkim, |selectors| selectors.join(" ")),
            cell(&caa, |records| records.join(" | ")),
            findings_cell(&findings),
        ]])
    }
}

fn cell<T>(lookup: &Lookup<T>, render: impl FnOnce(&T) -> String) -> String {
    match lookup {
        Ok(Some(value)) => render(value),
        Ok(None) => String::new(),
        Err(e) => format!("error: {e}"),
    }
}

fn analyze_dns(
    spf: &Lookup<String>,
    dmarc: &Lookup<DmarcData>,
    dkim: &Lookup<Vec<String>>,
    caa: &Lookup<Vec<String>>,
) -> Vec<AnalysisFinding> {
    let mut analyses = Vec::new();

    match dmarc {
        Ok(Some(d)) if d.policy.as_deref() == Some("none") => {
            analyses.push(AnalysisFinding::new(Severity::Warning, "DNS_DMARC_POLICY_NONE"));
        }
        Ok(None) => analyses.push(AnalysisFinding::new(Severity::Critical, "DNS_DMARC_MISSING")),
        _ => {}
    }

    match spf {
        Ok(Some(record)) if record.ends_with("~all") => {
            analyses.push(AnalysisFinding::new(Severity::Info, "DNS_SPF_POLICY_SOFTFAIL"));
        }
        Ok(Some(record)) if record.ends_with("?all") => {
            analyses.push(AnalysisFinding::new(Severity::Info, "DNS_SPF_POLICY_NEUTRAL"));
        }
        Ok(None) => analyses.push(AnalysisFinding::new(Severity::Warning, "DNS_SPF_MISSING")),
        _ => {}
    }

    if let Ok(None) = dkim {
        analyses.push(AnalysisFinding::new(Severity::Info, "DNS_DKIM_MISSING"));
    }
    if let Ok(None) = caa {
        analyses.push(AnalysisFinding::new(Severity::Info, "DNS_CAA_MISSING"));
    }

    analyses
}

/// SPF lives in a TXT record starting with `v=spf1`.
async fn lookup_spf(resolver: &TokioAsyncResolver, domain: &str) -> Lookup<String> {
    debug!(domain, "Looking up SPF record.");
    match resolver.txt_lookup(domain).await {
        Ok(txt_records) => Ok(txt_records
            .iter()
            .map(|r| r.to_string())
            .find(|r| r.starts_with("v=spf1"))),
        Err(e) => {
            warn!(domain, error = %e, "SPF lookup failed.");
            Err(e.to_string())
        }
    }
}

/// DMARC lives in a TXT record at `_dmarc.<domain>`.
async fn lookup_dmarc(resolver: &TokioAsyncResolver, domain: &str) -> Lookup<DmarcData> {
    let dmarc_target = format!("_dmarc.{domain}");
    debug!(domain = %dmarc_target, "Looking up DMARC record.");
    match resolver.txt_lookup(&dmarc_target).await {
        Ok(txt_records) => Ok(txt_records.iter().next().map(|record| {
            let record = record.to_string();
            let policy = parse_dmarc_policy(&record);
            DmarcData { record, policy }
        })),
        Err(e) => {
            // NXDOMAIN on _dmarc simply means no policy is published.
            debug!(domain = %dmarc_target, error = %e, "No DMARC record.");
            Ok(None)
        }
    }
}

fn parse_dmarc_policy(record: &str) -> Option<String> {
    record
        .split(';')
        .map(str::trim)
        .find(|s| s.starts_with("p="))
        .and_then(|s| s.split('=').nth(1))
        .map(|s| s.trim().to_string())
}

/// Selectors under `<selector>._domainkey.<domain>` that publish a DKIM key.
async fn lookup_dkim(resolver: &TokioAsyncResolver, domain: &str) -> Lookup<Vec<String>> {
    let mut found = Vec::new();
    for selector in COMMON_DKIM_SELECTORS {
        let dkim_target = format!("{selector}._domainkey.{domain}");
        if let Ok(txt_records) = resolver.txt_lookup(&dkim_target).await {
            if txt_records.iter().any(|r| r.to_string().starts_with("v=DKIM1")) {
                debug!(selector, "Found valid DKIM record.");
                found.push(selector.to_string());
            }
        }
    }
    Ok(if found.is_empty() { None } else { Some(found) })
}

async fn lookup_caa(resolver: &TokioAsyncResolver, domain: &str) -> Lookup<Vec<String>> {
    debug!(domain, "Looking up CAA records.");
    match resolver.lookup(domain, RecordType::CAA).await {
        Ok(caa_lookup) => {
            let records: Vec<String> = caa_lookup.iter().map(|r| r.to_string()).collect();
            Ok(if records.is_empty() { None } else { Some(records) })
        }
        Err(e) => {
            debug!(domain, error = %e, "CAA lookup returned no records.");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dmarc_policy_tag() {
        assert_eq!(
            parse_dmarc_policy("v=DMARC1; p=reject; rua=mailto:d@example.gov").as_deref(),
            Some("reject")
        );
        assert_eq!(parse_dmarc_policy("v=DMARC1"), None);
    }

    #[test]
    fn flags_missing_and_weak_records() {
        let spf: Lookup<String> = Ok(Some("v=spf1 include:_spf.example.com ~all".into()));
        let dmarc: Lookup<DmarcData> = Ok(Some(DmarcData {
            record: "v=DMARC1; p=none".into(),
            policy: Some("none".into()),
        }));
        let codes: Vec<_> = analyze_dns(&spf, &dmarc, &Ok(None), &Ok(Some(vec!["0 issue \"letsencrypt.org\"".into()])))
            .into_iter()
            .map(|f| f.code)
            .collect();
        assert_eq!(codes, vec!["DNS_DMARC_POLICY_NONE", "DNS_SPF_POLICY_SOFTFAIL", "DNS_DKIM_MISSING"]);
    }

    #[test]
    fn declares_one_column_per_rendered_cell() {
        assert_eq!(
            DnsScanner.headers(),
            ["SPF", "DMARC", "DMARC Policy", "DKIM Selectors", "CAA", "Findings"]
        );
    }

    #[test]
    fn renders_cells() {
        let err: Lookup<String> = Err("timeout".into());
        assert_eq!(cell(&err, Clone::clone), "error: timeout");
        assert_eq!(cell(&Ok::<Option<String>, String>(None), Clone::clone), "");
    }
}
