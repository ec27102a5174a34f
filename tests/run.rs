use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use domain_sweep::core::engine::METADATA_FILE;
use domain_sweep::{
    run, ArcScanner, DomainSource, Registry, ResultRow, RunConfig, RunMetadata, ScanError, ScanOptions, Scanner,
};

/// Emits one row per domain, echoing it in every declared column.
#[derive(Debug)]
struct Echo {
    name: &'static str,
    columns: &'static [&'static str],
    fail_on: Option<&'static str>,
}

#[async_trait]
impl Scanner for Echo {
    fn name(&self) -> &str {
        self.name
    }

    fn headers(&self) -> &[&'static str] {
        self.columns
    }

    async fn scan(&self, domain: &str, _options: &ScanOptions) -> Result<Vec<ResultRow>, ScanError> {
        if self.fail_on == Some(domain) {
            return Err(ScanError::failed("unreachable host"));
        }
        Ok(vec![self.columns.iter().map(|c| format!("{c}:{domain}")).collect()])
    }
}

fn alpha() -> ArcScanner {
    Arc::new(Echo { name: "alpha", columns: &["A"], fail_on: None })
}

fn beta() -> ArcScanner {
    Arc::new(Echo { name: "beta", columns: &["B", "C"], fail_on: None })
}

fn config(results: &Path) -> RunConfig {
    RunConfig {
        output_dir: results.to_path_buf(),
        command: "domain-sweep domains.csv --scan=alpha,beta".into(),
        ..Default::default()
    }
}

fn write_domains(dir: &Path, body: &str) -> DomainSource {
    let path = dir.join("domains.csv");
    fs::write(&path, body).unwrap();
    DomainSource::File(path)
}

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path).unwrap().lines().map(String::from).collect()
}

#[tokio::test]
async fn one_file_per_scanner_with_declared_headers() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("results");
    let source = write_domains(dir.path(), "domain\na.com\nb.com\n");

    let report = run(&config(&results), &[alpha(), beta()], &source).await.unwrap();
    assert!(report.succeeded());

    let alpha_lines = lines(&results.join("alpha.csv"));
    assert_eq!(alpha_lines[0], "Domain,Base Domain,A");
    assert_eq!(alpha_lines.len(), 3);

    let mut beta_lines = lines(&results.join("beta.csv"));
    assert_eq!(beta_lines.remove(0), "Domain,Base Domain,B,C");
    beta_lines.sort();
    assert_eq!(beta_lines, vec!["a.com,a.com,B:a.com,C:a.com", "b.com,b.com,B:b.com,C:b.com"]);

    let csv_count = fs::read_dir(&results)
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().extension().is_some_and(|x| x == "csv"))
        .count();
    assert_eq!(csv_count, 2);
}

#[tokio::test]
async fn previous_results_are_purged() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("results");
    fs::create_dir_all(&results).unwrap();
    fs::write(results.join("gamma.csv"), "Domain,Base Domain,G\nold.com,old.com,x\n").unwrap();
    fs::write(results.join("alpha.csv"), "Domain,Base Domain,A\nold.com,old.com,x\n").unwrap();
    let source = DomainSource::Single("a.com".into());

    run(&config(&results), &[alpha()], &source).await.unwrap();

    assert!(!results.join("gamma.csv").exists());
    assert_eq!(lines(&results.join("alpha.csv")), vec!["Domain,Base Domain,A", "a.com,a.com,A:a.com"]);
}

#[tokio::test]
async fn failing_domain_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("results");
    let source = write_domains(dir.path(), "a.com\nb.com\nc.com\nd.com\n");
    let scanner: ArcScanner = Arc::new(Echo { name: "alpha", columns: &["A"], fail_on: Some("c.com") });

    let report = run(&config(&results), &[scanner, beta()], &source).await.unwrap();
    assert!(report.succeeded());
    assert_eq!(report.outcomes[0].stats.rows, 3);
    assert_eq!(report.outcomes[0].stats.failures, 1);
    assert_eq!(report.outcomes[1].stats.rows, 4);

    let alpha_lines = lines(&results.join("alpha.csv"));
    assert_eq!(alpha_lines.len(), 4);
    assert!(alpha_lines.iter().all(|l| !l.starts_with("c.com")));
}

#[tokio::test]
async fn suffix_and_sort_apply_to_file_input() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("results");
    let source = write_domains(dir.path(), "Domain Name\nZeta\nalpha\nMid\n");
    let config = RunConfig {
        suffix: Some("gov".into()),
        sort: true,
        serial: true,
        ..config(&results)
    };

    run(&config, &[alpha()], &source).await.unwrap();

    assert_eq!(
        lines(&results.join("alpha.csv")),
        vec![
            "Domain,Base Domain,A",
            "alpha.gov,alpha.gov,A:alpha.gov",
            "mid.gov,mid.gov,A:mid.gov",
            "zeta.gov,zeta.gov,A:zeta.gov",
        ]
    );
}

#[tokio::test]
async fn metadata_is_written_once_per_run() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("results");
    let source = DomainSource::Single("a.com".into());
    let config = config(&results);

    let report = run(&config, &[alpha(), beta()], &source).await.unwrap();

    let meta: RunMetadata = serde_json::from_str(&fs::read_to_string(results.join(METADATA_FILE)).unwrap()).unwrap();
    assert_eq!(meta, report.metadata);
    assert_eq!(meta.command, config.command);
    assert_eq!(meta.scanners, vec!["alpha", "beta"]);
    assert_eq!(meta.domain_source, "a.com");
}

#[tokio::test]
async fn noop_scanner_through_the_registry() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("results");
    let source = write_domains(dir.path(), "a.com\nb.com\n");
    let options = ScanOptions::new().with("noop.fail", "b.com");
    let scanners = Registry::builtin().load("noop", &options).await.unwrap();
    let config = RunConfig { options, ..config(&results) };

    let report = run(&config, &scanners, &source).await.unwrap();
    assert_eq!(report.outcomes[0].stats.rows, 1);
    assert_eq!(report.outcomes[0].stats.failures, 1);
    assert_eq!(
        lines(&results.join("noop.csv")),
        vec!["Domain,Base Domain,Completed", "a.com,a.com,true"]
    );
}

#[tokio::test]
async fn broken_sink_stops_only_its_own_scanner() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("results");
    // A directory where alpha's result file should go survives the purge
    // and makes the sink impossible to open.
    fs::create_dir_all(results.join("alpha.csv")).unwrap();
    let source = write_domains(dir.path(), "a.com\nb.com\n");

    let report = run(&config(&results), &[alpha(), beta()], &source).await.unwrap();

    assert!(!report.succeeded());
    assert!(report.outcomes[0].error.is_some());
    assert!(report.outcomes[1].is_ok());
    assert_eq!(report.outcomes[1].stats.rows, 2);
    assert_eq!(lines(&results.join("beta.csv")).len(), 3);

    let meta: RunMetadata = serde_json::from_str(&fs::read_to_string(results.join(METADATA_FILE)).unwrap()).unwrap();
    assert_eq!(meta.scanners, vec!["alpha", "beta"]);
}

#[tokio::test]
async fn unreadable_row_keeps_counts_of_what_was_written() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("results");
    let path = dir.path().join("domains.csv");
    let mut body = b"a.com\nb.com\nc.com\n".to_vec();
    body.extend_from_slice(b"\xff\xfe\nd.com\n");
    fs::write(&path, body).unwrap();
    let config = RunConfig { serial: true, sort: true, ..config(&results) };

    let report = run(&config, &[alpha(), beta()], &DomainSource::File(path)).await.unwrap();

    assert!(!report.succeeded());
    for outcome in &report.outcomes {
        assert!(outcome.error.as_deref().is_some_and(|e| e.starts_with("CSV error")));
        assert_eq!(outcome.stats.domains, 3);
        assert!(outcome.stats.rows >= 1);
        let written = lines(&results.join(format!("{}.csv", outcome.scanner)));
        assert!(written.len() > outcome.stats.rows);
    }
    assert!(results.join(METADATA_FILE).exists());
}
