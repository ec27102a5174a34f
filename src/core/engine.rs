// src/core/engine.rs

//! Drives a full run: purge old results, run each scanner's pool in turn,
//! optionally sort, and write the run metadata.

use chrono::Utc;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};

use crate::config::{RunConfig, ScanOptions};
use crate::core::domains::DomainSource;
use crate::core::error::EngineError;
use crate::core::models::{PoolStats, RunMetadata, RunReport, ScannerOutcome};
use crate::core::scanner::ArcScanner;
use crate::core::scheduler::{run_pool, PoolAborted};
use crate::core::sink::{clear_results, result_path, ResultSink};
use crate::core::sort::sort_results;

/// File name of the run metadata record inside the results directory.
pub const METADATA_FILE: &str = "meta.json";

/// Runs every scanner over every domain and writes the results.
///
/// Startup problems (an unreadable results directory, for instance) come
/// back as `Err`. A scanner whose sink or input breaks mid-run is recorded in
/// its `ScannerOutcome` and the run moves on to the next scanner.
pub async fn run(
    config: &RunConfig,
    scanners: &[ArcScanner],
    source: &DomainSource,
) -> Result<RunReport, EngineError> {
    if scanners.is_empty() {
        return Err(EngineError::NoScanners);
    }
    source.validate()?;

    let start_time = Utc::now();
    clear_results(&config.output_dir)?;

    let options = Arc::new(config.options.clone());
    let mut outcomes = Vec::with_capacity(scanners.len());

    for scanner in scanners {
        let name = scanner.name().to_string();
        let span = info_span!("scanner", scanner = %name);
        let result = run_scanner(config, scanner, source, options.clone())
            .instrument(span)
            .await;
        let outcome = match result {
            Ok(stats) => ScannerOutcome { scanner: name, stats, error: None },
            Err(aborted) => {
                error!(scanner = %name, error = %aborted.error, "Scanner aborted.");
                ScannerOutcome { scanner: name, stats: aborted.stats, error: Some(aborted.error.to_string()) }
            }
        };
        outcomes.push(outcome);
    }

    if config.sort {
        for outcome in outcomes.iter_mut().filter(|o| o.is_ok()) {
            let path = result_path(&config.output_dir, &outcome.scanner);
            if let Err(e) = sort_results(&path) {
                error!(scanner = %outcome.scanner, error = %e, "Sorting failed; unsorted results kept.");
                outcome.error = Some(e.to_string());
            }
        }
    }

    let metadata = RunMetadata {
        start_time,
        end_time: Utc::now(),
        command: config.command.clone(),
        scanners: scanners.iter().map(|s| s.name().to_string()).collect(),
        domain_source: source.describe(),
    };
    write_metadata(&config.output_dir, &metadata)?;
    info!(
        scanners = metadata.scanners.len(),
        elapsed_ms = (metadata.end_time - metadata.start_time).num_milliseconds(),
        "Run complete."
    );

    Ok(RunReport { metadata, outcomes })
}

async fn run_scanner(
    config: &RunConfig,
    scanner: &ArcScanner,
    source: &DomainSource,
    options: Arc<ScanOptions>,
) -> Result<PoolStats, PoolAborted> {
    let sink = Arc::new(ResultSink::create(&config.output_dir, scanner.name(), scanner.headers())?);
    let domains = source.domains(config.normalized_suffix())?;
    let workers = config.workers_for(scanner.capabilities().workers);

    let stats = run_pool(scanner.clone(), domains, workers, options, sink.clone()).await;
    // Flush whatever made it out even when the pool aborted.
    let flushed = sink.finish().await;
    let stats = stats?;
    flushed.map_err(|error| PoolAborted { stats, error })?;
    Ok(stats)
}

fn write_metadata(dir: &Path, metadata: &RunMetadata) -> Result<(), EngineError> {
    let json = serde_json::to_string_pretty(metadata)?;
    fs::write(dir.join(METADATA_FILE), json)?;
    Ok(())
}
