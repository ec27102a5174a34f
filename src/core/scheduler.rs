// src/core/scheduler.rs

//! Scan Scheduler: runs one scanner over every domain with a bounded pool.
//!
//! A feeder task pulls domains lazily from the source and pushes them into a
//! bounded channel. A fixed number of workers share the receiving end and
//! each handle one domain at a time. A failing or panicking scan costs only
//! its own domain; an error on the sink or the input stops the whole pool.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::ScanOptions;
use crate::core::domains::{base_domain, Domains};
use crate::core::error::{EngineError, ScanError};
use crate::core::models::PoolStats;
use crate::core::scanner::ArcScanner;
use crate::core::sink::ResultSink;

/// A pool stopped by a sink or input error, with what it finished before.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PoolAborted {
    pub stats: PoolStats,
    #[source]
    pub error: EngineError,
}

impl From<EngineError> for PoolAborted {
    fn from(error: EngineError) -> Self {
        Self { stats: PoolStats::default(), error }
    }
}

/// Running totals shared by the feeder and the workers.
#[derive(Default)]
struct Counters {
    domains: AtomicUsize,
    rows: AtomicUsize,
    failures: AtomicUsize,
}

impl Counters {
    fn snapshot(&self) -> PoolStats {
        PoolStats {
            domains: self.domains.load(Ordering::SeqCst),
            rows: self.rows.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
        }
    }
}

/// Scans every domain from `domains` with `scanner`, appending rows to `sink`.
///
/// Returns once every domain has been handled, or on the first sink or input
/// error, in which case the remaining tasks are aborted and the counts so far
/// travel with the error.
pub async fn run_pool(
    scanner: ArcScanner,
    domains: Domains,
    workers: usize,
    options: Arc<ScanOptions>,
    sink: Arc<ResultSink>,
) -> Result<PoolStats, PoolAborted> {
    let workers = workers.max(1);
    let name = scanner.name().to_string();
    info!(scanner = %name, workers, "Starting worker pool.");

    let (tx, rx) = mpsc::channel::<String>(workers);
    let rx = Arc::new(Mutex::new(rx));
    let counters = Arc::new(Counters::default());
    let mut pool: JoinSet<Result<(), EngineError>> = JoinSet::new();

    pool.spawn(feed(domains, tx, counters.clone()));
    for id in 0..workers {
        pool.spawn(work(id, scanner.clone(), rx.clone(), options.clone(), sink.clone(), counters.clone()));
    }
    drop(rx);

    while let Some(joined) = pool.join_next().await {
        let error = match joined {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => e,
            Err(e) => EngineError::Pool { scanner: name.clone(), message: e.to_string() },
        };
        pool.abort_all();
        // Let the aborted tasks unwind so the counts below are final.
        while pool.join_next().await.is_some() {}
        let stats = counters.snapshot();
        warn!(scanner = %name, rows = stats.rows, error = %error, "Worker pool aborted.");
        return Err(PoolAborted { stats, error });
    }

    let stats = counters.snapshot();
    info!(
        scanner = %name,
        domains = stats.domains,
        rows = stats.rows,
        failures = stats.failures,
        "Worker pool finished."
    );
    Ok(stats)
}

/// Pushes domains into the channel until the source runs dry.
async fn feed(domains: Domains, tx: mpsc::Sender<String>, counters: Arc<Counters>) -> Result<(), EngineError> {
    for domain in domains {
        let domain = domain?;
        if tx.send(domain).await.is_err() {
            // Every worker is gone; nothing left to feed.
            break;
        }
        counters.domains.fetch_add(1, Ordering::SeqCst);
    }
    Ok(())
}

/// One worker: pull a domain, scan it, write its rows, repeat.
async fn work(
    id: usize,
    scanner: ArcScanner,
    rx: Arc<Mutex<mpsc::Receiver<String>>>,
    options: Arc<ScanOptions>,
    sink: Arc<ResultSink>,
    counters: Arc<Counters>,
) -> Result<(), EngineError> {
    loop {
        // The lock is held only while waiting for the next domain.
        let next = rx.lock().await.recv().await;
        let Some(domain) = next else { break };

        let rows = match scan_isolated(&scanner, &domain, &options).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(scanner = scanner.name(), domain = %domain, error = %e, "Scan failed.");
                counters.failures.fetch_add(1, Ordering::SeqCst);
                continue;
            }
        };

        let base = base_domain(&domain);
        for row in rows.iter().filter(|r| !r.is_empty()) {
            sink.append(&domain, &base, row).await?;
            counters.rows.fetch_add(1, Ordering::SeqCst);
        }
        debug!(worker = id, domain = %domain, rows = rows.len(), "Domain done.");
    }
    Ok(())
}

/// Runs one scan, turning a panic into an ordinary per-domain failure.
async fn scan_isolated(
    scanner: &ArcScanner,
    domain: &str,
    options: &ScanOptions,
) -> Result<Vec<Vec<String>>, ScanError> {
    match AssertUnwindSafe(scanner.scan(domain, options)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ScanError::Panicked(message))
        }
    }
}
