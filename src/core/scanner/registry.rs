// src/core/scanner/registry.rs

//! Scanner Registry: maps scanner names to constructors and vets them
//! before a run.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ScanOptions;
use crate::core::error::EngineError;
use crate::core::scanner::dns_scanner::DnsScanner;
use crate::core::scanner::fingerprint_scanner::FingerprintScanner;
use crate::core::scanner::headers_scanner::HeadersScanner;
use crate::core::scanner::noop_scanner::NoopScanner;
use crate::core::scanner::tls_scanner::TlsScanner;
use crate::core::scanner::ArcScanner;
use crate::core::sink::is_valid_scanner_name;

type Factory = Box<dyn Fn() -> ArcScanner + Send + Sync>;

/// A table of scanner names to constructors.
///
/// `Registry::default()` is empty; use [`Registry::builtin`] for the shipped
/// scanners.
#[derive(Default)]
pub struct Registry {
    factories: BTreeMap<String, Factory>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every scanner shipped with this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.insert("noop", || Arc::new(NoopScanner));
        registry.insert("dns", || Arc::new(DnsScanner));
        registry.insert("headers", || Arc::new(HeadersScanner));
        registry.insert("tls", || Arc::new(TlsScanner));
        registry.insert("fingerprint", || Arc::new(FingerprintScanner));
        registry
    }

    /// Adds (or replaces) a scanner under `name`.
    ///
    /// The name doubles as the result file name, so anything with a path
    /// separator, or `.`/`..`, is refused.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<&mut Self, EngineError>
    where
        F: Fn() -> ArcScanner + Send + Sync + 'static,
    {
        let name = name.into();
        if !is_valid_scanner_name(&name) {
            return Err(EngineError::InvalidScannerName { name });
        }
        self.insert(name, factory);
        Ok(self)
    }

    fn insert<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> ArcScanner + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Resolves a comma-separated list into loaded, ready scanners.
    ///
    /// Order follows the list. An unknown or repeated name, a missing
    /// dependency or a failed readiness check fails the whole load.
    pub async fn load(&self, list: &str, options: &ScanOptions) -> Result<Vec<ArcScanner>, EngineError> {
        let names: Vec<&str> = list.split(',').map(str::trim).filter(|n| !n.is_empty()).collect();
        if names.is_empty() {
            return Err(EngineError::NoScanners);
        }
        let mut seen = BTreeSet::new();
        if let Some(name) = names.iter().find(|n| !seen.insert(**n)) {
            return Err(EngineError::DuplicateScanner { name: name.to_string() });
        }

        let mut scanners = Vec::with_capacity(names.len());
        for name in names {
            let factory = self
                .factories
                .get(name)
                .ok_or_else(|| EngineError::UnknownScanner { name: name.to_string() })?;
            let scanner = factory();
            check_ready(&scanner, options).await?;
            debug!(scanner = name, "Scanner loaded.");
            scanners.push(scanner);
        }
        info!(count = scanners.len(), "All scanners ready.");
        Ok(scanners)
    }
}

async fn check_ready(scanner: &ArcScanner, options: &ScanOptions) -> Result<(), EngineError> {
    let name = scanner.name().to_string();
    if let Some(command) = scanner.capabilities().command {
        which::which(command).map_err(|_| EngineError::MissingDependency {
            scanner: name.clone(),
            command: command.to_string(),
        })?;
        debug!(scanner = %name, command, "External dependency found.");
    }
    match scanner.init(options).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(EngineError::InitRejected { scanner: name }),
        Err(source) => Err(EngineError::InitFailed { scanner: name, source }),
    }
}
