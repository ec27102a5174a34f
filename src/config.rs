// src/config.rs

//! Run configuration.
//!
//! Built once in `main` from the parsed command line and passed by reference
//! into the engine, the scheduler and every scan call.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Worker count used when neither `serial` nor the scanner says otherwise.
pub const DEFAULT_WORKERS: usize = 10;

/// Key-value options handed to every scanner's `init` and `scan` calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    values: BTreeMap<String, String>,
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a single option, replacing any previous value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Parses a `key=value` pair as given on the command line.
    pub fn parse_pair(pair: &str) -> Result<(String, String), String> {
        match pair.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
            _ => Err(format!("expected key=value, got '{pair}'")),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns the option parsed as an integer, ignoring unparsable values.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.values.iter()
    }
}

impl FromIterator<(String, String)> for ScanOptions {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}

/// Everything the engine needs to know about one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Force a single worker per scanner.
    pub serial: bool,
    /// Worker count when the scanner has no preference.
    pub workers: usize,
    /// Suffix appended to every domain read from a CSV file.
    pub suffix: Option<String>,
    /// Sort each result file by domain once its scanner is done.
    pub sort: bool,
    /// Directory receiving `<scanner>.csv` and `meta.json`.
    pub output_dir: PathBuf,
    /// Directory receiving downloaded domain lists.
    pub cache_dir: PathBuf,
    /// The command line that started this run, recorded in the metadata.
    pub command: String,
    pub options: ScanOptions,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            serial: false,
            workers: DEFAULT_WORKERS,
            suffix: None,
            sort: false,
            output_dir: PathBuf::from("results"),
            cache_dir: PathBuf::from("cache"),
            command: String::new(),
            options: ScanOptions::default(),
        }
    }
}

impl RunConfig {
    /// Pool size for a scanner: serial wins, then the scanner's preference,
    /// then the configured default. Never zero.
    pub fn workers_for(&self, preferred: Option<usize>) -> usize {
        if self.serial {
            return 1;
        }
        preferred.unwrap_or(self.workers).max(1)
    }

    /// The suffix without any leading dot, or `None` when unset or blank.
    pub fn normalized_suffix(&self) -> Option<&str> {
        self.suffix
            .as_deref()
            .map(|s| s.trim().trim_start_matches('.'))
            .filter(|s| !s.is_empty())
    }
}
