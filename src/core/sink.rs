// src/core/sink.rs

//! Result Sink: one CSV file per scanner.
//!
//! The header goes out as soon as the sink is created. Rows are appended by
//! any number of workers; a mutex around the writer keeps each record whole.

use crate::core::error::EngineError;
use crate::core::models::LEADING_HEADERS;
use csv::{Writer, WriterBuilder};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Whether `name` can be used as-is for a file inside the results directory.
pub fn is_valid_scanner_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Path of the result file for a scanner.
pub fn result_path(dir: &Path, scanner: &str) -> PathBuf {
    dir.join(format!("{scanner}.csv"))
}

/// Removes every file in the results directory, creating it if needed.
///
/// This is a whole-directory clear: artifacts of scanners that are not part
/// of this run go too. Subdirectories are left in place.
pub fn clear_results(dir: &Path) -> Result<usize, EngineError> {
    fs::create_dir_all(dir)?;
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            debug!(path = %entry.path().display(), "Removing stale result file.");
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    info!(dir = %dir.display(), removed, "Cleared results directory.");
    Ok(removed)
}

/// The append-only output stream of one scanner.
pub struct ResultSink {
    path: PathBuf,
    writer: Mutex<Writer<File>>,
}

impl ResultSink {
    /// Creates `<dir>/<scanner>.csv` and writes the header row.
    pub fn create(dir: &Path, scanner: &str, headers: &[&str]) -> Result<Self, EngineError> {
        if !is_valid_scanner_name(scanner) {
            return Err(EngineError::InvalidScannerName { name: scanner.to_string() });
        }
        let path = result_path(dir, scanner);
        let mut writer = WriterBuilder::new().flexible(true).from_path(&path)?;
        let header = LEADING_HEADERS.iter().chain(headers.iter());
        writer.write_record(header)?;
        writer.flush()?;
        debug!(path = %path.display(), "Opened result sink.");
        Ok(Self { path, writer: Mutex::new(writer) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row, prefixed with the domain and its base domain.
    pub async fn append(&self, domain: &str, base: &str, row: &[String]) -> Result<(), EngineError> {
        let record = [domain, base].into_iter().chain(row.iter().map(String::as_str));
        let mut writer = self.writer.lock().await;
        writer.write_record(record)?;
        writer.flush()?;
        Ok(())
    }

    /// Flushes everything written so far. The file closes when the sink drops.
    pub async fn finish(&self) -> Result<(), EngineError> {
        self.writer.lock().await.flush()?;
        Ok(())
    }
}
