// src/core/sort.rs

//! Post-processor: sorts a result file by its leading domain column.
//!
//! The whole file is read into memory and indexed by domain, which is fine
//! for the list sizes this tool is aimed at but will not scale to very large
//! inputs. Rows that share a domain collapse to the last one read.
//!
//! The sorted copy is written to a temporary file next to the original and
//! renamed over it, so an interrupted sort never leaves a truncated file.

use crate::core::error::EngineError;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// What a sort pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortStats {
    /// Data rows read from the original.
    pub read: usize,
    /// Data rows written to the sorted copy.
    pub written: usize,
}

impl SortStats {
    /// Rows lost to duplicate domain keys.
    pub fn dropped(&self) -> usize {
        self.read - self.written
    }
}

/// Writes a sorted copy of `path` into a temporary file in the same directory.
///
/// The original is untouched; the caller decides whether to persist.
pub fn write_sorted(path: &Path) -> Result<(NamedTempFile, SortStats), EngineError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record?,
        None => StringRecord::new(),
    };

    let mut index: BTreeMap<String, StringRecord> = BTreeMap::new();
    let mut read = 0;
    for record in records {
        let record = record?;
        read += 1;
        let key = record.get(0).unwrap_or("").to_string();
        index.insert(key, record);
    }

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = WriterBuilder::new().flexible(true).from_writer(temp.as_file_mut());
        if !header.is_empty() {
            writer.write_record(&header)?;
        }
        for record in index.values() {
            writer.write_record(record)?;
        }
        writer.flush()?;
    }
    temp.as_file_mut().flush()?;
    temp.as_file().sync_all()?;

    Ok((temp, SortStats { read, written: index.len() }))
}

/// Sorts `path` in place by ascending domain, header first.
pub fn sort_results(path: &Path) -> Result<SortStats, EngineError> {
    let (temp, stats) = write_sorted(path)?;
    temp.persist(path).map_err(|e| EngineError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    if stats.dropped() > 0 {
        warn!(
            path = %path.display(),
            dropped = stats.dropped(),
            "Sorting collapsed rows that share a domain; only the last row per domain was kept."
        );
    }
    info!(path = %path.display(), rows = stats.written, "Sorted result file.");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const UNSORTED: &str = "Domain,Base Domain,A\nc.com,c.com,3\na.com,a.com,1\nb.com,b.com,2\n";
    const SORTED: &str = "Domain,Base Domain,A\na.com,a.com,1\nb.com,b.com,2\nc.com,c.com,3\n";

    #[test]
    fn sorts_rows_and_keeps_header_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alpha.csv");
        fs::write(&path, UNSORTED).unwrap();

        let stats = sort_results(&path).unwrap();
        assert_eq!(stats, SortStats { read: 3, written: 3 });
        assert_eq!(fs::read_to_string(&path).unwrap(), SORTED);
    }

    #[test]
    fn sorting_sorted_file_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alpha.csv");
        fs::write(&path, SORTED).unwrap();

        sort_results(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), SORTED);
        sort_results(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), SORTED);
    }

    #[test]
    fn duplicate_domains_collapse_to_last_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alpha.csv");
        fs::write(&path, "Domain,Base Domain,A\nb.com,b.com,first\na.com,a.com,1\nb.com,b.com,last\n").unwrap();

        let stats = sort_results(&path).unwrap();
        assert_eq!(stats.dropped(), 1);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Domain,Base Domain,A\na.com,a.com,1\nb.com,b.com,last\n"
        );
    }

    #[test]
    fn original_survives_when_replacement_never_happens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alpha.csv");
        fs::write(&path, UNSORTED).unwrap();

        let (temp, _) = write_sorted(&path).unwrap();
        assert_eq!(fs::read_to_string(temp.path()).unwrap(), SORTED);
        // Crash between writing the temp file and the rename.
        drop(temp);

        assert_eq!(fs::read_to_string(&path).unwrap(), UNSORTED);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn header_only_file_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alpha.csv");
        fs::write(&path, "Domain,Base Domain,A\n").unwrap();

        let stats = sort_results(&path).unwrap();
        assert_eq!(stats.written, 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "Domain,Base Domain,A\n");
    }
}
