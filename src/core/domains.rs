// src/core/domains.rs

//! Domain Source: turns the input argument into a sequence of domains.
//!
//! A `.csv` argument is read row by row, taking the first column of every row
//! that is neither empty nor a header. Anything else is a single bare domain.
//! The sequence is rebuilt from scratch on every call to
//! [`DomainSource::domains`], so each scanner gets its own lazy pass over the
//! file.

use crate::core::error::EngineError;
use csv::{ReaderBuilder, StringRecordsIntoIter};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extension recognized as a tabular domain list.
const TABULAR_EXTENSION: &str = "csv";

/// Where the domains for this run come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainSource {
    /// A CSV file, one domain per row in the first column.
    File(PathBuf),
    /// A single domain given directly on the command line.
    Single(String),
}

impl DomainSource {
    /// Classifies an argument by its extension.
    pub fn from_arg(arg: &str) -> Self {
        if is_tabular(Path::new(arg)) {
            DomainSource::File(PathBuf::from(arg))
        } else {
            DomainSource::Single(arg.to_string())
        }
    }

    /// Checks that the source can be opened. Run once before any scanning.
    pub fn validate(&self) -> Result<(), EngineError> {
        match self {
            DomainSource::File(path) => open(path).map(|_| ()),
            DomainSource::Single(_) => Ok(()),
        }
    }

    /// A fresh lazy pass over the domains.
    ///
    /// `suffix` is applied to file rows only. A bare domain is yielded exactly
    /// as given.
    pub fn domains(&self, suffix: Option<&str>) -> Result<Domains, EngineError> {
        match self {
            DomainSource::File(path) => {
                let file = open(path)?;
                let records = ReaderBuilder::new()
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(file)
                    .into_records();
                Ok(Domains::File { records, suffix: suffix.map(str::to_string) })
            }
            DomainSource::Single(domain) => Ok(Domains::Single(Some(domain.clone()))),
        }
    }

    /// Human-readable description for logs and run metadata.
    pub fn describe(&self) -> String {
        match self {
            DomainSource::File(path) => path.display().to_string(),
            DomainSource::Single(domain) => domain.clone(),
        }
    }
}

fn is_tabular(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(TABULAR_EXTENSION))
}

fn open(path: &Path) -> Result<File, EngineError> {
    File::open(path).map_err(|source| EngineError::InputUnreachable {
        path: path.to_path_buf(),
        source,
    })
}

/// Lazy iterator over the domains of one source.
pub enum Domains {
    Single(Option<String>),
    File {
        records: StringRecordsIntoIter<File>,
        suffix: Option<String>,
    },
}

impl Iterator for Domains {
    type Item = Result<String, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Domains::Single(domain) => domain.take().map(Ok),
            Domains::File { records, suffix } => loop {
                let record = match records.next()? {
                    Ok(record) => record,
                    Err(e) => return Some(Err(e.into())),
                };
                let first = record.get(0).unwrap_or("");
                if let Some(domain) = normalize_row(first, suffix.as_deref()) {
                    return Some(Ok(domain));
                }
                debug!(value = first, "Skipping header or empty row.");
            },
        }
    }
}

/// Applies the row rules to a first-column value. `None` means skip the row.
fn normalize_row(value: &str, suffix: Option<&str>) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.to_lowercase().starts_with("domain") {
        return None;
    }
    let domain = value.to_lowercase();
    Some(match suffix {
        Some(suffix) => format!("{domain}.{suffix}"),
        None => domain,
    })
}

/// The registrable part of a domain (eTLD+1).
///
/// Falls back to the domain itself when the public suffix list has no answer,
/// e.g. for bare suffixes or single-label names.
pub fn base_domain(domain: &str) -> String {
    let trimmed = domain.trim_end_matches('.');
    psl::domain_str(trimmed).unwrap_or(trimmed).to_string()
}
