// src/lib.rs

//! Runs lists of domains through pluggable scanners and writes one CSV per
//! scanner, plus a `meta.json` describing the run.

pub mod config;
pub mod core;
pub mod logging;

pub use crate::config::{RunConfig, ScanOptions};
pub use crate::core::domains::DomainSource;
pub use crate::core::engine::run;
pub use crate::core::error::{EngineError, ScanError};
pub use crate::core::models::{ResultRow, RunMetadata, RunReport};
pub use crate::core::scanner::{ArcScanner, Capabilities, Registry, Scanner};
