// src/core/mod.rs

/// Data shared across the engine: result rows, findings, run bookkeeping.
pub mod models;

/// Typed errors for startup, pool and per-domain failures.
pub mod error;

/// Reading domains from a CSV file or a single argument.
pub mod domains;

/// Resolving the input argument, including remote lists.
pub mod input;

/// The scanner contract, the built-in scanners and the registry.
pub mod scanner;

/// Bounded worker pools, one scanner at a time.
pub mod scheduler;

/// Per-scanner CSV output.
pub mod sink;

/// Post-run sorting of result files.
pub mod sort;

/// Whole-run orchestration.
pub mod engine;
