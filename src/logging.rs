// src/logging.rs

use color_eyre::eyre::Result;
use directories::ProjectDirs;
use lazy_static::lazy_static;
use std::path::PathBuf;
use time::macros::format_description;
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref LOG_ENV: String = format!("{}_LOGLEVEL", PROJECT_NAME.clone());
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "domain-sweep", env!("CARGO_PKG_NAME"))
}

pub fn get_data_dir() -> PathBuf {
    if let Some(proj_dirs) = project_directory() {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

/// Filter directive: `RUST_LOG`, then `DOMAIN_SWEEP_LOGLEVEL`, then a default
/// that depends on `--debug`.
fn log_level(debug: bool) -> String {
    std::env::var("RUST_LOG")
        .or_else(|_| std::env::var(LOG_ENV.clone()))
        .unwrap_or_else(|_| {
            let level = if debug { "debug" } else { "info" };
            format!("{}={level}", env!("CARGO_CRATE_NAME"))
        })
}

/// Logs to `<data dir>/domain-sweep.log` and to stderr.
///
/// Per-domain scan failures are `warn`; they show up on the console but never
/// interrupt the run.
pub fn initialize_logging(debug: bool) -> Result<PathBuf> {
    let directory = get_data_dir();
    std::fs::create_dir_all(&directory)?;
    let log_path = directory.join(LOG_FILE.clone());
    let log_file = std::fs::File::create(&log_path)?;

    let level = log_level(debug);

    let file_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_filter(EnvFilter::new(&level));

    let console_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(LocalTime::new(format_description!("[hour]:[minute]:[second]")))
        .compact()
        .with_filter(EnvFilter::new(&level));

    tracing_subscriber::registry()
        .with(file_subscriber)
        .with(console_subscriber)
        .with(ErrorLayer::default())
        .init();

    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_derive_from_crate() {
        assert_eq!(LOG_ENV.as_str(), "DOMAIN_SWEEP_LOGLEVEL");
        assert_eq!(LOG_FILE.as_str(), "domain-sweep.log");
    }
}
