// src/main.rs

use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use std::path::PathBuf;
use tracing::{error, info};

use domain_sweep::config::{RunConfig, ScanOptions, DEFAULT_WORKERS};
use domain_sweep::core::{engine, input};
use domain_sweep::{logging, Registry};

/// Scan a list of domains with one or more scanners, one CSV per scanner.
#[derive(Parser, Debug)]
#[command(name = "domain-sweep", version, about)]
struct Cli {
    /// A single domain, a local .csv file, or an http(s) URL to a .csv list
    #[arg(required_unless_present = "list_scanners")]
    input: Option<String>,

    /// Comma-separated scanners to run, in order (e.g. "dns,headers")
    #[arg(long = "scan", short = 's', required_unless_present = "list_scanners")]
    scan: Option<String>,

    /// Run one worker per scanner
    #[arg(long)]
    serial: bool,

    /// Workers per scanner when the scanner has no preference
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Append this suffix to every domain read from a CSV file
    #[arg(long)]
    suffix: Option<String>,

    /// Sort each result file by domain when its scanner is done
    #[arg(long)]
    sort: bool,

    /// Directory for result files and meta.json (emptied before each run)
    #[arg(long, default_value = "results")]
    output: PathBuf,

    /// Directory for downloaded domain lists
    #[arg(long, default_value = "cache")]
    cache: PathBuf,

    /// Scanner option as key=value; may be repeated
    #[arg(long = "option", short = 'o', value_parser = ScanOptions::parse_pair)]
    options: Vec<(String, String)>,

    /// Log at debug level
    #[arg(long)]
    debug: bool,

    /// List the available scanners and exit
    #[arg(long)]
    list_scanners: bool,
}

impl Cli {
    fn into_config(self, command: String) -> RunConfig {
        RunConfig {
            serial: self.serial,
            workers: self.workers,
            suffix: self.suffix,
            sort: self.sort,
            output_dir: self.output,
            cache_dir: self.cache,
            command,
            options: self.options.into_iter().collect(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let mut cli = Cli::parse();

    if cli.list_scanners {
        for name in Registry::builtin().names() {
            println!("{name}");
        }
        return Ok(());
    }

    let log_path = logging::initialize_logging(cli.debug)?;
    info!(log = %log_path.display(), "Logging initialized.");

    // Both are required by clap unless --list-scanners was given.
    let input_arg = cli.input.take().ok_or_else(|| eyre!("no input given"))?;
    let scan_list = cli.scan.take().ok_or_else(|| eyre!("no scanners specified"))?;
    let command = std::env::args().collect::<Vec<_>>().join(" ");
    let config = cli.into_config(command);

    let source = input::resolve(&input_arg, &config.cache_dir)
        .await
        .wrap_err("could not read the domain list")?;
    let scanners = Registry::builtin()
        .load(&scan_list, &config.options)
        .await
        .wrap_err("could not load scanners")?;

    let report = engine::run(&config, &scanners, &source).await?;
    for outcome in &report.outcomes {
        match &outcome.error {
            None => info!(
                scanner = %outcome.scanner,
                domains = outcome.stats.domains,
                rows = outcome.stats.rows,
                failures = outcome.stats.failures,
                "Scanner finished."
            ),
            Some(e) => error!(scanner = %outcome.scanner, error = %e, "Scanner did not finish."),
        }
    }

    if !report.succeeded() {
        return Err(eyre!("one or more scanners aborted; see the log for details"));
    }
    info!(output = %config.output_dir.display(), "Results written.");
    Ok(())
}
