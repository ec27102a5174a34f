// src/core/input.rs

//! Resolves the positional input argument into a [`DomainSource`].
//!
//! URLs are fetched once into the cache directory and then read like any
//! local CSV file.

use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

use crate::core::domains::DomainSource;
use crate::core::error::EngineError;

/// Name the downloaded domain list is cached under.
pub const CACHED_LIST: &str = "domains.csv";

/// Parses `arg` as a remote list location, if it is one.
pub fn remote_url(arg: &str) -> Option<Url> {
    Url::parse(arg)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

/// Turns the input argument into a source, downloading it first when it is
/// an `http(s)` URL.
pub async fn resolve(arg: &str, cache_dir: &Path) -> Result<DomainSource, EngineError> {
    let source = match remote_url(arg) {
        Some(url) => DomainSource::File(download(&url, cache_dir).await?),
        None => DomainSource::from_arg(arg),
    };
    source.validate()?;
    debug!(source = %source.describe(), "Input resolved.");
    Ok(source)
}

async fn download(url: &Url, cache_dir: &Path) -> Result<PathBuf, EngineError> {
    let fail = |message: String| EngineError::Download { url: url.to_string(), message };

    info!(url = %url, "Downloading domain list.");
    let response = reqwest::get(url.clone())
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| fail(e.to_string()))?;
    let body = response.bytes().await.map_err(|e| fail(e.to_string()))?;

    tokio::fs::create_dir_all(cache_dir).await?;
    let path = cache_dir.join(CACHED_LIST);
    tokio::fs::write(&path, &body).await?;
    info!(path = %path.display(), bytes = body.len(), "Domain list cached.");
    Ok(path)
}
