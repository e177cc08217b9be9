//! End-to-end entry points: manifest file in, files on disk and item list out.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use crate::config::DapdlConfig;
use crate::fetcher::{self, CurlFetcher, FailurePolicy, Fetch, FetchOptions, ItemFailure, ProgressStats};
use crate::manifest::{self, Collapse, DuplicatePolicy, KeyFilter, Manifest};

/// Options for [`download`] and [`plan`].
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub output_dir: PathBuf,
    pub collapse: Collapse,
    /// Regex searched in each key; non-matching items are skipped.
    pub filter: Option<String>,
    pub workers: Option<usize>,
    pub failure_policy: FailurePolicy,
    pub duplicate_policy: DuplicatePolicy,
    pub progress: Option<Sender<ProgressStats>>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            collapse: Collapse::default(),
            filter: None,
            workers: None,
            failure_policy: FailurePolicy::default(),
            duplicate_policy: DuplicatePolicy::default(),
            progress: None,
        }
    }
}

impl DownloadOptions {
    /// Options seeded from the config file; callers override individual fields.
    pub fn from_config(cfg: &DapdlConfig) -> Self {
        Self {
            output_dir: cfg.output_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
            collapse: Collapse {
                data: cfg.collapse_data,
                metadata: cfg.collapse_metadata,
            },
            workers: cfg.workers,
            failure_policy: cfg.failure_policy,
            duplicate_policy: cfg.duplicate_policy,
            ..Self::default()
        }
    }
}

/// Result of a batch that ran to completion.
#[derive(Debug)]
pub struct DownloadOutcome {
    /// Every selected item; `path` is set on those written to disk.
    pub manifest: Manifest,
    /// Per-item failures (only populated with [`FailurePolicy::Continue`]).
    pub failures: Vec<ItemFailure>,
}

/// Parses and filters a manifest without touching the network.
pub fn plan(manifest_path: &Path, opts: &DownloadOptions) -> Result<Manifest> {
    // Compile the filter before reading so a bad pattern fails fast.
    let filter = opts.filter.as_deref().map(KeyFilter::new).transpose()?;
    let mut manifest = manifest::read_manifest(manifest_path, opts.collapse, opts.duplicate_policy)
        .with_context(|| format!("manifest {}", manifest_path.display()))?;
    let parsed = manifest.len();
    if let Some(filter) = &filter {
        let removed = manifest.retain_matching(filter);
        tracing::info!(pattern = filter.as_str(), removed, kept = manifest.len(), "filter applied");
    }
    tracing::info!(parsed, selected = manifest.len(), "manifest {} loaded", manifest_path.display());
    Ok(manifest)
}

/// Downloads every selected manifest item over HTTP(S) with libcurl.
pub fn download(manifest_path: &Path, opts: &DownloadOptions) -> Result<DownloadOutcome> {
    download_with(&CurlFetcher, manifest_path, opts)
}

/// Like [`download`] with a caller-supplied transport.
pub fn download_with<F: Fetch>(
    fetcher: &F,
    manifest_path: &Path,
    opts: &DownloadOptions,
) -> Result<DownloadOutcome> {
    let mut manifest = plan(manifest_path, opts)?;
    let fetch_opts = FetchOptions {
        workers: opts.workers,
        failure_policy: opts.failure_policy,
        progress: opts.progress.clone(),
    };
    let report = fetcher::fetch_all(manifest.items_mut(), fetcher, &opts.output_dir, &fetch_opts)?;
    Ok(DownloadOutcome {
        manifest,
        failures: report.failures,
    })
}
