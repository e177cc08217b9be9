//! Manifest-driven bulk downloader for the DAP data archive.
//!
//! [`pipeline::download`] reads a link manifest, derives a key and local path
//! per entry, optionally filters by key, then fetches every item on a
//! bounded thread pool.

pub mod config;
pub mod fetcher;
pub mod logging;
pub mod manifest;
pub mod pipeline;

pub use pipeline::{download, download_with, plan, DownloadOptions, DownloadOutcome};
