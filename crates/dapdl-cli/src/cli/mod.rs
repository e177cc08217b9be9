//! CLI for the DAPDL manifest downloader.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dapdl_core::config::{self, DapdlConfig};
use dapdl_core::manifest::DuplicatePolicy;
use dapdl_core::DownloadOptions;
use std::path::PathBuf;

use commands::{run_download, run_plan};

/// Top-level CLI for the DAPDL downloader.
#[derive(Debug, Parser)]
#[command(name = "dapdl")]
#[command(about = "DAPDL: bulk downloader for DAP link manifests", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/dapdl/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every item listed in a manifest.
    Download {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Worker threads (default: available CPU cores).
        #[arg(long, value_name = "N")]
        workers: Option<usize>,

        /// Keep downloading after a failed item and report failures at the end.
        #[arg(long)]
        keep_going: bool,
    },

    /// Show the keys and local paths a manifest maps to, without downloading.
    Plan {
        #[command(flatten)]
        selection: SelectionArgs,
    },
}

/// Manifest and item-selection flags shared by `download` and `plan`.
#[derive(Debug, Args)]
pub struct SelectionArgs {
    /// Path to the DAP link manifest.
    pub manifest: PathBuf,

    /// Output root directory (default: config value or current directory).
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Drop a leading `data` folder from keys and directories.
    #[arg(long, overrides_with = "no_collapse_data")]
    pub collapse_data: bool,

    /// Keep a leading `data` folder.
    #[arg(long)]
    pub no_collapse_data: bool,

    /// Drop a leading `metadata` folder from keys and directories.
    #[arg(long, overrides_with = "no_collapse_metadata")]
    pub collapse_metadata: bool,

    /// Keep a leading `metadata` folder.
    #[arg(long)]
    pub no_collapse_metadata: bool,

    /// Only take items whose key matches this regex.
    #[arg(long, value_name = "REGEX")]
    pub filter: Option<String>,

    /// Fail when two manifest entries map to the same key.
    #[arg(long)]
    pub reject_duplicates: bool,
}

impl SelectionArgs {
    /// Builds download options from config, then applies the flags on top.
    pub fn to_options(&self, cfg: &DapdlConfig) -> DownloadOptions {
        let mut opts = DownloadOptions::from_config(cfg);
        if let Some(dir) = &self.output_dir {
            opts.output_dir = dir.clone();
        }
        if self.collapse_data {
            opts.collapse.data = true;
        }
        if self.no_collapse_data {
            opts.collapse.data = false;
        }
        if self.collapse_metadata {
            opts.collapse.metadata = true;
        }
        if self.no_collapse_metadata {
            opts.collapse.metadata = false;
        }
        if self.filter.is_some() {
            opts.filter = self.filter.clone();
        }
        if self.reject_duplicates {
            opts.duplicate_policy = DuplicatePolicy::Reject;
        }
        opts
    }
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = match &cli.config {
            Some(path) => config::load_from_path(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Download {
                selection,
                workers,
                keep_going,
            } => run_download(&selection, &cfg, workers, keep_going)?,
            CliCommand::Plan { selection } => run_plan(&selection, &cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
