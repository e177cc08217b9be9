//! `dapdl download <manifest>` – fetch every selected item.

use anyhow::Result;
use dapdl_core::config::DapdlConfig;
use dapdl_core::fetcher::{FailurePolicy, ProgressStats};
use std::io::{self, Write};
use std::sync::mpsc;
use std::thread;

use crate::cli::SelectionArgs;

pub fn run_download(
    selection: &SelectionArgs,
    cfg: &DapdlConfig,
    workers: Option<usize>,
    keep_going: bool,
) -> Result<()> {
    let mut opts = selection.to_options(cfg);
    if workers.is_some() {
        opts.workers = workers;
    }
    if keep_going {
        opts.failure_policy = FailurePolicy::Continue;
    }

    let (progress_tx, progress_rx) = mpsc::channel::<ProgressStats>();
    opts.progress = Some(progress_tx);
    let progress_handle = thread::spawn(move || {
        let mut printed = false;
        for stats in progress_rx {
            print!("{}", progress_line(&stats));
            let _ = io::stdout().flush();
            printed = true;
        }
        if printed {
            println!();
        }
    });

    let result = dapdl_core::download(&selection.manifest, &opts);
    // Drop the last sender so the printer thread drains and exits.
    drop(opts);
    let _ = progress_handle.join();
    let outcome = result?;

    let fetched = outcome
        .manifest
        .items()
        .iter()
        .filter(|i| i.path.is_some())
        .count();
    if outcome.manifest.is_empty() {
        println!("No items selected.");
    } else {
        println!("Downloaded {} of {} item(s).", fetched, outcome.manifest.len());
    }

    if !outcome.failures.is_empty() {
        for failure in &outcome.failures {
            eprintln!("  failed: {}: {}", failure.key, failure.error);
        }
        anyhow::bail!(
            "{} of {} item(s) failed",
            outcome.failures.len(),
            outcome.manifest.len()
        );
    }
    Ok(())
}

/// Status line for the printer thread; overwrites itself with `\r`, no newline.
pub(crate) fn progress_line(stats: &ProgressStats) -> String {
    format!(
        "\r  [{}/{}] ({:.0}%)  {}  ",
        stats.done,
        stats.total,
        stats.fraction() * 100.0,
        stats.key
    )
}
