//! `dapdl plan <manifest>` – list what a manifest would download.

use anyhow::Result;
use dapdl_core::config::DapdlConfig;
use dapdl_core::manifest::DownloadItem;
use std::path::Path;

use crate::cli::SelectionArgs;

pub fn run_plan(selection: &SelectionArgs, cfg: &DapdlConfig) -> Result<()> {
    let opts = selection.to_options(cfg);
    let manifest = dapdl_core::plan(&selection.manifest, &opts)?;
    if manifest.is_empty() {
        println!("No items selected.");
        return Ok(());
    }
    println!("{:<40} {:<12} {:<40} {}", "KEY", "PROJECT", "TARGET", "URL");
    for item in manifest.items() {
        println!("{}", plan_row(item, &opts.output_dir));
    }
    println!("{} item(s)", manifest.len());
    Ok(())
}

/// One table row: key, project, target path, URL.
pub(crate) fn plan_row(item: &DownloadItem, output_dir: &Path) -> String {
    format!(
        "{:<40} {:<12} {:<40} {}",
        item.key,
        item.project_id,
        item.target_path(output_dir).display().to_string(),
        item.url
    )
}
