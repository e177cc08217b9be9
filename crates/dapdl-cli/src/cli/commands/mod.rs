//! CLI command handlers, one file per command.

mod download;
mod plan;

pub use download::run_download;
pub use plan::run_plan;

#[cfg(test)]
pub(crate) use download::progress_line;
#[cfg(test)]
pub(crate) use plan::plan_row;
