//! Per-item fetch errors.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single item's fetch-then-write unit.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Curl reported an error (DNS, connection, TLS, reset, ...).
    #[error("transfer failed: {0}")]
    Transport(#[from] curl::Error),

    /// Response had a non-2xx status.
    #[error("HTTP {status}")]
    Http { status: u32 },

    /// Creating the destination directory or writing the file failed.
    #[error("writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
