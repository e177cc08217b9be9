//! Line-by-line manifest parser.

use super::error::ManifestError;
use super::item::{Collapse, DownloadItem};
use super::{DuplicatePolicy, Manifest};

/// Lines starting with this open a new URL context.
const URL_PREFIX: &str = "https";
const COMMENT_PREFIX: char = '#';

/// Parser state: a directive line is only meaningful after a URL line.
#[derive(Debug, Clone, Copy)]
enum ParseState<'a> {
    AwaitingUrl,
    AwaitingDirective { url: &'a str },
}

/// Parses manifest text into an ordered, keyed set of download items.
///
/// `#` lines are comments, `https...` lines set the current URL, and every
/// other line (including a blank one) emits one item for the current URL.
/// The URL stays current until the next URL line.
pub fn parse_manifest(
    text: &str,
    collapse: Collapse,
    duplicates: DuplicatePolicy,
) -> Result<Manifest, ManifestError> {
    let mut manifest = Manifest::default();
    let mut state = ParseState::AwaitingUrl;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if line.starts_with(COMMENT_PREFIX) {
            continue;
        }
        if line.starts_with(URL_PREFIX) {
            state = ParseState::AwaitingDirective { url: line.trim_end() };
            continue;
        }
        let ParseState::AwaitingDirective { url } = state else {
            return Err(ManifestError::MissingUrl { line: line_no });
        };
        let item = DownloadItem::from_directive(url, line, collapse)
            .map_err(|source| ManifestError::Item { line: line_no, source })?;
        tracing::debug!(key = %item.key, dir = ?item.dir, "manifest item");
        manifest.insert(item, line_no, duplicates)?;
    }

    Ok(manifest)
}
