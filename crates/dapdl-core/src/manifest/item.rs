//! Download items and the key/directory derivation rules.

use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

use super::error::ItemError;
use super::sanitize::strip_spaces;

/// Prefix of a directive line carrying a directory hint.
const DIR_PREFIX: &str = "dir=";

/// Number of URL path segments ahead of the key: service literal and project id.
const URL_PREFIX_SEGMENTS: usize = 2;

/// Which well-known leading folder is dropped from keys and directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collapse {
    /// Drop a leading `data` segment.
    pub data: bool,
    /// Drop a leading `metadata` segment.
    pub metadata: bool,
}

impl Default for Collapse {
    fn default() -> Self {
        Self {
            data: true,
            metadata: false,
        }
    }
}

impl Collapse {
    /// Drops the first segment when it is exactly a collapsed folder name.
    /// Only the first segment is inspected.
    pub fn apply<'a, 'b>(&self, parts: &'b [&'a str]) -> &'b [&'a str] {
        match parts.first() {
            Some(&"data") if self.data => &parts[1..],
            Some(&"metadata") if self.metadata => &parts[1..],
            _ => parts,
        }
    }
}

/// One file to fetch, derived from a URL line and one directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    /// Unique logical key: URL path after the project prefix, sanitized.
    pub key: String,
    /// Source URL, normalized by the URL parser.
    pub url: String,
    /// Versioned project identifier taken from the URL (e.g. `ID123v2`).
    pub project_id: String,
    /// Sanitized basename of the URL path.
    pub name: String,
    /// Sanitized subdirectory under the output root; `None` for the root itself.
    pub dir: Option<String>,
    /// Final on-disk location, set once the file has been written.
    pub path: Option<PathBuf>,
}

impl DownloadItem {
    /// Builds an item from the current URL and a directive line (`dir=...` or blank).
    ///
    /// The URL path must hold at least the service literal, the project id and
    /// one more segment; e.g. `https://host/dapprd/ID123v2/data/a.csv` yields
    /// key `a.csv` with the default [`Collapse`].
    pub fn from_directive(url: &str, directive: &str, collapse: Collapse) -> Result<Self, ItemError> {
        let parsed = url::Url::parse(url).map_err(|source| ItemError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        // Keys and names come from the path as written; the parsed URL would
        // percent-encode non-ASCII characters.
        let segments: Vec<&str> = raw_path(url)
            .split('/')
            .filter(|p| !p.is_empty() && *p != ".")
            .collect();
        if segments.contains(&"..") {
            return Err(ItemError::ParentDirInUrl {
                url: url.to_string(),
            });
        }
        if segments.len() <= URL_PREFIX_SEGMENTS {
            return Err(ItemError::ShortUrlPath {
                url: url.to_string(),
            });
        }

        let project_id = segments[URL_PREFIX_SEGMENTS - 1].to_string();
        let key_parts = collapse.apply(&segments[URL_PREFIX_SEGMENTS..]);
        let key = strip_spaces(&key_parts.join(MAIN_SEPARATOR_STR));
        // Non-empty: segments.len() > URL_PREFIX_SEGMENTS.
        let name = strip_spaces(segments[segments.len() - 1]);
        if key.is_empty() || name.is_empty() {
            return Err(ItemError::EmptyKey {
                url: url.to_string(),
            });
        }

        Ok(Self {
            key,
            project_id,
            name,
            dir: dir_from_hint(directive, collapse)?,
            url: parsed.as_str().to_string(),
            path: None,
        })
    }

    /// Destination of this item under `output_dir`.
    pub fn target_path(&self, output_dir: &Path) -> PathBuf {
        let mut target = output_dir.to_path_buf();
        if let Some(dir) = &self.dir {
            target.push(dir);
        }
        target.push(&self.name);
        target
    }
}

/// Path component of a URL as written: after the authority, before any query or fragment.
fn raw_path(url: &str) -> &str {
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let is_delim = |c: char| c == '/' || c == '?' || c == '#';
    let path = after_scheme
        .find(is_delim)
        .map_or("", |start| &after_scheme[start..]);
    let end = path
        .find(|c: char| c == '?' || c == '#')
        .unwrap_or(path.len());
    &path[..end]
}

/// Subdirectory from a directive line, or `None` when it names no subdirectory.
fn dir_from_hint(directive: &str, collapse: Collapse) -> Result<Option<String>, ItemError> {
    let hint = directive.trim();
    let hint = hint.strip_prefix(DIR_PREFIX).unwrap_or(hint);
    let parts: Vec<&str> = hint
        .split('/')
        .filter(|p| !p.is_empty() && *p != ".")
        .collect();
    if parts.contains(&"..") {
        return Err(ItemError::ParentDirInHint {
            hint: hint.to_string(),
        });
    }
    let dir = strip_spaces(&collapse.apply(&parts).join(MAIN_SEPARATOR_STR));
    Ok((!dir.is_empty()).then_some(dir))
}
