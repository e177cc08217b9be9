//! Errors raised while turning manifest text into download items.

use thiserror::Error;

/// Fatal manifest problem. Parsing is all-or-nothing: the first error aborts.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A directive line appeared before any URL line.
    #[error("line {line}: directive without a preceding URL line")]
    MissingUrl { line: usize },

    #[error("line {line}: {source}")]
    Item {
        line: usize,
        #[source]
        source: ItemError,
    },

    /// Two entries mapped to the same key while duplicates are rejected.
    #[error("line {line}: duplicate key {key:?}")]
    DuplicateKey { line: usize, key: String },

    #[error("reading manifest: {0}")]
    Io(#[from] std::io::Error),
}

/// A single URL/directive pair that cannot be mapped to a download item.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// URL path lacks the service, project and file segments.
    #[error("URL path too short for key derivation: {url}")]
    ShortUrlPath { url: String },

    /// The key or file name is empty once the prefix, collapsed folder and spaces are removed.
    #[error("URL yields an empty key: {url}")]
    EmptyKey { url: String },

    #[error("URL path contains a parent-directory segment: {url}")]
    ParentDirInUrl { url: String },

    #[error("directory hint escapes the output directory: {hint:?}")]
    ParentDirInHint { hint: String },
}

/// Invalid key filter pattern.
#[derive(Debug, Error)]
#[error("invalid filter pattern {pattern:?}: {source}")]
pub struct FilterError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}
