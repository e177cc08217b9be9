//! Name and directory sanitization for manifest-derived paths.

/// Literal percent-encoded space as it appears in DAP URLs.
const ENCODED_SPACE: &str = "%20";

/// Removes spaces and literal `%20` sequences from a name or joined path.
///
/// Removal repeats until no `%20` is left, so input like `"%2%200"` does not
/// leave a fresh `%20` behind and the function is idempotent.
pub fn strip_spaces(raw: &str) -> String {
    let mut out: String = raw.chars().filter(|c| *c != ' ').collect();
    while out.contains(ENCODED_SPACE) {
        out = out.replace(ENCODED_SPACE, "");
    }
    out
}
