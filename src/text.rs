//! Text cleanup applied before documents are handed to the encoder.

/// Collapse whitespace runs (spaces, tabs, newlines) to single spaces and trim.
///
/// With `lowercase` set, the collapsed text is also lowercased. The indexer
/// is fed case-preserving text, so callers in this crate pass `false`.
pub fn normalize(text: &str, lowercase: bool) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if lowercase {
        collapsed.to_lowercase()
    } else {
        collapsed
    }
}
