//! Filename normalization for download correlation.
//!
//! The editor's export names pass through several lossy hands before
//! they hit disk: the remote service strips emoji and symbols, the OS
//! may truncate, and the dialog value the user saw can differ from the
//! link's `download` attribute. Matching therefore happens on a
//! normalized token form, accepting prefix overlap.

/// Normalize a filename to a canonical lowercase token string.
///
/// Alphanumeric runs are kept (lowercased); everything else (emoji,
/// punctuation, separators, extensions' dots) collapses to a single
/// space. Idempotent: normalizing a normalized string is a no-op.
pub fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push(' ');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }

    out
}

/// Whether a file on disk plausibly is the expected export.
///
/// Prefix overlap in either direction tolerates OS-level truncation of
/// long names as well as the service appending suffixes like `(1)`.
pub fn matches(expected: &str, candidate: &str) -> bool {
    let a = normalize(expected);
    let b = normalize(candidate);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.starts_with(&b) || b.starts_with(&a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_emoji_and_punctuation() {
        assert_eq!(normalize("My 🎬 Clip!!.mp4"), "my clip mp4");
        assert_eq!(normalize("my_clip.mp4"), "my clip mp4");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["My 🎬 Clip!!.mp4", "already normal", "__-__", "ÜBER.mov"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_normalize_case_insensitive() {
        assert_eq!(normalize("CLIP.MP4"), normalize("clip.mp4"));
    }

    #[test]
    fn test_normalize_empty_and_symbol_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("🎬🎬!!"), "");
    }

    #[test]
    fn test_matches_overlapping_prefixes() {
        assert!(matches("My 🎬 Clip!!.mp4", "my_clip.mp4"));
        assert!(matches("my very long export name truncat", "My Very Long Export Name Truncated By The OS.mp4"));
        assert!(!matches("holiday.mp4", "report.mp4"));
    }

    #[test]
    fn test_matches_rejects_empty_sides() {
        assert!(!matches("", "clip.mp4"));
        assert!(!matches("clip.mp4", "🎬"));
    }
}
