//! MIME type equivalence.
//!
//! Sniffers and catalogs disagree on names for the same container
//! (`audio/mpeg` vs `audio/mp3`, `video/quicktime` vs `video/mov`).
//! Both sides are mapped to one canonical spelling before comparing.

/// Synonym → canonical form. Types not listed are already canonical.
const EQUIVALENCES: &[(&str, &str)] = &[
    ("audio/mpeg", "audio/mp3"),
    ("audio/mp3", "audio/mp3"),
    ("video/quicktime", "video/mov"),
    ("audio/x-wav", "audio/wav"),
    ("audio/vnd.wave", "audio/wav"),
    ("audio/wave", "audio/wav"),
    ("audio/x-flac", "audio/flac"),
    ("audio/x-m4a", "audio/m4a"),
    ("image/jpg", "image/jpeg"),
];

/// Canonical spelling of `mime`. Unknown types pass through unchanged.
pub fn canonical(mime: &str) -> &str {
    EQUIVALENCES
        .iter()
        .find(|(synonym, _)| *synonym == mime)
        .map(|(_, canon)| *canon)
        .unwrap_or(mime)
}

/// Whether `detected` is acceptable for an allow-list.
///
/// Matches on canonical forms, or on the raw detected string being listed
/// verbatim.
pub fn is_allowed<S: AsRef<str>>(detected: &str, allowed: &[S]) -> bool {
    let wanted = canonical(detected);
    allowed
        .iter()
        .any(|a| canonical(a.as_ref()) == wanted || a.as_ref() == detected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_known_synonyms() {
        assert_eq!(canonical("audio/mpeg"), "audio/mp3");
        assert_eq!(canonical("audio/mp3"), "audio/mp3");
        assert_eq!(canonical("video/quicktime"), "video/mov");
        assert_eq!(canonical("audio/vnd.wave"), "audio/wav");
    }

    #[test]
    fn canonical_unknown_passthrough() {
        assert_eq!(canonical("video/mp4"), "video/mp4");
        assert_eq!(canonical("application/x-whatever"), "application/x-whatever");
    }

    #[test]
    fn mpeg_and_mp3_interchangeable() {
        assert!(is_allowed("audio/mpeg", &["audio/mp3"]));
        assert!(is_allowed("audio/mp3", &["audio/mpeg"]));
    }

    #[test]
    fn quicktime_matches_mov() {
        assert!(is_allowed("video/quicktime", &["video/mov"]));
        assert!(is_allowed("video/quicktime", &["video/mp4", "video/quicktime"]));
    }

    #[test]
    fn unrelated_types_rejected() {
        assert!(!is_allowed("video/webm", &["video/mp4", "video/mov"]));
        assert!(!is_allowed("audio/mpeg", &[] as &[&str]));
    }

    #[test]
    fn owned_allow_list() {
        let allowed = vec!["image/jpeg".to_string()];
        assert!(is_allowed("image/jpg", &allowed));
    }
}
