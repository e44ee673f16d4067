//! Spotify URL shape validation.
//!
//! Pure predicate over the five link forms the lookup endpoint accepts.
//! Used for live keystroke feedback and again as a pre-flight gate before
//! any network call.

use regex::Regex;

/// The accepted URL shapes: track, album, playlist and artist pages plus
/// spotify.link short links. Protocol prefix and trailing query optional.
const URL_PATTERNS: &[&str] = &[
    r"^(https?://)?(open\.spotify\.com/track/[a-zA-Z0-9]{22})(\?.*)?$",
    r"^(https?://)?(spotify\.link/[a-zA-Z0-9]+)$",
    r"^(https?://)?(open\.spotify\.com/album/[a-zA-Z0-9]{22})(\?.*)?$",
    r"^(https?://)?(open\.spotify\.com/playlist/[a-zA-Z0-9]{22})(\?.*)?$",
    r"^(https?://)?(open\.spotify\.com/artist/[a-zA-Z0-9]{22})(\?.*)?$",
];

/// Check whether `url` (after trimming) matches one of the accepted shapes.
pub fn is_valid_track_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }

    URL_PATTERNS.iter().any(|pattern| {
        Regex::new(pattern)
            .map(|re| re.is_match(url))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK_ID: &str = "4uLU6hMCjMI75M1A2tKUQC";

    #[test]
    fn test_accepts_canonical_shapes() {
        for kind in ["track", "album", "playlist", "artist"] {
            let bare = format!("open.spotify.com/{}/{}", kind, TRACK_ID);
            assert!(is_valid_track_url(&bare), "bare {}", kind);
            assert!(
                is_valid_track_url(&format!("https://{}", bare)),
                "https {}",
                kind
            );
            assert!(
                is_valid_track_url(&format!("http://{}", bare)),
                "http {}",
                kind
            );
            assert!(
                is_valid_track_url(&format!("{}?si=abc123", bare)),
                "query {}",
                kind
            );
        }

        assert!(is_valid_track_url("spotify.link/abc123XYZ"));
        assert!(is_valid_track_url("https://spotify.link/abc123XYZ"));
    }

    #[test]
    fn test_trims_whitespace() {
        let url = format!("  open.spotify.com/track/{}  ", TRACK_ID);
        assert!(is_valid_track_url(&url));
    }

    #[test]
    fn test_rejects_non_matching() {
        assert!(!is_valid_track_url(""));
        assert!(!is_valid_track_url("   "));
        assert!(!is_valid_track_url("not a url"));
        assert!(!is_valid_track_url("https://example.com/track/abc"));
        // ID too short
        assert!(!is_valid_track_url("open.spotify.com/track/abc"));
        // Unknown resource kind
        assert!(!is_valid_track_url(&format!(
            "open.spotify.com/episode/{}",
            TRACK_ID
        )));
        // Short links take no query string
        assert!(!is_valid_track_url("spotify.link/abc?si=x"));
        // Trailing garbage after the ID
        assert!(!is_valid_track_url(&format!(
            "open.spotify.com/track/{}/extra",
            TRACK_ID
        )));
    }
}
