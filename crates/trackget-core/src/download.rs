//! File save: HEAD-check the resolved link, then stream it to disk under a
//! generated filename.

use std::path::{Path, PathBuf};

use anyhow::Context;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Maximum sanitized lengths, title then artist.
const TITLE_MAX: usize = 50;
const ARTIST_MAX: usize = 30;

fn sanitize(s: &str, fallback: &str, max: usize) -> String {
    let s = if s.trim().is_empty() { fallback } else { s };
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(max)
        .collect()
}

/// Build the save filename: `<artist>_-_<title>.mp3`, non-alphanumerics
/// replaced with underscores (then collapsed), lower-cased. A stem that
/// degenerates to separators only falls back to `spotify_track`.
pub fn target_filename(artist: &str, title: &str) -> String {
    let artist = sanitize(artist, "artist", ARTIST_MAX);
    let title = sanitize(title, "track", TITLE_MAX);

    let mut stem = format!("{}_-_{}", artist, title);
    if stem.chars().all(|c| c == '_' || c == '-') {
        stem = "spotify_track".to_string();
    }

    let mut collapsed = String::with_capacity(stem.len() + 4);
    let mut prev_underscore = false;
    for c in stem.chars() {
        if c == '_' {
            if !prev_underscore {
                collapsed.push('_');
            }
            prev_underscore = true;
        } else {
            collapsed.push(c.to_ascii_lowercase());
            prev_underscore = false;
        }
    }

    format!("{}.mp3", collapsed)
}

/// Pretty-print a byte count as "N.M MB".
pub fn format_size_mb(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

pub struct SavedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Save `url` into `dir` as `filename`. A HEAD request first confirms the
/// link is still live (resolved links are time-limited), then the body is
/// streamed to disk.
pub async fn save_track(
    client: &reqwest::Client,
    url: &str,
    dir: &Path,
    filename: &str,
) -> anyhow::Result<SavedFile> {
    let head = client
        .head(url)
        .send()
        .await
        .context("Failed to reach download link")?;
    if !head.status().is_success() {
        anyhow::bail!("Download link expired or invalid (HTTP {})", head.status());
    }

    tokio::fs::create_dir_all(dir)
        .await
        .context("Failed to create downloads directory")?;
    let path = dir.join(filename);

    let response = client
        .get(url)
        .send()
        .await
        .context("Failed to start download")?;
    if !response.status().is_success() {
        anyhow::bail!("Download failed with HTTP {}", response.status());
    }

    let mut file = tokio::fs::File::create(&path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut stream = response.bytes_stream();
    let mut bytes = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Failed while reading download stream")?;
        bytes += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    info!("saved {} ({} bytes)", path.display(), bytes);
    Ok(SavedFile { path, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_from_plain_metadata() {
        assert_eq!(target_filename("A", "T"), "a_-_t.mp3");
        assert_eq!(
            target_filename("Daft Punk", "One More Time"),
            "daft_punk_-_one_more_time.mp3"
        );
    }

    #[test]
    fn test_filename_collapses_punctuation() {
        assert_eq!(
            target_filename("AC/DC", "T.N.T."),
            "ac_dc_-_t_n_t_.mp3"
        );
    }

    #[test]
    fn test_filename_truncates_long_fields() {
        let artist = "a".repeat(40);
        let title = "b".repeat(60);
        let name = target_filename(&artist, &title);
        assert_eq!(name, format!("{}_-_{}.mp3", "a".repeat(30), "b".repeat(50)));
    }

    #[test]
    fn test_filename_fallback_when_absent() {
        assert_eq!(target_filename("", ""), "artist_-_track.mp3");
        assert_eq!(target_filename("  ", "  "), "artist_-_track.mp3");
    }

    #[test]
    fn test_filename_fallback_when_degenerate() {
        // All-punctuation metadata sanitizes to separators only.
        assert_eq!(target_filename("???", "!!!"), "spotify_track.mp3");
        // A real title keeps the stem; the fallback is all-or-nothing.
        assert_eq!(target_filename("???", "Hello"), "_-_hello.mp3");
    }

    #[test]
    fn test_size_label() {
        assert_eq!(format_size_mb(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size_mb(1_572_864), "1.5 MB");
    }
}
