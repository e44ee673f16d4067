//! Bounded lookup/download history, persisted as JSON arrays.
//!
//! Telemetry is best-effort: read failures and corrupt files degrade to an
//! empty history, write failures are logged and swallowed. Entries are
//! prepended and the oldest evicted past the cap (they are never re-read by
//! business logic, only shown to the user).

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::warn;

use crate::api::TrackResult;

const HISTORY_FILE: &str = "history.json";
const DOWNLOADS_FILE: &str = "downloads.json";
const HISTORY_CAP: usize = 50;
const DOWNLOADS_CAP: usize = 100;

/// A successfully resolved lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub title: String,
    pub artist: String,
    pub timestamp: String,
    pub download_url: String,
}

/// A completed file save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub filename: String,
    pub timestamp: String,
}

pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Record a resolved lookup (newest first, cap 50).
    pub fn record_lookup(&self, track: &TrackResult) {
        let entry = HistoryEntry {
            title: track.title.clone(),
            artist: track.artist.clone(),
            timestamp: now_rfc3339(),
            download_url: track.download_url.clone(),
        };
        self.prepend(HISTORY_FILE, entry, HISTORY_CAP);
    }

    /// Record a completed file save (newest first, cap 100).
    pub fn record_download(&self, filename: &str) {
        let record = DownloadRecord {
            filename: filename.to_string(),
            timestamp: now_rfc3339(),
        };
        self.prepend(DOWNLOADS_FILE, record, DOWNLOADS_CAP);
    }

    pub fn load_lookups(&self) -> Vec<HistoryEntry> {
        load_entries(&self.dir.join(HISTORY_FILE))
    }

    pub fn load_downloads(&self) -> Vec<DownloadRecord> {
        load_entries(&self.dir.join(DOWNLOADS_FILE))
    }

    fn prepend<T: Serialize + DeserializeOwned>(&self, file: &str, entry: T, cap: usize) {
        let path = self.dir.join(file);
        let mut entries: Vec<T> = load_entries(&path);
        entries.insert(0, entry);
        entries.truncate(cap);

        if let Err(e) = write_entries(&path, &entries) {
            warn!("failed to save {}: {}", file, e);
        }
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn load_entries<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };
    match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("ignoring corrupt history at {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

fn write_entries<T: Serialize>(path: &Path, entries: &[T]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string(entries)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn track(title: &str) -> TrackResult {
        TrackResult {
            title: title.to_string(),
            artist: "A".to_string(),
            cover_url: None,
            duration_secs: None,
            size_label: None,
            download_url: format!("http://x/{}.mp3", title),
        }
    }

    #[test]
    fn test_lookups_capped_at_fifty_oldest_evicted() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().to_path_buf());

        for i in 0..51 {
            store.record_lookup(&track(&format!("t{}", i)));
        }

        let entries = store.load_lookups();
        assert_eq!(entries.len(), 50);
        // Most recent first; t0 (the oldest) was evicted.
        assert_eq!(entries[0].title, "t50");
        assert_eq!(entries.last().unwrap().title, "t1");
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().to_path_buf());
        assert!(store.load_lookups().is_empty());
        assert!(store.load_downloads().is_empty());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(HISTORY_FILE), "{not json]").unwrap();

        let store = HistoryStore::new(dir.path().to_path_buf());
        assert!(store.load_lookups().is_empty());

        // And recording on top of a corrupt file starts fresh.
        store.record_lookup(&track("t"));
        assert_eq!(store.load_lookups().len(), 1);
    }

    #[test]
    fn test_downloads_capped_at_one_hundred() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().to_path_buf());

        for i in 0..101 {
            store.record_download(&format!("f{}.mp3", i));
        }

        let records = store.load_downloads();
        assert_eq!(records.len(), 100);
        assert_eq!(records[0].filename, "f100.mp3");
    }
}
