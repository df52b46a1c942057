//! Persisted progress document: which resources were already acted on, with
//! what outcome, plus the daily counters. One JSON file per profile; the
//! document only grows.

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome descriptor for a single processed resource (post URL, username,
/// or hashtag). At most one record per resource identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(default)]
    pub liked: bool,

    #[serde(default)]
    pub already_liked: bool,

    #[serde(default)]
    pub commented: bool,

    #[serde(default)]
    pub followed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionRecord {
    /// Record for a target whose agent run produced no confirmed outcome.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            timestamp: Some(Utc::now()),
            ..Default::default()
        }
    }
}

/// A post URL collected during hashtag exploration, kept for later engagement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedPost {
    pub url: String,

    /// Hashtag page where the post was found (without '#').
    pub source: String,

    #[serde(default)]
    pub hashtags: Vec<String>,

    pub collected_at: DateTime<Utc>,
}

/// Cumulative per-category action counters, compared against the daily caps.
/// Reset is external: a fresh progress file (or date-suffixed path) per day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Counters {
    #[serde(default)]
    pub follows: u32,

    #[serde(default)]
    pub likes: u32,

    #[serde(default)]
    pub comments: u32,
}

/// The whole persisted document. Maps are ordered so that serialization is
/// stable across load/save cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub visited_posts: Vec<String>,

    #[serde(default)]
    pub actions: BTreeMap<String, ActionRecord>,

    #[serde(default)]
    pub visited_hashtags: Vec<String>,

    #[serde(default)]
    pub collected_posts: Vec<CollectedPost>,

    #[serde(default)]
    pub scroll_positions: BTreeMap<String, i64>,

    #[serde(default)]
    pub counters: Counters,

    #[serde(default)]
    pub last_action_timestamp: Option<DateTime<Utc>>,
}

impl Progress {
    /// Whether a feed post has already been opened this or a previous run.
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited_posts.iter().any(|u| u == url)
    }

    /// Mark a post URL as visited, keeping the list duplicate-free.
    pub fn mark_visited(&mut self, url: &str) {
        if !self.is_visited(url) {
            self.visited_posts.push(url.to_string());
        }
    }

    /// Whether an action record already exists for this resource identifier.
    /// Recorded resources are skipped without re-invoking the agent.
    pub fn is_recorded(&self, id: &str) -> bool {
        self.actions.contains_key(id)
    }

    /// Insert the outcome for a resource and bump the activity timestamp.
    pub fn record(&mut self, id: impl Into<String>, record: ActionRecord) {
        self.last_action_timestamp = Some(Utc::now());
        self.actions.insert(id.into(), record);
    }

    pub fn has_explored(&self, hashtag: &str) -> bool {
        self.visited_hashtags.iter().any(|h| h == hashtag)
    }

    pub fn mark_explored(&mut self, hashtag: &str) {
        if !self.has_explored(hashtag) {
            self.visited_hashtags.push(hashtag.to_string());
        }
    }
}

/// Loads and saves the progress document.
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document. A missing file yields the default empty document.
    /// An unreadable file is preserved under a timestamped backup name and a
    /// warning is logged before starting fresh — progress is never silently
    /// discarded.
    pub fn load(&self) -> Result<Progress> {
        if !self.path.exists() {
            debug!("no progress file at {}, starting fresh", self.path.display());
            return Ok(Progress::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(progress) => Ok(progress),
            Err(e) => {
                let backup = self.backup_path();
                warn!(
                    "progress file {} is corrupt ({}); preserving it as {} and starting fresh",
                    self.path.display(),
                    e,
                    backup.display()
                );
                std::fs::rename(&self.path, &backup)?;
                Ok(Progress::default())
            }
        }
    }

    /// Persist the whole document. Written to a temp file in the same
    /// directory and renamed into place so a crash never truncates the
    /// previous document.
    pub fn save(&self, progress: &Progress) -> Result<()> {
        let json = serde_json::to_string_pretty(progress)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "progress.json".into());
        name.push_str(&format!(".corrupt-{}", Utc::now().timestamp()));
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ProgressStore {
        ProgressStore::new(dir.path().join("progress.json"))
    }

    #[test]
    fn test_load_missing_returns_default() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let progress = store.load().unwrap();
        assert_eq!(progress, Progress::default());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut progress = Progress::default();
        progress.mark_visited("https://www.instagram.com/p/abc123/");
        progress.record(
            "https://www.instagram.com/p/abc123/",
            ActionRecord {
                liked: true,
                commented: true,
                comment_text: Some("Nice post! 🙌".into()),
                timestamp: Some(Utc::now()),
                ..Default::default()
            },
        );
        progress.counters.likes = 1;
        store.save(&progress).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, progress);
    }

    #[test]
    fn test_save_load_save_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut progress = Progress::default();
        progress.record("zeta", ActionRecord::failure("no keyword"));
        progress.record("alpha", ActionRecord::default());
        progress.scroll_positions.insert("main_feed".into(), 800);
        store.save(&progress).unwrap();
        let first = std::fs::read_to_string(store.path()).unwrap();

        let loaded = store.load().unwrap();
        store.save(&loaded).unwrap();
        let second = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_corrupt_file_backed_up_not_discarded() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{not json").unwrap();

        let progress = store.load().unwrap();
        assert_eq!(progress, Progress::default());
        assert!(!store.path().exists());

        let backups: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains("corrupt"))
            .collect();
        assert_eq!(backups.len(), 1);
        let content = std::fs::read_to_string(backups[0].path()).unwrap();
        assert_eq!(content, "{not json");
    }

    #[test]
    fn test_mark_visited_is_duplicate_free() {
        let mut progress = Progress::default();
        progress.mark_visited("https://www.instagram.com/p/a/");
        progress.mark_visited("https://www.instagram.com/p/a/");
        assert_eq!(progress.visited_posts.len(), 1);
    }

    #[test]
    fn test_record_updates_last_action_timestamp() {
        let mut progress = Progress::default();
        assert!(progress.last_action_timestamp.is_none());
        progress.record("user:alice", ActionRecord::default());
        assert!(progress.last_action_timestamp.is_some());
        assert!(progress.is_recorded("user:alice"));
    }
}
