//! Event deduplication and timing.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use super::ChangeKind;
use crate::utils::normalize_path;

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
const RECHECK_COOLDOWN_MS: u64 = 500;

/// Collects raw notify events until the window has been quiet.
pub struct Debouncer {
    /// Path → ChangeKind (dedup is free via key uniqueness)
    changes: FxHashMap<PathBuf, ChangeKind>,
    last_event: Option<Instant>,
    last_flush: Option<Instant>,
    window: Duration,
    cooldown: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
            last_flush: None,
            window,
            cooldown: Duration::from_millis(RECHECK_COOLDOWN_MS).min(window * 2),
        }
    }

    /// Add a notify event, applying dedup rules:
    /// - Removed then Created/Modified → the newer event (file was restored)
    /// - Modified then Removed → Removed
    /// - Created then Removed → dropped
    /// - otherwise the first event wins
    pub fn add_event(&mut self, event: &notify::Event) {
        let Some(kind) = ChangeKind::from_event_kind(&event.kind) else {
            return;
        };

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            let path = normalize_path(path);

            if let Some(&existing) = self.changes.get(&path) {
                match (existing, kind) {
                    (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                        crate::debug!("watch"; "restored: {}", path.display());
                        self.changes.insert(path, kind);
                    }
                    (ChangeKind::Modified, ChangeKind::Removed) => {
                        self.changes.insert(path, ChangeKind::Removed);
                    }
                    (ChangeKind::Created, ChangeKind::Removed) => {
                        crate::debug!("watch"; "discard created+removed: {}", path.display());
                        self.changes.remove(&path);
                    }
                    _ => continue,
                }
                self.last_event = Some(Instant::now());
                continue;
            }

            crate::debug!("watch"; "event {}: {}", kind.label(), path.display());
            self.changes.insert(path, kind);
            self.last_event = Some(Instant::now());
        }
    }

    /// Take the accumulated changes once the window and cooldown elapsed.
    pub fn take_if_ready(&mut self) -> Option<Vec<(PathBuf, ChangeKind)>> {
        if !self.is_ready() {
            return None;
        }

        let changes = std::mem::take(&mut self.changes);
        self.last_event = None;
        self.last_flush = Some(Instant::now());

        let mut changes: Vec<_> = changes.into_iter().collect();
        changes.sort();
        Some(changes)
    }

    pub fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };
        if last_event.elapsed() < self.window {
            return false;
        }
        if let Some(last_flush) = self.last_flush
            && last_flush.elapsed() < self.cooldown
        {
            return false;
        }
        !self.changes.is_empty()
    }

    /// Time until the next possible flush.
    pub fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(3600);
        };

        let debounce_remaining = self.window.saturating_sub(last_event.elapsed());
        let cooldown_remaining = self
            .last_flush
            .map(|t| self.cooldown.saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        debounce_remaining
            .max(cooldown_remaining)
            .max(Duration::from_millis(1))
    }

    pub fn pending(&self) -> usize {
        self.changes.len()
    }
}

/// Editor artifacts (backup, swap and hidden files).
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
