//! Filesystem watching.
//!
//! ```text
//! notify ──▶ ProjectWatcher ──┬─▶ ChangeRegistry (tokens go stale at once)
//!                             └─▶ channel ──▶ Debouncer ──▶ re-check
//! ```
//!
//! Tokens are signalled straight from the notify callback so the request
//! path never serves an entry the watcher already knows is stale; the
//! debounced stream only drives proactive re-checking.

mod debouncer;

pub use debouncer::{DEFAULT_DEBOUNCE_MS, Debouncer, is_temp_file};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam::channel::{self, Receiver};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::freshness::ChangeRegistry;
use crate::project::path;
use crate::utils::normalize_path;

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    /// Metadata-only modifications (mtime/chmod noise) are ignored.
    pub fn from_event_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Remove(_) => Some(Self::Removed),
            EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(Self::Modified),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Watches a template root and signals a [`ChangeRegistry`].
///
/// The watcher stops when this value is dropped.
pub struct ProjectWatcher {
    _watcher: RecommendedWatcher,
    events: Receiver<notify::Event>,
    root: PathBuf,
}

impl ProjectWatcher {
    /// Start watching `root` recursively, plus any `extra_files` outside it
    /// (such as the config file).
    pub fn start(root: &Path, registry: Arc<ChangeRegistry>, extra_files: &[PathBuf]) -> notify::Result<Self> {
        let root = normalize_path(root);
        let (tx, rx) = channel::unbounded();

        let callback_root = root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                if ChangeKind::from_event_kind(&event.kind).is_some() {
                    for changed in &event.paths {
                        if let Some(logical) = logical_path(&callback_root, changed) {
                            registry.notify_changed(&logical);
                        }
                    }
                }
                // Receiver dropped means the watch loop is gone
                let _ = tx.send(event);
            }
            Err(e) => {
                // Events may have been lost: treat everything as changed
                crate::debug!("watch"; "notify error: {}", e);
                registry.notify_all();
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        for file in extra_files {
            let file = normalize_path(file);
            if !file.starts_with(&root) && file.exists() {
                watcher.watch(&file, RecursiveMode::NonRecursive)?;
            }
        }
        crate::debug!("watch"; "watching {}", root.display());

        Ok(Self {
            _watcher: watcher,
            events: rx,
            root,
        })
    }

    /// Raw events, after the registry has been signalled.
    pub fn events(&self) -> &Receiver<notify::Event> {
        &self.events
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Logical path of a physical path under the watched root.
    pub fn logical(&self, physical: &Path) -> Option<String> {
        logical_path(&self.root, physical)
    }
}

/// Map a reported path to its logical form. Removed files cannot be
/// canonicalized, so the raw path is tried first.
fn logical_path(root: &Path, physical: &Path) -> Option<String> {
    path::to_logical(root, physical).or_else(|| path::to_logical(root, &normalize_path(physical)))
}
