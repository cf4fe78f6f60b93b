//! Expiration tokens.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use parking_lot::Mutex;

use super::hash::{ContentHash, compute_file_hash};

/// Change notification handle for a single file.
pub trait ChangeToken: Send + Sync + fmt::Debug {
    /// Whether the underlying file changed since the token was issued.
    ///
    /// Once a token reports a change it keeps reporting it.
    fn has_changed(&self) -> bool;
}

/// Shared token handle attached to cache entries.
pub type ExpirationToken = Arc<dyn ChangeToken>;

/// True if any token in the set reports a change.
#[inline]
pub fn any_changed(tokens: &[ExpirationToken]) -> bool {
    tokens.iter().any(|token| token.has_changed())
}

/// Token for a path that can never exist, such as one escaping the root.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverChangeToken;

impl ChangeToken for NeverChangeToken {
    #[inline]
    fn has_changed(&self) -> bool {
        false
    }
}

// =============================================================================
// FileChangeToken
// =============================================================================

/// Metadata stamp used as the cheap first check.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Stamp {
    len: u64,
    modified: Option<SystemTime>,
}

impl Stamp {
    /// `None` when the file does not exist (or is not a regular file).
    fn read(path: &Path) -> Option<Self> {
        let meta = fs::metadata(path).ok().filter(|m| m.is_file())?;
        Some(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

#[derive(Debug)]
struct Fingerprint {
    stamp: Option<Stamp>,
    hash: ContentHash,
}

impl Fingerprint {
    fn capture(path: &Path) -> Self {
        let stamp = Stamp::read(path);
        let hash = if stamp.is_some() {
            compute_file_hash(path)
        } else {
            ContentHash::empty()
        };
        Self { stamp, hash }
    }
}

/// Polling token for a physical file.
///
/// Compares `(len, mtime)` first and only hashes the content when the
/// metadata moved, so a touched-but-identical file stays fresh.
/// Tokens for files that do not exist yet report a change once the file
/// appears.
pub struct FileChangeToken {
    path: PathBuf,
    snapshot: Mutex<Fingerprint>,
    changed: AtomicBool,
}

impl FileChangeToken {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let snapshot = Fingerprint::capture(&path);
        Self {
            path,
            snapshot: Mutex::new(snapshot),
            changed: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn detect(&self) -> bool {
        let current = Stamp::read(&self.path);
        let mut snapshot = self.snapshot.lock();

        match (&snapshot.stamp, current) {
            (None, None) => false,
            (None, Some(_)) | (Some(_), None) => true,
            (Some(old), Some(new)) if *old == new => false,
            (Some(_), Some(new)) => {
                if compute_file_hash(&self.path) == snapshot.hash {
                    snapshot.stamp = Some(new);
                    false
                } else {
                    true
                }
            }
        }
    }
}

impl ChangeToken for FileChangeToken {
    fn has_changed(&self) -> bool {
        if self.changed.load(Ordering::Acquire) {
            return true;
        }

        let changed = self.detect();
        if changed {
            self.changed.store(true, Ordering::Release);
            crate::debug!("token"; "changed: {}", self.path.display());
        }
        changed
    }
}

impl fmt::Debug for FileChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileChangeToken")
            .field("path", &self.path)
            .field("changed", &self.changed.load(Ordering::Relaxed))
            .finish()
    }
}
