//! Push-based change signals.
//!
//! A `ChangeRegistry` hands out `SignalToken`s per logical path. The
//! filesystem watcher fires them; tokens never touch the disk themselves.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;

use super::token::{ChangeToken, ExpirationToken};

/// One-shot flag shared by every token issued for a path.
#[derive(Debug, Default)]
struct ChangeSignal {
    fired: AtomicBool,
}

impl ChangeSignal {
    #[inline]
    fn fire(&self) {
        self.fired.store(true, Ordering::Release);
    }

    #[inline]
    fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// Registry of outstanding signals, keyed by logical path.
///
/// Firing a path consumes its signal: tokens issued afterwards observe a
/// fresh, unfired one.
#[derive(Debug, Default)]
pub struct ChangeRegistry {
    signals: DashMap<String, Arc<ChangeSignal>>,
}

impl ChangeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for `path`. Tokens issued for the same path share a signal.
    pub fn token(&self, path: &str) -> ExpirationToken {
        let signal = self.signals.entry(path.to_string()).or_default().clone();
        Arc::new(SignalToken {
            path: path.to_string(),
            signal,
        })
    }

    /// Fire the signal for `path`, or for everything under it when `path`
    /// names a directory. Returns how many signals fired.
    pub fn notify_changed(&self, path: &str) -> usize {
        let dir_prefix = format!("{}/", path.trim_end_matches('/'));
        let mut fired = 0;

        self.signals.retain(|key, signal| {
            if key == path || key.starts_with(&dir_prefix) {
                signal.fire();
                fired += 1;
                false
            } else {
                true
            }
        });

        if fired > 0 {
            crate::debug!("token"; "signalled {} ({} token set(s))", path, fired);
        }
        fired
    }

    /// Fire every outstanding signal (watcher overflow or error).
    pub fn notify_all(&self) {
        self.signals.retain(|_, signal| {
            signal.fire();
            false
        });
    }

    /// Number of paths with live signals.
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

/// Token backed by a registry signal.
pub struct SignalToken {
    path: String,
    signal: Arc<ChangeSignal>,
}

impl SignalToken {
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl ChangeToken for SignalToken {
    #[inline]
    fn has_changed(&self) -> bool {
        self.signal.is_fired()
    }
}

impl fmt::Debug for SignalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalToken")
            .field("path", &self.path)
            .field("fired", &self.signal.is_fired())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_fires_on_exact_path() {
        let registry = ChangeRegistry::new();
        let token = registry.token("/Views/Home/Index.cshtml");
        let other = registry.token("/Views/Home/About.cshtml");

        assert_eq!(registry.notify_changed("/Views/Home/Index.cshtml"), 1);
        assert!(token.has_changed());
        assert!(!other.has_changed());
    }

    #[test]
    fn test_tokens_share_signal() {
        let registry = ChangeRegistry::new();
        let a = registry.token("/Views/_ViewImports.cshtml");
        let b = registry.token("/Views/_ViewImports.cshtml");
        assert_eq!(registry.len(), 1);

        registry.notify_changed("/Views/_ViewImports.cshtml");
        assert!(a.has_changed());
        assert!(b.has_changed());
    }

    #[test]
    fn test_directory_fires_children() {
        let registry = ChangeRegistry::new();
        let inner = registry.token("/Views/Home/Index.cshtml");
        let sibling = registry.token("/Views2/Index.cshtml");

        registry.notify_changed("/Views");
        assert!(inner.has_changed());
        assert!(!sibling.has_changed());
    }

    #[test]
    fn test_new_token_after_fire_is_fresh() {
        let registry = ChangeRegistry::new();
        let old = registry.token("/a.cshtml");
        registry.notify_changed("/a.cshtml");
        assert!(registry.is_empty());

        let new = registry.token("/a.cshtml");
        assert!(old.has_changed());
        assert!(!new.has_changed());
    }

    #[test]
    fn test_notify_all() {
        let registry = ChangeRegistry::new();
        let a = registry.token("/a.cshtml");
        let b = registry.token("/b/c.cshtml");

        registry.notify_all();
        assert!(a.has_changed());
        assert!(b.has_changed());
        assert!(registry.is_empty());
    }
}
