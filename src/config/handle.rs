//! Global config with atomic reload support.
//!
//! Uses `arc-swap` for lock-free reads and atomic config replacement, so
//! `razor.toml` can be reloaded while `watch` is running.

use std::fs;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use anyhow::Result;
use arc_swap::ArcSwap;
use rustc_hash::FxHasher;

use super::RazorConfig;

/// Global config storage.
pub static CONFIG: LazyLock<ArcSwap<RazorConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(RazorConfig::default()));

/// Hash of the config file content currently loaded.
static CONFIG_HASH: AtomicU64 = AtomicU64::new(0);

#[inline]
pub fn cfg() -> Arc<RazorConfig> {
    CONFIG.load_full()
}

fn content_hash(content: &str) -> u64 {
    let mut hasher = FxHasher::default();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Reload config from disk if content changed.
///
/// Returns `Ok(true)` if config was updated, `Ok(false)` if unchanged.
pub fn reload_config() -> Result<bool> {
    let current = cfg();
    if !current.config_path.is_file() {
        return Ok(false);
    }

    let content = fs::read_to_string(&current.config_path)?;
    let new_hash = content_hash(&content);
    if new_hash == CONFIG_HASH.load(Ordering::Relaxed) {
        return Ok(false);
    }

    let mut config = RazorConfig::parse(&content, &current.config_path)?;
    config.finalize(&current.config_path, current.cli_root.clone());
    config.validate()?;

    CONFIG.store(Arc::new(config));
    CONFIG_HASH.store(new_hash, Ordering::Relaxed);
    Ok(true)
}

#[inline]
pub fn init_config(config: RazorConfig) -> Arc<RazorConfig> {
    if let Ok(content) = fs::read_to_string(&config.config_path) {
        CONFIG_HASH.store(content_hash(&content), Ordering::Relaxed);
    }

    let arc = Arc::new(config);
    CONFIG.store(Arc::clone(&arc));
    arc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash("[watch]\n"), content_hash("[watch]\n"));
        assert_ne!(content_hash("[watch]\n"), content_hash("[compile]\n"));
    }
}
