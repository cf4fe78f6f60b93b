//! Freshness detection: expiration tokens for cached compilations.
//!
//! - [`FileChangeToken`]: stat fingerprint with blake3 content-hash fallback
//! - [`SignalToken`]: fired by the file watcher through a [`ChangeRegistry`]
//!
//! A token answers one question: has the file it was issued for changed
//! (modified, created or deleted) since the token was issued?

mod hash;
mod registry;
mod token;

pub use hash::{ContentHash, compute_file_hash, hash_bytes};
pub use registry::{ChangeRegistry, SignalToken};
pub use token::{ChangeToken, ExpirationToken, FileChangeToken, NeverChangeToken, any_changed};
