//! Source resolution: logical template paths to project items.
//!
//! A [`RazorProject`] maps logical paths (`/Views/Home/Index.cshtml`) to
//! [`ProjectItem`]s, finds the hierarchical import files that apply to a
//! template and issues change tokens for paths.
//!
//! Two implementations ship with the crate:
//! - [`FileSystemProject`]: a directory on disk
//! - [`MemoryProject`]: in-memory files, for embedders and tests

mod fs;
mod memory;
pub mod path;

pub use fs::FileSystemProject;
pub use memory::{GenerationToken, MemoryProject};

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::freshness::ExpirationToken;

/// Lazily readable content of a project item.
pub trait ItemSource: Send + Sync {
    fn read(&self) -> io::Result<Vec<u8>>;
}

/// Source for items that do not exist.
struct Missing;

impl ItemSource for Missing {
    fn read(&self) -> io::Result<Vec<u8>> {
        Err(io::ErrorKind::NotFound.into())
    }
}

/// A template or import file, existing or not.
///
/// Content is read on demand. Resolving an item never touches its content,
/// so a token issued after resolution but before the read covers every
/// write the read could observe.
#[derive(Clone)]
pub struct ProjectItem {
    path: String,
    base_path: String,
    physical_path: Option<PathBuf>,
    exists: bool,
    source: Arc<dyn ItemSource>,
}

impl ProjectItem {
    /// An existing item backed by `source`.
    pub fn new(path: impl Into<String>, source: Arc<dyn ItemSource>) -> Self {
        Self {
            path: path.into(),
            base_path: "/".to_string(),
            physical_path: None,
            exists: true,
            source,
        }
    }

    /// An item that does not exist.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            base_path: "/".to_string(),
            physical_path: None,
            exists: false,
            source: Arc::new(Missing),
        }
    }

    pub fn with_physical_path(mut self, physical_path: impl Into<PathBuf>) -> Self {
        self.physical_path = Some(physical_path.into());
        self
    }

    /// Logical path relative to the project root, with a leading `/`.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[inline]
    pub fn physical_path(&self) -> Option<&Path> {
        self.physical_path.as_deref()
    }

    #[inline]
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn file_name(&self) -> &str {
        path::file_name(&self.path)
    }

    /// Read the raw content.
    pub fn read(&self) -> io::Result<Vec<u8>> {
        if !self.exists {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", self.path),
            ));
        }
        self.source.read()
    }

    /// Read the content as UTF-8.
    pub fn read_to_string(&self) -> io::Result<String> {
        let bytes = self.read()?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl fmt::Debug for ProjectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectItem")
            .field("path", &self.path)
            .field("physical_path", &self.physical_path)
            .field("exists", &self.exists)
            .finish()
    }
}

/// Access to the templates of an application.
pub trait RazorProject: Send + Sync {
    /// Item for `path`. Never fails: missing files yield an item with
    /// `exists() == false`.
    fn get_item(&self, path: &str) -> ProjectItem;

    /// Expiration token for `path` (which need not exist yet).
    fn watch(&self, path: &str) -> ExpirationToken;

    /// Every existing item under `base_path` with the given extension,
    /// sorted by path.
    fn enumerate_items(&self, base_path: &str, extension: &str) -> Vec<ProjectItem>;

    /// Items named `file_name` in every directory from the root down to the
    /// directory of `path`, root-most first. Items are returned whether they
    /// exist or not; the template itself is skipped.
    fn find_hierarchical_items(&self, path: &str, file_name: &str) -> Vec<ProjectItem> {
        let Some(path) = path::normalize(path) else {
            return Vec::new();
        };
        path::hierarchical_paths(&path, file_name)
            .iter()
            .map(|candidate| self.get_item(candidate))
            .collect()
    }
}
