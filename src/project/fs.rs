//! Filesystem-backed project.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jwalk::WalkDir;

use super::{ItemSource, ProjectItem, RazorProject, path};
use crate::freshness::{ChangeRegistry, ExpirationToken, FileChangeToken, NeverChangeToken};
use crate::utils::normalize_path;

/// Reads a physical file on demand.
struct FileSource {
    path: PathBuf,
}

impl ItemSource for FileSource {
    fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}

/// Templates rooted at a directory.
///
/// Change detection is polling (`FileChangeToken`) unless a
/// [`ChangeRegistry`] is attached, in which case tokens are signalled by the
/// watcher feeding that registry.
#[derive(Debug, Clone)]
pub struct FileSystemProject {
    root: PathBuf,
    registry: Option<Arc<ChangeRegistry>>,
}

impl FileSystemProject {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: normalize_path(root.as_ref()),
            registry: None,
        }
    }

    /// Use push-based tokens from `registry` instead of polling.
    pub fn with_registry(mut self, registry: Arc<ChangeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Physical location of a logical path, `None` if it escapes the root.
    fn physical(&self, logical: &str) -> Option<(String, PathBuf)> {
        let logical = path::normalize(logical)?;
        let physical = self.root.join(logical.trim_start_matches('/'));
        Some((logical, physical))
    }
}

impl RazorProject for FileSystemProject {
    fn get_item(&self, path: &str) -> ProjectItem {
        let Some((logical, physical)) = self.physical(path) else {
            return ProjectItem::not_found(path);
        };

        if physical.is_file() {
            let source = Arc::new(FileSource {
                path: physical.clone(),
            });
            ProjectItem::new(logical, source).with_physical_path(physical)
        } else {
            ProjectItem::not_found(logical).with_physical_path(physical)
        }
    }

    fn watch(&self, path: &str) -> ExpirationToken {
        // Escaping paths never resolve to an item
        let Some(logical) = path::normalize(path) else {
            return Arc::new(NeverChangeToken);
        };

        if let Some(registry) = &self.registry {
            return registry.token(&logical);
        }
        let physical = self.root.join(logical.trim_start_matches('/'));
        Arc::new(FileChangeToken::new(physical))
    }

    fn enumerate_items(&self, base_path: &str, extension: &str) -> Vec<ProjectItem> {
        let Some((_, base)) = self.physical(base_path) else {
            return Vec::new();
        };

        let mut items: Vec<_> = WalkDir::new(&base)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == extension))
            .filter_map(|p| {
                let logical = path::to_logical(&self.root, &p)?;
                let source = Arc::new(FileSource { path: p.clone() });
                Some(ProjectItem::new(logical, source).with_physical_path(p))
            })
            .collect();

        items.sort_by(|a, b| a.path().cmp(b.path()));
        items
    }
}
