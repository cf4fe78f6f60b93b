//! In-memory project.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::{ItemSource, ProjectItem, RazorProject, path};
use crate::freshness::{ChangeToken, ExpirationToken, NeverChangeToken};

#[derive(Debug, Clone)]
struct MemoryFile {
    /// `None` once removed; the entry is kept so its generation survives.
    content: Option<Arc<[u8]>>,
    generation: u64,
}

#[derive(Debug, Default)]
struct MemoryFiles {
    entries: DashMap<String, MemoryFile>,
    clock: AtomicU64,
}

impl MemoryFiles {
    #[inline]
    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current generation of `path` (0 if it was never written).
    fn generation(&self, path: &str) -> u64 {
        self.entries.get(path).map_or(0, |file| file.generation)
    }
}

/// Templates held in memory.
///
/// Every write or removal bumps the path's generation; tokens compare the
/// generation they were issued at against the current one. Cloning shares
/// the underlying files.
#[derive(Debug, Clone, Default)]
pub struct MemoryProject {
    files: Arc<MemoryFiles>,
}

impl MemoryProject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project pre-populated with `(path, content)` pairs.
    pub fn with_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: Into<Vec<u8>>,
    {
        let project = Self::new();
        for (path, content) in files {
            project.write(path.as_ref(), content);
        }
        project
    }

    /// Create or replace a file.
    pub fn write(&self, path: &str, content: impl Into<Vec<u8>>) {
        let Some(path) = path::normalize(path) else {
            return;
        };
        let generation = self.files.tick();
        let content: Vec<u8> = content.into();
        self.files.entries.insert(
            path,
            MemoryFile {
                content: Some(content.into()),
                generation,
            },
        );
    }

    /// Remove a file. Returns whether it existed.
    pub fn remove(&self, path: &str) -> bool {
        let Some(path) = path::normalize(path) else {
            return false;
        };
        let generation = self.files.tick();
        match self.files.entries.get_mut(&path) {
            Some(mut file) => {
                let existed = file.content.take().is_some();
                file.generation = generation;
                existed
            }
            None => false,
        }
    }

    fn content(&self, path: &str) -> Option<Arc<[u8]>> {
        self.files.entries.get(path)?.content.clone()
    }
}

/// Source reading the current content from the shared map.
struct MemorySource {
    files: Arc<MemoryFiles>,
    path: String,
}

impl ItemSource for MemorySource {
    fn read(&self) -> io::Result<Vec<u8>> {
        self.files
            .entries
            .get(&self.path)
            .and_then(|file| file.content.as_deref().map(<[u8]>::to_vec))
            .ok_or_else(|| io::ErrorKind::NotFound.into())
    }
}

impl RazorProject for MemoryProject {
    fn get_item(&self, path: &str) -> ProjectItem {
        let Some(logical) = path::normalize(path) else {
            return ProjectItem::not_found(path);
        };

        if self.content(&logical).is_some() {
            let source = Arc::new(MemorySource {
                files: self.files.clone(),
                path: logical.clone(),
            });
            ProjectItem::new(logical, source)
        } else {
            ProjectItem::not_found(logical)
        }
    }

    fn watch(&self, path: &str) -> ExpirationToken {
        let Some(logical) = path::normalize(path) else {
            return Arc::new(NeverChangeToken);
        };
        let issued = self.files.generation(&logical);
        Arc::new(GenerationToken {
            files: self.files.clone(),
            path: logical,
            issued,
        })
    }

    fn enumerate_items(&self, base_path: &str, extension: &str) -> Vec<ProjectItem> {
        let Some(base) = path::normalize(base_path) else {
            return Vec::new();
        };
        let prefix = if base == "/" { base } else { format!("{base}/") };
        let suffix = format!(".{extension}");

        let mut paths: Vec<String> = self
            .files
            .entries
            .iter()
            .filter(|entry| entry.content.is_some())
            .map(|entry| entry.key().clone())
            .filter(|p| p.starts_with(&prefix) && p.ends_with(&suffix))
            .collect();
        paths.sort();

        paths.iter().map(|p| self.get_item(p)).collect()
    }
}

/// Token that changes when a path's generation moves past the issued one.
pub struct GenerationToken {
    files: Arc<MemoryFiles>,
    path: String,
    issued: u64,
}

impl ChangeToken for GenerationToken {
    fn has_changed(&self) -> bool {
        self.files.generation(&self.path) != self.issued
    }
}

impl fmt::Debug for GenerationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationToken")
            .field("path", &self.path)
            .field("issued", &self.issued)
            .finish()
    }
}
