//! Compilation cache.
//!
//! Maps template paths to compiled results, compiling each path at most
//! once per change:
//!
//! ```text
//! get_or_add(path)
//!   ├─ Cached + fresh ──────────▶ return entry (no factory call)
//!   ├─ Pending ─────────────────▶ wait for the builder, share its Arc
//!   └─ absent / stale ─ claim ──▶ build: tokens → compile → install Cached
//! ```
//!
//! Tokens are issued before any source is read, so a write racing with the
//! compilation always leaves the entry stale rather than stale-but-fresh.
//! Stale entries are replaced on their next access; nothing is purged
//! proactively.

mod dependency;
mod entry;
mod pending;

pub use dependency::DependencyGraph;
pub use entry::{CacheOutcome, CompilerCacheResult};
pub use pending::PendingCompilation;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use serde::Serialize;

use crate::compilation::{CompilationResult, CompilationUnit, CompiledType};
use crate::project::{RazorProject, path};

/// What the cache needs to build an entry: the resolved unit and a
/// closure compiling it.
pub struct CacheContext<'a> {
    unit: CompilationUnit,
    compile: Box<dyn FnOnce(&CompilationUnit) -> CompilationResult + 'a>,
}

impl<'a> CacheContext<'a> {
    pub fn new(
        unit: CompilationUnit,
        compile: impl FnOnce(&CompilationUnit) -> CompilationResult + 'a,
    ) -> Self {
        Self {
            unit,
            compile: Box::new(compile),
        }
    }
}

#[derive(Clone)]
enum Slot {
    Pending(Arc<PendingCompilation>),
    Cached(Arc<CompilerCacheResult>),
}

enum Claim {
    Build(Arc<PendingCompilation>),
    Wait(Arc<PendingCompilation>),
    /// The slot moved on since it was read.
    Retry,
}

/// Counters for cache activity.
#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    compilations: AtomicU64,
    coalesced: AtomicU64,
}

/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    /// Fresh entries returned without compiling.
    pub hits: u64,
    /// Factory invocations (including not-found results).
    pub compilations: u64,
    /// Callers that waited on another caller's compilation.
    pub coalesced: u64,
}

/// Per-path memoizing compilation cache.
pub struct CompilerCache {
    project: Arc<dyn RazorProject>,
    entries: DashMap<String, Slot>,
    dependencies: RwLock<DependencyGraph>,
    stats: CacheStats,
}

impl CompilerCache {
    pub fn new(project: Arc<dyn RazorProject>) -> Self {
        Self {
            project,
            entries: DashMap::new(),
            dependencies: RwLock::new(DependencyGraph::new()),
            stats: CacheStats::default(),
        }
    }

    /// Cache seeded with precompiled views. Their entries never expire.
    pub fn with_precompiled<I, P>(project: Arc<dyn RazorProject>, views: I) -> Self
    where
        I: IntoIterator<Item = (P, CompiledType)>,
        P: AsRef<str>,
    {
        let cache = Self::new(project);
        for (view_path, compiled_type) in views {
            let key = path::strip_app_root(view_path.as_ref()).to_string();
            let entry = CompilerCacheResult::precompiled(key.clone(), compiled_type);
            cache.entries.insert(key, Slot::Cached(Arc::new(entry)));
        }
        crate::debug!("cache"; "seeded {} precompiled view(s)", cache.entries.len());
        cache
    }

    #[inline]
    pub fn project(&self) -> &Arc<dyn RazorProject> {
        &self.project
    }

    /// Cached result for `path`, compiling it through `factory` when the
    /// path is absent or stale.
    ///
    /// Concurrent callers for the same path share one compilation and
    /// receive the same `Arc`. If the builder panics its claim is released,
    /// waiters retry and the panic resumes in the builder's caller.
    pub fn get_or_add<'a, F>(&self, path: &str, factory: F) -> Arc<CompilerCacheResult>
    where
        F: Fn(&str) -> CacheContext<'a>,
    {
        let key = path::strip_app_root(path);

        loop {
            // Clone out of the shard guard; tokens are checked unlocked.
            let current = self.entries.get(key).map(|slot| slot.clone());

            let stale = match current {
                Some(Slot::Cached(entry)) => {
                    if !entry.is_expired() {
                        self.stats.hits.fetch_add(1, Ordering::Relaxed);
                        return entry;
                    }
                    crate::debug!("cache"; "expired: {}", key);
                    Some(entry)
                }
                Some(Slot::Pending(pending)) => match self.wait(&pending) {
                    Some(entry) => return entry,
                    None => continue,
                },
                None => None,
            };

            match self.claim(key, stale.as_ref()) {
                Claim::Build(pending) => return self.build(key, pending, &factory),
                Claim::Wait(pending) => match self.wait(&pending) {
                    Some(entry) => return entry,
                    None => continue,
                },
                Claim::Retry => continue,
            }
        }
    }

    /// Current entry for `path` without compiling. Pending or missing
    /// entries yield `None`.
    pub fn get(&self, path: &str) -> Option<Arc<CompilerCacheResult>> {
        match &*self.entries.get(path::strip_app_root(path))? {
            Slot::Cached(entry) => Some(Arc::clone(entry)),
            Slot::Pending(_) => None,
        }
    }

    /// Cached templates affected by a change to `path`: the template itself
    /// and every template importing it.
    pub fn dependents_of(&self, path: &str) -> Vec<String> {
        let Some(path) = path::normalize(path) else {
            return Vec::new();
        };

        let graph = self.dependencies.read();
        let mut dependents: Vec<String> = graph
            .used_by(&path)
            .map(|users| users.iter().cloned().collect())
            .unwrap_or_default();
        if graph.contains(&path) && !dependents.contains(&path) {
            dependents.push(path);
        }
        dependents.sort();
        dependents
    }

    /// Number of paths with an entry (cached or pending).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            compilations: self.stats.compilations.load(Ordering::Relaxed),
            coalesced: self.stats.coalesced.load(Ordering::Relaxed),
        }
    }

    // -------------------------------------------------------------------------
    // Private
    // -------------------------------------------------------------------------

    /// Take the slot for `key` under its entry lock.
    ///
    /// A cached entry is only replaced if it is still the one found stale.
    fn claim(&self, key: &str, stale: Option<&Arc<CompilerCacheResult>>) -> Claim {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let replace = match occupied.get() {
                    Slot::Pending(pending) => return Claim::Wait(Arc::clone(pending)),
                    Slot::Cached(entry) => stale.is_some_and(|stale| Arc::ptr_eq(stale, entry)),
                };
                if !replace {
                    return Claim::Retry;
                }
                let pending = Arc::new(PendingCompilation::new());
                occupied.insert(Slot::Pending(Arc::clone(&pending)));
                Claim::Build(pending)
            }
            Entry::Vacant(vacant) => {
                let pending = Arc::new(PendingCompilation::new());
                vacant.insert(Slot::Pending(Arc::clone(&pending)));
                Claim::Build(pending)
            }
        }
    }

    fn wait(&self, pending: &PendingCompilation) -> Option<Arc<CompilerCacheResult>> {
        self.stats.coalesced.fetch_add(1, Ordering::Relaxed);
        pending.wait()
    }

    fn build<'a, F>(
        &self,
        key: &str,
        pending: Arc<PendingCompilation>,
        factory: &F,
    ) -> Arc<CompilerCacheResult>
    where
        F: Fn(&str) -> CacheContext<'a>,
    {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.compute(key, factory)));

        match outcome {
            Ok(result) => {
                let result = Arc::new(result);
                self.entries
                    .insert(key.to_string(), Slot::Cached(Arc::clone(&result)));
                pending.complete(Arc::clone(&result));
                result
            }
            Err(payload) => {
                crate::debug!("cache"; "compilation of {} panicked, releasing claim", key);
                self.entries.remove_if(key, |_, slot| {
                    matches!(slot, Slot::Pending(p) if Arc::ptr_eq(p, &pending))
                });
                pending.abandon();
                panic::resume_unwind(payload)
            }
        }
    }

    fn compute<'a, F>(&self, key: &str, factory: &F) -> CompilerCacheResult
    where
        F: Fn(&str) -> CacheContext<'a>,
    {
        self.stats.compilations.fetch_add(1, Ordering::Relaxed);
        let CacheContext { unit, compile } = factory(key);
        let item_path = unit.item().path().to_string();

        if !unit.item().exists() {
            crate::debug!("cache"; "not found: {}", key);
            let token = self.project.watch(&item_path);
            self.dependencies.write().record(key, &[item_path.as_str()]);
            return CompilerCacheResult::not_found(key, vec![token]);
        }

        let watched = unit.watched_paths();
        let tokens = watched.iter().map(|p| self.project.watch(p)).collect();
        self.dependencies.write().record(key, &watched);

        crate::debug!("cache"; "compiling {} ({} import candidate(s))", key, watched.len() - 1);
        let result = compile(&unit);
        CompilerCacheResult::compiled(key, result, tokens)
    }
}

#[cfg(test)]
mod tests;
