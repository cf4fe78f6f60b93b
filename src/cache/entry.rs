//! Cache entry values.

use crate::compilation::{CompilationResult, CompiledType};
use crate::freshness::{ExpirationToken, any_changed};

/// What the cache knows about a path.
#[derive(Debug, Clone)]
pub enum CacheOutcome {
    Compiled(CompilationResult),
    /// The template does not exist. Only its own token is kept, so
    /// creating it invalidates the entry.
    NotFound,
}

/// Result stored per path, shared as an `Arc` and replaced whole.
#[derive(Debug, Clone)]
pub struct CompilerCacheResult {
    path: String,
    outcome: CacheOutcome,
    expiration_tokens: Vec<ExpirationToken>,
}

impl CompilerCacheResult {
    pub fn compiled(
        path: impl Into<String>,
        result: CompilationResult,
        expiration_tokens: Vec<ExpirationToken>,
    ) -> Self {
        Self {
            path: path.into(),
            outcome: CacheOutcome::Compiled(result),
            expiration_tokens,
        }
    }

    pub fn not_found(path: impl Into<String>, expiration_tokens: Vec<ExpirationToken>) -> Self {
        Self {
            path: path.into(),
            outcome: CacheOutcome::NotFound,
            expiration_tokens,
        }
    }

    /// A precompiled view. It carries no tokens and never expires.
    pub fn precompiled(path: impl Into<String>, compiled_type: CompiledType) -> Self {
        Self {
            path: path.into(),
            outcome: CacheOutcome::Compiled(CompilationResult::precompiled(compiled_type)),
            expiration_tokens: Vec::new(),
        }
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn outcome(&self) -> &CacheOutcome {
        &self.outcome
    }

    #[inline]
    pub fn expiration_tokens(&self) -> &[ExpirationToken] {
        &self.expiration_tokens
    }

    #[inline]
    pub fn is_found(&self) -> bool {
        matches!(self.outcome, CacheOutcome::Compiled(_))
    }

    /// Compilation result, `None` for not-found entries.
    pub fn result(&self) -> Option<&CompilationResult> {
        match &self.outcome {
            CacheOutcome::Compiled(result) => Some(result),
            CacheOutcome::NotFound => None,
        }
    }

    pub fn compiled_type(&self) -> Option<&CompiledType> {
        self.result().and_then(CompilationResult::compiled_type)
    }

    /// Stale once any token reports a change.
    #[inline]
    pub fn is_expired(&self) -> bool {
        any_changed(&self.expiration_tokens)
    }
}
