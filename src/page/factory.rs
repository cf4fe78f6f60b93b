//! View page factories.

use std::fmt;
use std::sync::Arc;

use super::RazorPage;
use crate::cache::{CacheOutcome, CompilerCache};
use crate::compilation::{CompilationFailure, CompilationPipeline, CompilationResult, ImportsKind};
use crate::freshness::ExpirationToken;
use crate::project::path;

/// Creates a fresh page with its path already set.
pub type PageFactory = Arc<dyn Fn() -> Box<dyn RazorPage> + Send + Sync>;

/// Outcome of [`PageFactoryProvider::create_factory`].
///
/// Every variant carries the expiration tokens of the cache entry it was
/// built from, so callers can cache the result for as long as it is valid.
#[derive(Clone)]
pub enum PageFactoryResult {
    Found {
        factory: PageFactory,
        expiration_tokens: Vec<ExpirationToken>,
        is_precompiled: bool,
    },
    Failed {
        expiration_tokens: Vec<ExpirationToken>,
        failures: Vec<CompilationFailure>,
    },
    NotFound {
        expiration_tokens: Vec<ExpirationToken>,
    },
}

impl PageFactoryResult {
    #[inline]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    pub fn expiration_tokens(&self) -> &[ExpirationToken] {
        match self {
            Self::Found {
                expiration_tokens, ..
            }
            | Self::Failed {
                expiration_tokens, ..
            }
            | Self::NotFound { expiration_tokens } => expiration_tokens,
        }
    }

    pub fn factory(&self) -> Option<&PageFactory> {
        match self {
            Self::Found { factory, .. } => Some(factory),
            _ => None,
        }
    }
}

impl fmt::Debug for PageFactoryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found {
                expiration_tokens,
                is_precompiled,
                ..
            } => f
                .debug_struct("Found")
                .field("expiration_tokens", &expiration_tokens.len())
                .field("is_precompiled", is_precompiled)
                .finish(),
            Self::Failed { failures, .. } => f.debug_struct("Failed").field("failures", failures).finish(),
            Self::NotFound { .. } => f.write_str("NotFound"),
        }
    }
}

/// Produces page factories for views, using the `_ViewImports` chain.
#[derive(Clone)]
pub struct PageFactoryProvider {
    pipeline: Arc<CompilationPipeline>,
    cache: Arc<CompilerCache>,
}

impl PageFactoryProvider {
    pub fn new(pipeline: Arc<CompilationPipeline>, cache: Arc<CompilerCache>) -> Self {
        Self { pipeline, cache }
    }

    pub fn create_factory(&self, relative_path: &str) -> PageFactoryResult {
        let relative_path = path::strip_app_root(relative_path);
        let entry = self.cache.get_or_add(relative_path, |p| {
            self.pipeline.cache_context(p, ImportsKind::Views)
        });
        let expiration_tokens = entry.expiration_tokens().to_vec();

        match entry.outcome() {
            CacheOutcome::NotFound => PageFactoryResult::NotFound { expiration_tokens },
            CacheOutcome::Compiled(CompilationResult::Failure(failures)) => PageFactoryResult::Failed {
                expiration_tokens,
                failures: failures.clone(),
            },
            CacheOutcome::Compiled(CompilationResult::Success {
                compiled_type,
                is_precompiled,
            }) => {
                let compiled_type = compiled_type.clone();
                let page_path = relative_path.to_string();
                let factory: PageFactory = Arc::new(move || {
                    let mut page = compiled_type.activate();
                    page.set_path(page_path.clone());
                    page
                });
                PageFactoryResult::Found {
                    factory,
                    expiration_tokens,
                    is_precompiled: *is_precompiled,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilation::builtin::{DirectiveEngine, ManifestBackend};
    use crate::project::{MemoryProject, RazorProject};

    fn provider(project: &MemoryProject) -> PageFactoryProvider {
        let shared: Arc<dyn RazorProject> = Arc::new(project.clone());
        let pipeline = CompilationPipeline::new(
            shared.clone(),
            Arc::new(DirectiveEngine::new()),
            Arc::new(ManifestBackend::new()),
        );
        PageFactoryProvider::new(Arc::new(pipeline), Arc::new(CompilerCache::new(shared)))
    }

    #[test]
    fn test_found_factory_sets_path() {
        let project = MemoryProject::with_files([("/Views/Home/Index.cshtml", "<h1>hi</h1>")]);
        let provider = provider(&project);

        let result = provider.create_factory("~/Views/Home/Index.cshtml");
        let PageFactoryResult::Found {
            factory,
            expiration_tokens,
            is_precompiled,
        } = &result
        else {
            panic!("expected a factory, got {result:?}");
        };
        assert!(!*is_precompiled);
        assert_eq!(expiration_tokens.len(), 4);

        let first = factory();
        let second = factory();
        assert_eq!(first.path(), "/Views/Home/Index.cshtml");
        assert_eq!(second.type_name(), "Views_Home_Index");
    }

    #[test]
    fn test_not_found() {
        let project = MemoryProject::new();
        let result = provider(&project).create_factory("/Views/Missing.cshtml");
        assert!(matches!(result, PageFactoryResult::NotFound { .. }));
        assert_eq!(result.expiration_tokens().len(), 1);
    }

    #[test]
    fn test_failed_carries_failures_and_tokens() {
        let project = MemoryProject::with_files([
            ("/Views/_ViewImports.cshtml", "@page"),
            ("/Views/Index.cshtml", "<p></p>"),
        ]);
        let provider = provider(&project);
        let result = provider.create_factory("/Views/Index.cshtml");

        let PageFactoryResult::Failed {
            expiration_tokens,
            failures,
        } = &result
        else {
            panic!("expected failure, got {result:?}");
        };
        assert_eq!(failures[0].source_file_path, "/Views/_ViewImports.cshtml");
        assert_eq!(expiration_tokens.len(), 3);
        assert!(result.factory().is_none());

        project.write("/Views/_ViewImports.cshtml", "@using App");
        assert!(expiration_tokens.iter().any(|t| t.has_changed()));
        assert!(provider.create_factory("/Views/Index.cshtml").is_found());
    }

    #[test]
    fn test_uses_view_imports_not_page_imports() {
        let project = MemoryProject::with_files([
            ("/Pages/_PageImports.cshtml", "@{"),
            ("/Pages/Index.cshtml", "<p></p>"),
        ]);
        assert!(provider(&project).create_factory("/Pages/Index.cshtml").is_found());
    }
}
