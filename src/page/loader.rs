//! Page loading for page actions.

use std::sync::Arc;

use thiserror::Error;

use crate::cache::{CacheOutcome, CompilerCache};
use crate::compilation::{CompilationFailure, CompilationPipeline, CompilationResult, CompiledType, ImportsKind};

/// Describes a routable page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageActionDescriptor {
    /// Logical path of the page template.
    pub relative_path: String,
    pub view_engine_path: String,
    pub route_template: Option<String>,
}

impl PageActionDescriptor {
    pub fn new(relative_path: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        let view_engine_path = relative_path
            .rsplit_once('.')
            .map_or(relative_path.as_str(), |(stem, _)| stem)
            .to_string();
        Self {
            relative_path,
            view_engine_path,
            route_template: None,
        }
    }

    pub fn with_route_template(mut self, route: impl Into<String>) -> Self {
        self.route_template = Some(route.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum PageLoadError {
    #[error("File {0} was not found.")]
    NotFound(String),

    #[error("compilation of {path} failed with {} error(s)", count_messages(.failures))]
    Compilation {
        path: String,
        failures: Vec<CompilationFailure>,
    },
}

fn count_messages(failures: &[CompilationFailure]) -> usize {
    failures.iter().map(|f| f.messages.len()).sum()
}

/// Loads compiled page types, using the `_PageImports` chain.
#[derive(Clone)]
pub struct PageLoader {
    pipeline: Arc<CompilationPipeline>,
    cache: Arc<CompilerCache>,
}

impl PageLoader {
    pub fn new(pipeline: Arc<CompilationPipeline>, cache: Arc<CompilerCache>) -> Self {
        Self { pipeline, cache }
    }

    /// Compiled type for a page. Existence is checked before the cache is
    /// consulted.
    pub fn load(&self, descriptor: &PageActionDescriptor) -> Result<CompiledType, PageLoadError> {
        let path = descriptor.relative_path.as_str();
        if !self.pipeline.project().get_item(path).exists() {
            return Err(PageLoadError::NotFound(path.to_string()));
        }

        let entry = self.cache.get_or_add(path, |p| {
            self.pipeline.cache_context(p, ImportsKind::Pages)
        });

        match entry.outcome() {
            CacheOutcome::Compiled(CompilationResult::Success { compiled_type, .. }) => {
                Ok(compiled_type.clone())
            }
            CacheOutcome::Compiled(CompilationResult::Failure(failures)) => {
                Err(PageLoadError::Compilation {
                    path: entry.path().to_string(),
                    failures: failures.clone(),
                })
            }
            // Deleted between the existence check and compilation
            CacheOutcome::NotFound => Err(PageLoadError::NotFound(path.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilation::builtin::{DirectiveEngine, ManifestBackend};
    use crate::project::{MemoryProject, RazorProject};

    fn loader(project: &MemoryProject) -> PageLoader {
        let shared: Arc<dyn RazorProject> = Arc::new(project.clone());
        let pipeline = CompilationPipeline::new(
            shared.clone(),
            Arc::new(DirectiveEngine::new()),
            Arc::new(ManifestBackend::new()),
        );
        PageLoader::new(Arc::new(pipeline), Arc::new(CompilerCache::new(shared)))
    }

    #[test]
    fn test_descriptor() {
        let descriptor = PageActionDescriptor::new("/Pages/About.cshtml").with_route_template("about");
        assert_eq!(descriptor.view_engine_path, "/Pages/About");
        assert_eq!(descriptor.route_template.as_deref(), Some("about"));
    }

    #[test]
    fn test_load_success() {
        let project = MemoryProject::with_files([
            ("/Pages/_PageImports.cshtml", "@using App.Pages"),
            ("/Pages/Index.cshtml", "@page\n<h1>Index</h1>"),
        ]);
        let loader = loader(&project);
        let descriptor = PageActionDescriptor::new("/Pages/Index.cshtml");

        let first = loader.load(&descriptor).unwrap();
        let second = loader.load(&descriptor).unwrap();
        assert_eq!(first.type_name(), "Pages_Index");
        assert!(first.ptr_eq(&second));
    }

    #[test]
    fn test_missing_file() {
        let project = MemoryProject::new();
        let err = loader(&project)
            .load(&PageActionDescriptor::new("/Pages/Missing.cshtml"))
            .unwrap_err();
        assert!(matches!(err, PageLoadError::NotFound(_)));
        assert_eq!(err.to_string(), "File /Pages/Missing.cshtml was not found.");
    }

    #[test]
    fn test_missing_file_does_not_touch_cache() {
        let project = MemoryProject::new();
        let shared: Arc<dyn RazorProject> = Arc::new(project.clone());
        let pipeline = Arc::new(CompilationPipeline::new(
            shared.clone(),
            Arc::new(DirectiveEngine::new()),
            Arc::new(ManifestBackend::new()),
        ));
        let cache = Arc::new(CompilerCache::new(shared));
        let loader = PageLoader::new(pipeline, cache.clone());

        assert!(loader.load(&PageActionDescriptor::new("/Pages/Missing.cshtml")).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_compilation_failure_propagates() {
        let project = MemoryProject::with_files([
            ("/Pages/_PageImports.cshtml", "@page"),
            ("/Pages/Index.cshtml", "@page"),
        ]);
        let err = loader(&project)
            .load(&PageActionDescriptor::new("/Pages/Index.cshtml"))
            .unwrap_err();

        let PageLoadError::Compilation { path, failures } = &err else {
            panic!("expected compilation error, got {err:?}");
        };
        assert_eq!(path, "/Pages/Index.cshtml");
        assert_eq!(failures[0].source_file_path, "/Pages/_PageImports.cshtml");
        assert_eq!(err.to_string(), "compilation of /Pages/Index.cshtml failed with 1 error(s)");
    }
}
