//! Command-line interface module.

mod args;
mod check;
mod report;
mod watch;

pub use args::{CheckArgs, Cli, Commands};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::cache::CompilerCache;
use crate::compilation::builtin::{DirectiveEngine, ManifestBackend};
use crate::compilation::{CompilationFailure, CompilationPipeline, ImportsKind};
use crate::config::RazorConfig;
use crate::freshness::ChangeRegistry;
use crate::page::{PageActionDescriptor, PageFactoryProvider, PageFactoryResult, PageLoadError, PageLoader};
use crate::project::{FileSystemProject, RazorProject, path};
use crate::utils::normalize_path;

/// Dispatch a parsed command line.
pub fn run(cli: &Cli, config: &RazorConfig) -> Result<()> {
    match &cli.command {
        Commands::Check { args } => check::run_check(args, config),
        Commands::Watch { pages } => watch::run_watch(*pages),
    }
}

// ============================================================================
// services
// ============================================================================

/// The wired-up project, pipeline, cache and page front-ends.
pub struct Services {
    pub project: Arc<dyn RazorProject>,
    pub pipeline: Arc<CompilationPipeline>,
    pub cache: Arc<CompilerCache>,
    pub factories: PageFactoryProvider,
    pub loader: PageLoader,
    root: PathBuf,
}

impl Services {
    /// Build services for `config`. With a registry, tokens are signalled by
    /// a watcher instead of polled.
    pub fn new(config: &RazorConfig, registry: Option<Arc<ChangeRegistry>>) -> Self {
        let root = config.template_root();
        let mut project = FileSystemProject::new(&root);
        if let Some(registry) = registry {
            project = project.with_registry(registry);
        }
        let project: Arc<dyn RazorProject> = Arc::new(project);

        let pipeline = Arc::new(
            CompilationPipeline::new(
                project.clone(),
                Arc::new(DirectiveEngine::new()),
                Arc::new(ManifestBackend::new()),
            )
            .with_options(config.compilation_options()),
        );
        let cache = Arc::new(CompilerCache::new(project.clone()));

        Self {
            factories: PageFactoryProvider::new(pipeline.clone(), cache.clone()),
            loader: PageLoader::new(pipeline.clone(), cache.clone()),
            project,
            pipeline,
            cache,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compile (or fetch) one template and summarize the outcome.
    pub fn check(&self, path: &str, kind: ImportsKind) -> TemplateReport {
        let status = match kind {
            ImportsKind::Views => match self.factories.create_factory(path) {
                PageFactoryResult::Found {
                    factory,
                    is_precompiled,
                    ..
                } => TemplateStatus::Compiled {
                    type_name: factory().type_name().to_string(),
                    is_precompiled,
                },
                PageFactoryResult::Failed { failures, .. } => TemplateStatus::Failed { failures },
                PageFactoryResult::NotFound { .. } => TemplateStatus::NotFound,
            },
            ImportsKind::Pages => match self.loader.load(&PageActionDescriptor::new(path)) {
                Ok(compiled) => TemplateStatus::Compiled {
                    type_name: compiled.type_name().to_string(),
                    is_precompiled: false,
                },
                Err(PageLoadError::Compilation { failures, .. }) => TemplateStatus::Failed { failures },
                Err(PageLoadError::NotFound(_)) => TemplateStatus::NotFound,
            },
        };

        TemplateReport {
            path: path.to_string(),
            kind: kind_label(kind),
            status,
        }
    }

    /// Which import chain `path` compiles with.
    pub fn kind_of(&self, path: &str, force_pages: bool) -> ImportsKind {
        if force_pages || path.starts_with("/Pages/") {
            ImportsKind::Pages
        } else {
            ImportsKind::Views
        }
    }

    /// Whether `path` is an import file rather than a template.
    pub fn is_import_file(&self, path: &str) -> bool {
        let options = self.pipeline.options();
        let name = path::file_name(path);
        name == options.view_imports || name == options.page_imports
    }

    /// Logical paths of the templates under `inputs` (or the whole root).
    pub fn discover(&self, config: &RazorConfig, inputs: &[PathBuf]) -> Result<Vec<String>> {
        let mut found = Vec::new();

        let bases: Vec<String> = if inputs.is_empty() {
            vec!["/".to_string()]
        } else {
            let mut bases = Vec::new();
            for input in inputs {
                let physical = normalize_path(input);
                let Some(logical) = path::to_logical(&self.root, &physical) else {
                    bail!("{} is outside the template root {}", input.display(), self.root.display());
                };
                if physical.is_file() {
                    if config.is_template(&physical) {
                        found.push(logical);
                    }
                } else if physical.is_dir() {
                    bases.push(logical);
                } else {
                    bail!("{} does not exist", input.display());
                }
            }
            bases
        };

        for base in &bases {
            for ext in &config.project.extensions {
                found.extend(
                    self.project
                        .enumerate_items(base, ext)
                        .into_iter()
                        .map(|item| item.path().to_string()),
                );
            }
        }

        found.retain(|p| !self.is_import_file(p));
        found.sort();
        found.dedup();
        Ok(found)
    }
}

fn kind_label(kind: ImportsKind) -> &'static str {
    match kind {
        ImportsKind::Views => "view",
        ImportsKind::Pages => "page",
    }
}

// ============================================================================
// reports
// ============================================================================

/// Outcome of checking one template.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateReport {
    pub path: String,
    pub kind: &'static str,
    #[serde(flatten)]
    pub status: TemplateStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TemplateStatus {
    Compiled {
        type_name: String,
        is_precompiled: bool,
    },
    Failed {
        failures: Vec<CompilationFailure>,
    },
    NotFound,
}

impl TemplateReport {
    pub fn is_failure(&self) -> bool {
        !matches!(self.status, TemplateStatus::Compiled { .. })
    }

    /// Total diagnostics across every failing file.
    pub fn error_count(&self) -> usize {
        match &self.status {
            TemplateStatus::Failed { failures } => failures.iter().map(|f| f.messages.len()).sum(),
            TemplateStatus::NotFound => 1,
            TemplateStatus::Compiled { .. } => 0,
        }
    }
}
