//! Unit → code document → generated document → compiled type.

use std::sync::Arc;

use super::diagnostics::{from_backend_diagnostics, from_razor_errors, from_read_error};
use super::document::{CodeDocument, GeneratedDocument};
use super::engine::{CompilerBackend, TemplateEngine};
use super::options::{CompilationOptions, ImportsKind};
use super::result::CompilationResult;
use super::unit::{CompilationUnit, ReadError, resolve_unit};
use crate::cache::CacheContext;
use crate::project::RazorProject;

/// Drives the template engine and the compiler backend for a project.
#[derive(Clone)]
pub struct CompilationPipeline {
    project: Arc<dyn RazorProject>,
    engine: Arc<dyn TemplateEngine>,
    backend: Arc<dyn CompilerBackend>,
    options: CompilationOptions,
}

impl CompilationPipeline {
    pub fn new(
        project: Arc<dyn RazorProject>,
        engine: Arc<dyn TemplateEngine>,
        backend: Arc<dyn CompilerBackend>,
    ) -> Self {
        Self {
            project,
            engine,
            backend,
            options: CompilationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompilationOptions) -> Self {
        self.options = options;
        self
    }

    #[inline]
    pub fn project(&self) -> &Arc<dyn RazorProject> {
        &self.project
    }

    #[inline]
    pub fn options(&self) -> &CompilationOptions {
        &self.options
    }

    /// Resolve `path` with the import chain for `kind`.
    pub fn resolve_unit(&self, path: &str, kind: ImportsKind) -> CompilationUnit {
        resolve_unit(self.project.as_ref(), path, kind, &self.options)
    }

    pub fn create_code_document(&self, unit: &CompilationUnit) -> Result<CodeDocument, ReadError> {
        unit.create_code_document()
    }

    /// Run the template engine. Any engine diagnostic short-circuits into
    /// a failure result.
    pub fn create_compiled_document(
        &self,
        code: &CodeDocument,
    ) -> Result<GeneratedDocument, CompilationResult> {
        let generated = self.engine.generate(code);
        if generated.has_errors() {
            return Err(from_razor_errors(
                self.project.as_ref(),
                &code.relative_path,
                &generated.diagnostics,
            ));
        }
        Ok(generated)
    }

    /// Run the compiler backend over generated code.
    pub fn compile_generated(
        &self,
        code: &CodeDocument,
        generated: &GeneratedDocument,
    ) -> CompilationResult {
        match self.backend.compile(generated, &self.options.references) {
            Ok(compiled_type) => CompilationResult::success(compiled_type),
            Err(diagnostics) => from_backend_diagnostics(
                self.project.as_ref(),
                &code.relative_path,
                &generated.generated_code,
                &diagnostics,
            ),
        }
    }

    /// Compile a unit end to end. Never fails: every problem is reported
    /// as a failure result.
    pub fn compile(&self, unit: &CompilationUnit) -> CompilationResult {
        let code = match self.create_code_document(unit) {
            Ok(code) => code,
            Err(e) => {
                crate::debug!("compile"; "{}", e);
                return from_read_error(&e);
            }
        };

        let generated = match self.create_compiled_document(&code) {
            Ok(generated) => generated,
            Err(failure) => return failure,
        };

        self.compile_generated(&code, &generated)
    }

    /// Cache context for `path`: the resolved unit and a closure compiling it.
    pub fn cache_context(&self, path: &str, kind: ImportsKind) -> CacheContext<'_> {
        CacheContext::new(self.resolve_unit(path, kind), move |unit| self.compile(unit))
    }
}
