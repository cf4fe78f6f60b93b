//! Compilation outcomes.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::page::{PageActivator, RazorPage};

/// An activatable compiled page type.
#[derive(Clone)]
pub struct CompiledType(Arc<dyn PageActivator>);

impl CompiledType {
    pub fn new(activator: impl PageActivator + 'static) -> Self {
        Self(Arc::new(activator))
    }

    pub fn from_arc(activator: Arc<dyn PageActivator>) -> Self {
        Self(activator)
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        self.0.type_name()
    }

    /// Construct a fresh page instance.
    #[inline]
    pub fn activate(&self) -> Box<dyn RazorPage> {
        self.0.activate()
    }

    /// Whether both handles refer to the same compiled type.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for CompiledType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompiledType").field(&self.type_name()).finish()
    }
}

/// A single diagnostic with 1-based lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticMessage {
    pub message: String,
    pub formatted_message: String,
    pub source_file_path: String,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

/// Diagnostics belonging to one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilationFailure {
    pub source_file_path: String,
    /// `None` when the file could not be read.
    pub source_file_content: Option<String>,
    /// Generated code, empty for parse failures.
    pub compiled_content: String,
    pub messages: Vec<DiagnosticMessage>,
}

/// Outcome of compiling one template.
#[derive(Debug, Clone)]
pub enum CompilationResult {
    Success {
        compiled_type: CompiledType,
        is_precompiled: bool,
    },
    Failure(Vec<CompilationFailure>),
}

impl CompilationResult {
    pub fn success(compiled_type: CompiledType) -> Self {
        Self::Success {
            compiled_type,
            is_precompiled: false,
        }
    }

    pub fn precompiled(compiled_type: CompiledType) -> Self {
        Self::Success {
            compiled_type,
            is_precompiled: true,
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn compiled_type(&self) -> Option<&CompiledType> {
        match self {
            Self::Success { compiled_type, .. } => Some(compiled_type),
            Self::Failure(_) => None,
        }
    }

    /// Failures, empty on success.
    pub fn failures(&self) -> &[CompilationFailure] {
        match self {
            Self::Success { .. } => &[],
            Self::Failure(failures) => failures,
        }
    }

    pub fn is_precompiled(&self) -> bool {
        matches!(
            self,
            Self::Success {
                is_precompiled: true,
                ..
            }
        )
    }
}
