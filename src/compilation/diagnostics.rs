//! Turns parser and compiler errors into file-grouped failures.

use rustc_hash::FxHashMap;

use super::engine::{BackendDiagnostic, RazorError};
use super::result::{CompilationFailure, CompilationResult, DiagnosticMessage};
use super::unit::ReadError;
use crate::project::RazorProject;

/// Failure result for parser/generator errors.
///
/// Errors without a file path are attributed to `relative_path`. Groups keep
/// the order in which their first error appeared.
pub fn from_razor_errors(
    project: &dyn RazorProject,
    relative_path: &str,
    errors: &[RazorError],
) -> CompilationResult {
    let groups = group_by_file(errors, |error| {
        error.location.file_path.as_deref().unwrap_or(relative_path)
    });

    let failures = groups
        .into_iter()
        .map(|(file_path, errors)| CompilationFailure {
            source_file_path: file_path.to_string(),
            source_file_content: read_file_contents_safely(project, file_path),
            compiled_content: String::new(),
            messages: errors
                .into_iter()
                .map(|error| razor_message(error, file_path))
                .collect(),
        })
        .collect();

    CompilationResult::Failure(failures)
}

fn razor_message(error: &RazorError, file_path: &str) -> DiagnosticMessage {
    let location = &error.location;
    let start_line = location.line_index + 1;
    DiagnosticMessage {
        message: error.message.clone(),
        formatted_message: format!(
            "{error} ({},{}) {}",
            location.line_index, location.character_index, error.message
        ),
        source_file_path: file_path.to_string(),
        start_line,
        start_column: location.character_index,
        end_line: start_line,
        end_column: location.character_index + error.length,
    }
}

/// Failure result for backend diagnostics.
///
/// Unmapped diagnostics are attributed to `relative_path`. The generated
/// code is kept as `compiled_content` of every group.
pub fn from_backend_diagnostics(
    project: &dyn RazorProject,
    relative_path: &str,
    generated_code: &str,
    diagnostics: &[BackendDiagnostic],
) -> CompilationResult {
    let groups = group_by_file(diagnostics, |diagnostic| {
        diagnostic.file_path.as_deref().unwrap_or(relative_path)
    });

    let failures = groups
        .into_iter()
        .map(|(file_path, diagnostics)| CompilationFailure {
            source_file_path: file_path.to_string(),
            source_file_content: read_file_contents_safely(project, file_path),
            compiled_content: generated_code.to_string(),
            messages: diagnostics
                .into_iter()
                .map(|diagnostic| backend_message(diagnostic, file_path))
                .collect(),
        })
        .collect();

    CompilationResult::Failure(failures)
}

fn backend_message(diagnostic: &BackendDiagnostic, file_path: &str) -> DiagnosticMessage {
    let id = diagnostic.id.as_deref().unwrap_or("RV0000");
    DiagnosticMessage {
        message: diagnostic.message.clone(),
        formatted_message: format!(
            "{file_path}({},{}): error {id}: {}",
            diagnostic.line, diagnostic.column, diagnostic.message
        ),
        source_file_path: file_path.to_string(),
        start_line: diagnostic.line,
        start_column: diagnostic.column,
        end_line: diagnostic.end_line,
        end_column: diagnostic.end_column,
    }
}

/// Failure result for a template or import that exists but cannot be read.
pub fn from_read_error(error: &ReadError) -> CompilationResult {
    let message = error.source.to_string();
    CompilationResult::Failure(vec![CompilationFailure {
        source_file_path: error.path.clone(),
        source_file_content: None,
        compiled_content: String::new(),
        messages: vec![DiagnosticMessage {
            formatted_message: format!("{}: {message}", error.path),
            message,
            source_file_path: error.path.clone(),
            start_line: 1,
            start_column: 0,
            end_line: 1,
            end_column: 0,
        }],
    }])
}

/// Group items by key with ordinal comparison, in first-appearance order.
fn group_by_file<'a, T, F>(items: &'a [T], key: F) -> Vec<(&'a str, Vec<&'a T>)>
where
    F: Fn(&'a T) -> &'a str,
{
    let mut index: FxHashMap<&str, usize> = FxHashMap::default();
    let mut groups: Vec<(&str, Vec<&T>)> = Vec::new();

    for item in items {
        let file = key(item);
        let slot = *index.entry(file).or_insert_with(|| {
            groups.push((file, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(item);
    }
    groups
}

/// Best-effort read; any failure yields `None`.
fn read_file_contents_safely(project: &dyn RazorProject, path: &str) -> Option<String> {
    let item = project.get_item(path);
    if !item.exists() {
        return None;
    }
    item.read_to_string().ok()
}
