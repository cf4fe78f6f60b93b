//! Text rendering of check reports.

use std::fmt::Write;

use owo_colors::OwoColorize;

use super::{TemplateReport, TemplateStatus};
use crate::compilation::{CompilationFailure, DiagnosticMessage};
use crate::utils::{plural_count, plural_s};

/// Print every failing report to stderr, followed by a summary line.
pub fn print_reports(reports: &[TemplateReport]) {
    let failing: Vec<_> = reports.iter().filter(|r| r.is_failure()).collect();
    for report in &failing {
        eprintln!();
        eprint!("{}", render_report(report));
    }
    if !failing.is_empty() {
        eprintln!();
    }
    crate::log!("check"; "{}", summary(reports));
}

/// One report as text. Compiled templates render as a single line.
pub fn render_report(report: &TemplateReport) -> String {
    let mut out = String::new();
    match &report.status {
        TemplateStatus::Compiled { type_name, .. } => {
            let _ = writeln!(out, "{} {} {}", "✓".green(), report.path, type_name.dimmed());
        }
        TemplateStatus::NotFound => {
            let _ = writeln!(out, "{}{}{}", "[".dimmed(), report.path.cyan(), "]".dimmed());
            let _ = writeln!(out, "{} not found", "→".red());
        }
        TemplateStatus::Failed { failures } => {
            for failure in failures {
                out.push_str(&render_failure(failure));
            }
        }
    }
    out
}

/// Diagnostics of one file, each with its source line underlined.
pub fn render_failure(failure: &CompilationFailure) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}{}{}",
        "[".dimmed(),
        failure.source_file_path.cyan(),
        "]".dimmed()
    );

    let lines: Vec<&str> = failure
        .source_file_content
        .as_deref()
        .map(|content| content.lines().collect())
        .unwrap_or_default();

    for message in &failure.messages {
        let _ = writeln!(
            out,
            "{} {} {}",
            "→".red(),
            format!("{}:{}", message.start_line, message.start_column).dimmed(),
            message.message
        );
        if let Some(snippet) = snippet(&lines, message) {
            out.push_str(&snippet);
        }
    }
    out
}

/// Source line and caret underline for a diagnostic, if the line exists.
fn snippet(lines: &[&str], message: &DiagnosticMessage) -> Option<String> {
    let line = *lines.get(message.start_line.checked_sub(1)?)?;
    let number = message.start_line.to_string();
    let gutter = " ".repeat(number.len());

    let width = line.chars().count();
    let start = message.start_column.saturating_sub(1).min(width);
    let end = if message.end_line == message.start_line {
        message.end_column.saturating_sub(1).clamp(start + 1, width.max(start + 1))
    } else {
        width.max(start + 1)
    };

    let mut out = String::new();
    let _ = writeln!(out, "  {} {} {}", number.dimmed(), "|".dimmed(), line);
    let _ = writeln!(
        out,
        "  {} {} {}{}",
        gutter,
        "|".dimmed(),
        " ".repeat(start),
        "^".repeat(end - start).red()
    );
    Some(out)
}

/// `checked 12 templates, found 3 errors in 2 files`
pub fn summary(reports: &[TemplateReport]) -> String {
    let failed = reports.iter().filter(|r| r.is_failure()).count();
    let errors: usize = reports.iter().map(TemplateReport::error_count).sum();
    let checked = plural_count(reports.len(), "template");

    if failed == 0 {
        format!("checked {checked}, {}", "all compiled".green())
    } else {
        format!(
            "checked {checked}, found {} error{} in {}",
            errors.to_string().red().bold(),
            plural_s(errors),
            plural_count(failed, "template")
        )
    }
}
