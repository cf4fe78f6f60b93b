//! `check`: compile templates in parallel and report diagnostics.

use anyhow::{Result, bail};
use rayon::prelude::*;

use super::{CheckArgs, Services, TemplateReport, report};
use crate::compilation::ImportsKind;
use crate::config::RazorConfig;
use crate::log;
use crate::logger::ProgressLine;
use crate::utils::plural_count;

pub fn run_check(args: &CheckArgs, config: &RazorConfig) -> Result<()> {
    let services = Services::new(config, None);
    let templates = services.discover(config, &args.paths)?;

    if templates.is_empty() {
        log!("check"; "no templates found under {}", services.root().display());
        return Ok(());
    }

    let jobs: Vec<(String, ImportsKind)> = templates
        .into_iter()
        .map(|path| {
            let kind = services.kind_of(&path, args.pages);
            (path, kind)
        })
        .collect();

    let reports = check_all(&services, &jobs, !args.json);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        report::print_reports(&reports);
    }

    let failed = reports.iter().filter(|r| r.is_failure()).count();
    if failed > 0 {
        bail!("{} failed to compile", plural_count(failed, "template"));
    }
    Ok(())
}

/// Check every job, preserving job order in the output.
pub(super) fn check_all(
    services: &Services,
    jobs: &[(String, ImportsKind)],
    show_progress: bool,
) -> Vec<TemplateReport> {
    let views = jobs.iter().filter(|(_, k)| *k == ImportsKind::Views).count();
    let progress = show_progress.then(|| ProgressLine::new(&[("views", views), ("pages", jobs.len() - views)]));

    let reports: Vec<_> = jobs
        .par_iter()
        .map(|(path, kind)| {
            let report = services.check(path, *kind);
            if let Some(progress) = &progress {
                progress.inc(match kind {
                    ImportsKind::Views => "views",
                    ImportsKind::Pages => "pages",
                });
            }
            report
        })
        .collect();

    if let Some(progress) = progress {
        progress.finish();
    }

    let stats = services.cache.stats();
    crate::debug!(
        "cache";
        "{} compiled, {} hits, {} coalesced",
        stats.compilations,
        stats.hits,
        stats.coalesced
    );
    reports
}
