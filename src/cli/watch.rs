//! `watch`: keep a warm cache and recheck what changes.
//!
//! ```text
//! ProjectWatcher ──events──▶ Debouncer ──batch──▶ affected templates ──▶ check
//!        │                                            ▲
//!        └── signals ChangeRegistry          CompilerCache::dependents_of
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::RecvTimeoutError;
use rustc_hash::FxHashSet;

use super::check::check_all;
use super::{Services, report};
use crate::compilation::ImportsKind;
use crate::config::{Detection, RazorConfig, cfg, reload_config};
use crate::freshness::ChangeRegistry;
use crate::log;
use crate::logger::{status_error, status_success, status_unchanged};
use crate::project::path;
use crate::utils::{normalize_path, plural_count};
use crate::watch::{ChangeKind, Debouncer, ProjectWatcher};

pub fn run_watch(pages: bool) -> Result<()> {
    let mut config = cfg();
    let registry = Arc::new(ChangeRegistry::new());
    let mut services = services_for(&config, &registry);

    let mut watcher = start_watcher(&config, &registry)?;
    let mut debouncer = Debouncer::new(Duration::from_millis(config.watch.debounce_ms));

    log!("watch"; "watching {} (ctrl+c to stop)", services.root().display());
    recheck_all(&services, &config, pages);

    loop {
        match watcher.events().recv_timeout(debouncer.sleep_duration()) {
            Ok(event) => debouncer.add_event(&event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let Some(changes) = debouncer.take_if_ready() else {
            continue;
        };

        if changes.iter().any(|(p, _)| is_config_change(&config, p)) {
            match reload_config() {
                Ok(true) => {
                    log!("watch"; "config reloaded");
                    config = cfg();
                    // Fresh cache: import names and references may differ
                    registry.notify_all();
                    services = services_for(&config, &registry);
                    watcher = start_watcher(&config, &registry)?;
                    debouncer = Debouncer::new(Duration::from_millis(config.watch.debounce_ms));
                    recheck_all(&services, &config, pages);
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    status_error("config reload failed", &format!("{e:#}"));
                    continue;
                }
            }
        }

        let affected = affected_templates(&services, &config, &watcher, &changes);
        if affected.is_empty() {
            status_unchanged(&format!("{} changed, nothing to recheck", plural_count(changes.len(), "file")));
            continue;
        }
        recheck(&services, &affected, pages);
    }

    Ok(())
}

fn services_for(config: &RazorConfig, registry: &Arc<ChangeRegistry>) -> Services {
    let registry = (config.watch.detection == Detection::Notify).then(|| registry.clone());
    Services::new(config, registry)
}

fn start_watcher(config: &RazorConfig, registry: &Arc<ChangeRegistry>) -> Result<ProjectWatcher> {
    let extra: Vec<PathBuf> = vec![config.config_path.clone()];
    Ok(ProjectWatcher::start(&config.template_root(), registry.clone(), &extra)?)
}

/// Templates to recheck for a batch of changes: cached dependents of each
/// changed path plus newly created templates.
fn affected_templates(
    services: &Services,
    config: &RazorConfig,
    watcher: &ProjectWatcher,
    changes: &[(PathBuf, ChangeKind)],
) -> Vec<String> {
    let mut affected = FxHashSet::default();

    for (physical, kind) in changes {
        let Some(logical) = watcher.logical(physical) else {
            continue;
        };
        crate::debug!("watch"; "{}: {}", kind.label(), logical);

        let dependents = services.cache.dependents_of(&logical);
        if dependents.is_empty()
            && *kind != ChangeKind::Removed
            && config.is_template(physical)
            && !services.is_import_file(&logical)
        {
            affected.insert(logical);
        } else {
            affected.extend(dependents);
        }
    }

    let mut affected: Vec<_> = affected.into_iter().collect();
    affected.sort();
    affected
}

fn recheck_all(services: &Services, config: &RazorConfig, pages: bool) {
    match services.discover(config, &[]) {
        Ok(templates) => recheck(services, &templates, pages),
        Err(e) => status_error("template discovery failed", &format!("{e:#}")),
    }
}

fn recheck(services: &Services, templates: &[String], pages: bool) {
    let jobs: Vec<(String, ImportsKind)> = templates
        .iter()
        .map(|p| (p.clone(), services.kind_of(p, pages)))
        .collect();
    let reports = check_all(services, &jobs, false);

    let failing: Vec<_> = reports.iter().filter(|r| r.is_failure()).collect();
    if failing.is_empty() {
        let message = if reports.len() <= 3 {
            let names: Vec<_> = reports.iter().map(|r| path::file_name(&r.path)).collect();
            names.join(", ")
        } else {
            plural_count(reports.len(), "template")
        };
        status_success(&format!("compiled {message}"));
    } else {
        let detail: String = failing.iter().map(|r| report::render_report(r)).collect();
        status_error(&report::summary(&reports), detail.trim_end());
    }
}

fn is_config_change(config: &RazorConfig, physical: &Path) -> bool {
    normalize_path(physical) == config.config_path
}
