//! Terminal output: prefixed log lines, the watch status block and the
//! `check` progress line.
//!
//! ```ignore
//! log!("check"; "compiling {} templates", count);
//! debug!("cache"; "expired: {}", path);
//! ```

use std::io::{StdoutLock, Write, stdout};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::SystemTime;

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Last rendered progress line, redrawn below every log line while set.
static PROGRESS: LazyLock<Mutex<Option<String>>> = LazyLock::new(|| Mutex::new(None));

static STATUS: LazyLock<Mutex<StatusBlock>> = LazyLock::new(|| Mutex::new(StatusBlock::default()));

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Print a line with a colored `[module]` prefix.
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like `log!`, printed only with `--verbose`.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

pub fn log(module: &str, message: &str) {
    let progress = PROGRESS.lock();
    let mut out = stdout().lock();

    clear_line(&mut out);
    writeln!(out, "{} {message}", prefix(module)).ok();
    if let Some(line) = progress.as_deref() {
        write!(out, "{line}").ok();
    }
    out.flush().ok();
}

fn prefix(module: &str) -> String {
    let tag = format!("[{module}]");
    match module {
        "cache" => tag.bright_blue().bold().to_string(),
        "watch" => tag.bright_green().bold().to_string(),
        "error" => tag.bright_red().bold().to_string(),
        _ => tag.bright_yellow().bold().to_string(),
    }
}

fn clear_line(out: &mut StdoutLock<'_>) {
    execute!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
}

// -----------------------------------------------------------------------------
// Watch status
// -----------------------------------------------------------------------------

/// `HH:MM:SS` of the current UTC time.
fn clock() -> String {
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs());
    format!("{:02}:{:02}:{:02}", secs / 3600 % 24, secs / 60 % 60, secs % 60)
}

/// Timestamped block that replaces the previous one on every update, so
/// watch mode only shows the outcome of the latest re-check.
#[derive(Debug, Default)]
struct StatusBlock {
    height: usize,
}

impl StatusBlock {
    fn show(&mut self, symbol: Option<String>, body: &str) {
        let mut out = stdout().lock();

        if let Ok(height) = u16::try_from(self.height)
            && height > 0
        {
            execute!(out, cursor::MoveUp(height), Clear(ClearType::FromCursorDown)).ok();
        }

        let stamp = format!("[{}]", clock()).dimmed().to_string();
        match symbol {
            Some(symbol) => writeln!(out, "{stamp} {symbol} {body}").ok(),
            None => writeln!(out, "{stamp} {body}").ok(),
        };
        out.flush().ok();

        self.height = line_count(body);
    }
}

fn line_count(text: &str) -> usize {
    text.lines().count().max(1)
}

pub fn status_success(message: &str) {
    STATUS.lock().show(Some("✓".green().to_string()), message);
}

pub fn status_unchanged(message: &str) {
    STATUS.lock().show(None, &message.dimmed().to_string());
}

pub fn status_error(summary: &str, detail: &str) {
    let body = if detail.is_empty() {
        summary.to_string()
    } else {
        format!("{summary}\n{detail}")
    };
    STATUS.lock().show(Some("✗".red().to_string()), &body);
}

// -----------------------------------------------------------------------------
// Progress line
// -----------------------------------------------------------------------------

/// One-line counters for `check`, e.g. `[check] views(42/69) pages(5/10)`.
///
/// Rayon workers redraw with `try_lock` and skip the redraw when another
/// worker holds the terminal.
pub struct ProgressLine {
    counters: Vec<(&'static str, usize, AtomicUsize)>,
}

impl ProgressLine {
    /// Counters with a zero total are left out.
    pub fn new(totals: &[(&'static str, usize)]) -> Self {
        let progress = Self {
            counters: totals
                .iter()
                .filter(|(_, total)| *total > 0)
                .map(|&(name, total)| (name, total, AtomicUsize::new(0)))
                .collect(),
        };
        progress.redraw(&mut PROGRESS.lock());
        progress
    }

    pub fn inc(&self, name: &str) {
        let Some((_, _, done)) = self.counters.iter().find(|(n, ..)| *n == name) else {
            return;
        };
        done.fetch_add(1, Ordering::Relaxed);
        if let Some(mut slot) = PROGRESS.try_lock() {
            self.redraw(&mut slot);
        }
    }

    /// Leave the final counts on screen.
    pub fn finish(self) {
        let line = self.render();
        let mut slot = PROGRESS.lock();
        *slot = None;

        let mut out = stdout().lock();
        clear_line(&mut out);
        writeln!(out, "{line}").ok();
        out.flush().ok();
    }

    fn render(&self) -> String {
        let counts: Vec<String> = self
            .counters
            .iter()
            .map(|(name, total, done)| format!("{name}({}/{total})", done.load(Ordering::Relaxed)))
            .collect();
        format!("{} {}", prefix("check"), counts.join(" "))
    }

    fn redraw(&self, slot: &mut Option<String>) {
        let line = self.render();
        let mut out = stdout().lock();
        clear_line(&mut out);
        write!(out, "{line}").ok();
        out.flush().ok();
        *slot = Some(line);
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        let mut slot = PROGRESS.lock();
        if slot.take().is_some() {
            let mut out = stdout().lock();
            clear_line(&mut out);
            out.flush().ok();
        }
    }
}
