//! Project configuration for `razor.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error      # ConfigError
//! ├── handle     # Global config handle (arc-swap)
//! └── mod.rs     # RazorConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[project]` | Template root and template extensions            |
//! | `[compile]` | Import file names, references, default imports   |
//! | `[watch]`   | Change detection mode and debounce window        |
//!
//! The file is optional: without one every section takes its defaults and
//! the template root is the current directory.

mod error;
mod handle;

pub use error::ConfigError;
pub use handle::{cfg, init_config, reload_config};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::compilation::{
    CompilationOptions, PAGE_IMPORTS_FILE_NAME, VIEW_IMPORTS_FILE_NAME, default_imports,
    imports_document,
};
use crate::log;
use crate::utils::{normalize_path, resolve_against};
use crate::watch::DEFAULT_DEBOUNCE_MS;

// ============================================================================
// sections
// ============================================================================

/// `[project]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    /// Template root, relative to the config file.
    pub root: PathBuf,
    /// Extensions treated as templates (without the dot).
    pub extensions: Vec<String>,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            extensions: vec!["cshtml".to_string()],
        }
    }
}

/// `[compile]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileSection {
    pub view_imports: String,
    pub page_imports: String,
    /// Namespaces `@using` directives may name. Empty accepts anything.
    pub references: Vec<String>,
    /// Directive lines replacing the built-in default imports.
    pub default_imports: Vec<String>,
}

impl Default for CompileSection {
    fn default() -> Self {
        Self {
            view_imports: VIEW_IMPORTS_FILE_NAME.to_string(),
            page_imports: PAGE_IMPORTS_FILE_NAME.to_string(),
            references: Vec::new(),
            default_imports: Vec::new(),
        }
    }
}

/// How `watch` learns about file changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Detection {
    /// Tokens compare file fingerprints when checked.
    #[default]
    Poll,
    /// Tokens are signalled by the filesystem watcher.
    Notify,
}

/// `[watch]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    pub detection: Detection,
    pub debounce_ms: u64,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            detection: Detection::default(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing razor.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RazorConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory holding the config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// `--root` override, kept so reloads honour it
    #[serde(skip)]
    pub cli_root: Option<PathBuf>,

    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub compile: CompileSection,

    #[serde(default)]
    pub watch: WatchSection,
}

impl RazorConfig {
    /// Load configuration for the CLI, searching upward from the cwd.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        let cli_root = cli.root.as_ref().map(|root| normalize_path(root));

        let (mut config, config_path) = match find_config_file(&cli.config) {
            Some(path) => (Self::from_path(&path)?, path),
            None => {
                crate::debug!("config"; "no {} found, using defaults", cli.config.display());
                (Self::default(), cwd.join(&cli.config))
            }
        };

        config.finalize(&config_path, cli_root);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::parse(&content, path)
    }

    /// Parse TOML content, warning about unknown fields.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config: Self = serde_ignored::deserialize(deserializer, |field: serde_ignored::Path| {
            ignored.push(field.to_string());
        })?;

        if !ignored.is_empty() {
            let display_path = path
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_else(|| path.to_string_lossy());
            log!("warning"; "unknown fields in {}, ignoring: {}", display_path, ignored.join(", "));
        }
        Ok(config)
    }

    /// Set internal paths after loading.
    pub(crate) fn finalize(&mut self, config_path: &Path, cli_root: Option<PathBuf>) {
        self.config_path = normalize_path(config_path);
        self.root = self
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        self.cli_root = cli_root;
    }

    /// Validate configuration, collecting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.project.extensions.is_empty() {
            errors.push("project.extensions must not be empty".to_string());
        }
        for ext in &self.project.extensions {
            if ext.is_empty() || ext.starts_with('.') {
                errors.push(format!("project.extensions: `{ext}` must be a bare extension"));
            }
        }
        for (field, name) in [
            ("compile.view_imports", &self.compile.view_imports),
            ("compile.page_imports", &self.compile.page_imports),
        ] {
            if name.is_empty() || name.contains('/') || name.contains('\\') {
                errors.push(format!("{field}: `{name}` must be a file name"));
            }
        }
        if self.watch.debounce_ms == 0 {
            errors.push("watch.debounce_ms must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }

    /// Absolute template root.
    pub fn template_root(&self) -> PathBuf {
        match &self.cli_root {
            Some(root) => root.clone(),
            None => normalize_path(&resolve_against(&self.project.root, &self.root)),
        }
    }

    /// Whether `path` has one of the configured template extensions.
    pub fn is_template(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.project.extensions.iter().any(|e| e == ext))
    }

    pub fn compilation_options(&self) -> CompilationOptions {
        let global_imports = if self.compile.default_imports.is_empty() {
            default_imports()
        } else {
            imports_document(&self.compile.default_imports)
        };

        CompilationOptions {
            view_imports: self.compile.view_imports.clone(),
            page_imports: self.compile.page_imports.clone(),
            references: self.compile.references.clone(),
            global_imports,
        }
    }
}

/// Find config file by searching upward from current directory
///
/// ```text
/// /srv/app/Views/Home/    ← cwd
/// /srv/app/razor.toml     ← found!
/// ```
fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.is_file().then(|| config_name.to_path_buf());
    }

    let cwd = std::env::current_dir().ok()?;
    let mut current = cwd.as_path();
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(content: &str) -> RazorConfig {
        RazorConfig::parse(content, Path::new("razor.toml")).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse("");
        assert_eq!(config.project.extensions, ["cshtml"]);
        assert_eq!(config.compile.view_imports, "_ViewImports.cshtml");
        assert_eq!(config.compile.page_imports, "_PageImports.cshtml");
        assert_eq!(config.watch.detection, Detection::Poll);
        assert_eq!(config.watch.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
            [project]
            root = "app"
            extensions = ["cshtml", "razor"]

            [compile]
            references = ["System", "App.Models"]
            default_imports = ["@using System"]

            [watch]
            detection = "notify"
            debounce_ms = 150
            "#,
        );
        assert_eq!(config.project.root, PathBuf::from("app"));
        assert_eq!(config.compile.references, ["System", "App.Models"]);
        assert_eq!(config.watch.detection, Detection::Notify);
        assert_eq!(config.watch.debounce_ms, 150);

        let options = config.compilation_options();
        assert_eq!(options.global_imports.content(), "@using System\n");
        assert_eq!(options.references.len(), 2);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let config = parse("[project]\nroot = \"v\"\nflavour = \"mild\"\n");
        assert_eq!(config.project.root, PathBuf::from("v"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = RazorConfig::parse("[watch\n", Path::new("razor.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_validation_collects_errors() {
        let config = parse(
            r#"
            [project]
            extensions = [".cshtml"]
            [compile]
            view_imports = "Views/_ViewImports.cshtml"
            [watch]
            debounce_ms = 0
            "#,
        );
        let ConfigError::Validation(message) = config.validate().unwrap_err() else {
            panic!("expected validation error");
        };
        assert!(message.contains("project.extensions"));
        assert!(message.contains("compile.view_imports"));
        assert!(message.contains("watch.debounce_ms"));
    }

    #[test]
    fn test_default_imports_fall_back_to_builtin() {
        let options = parse("").compilation_options();
        assert!(std::sync::Arc::ptr_eq(&options.global_imports, &default_imports()));
    }

    #[test]
    fn test_template_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("app")).unwrap();
        let path = dir.path().join("razor.toml");
        fs::write(&path, "[project]\nroot = \"app\"\n").unwrap();

        let mut config = RazorConfig::from_path(&path).unwrap();
        config.finalize(&path, None);
        assert_eq!(config.template_root(), normalize_path(&dir.path().join("app")));

        config.finalize(&path, Some(PathBuf::from("/srv/views")));
        assert_eq!(config.template_root(), PathBuf::from("/srv/views"));
    }

    #[test]
    fn test_is_template() {
        let config = parse("");
        assert!(config.is_template(Path::new("/a/Index.cshtml")));
        assert!(!config.is_template(Path::new("/a/notes.txt")));
        assert!(!config.is_template(Path::new("/a/Makefile")));
    }

    #[test]
    fn test_missing_file() {
        let err = RazorConfig::from_path(Path::new("/nonexistent/razor.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }
}
