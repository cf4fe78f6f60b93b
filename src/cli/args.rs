//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Razor view compiler: check templates once, recheck only what changed
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: razor.toml)
    #[arg(short = 'C', long, default_value = "razor.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Template root, overriding `[project] root`
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Print cache and watcher debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile templates and report diagnostics
    #[command(visible_alias = "c")]
    Check {
        #[command(flatten)]
        args: CheckArgs,
    },

    /// Recompile templates as they or their imports change
    #[command(visible_alias = "w")]
    Watch {
        /// Compile every template with the page imports chain
        #[arg(short, long)]
        pages: bool,
    },
}

/// Check command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct CheckArgs {
    /// Template files or directories. If omitted, checks the whole template root.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Compile every template with the page imports chain
    #[arg(short, long)]
    pub pages: bool,

    /// Print reports as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from(["razor-views", "check", "Views", "--json"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("razor.toml"));
        let Commands::Check { args } = cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.paths, [PathBuf::from("Views")]);
        assert!(args.json);
        assert!(!args.pages);
    }

    #[test]
    fn test_parse_watch_with_globals() {
        let cli = Cli::try_parse_from(["razor-views", "-C", "app.toml", "-r", "site", "w", "-v", "--pages"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("app.toml"));
        assert_eq!(cli.root, Some(PathBuf::from("site")));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Watch { pages: true }));
    }
}
