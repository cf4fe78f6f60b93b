//! razor-views command-line entry point.

use anyhow::Result;
use clap::{ColorChoice, Parser};

use razor_views::cli::{self, Cli};
use razor_views::config::{RazorConfig, init_config};
use razor_views::logger;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = init_config(RazorConfig::load(&cli)?);
    cli::run(&cli, &config)
}
