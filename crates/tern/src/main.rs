//! Tern - multi-target backend passes
//!
//! CLI driver for hoisting suspension points out of protected regions and
//! synthesizing bridge methods for covariant overrides.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

/// Backend passes for the tern compiler
#[derive(Parser, Debug)]
#[command(name = "tern")]
#[command(author, version, about = "Run tern backend passes over lowered methods")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Backend configuration file (defaults to tern.toml next to the input)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub format: OutputFormat,
    pub use_color: bool,
    pub quiet: bool,
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Hoist suspension points out of try/catch regions in one method
    Hoist(commands::hoist::HoistArgs),

    /// Analyze an override and synthesize its bridge method
    Bridge(commands::bridge::BridgeArgs),

    /// Run every backend pass over a module file or a directory of modules
    Lower(commands::lower::LowerArgs),

    /// Explain a diagnostic code
    Explain(commands::explain::ExplainArgs),
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => log::LevelFilter::Error,
        (false, 0) => log::LevelFilter::Warn,
        (false, 1) => log::LevelFilter::Info,
        (false, 2) => log::LevelFilter::Debug,
        (false, _) => log::LevelFilter::Trace,
    };
    // RUST_LOG still wins when set
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    // Determine if colors should be used
    let use_color = !cli.no_color && !cli.quiet && atty::is(atty::Stream::Stdout);

    let options = GlobalOptions {
        format: cli.format,
        use_color,
        quiet: cli.quiet,
        config: cli.config,
    };

    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Hoist(args) => commands::hoist::run(args, &options),
        Commands::Bridge(args) => commands::bridge::run(args, &options),
        Commands::Lower(args) => commands::lower::run(args, &options),
        Commands::Explain(args) => commands::explain::run(args, options.format, options.use_color),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tern", "lower", "mods", "--format", "json", "-vv", "--config", "b.toml",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("b.toml")));
        assert!(matches!(cli.command, Some(Commands::Lower(_))));
    }
}
