//! Clap derive structures for the `threadroute` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// threadroute -- IPv6 routes from your UniFi router to Thread networks
#[derive(Debug, Parser)]
#[command(
    name = "threadroute",
    version,
    about = "Route IPv6 traffic to Thread networks through their border routers",
    long_about = "Discovers Matter devices and Thread border routers over mDNS and keeps\n\
        a UniFi router's IPv6 static routes pointing at the border routers.\n\n\
        Managed routes are recognised by their label prefix; routes that\n\
        disappear from discovery are removed only after a grace period.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration file (default: platform config dir)
    #[arg(long, short = 'c', env = "THREADROUTE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,
}

// ── Output Enums ─────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daemon until SIGINT/SIGTERM
    Run,

    /// Discover devices and border routers once and show the routes they imply
    Scan(ScanArgs),

    /// Inspect the router's static routes
    #[command(alias = "r")]
    Routes(RoutesArgs),

    /// Show configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// How long to listen for mDNS answers (e.g. "5s"); default from config
    #[arg(long, short = 't')]
    pub timeout: Option<humantime::Duration>,
}

#[derive(Debug, Args)]
pub struct RoutesArgs {
    #[command(subcommand)]
    pub command: RoutesCommand,
}

#[derive(Debug, Subcommand)]
pub enum RoutesCommand {
    /// List the router's IPv6 static routes, marking managed ones
    #[command(alias = "ls")]
    List,

    /// Discover, compare with the router, and show what would change
    Plan(ScanArgs),
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the resolved configuration (password redacted)
    Show,

    /// Print the configuration file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "threadroute",
            "routes",
            "plan",
            "--timeout",
            "3s",
            "-vv",
            "-o",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.global.verbose, 2);
        assert!(matches!(cli.global.output, OutputFormat::Json));
        match cli.command {
            Command::Routes(RoutesArgs {
                command: RoutesCommand::Plan(args),
            }) => assert_eq!(
                args.timeout.map(|d| *d),
                Some(std::time::Duration::from_secs(3))
            ),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
