mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, GlobalOpts, LogFormat};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(&cli.global, matches!(cli.command, Command::Run));

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// `RUST_LOG` wins, then `LOG_LEVEL`, then `-v`/`-q`. Logs go to stderr
/// so command output on stdout stays clean.
fn init_tracing(global: &GlobalOpts, daemon: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL")
            .ok()
            .filter(|v| !v.is_empty())
            .map_or_else(
                || verbosity_level(global.verbose, global.quiet, daemon),
                |v| log_level_name(&v),
            );
        EnvFilter::new(format!("{level},mdns_sd=warn"))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match global.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.with_target(false).init(),
    }
}

fn verbosity_level(verbose: u8, quiet: bool, daemon: bool) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 if daemon => "info",
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

/// `LOG_LEVEL` names, case-insensitive; anything unknown means info.
fn log_level_name(value: &str) -> &'static str {
    match value.trim().to_ascii_lowercase().as_str() {
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let global = &cli.global;
    match cli.command {
        // Config commands work even when the file does not parse
        Command::Config(args) => commands::config_cmd::handle(&args, global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "threadroute", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let config = commands::load(global)?;
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &config, global).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_names_are_case_insensitive() {
        assert_eq!(log_level_name("DEBUG"), "debug");
        assert_eq!(log_level_name("Warning"), "warn");
        assert_eq!(log_level_name("warn"), "warn");
        assert_eq!(log_level_name("ERROR"), "error");
        assert_eq!(log_level_name("info"), "info");
        assert_eq!(log_level_name("verbose"), "info");
    }

    #[test]
    fn verbosity_depends_on_command() {
        assert_eq!(verbosity_level(0, false, true), "info");
        assert_eq!(verbosity_level(0, false, false), "warn");
        assert_eq!(verbosity_level(0, true, true), "error");
        assert_eq!(verbosity_level(1, true, false), "debug");
        assert_eq!(verbosity_level(3, false, false), "trace");
    }
}
