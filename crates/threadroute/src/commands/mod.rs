//! Command dispatch: bridges CLI args -> config, core, and output formatting.

pub mod config_cmd;
pub mod routes;
pub mod run;
pub mod scan;

use std::path::PathBuf;

use threadroute_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// `--config`, or the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(threadroute_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(threadroute_config::load_config(&config_file(global))?)
}

/// Dispatch a command that needs the loaded configuration.
pub async fn dispatch(cmd: Command, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run => run::handle(config).await,
        Command::Scan(args) => scan::handle(&args, config, global).await,
        Command::Routes(args) => routes::handle(args, config, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
