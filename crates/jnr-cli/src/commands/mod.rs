//! Command implementations

mod classify;
mod config;
mod emission;
mod run;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use anyhow::Result;

/// Execute a CLI command
pub fn execute(cli: Cli, output: &OutputWriter) -> Result<()> {
    let config_file = cli.config.as_deref();

    match cli.command {
        Commands::Run(args) => run::execute(args, config_file, output),
        Commands::Classify(args) => classify::execute(args, config_file, output),
        Commands::Emission(args) => emission::execute(args, config_file, output),
        Commands::Config(args) => config::execute(args, config_file, output),
    }
}
