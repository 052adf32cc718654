//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`] or [`validate`]. Each handler lives in
//! its own submodule.

pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::JunctionError;

pub async fn dispatch(cli: Cli) -> Result<(), JunctionError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(args).await,
        Some(Commands::Validate(ref args)) => validate::execute(args),
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  junction v{version} \u{2014} HTTP reverse-proxy load balancer\n\n  \
         No command provided. To get started:\n\n    \
         junction run                   Start the load balancer (auto-detects ./junction.yaml)\n    \
         junction run -c lb.yaml        Start with a specific config file\n    \
         junction validate lb.yaml      Check a config without starting\n    \
         junction --help                See all commands and options\n"
    );
}
