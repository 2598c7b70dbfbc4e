//! statediff CLI: traces recorded EVM executions and prints the minimal per-account
//! state diff of each transaction.

pub(crate) mod args;

use args::{Arguments, Subcommands};
use clap::Parser;
use eyre::Result;
use statediff_config::Configuration;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    // parse command line arguments
    let args = Arguments::parse();

    // init tracing, the guard flushes file logs on exit
    let _guard = args.logs.init_tracing()?;

    // load config
    let config = Configuration::load()?;
    debug!(config = ?config, "loaded configuration");

    match args.sub {
        Subcommands::Config(subargs) => statediff_config::config(subargs)?,
        Subcommands::Replay(mut subargs) => {
            // persisted values only fill what the command line leaves unset
            subargs.defaults = config;

            statediff_replay::replay(subargs).await?
        }
    };

    Ok(())
}
