mod args;
mod commands;
mod logging;

use anyhow::Result;
use args::{Cli, Command};
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let config = commands::load_config(cli.config.as_deref())?;
    let output = match &cli.command {
        Command::Explore(args) => commands::explore(args)?,
        Command::Prepare(args) => commands::prepare(config, args)?,
        Command::Run(args) => commands::run(config, args)?,
        Command::Score(args) => {
            let n = commands::score(config, args)?;
            tracing::info!(predictions = n, "scored");
            String::new()
        }
        Command::Teardown(args) => commands::teardown_endpoint(config, args)?,
        Command::ShowConfig => commands::show_config(&config)?,
    };
    print!("{}", output);
    Ok(())
}
