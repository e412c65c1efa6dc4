use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Commands, ConfigCommands};
use hwp_tagger::{config, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = cli::Cli::parse();
    let command = args.get_command();

    // Commands that need no configuration
    match command {
        Commands::Version => {
            println!("hwp-tagger v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Tags => {
            commands::tags::execute();
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(args.config.as_deref())?;
    init_tracing(&cfg.logging.level);

    // Dispatch to appropriate command handler
    match command {
        Commands::Run(run) => commands::run::execute(cfg, run).await?,
        Commands::Config { action } => match action {
            ConfigCommands::Show => commands::config::show(&cfg)?,
            ConfigCommands::Validate => commands::config::validate(&cfg),
        },
        Commands::Version | Commands::Tags => {}
    }

    Ok(())
}
