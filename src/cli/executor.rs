//! CLI execution: configuration assembly and command dispatch.

use clap::Parser;

use crate::cli::migrate::MigrateCommandHandler;
use crate::cli::parser::{Cli, Commands};
use crate::config::ConfigLoader;
use crate::config::settings::Settings;
use crate::logger;
use crate::server::Server;

/// Parses arguments, loads configuration, initializes logging and runs the
/// selected command. `serve` is the default when no subcommand is given.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loader = match &cli.config {
        Some(path) => ConfigLoader::from_file(path.clone()),
        None => ConfigLoader::new()?,
    };
    let mut settings = loader.load()?;

    apply_global_overrides(&cli, &mut settings);

    match cli.command {
        Some(Commands::Serve {
            host,
            port,
            log_level,
            dry_run,
        }) => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            if let Some(level) = log_level {
                settings.logger.level = level.into();
            }

            logger::init(&settings.logger)?;

            if dry_run {
                settings.validate()?;
                println!("Configuration is valid");
                println!("Server would bind to: {}", settings.server.address());
                println!("Dry run completed successfully");
                return Ok(());
            }

            Server::new(settings).run().await
        }
        Some(Commands::Migrate { dry_run, rollback }) => {
            logger::init(&settings.logger)?;
            MigrateCommandHandler::new(settings)
                .execute(dry_run, rollback)
                .await?;
            Ok(())
        }
        None => {
            logger::init(&settings.logger)?;
            Server::new(settings).run().await
        }
    }
}

fn apply_global_overrides(cli: &Cli, settings: &mut Settings) {
    if cli.verbose {
        settings.logger.level = "debug".to_string();
    }
    if cli.quiet {
        settings.logger.level = "error".to_string();
    }
}
