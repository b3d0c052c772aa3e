// ABOUTME: Entry point for the berth CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use berth::config::{self, Config};
use berth::error::Result;
use berth::output::{Output, OutputMode};
use clap::Parser;
use cli::{Cli, Commands};
use commands::DeployArgs;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let output = Output::new(mode);

    if let Err(e) = run(cli, output).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Init { base_domain, force } => {
            config::init_config(&cwd, base_domain.as_deref(), force)?;
            output.success("Created berth.yml");
            Ok(())
        }
        Commands::Deploy {
            repo,
            name,
            branch,
            method,
            env,
            domain,
        } => {
            let config = Config::discover(&cwd)?;
            let args = DeployArgs {
                repo,
                name,
                branch,
                method,
                env,
                domain,
            };
            commands::deploy(config, args, output).await
        }
        Commands::Status => {
            let config = Config::discover(&cwd)?;
            commands::status(config, output).await
        }
        Commands::Logs { subdomain, tail } => {
            let config = Config::discover(&cwd)?;
            commands::logs(config, &subdomain, tail, output).await
        }
        Commands::Start { subdomain } => {
            let config = Config::discover(&cwd)?;
            commands::start(config, &subdomain, output).await
        }
        Commands::Stop { subdomain } => {
            let config = Config::discover(&cwd)?;
            commands::stop(config, &subdomain, output).await
        }
        Commands::Restart { subdomain } => {
            let config = Config::discover(&cwd)?;
            commands::restart(config, &subdomain, output).await
        }
        Commands::Destroy { subdomain } => {
            let config = Config::discover(&cwd)?;
            commands::destroy(config, &subdomain, output).await
        }
    }
}
