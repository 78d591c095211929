//! Flowgate CLI entry point.

use anyhow::Result;
use clap::Parser;

use flowgate::cli::context::AppContext;
use flowgate::cli::{commands, Cli, Commands};
use flowgate::infrastructure::config::ConfigLoader;
use flowgate::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        flowgate::cli::handle_error(err, json_mode);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))?;

    let ctx = AppContext::connect(config).await?;

    match cli.command {
        Commands::Draft(args) => commands::draft::execute(args, &ctx, cli.json).await,
        Commands::Workflow(args) => commands::workflow::execute(args, &ctx, cli.json).await,
        Commands::Deploy(args) => commands::deploy::execute(args, &ctx, cli.json).await,
        Commands::Task(args) => commands::task::execute(args, &ctx, cli.json).await,
        Commands::Process(args) => commands::process::execute(args, &ctx, cli.json).await,
    }
}
