//! Command-line interface.

pub mod commands;
pub mod context;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;

use crate::domain::errors::DomainError;

#[derive(Parser, Debug)]
#[command(name = "flowgate")]
#[command(about = "Deploy-readiness checks and human-task handling for BPMN workflows", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (replaces .flowgate/config.yaml and local.yaml)
    #[arg(short, long, global = true, env = "FLOWGATE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Local working copies of workflow documents
    Draft(commands::draft::DraftArgs),
    /// Workflow registry on the engine
    Workflow(commands::workflow::WorkflowArgs),
    /// Validate and deploy workflows
    Deploy(commands::deploy::DeployArgs),
    /// Claim and complete human tasks
    Task(commands::task::TaskArgs),
    /// Deployed process definitions
    Process(commands::process::ProcessArgs),
}

/// Print the error and exit. Errors raised before any request was sent
/// exit with 2, everything else with 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let local = err
        .downcast_ref::<DomainError>()
        .is_some_and(DomainError::is_local);

    if json_mode {
        let body = serde_json::json!({
            "error": err.to_string(),
            "causes": err.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>(),
            "local": local,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err}", style("Error:").red().bold());
        for cause in err.chain().skip(1) {
            eprintln!("  {} {cause}", style("caused by:").dim());
        }
    }

    std::process::exit(if local { 2 } else { 1 });
}
