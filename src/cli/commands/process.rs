//! Process definition CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::Cell;

use crate::cli::context::AppContext;
use crate::cli::output::{list_table, ok_mark, output, render_list, truncate, CommandOutput};
use crate::domain::errors::DomainError;
use crate::domain::models::ProcessDefinition;
use crate::domain::ports::ProcessEngine;

#[derive(Args, Debug)]
pub struct ProcessArgs {
    #[command(subcommand)]
    pub command: ProcessCommands,
}

#[derive(Subcommand, Debug)]
pub enum ProcessCommands {
    /// List deployed process definitions
    List,
    /// Start a process instance
    Start {
        /// Process definition key
        key: String,
    },
}

#[derive(Debug, serde::Serialize)]
struct ProcessListOutput {
    processes: Vec<ProcessDefinition>,
}

impl CommandOutput for ProcessListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["key", "name", "version", "resource", "state"]);
        for p in &self.processes {
            table.add_row(vec![
                Cell::new(&p.key),
                Cell::new(truncate(p.name.as_deref().unwrap_or("-"), 32)),
                Cell::new(p.version),
                Cell::new(p.resource_name.as_deref().unwrap_or("-")),
                Cell::new(if p.suspended { "suspended" } else { "active" }),
            ]);
        }
        render_list("process definition", &table, self.processes.len())
    }
}

#[derive(Debug, serde::Serialize)]
struct StartOutput {
    process_key: String,
    reply: String,
}

impl CommandOutput for StartOutput {
    fn to_human(&self) -> String {
        format!("{} {}", ok_mark(), self.reply)
    }
}

pub async fn execute(args: ProcessArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    match args.command {
        ProcessCommands::List => {
            let processes = ctx
                .engine
                .list_processes()
                .await
                .map_err(|e| DomainError::retrieval("process list", e.to_string()))?;
            output(&ProcessListOutput { processes }, json_mode);
        }
        ProcessCommands::Start { key } => {
            let reply = ctx
                .engine
                .start_process(&key)
                .await
                .map_err(|e| DomainError::retrieval(format!("process {key}"), e.to_string()))?;
            output(&StartOutput { process_key: key, reply }, json_mode);
        }
    }
    Ok(())
}
