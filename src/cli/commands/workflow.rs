//! Workflow registry CLI commands.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use console::style;

use crate::cli::context::AppContext;
use crate::cli::output::{list_table, output, render_list, spinner, truncate, CommandOutput};
use crate::domain::errors::DomainError;
use crate::domain::models::{ConfigEntry, ConfigurationAdvisory, WorkflowDocument};
use crate::domain::ports::ProcessEngine;

#[derive(Args, Debug)]
pub struct WorkflowArgs {
    #[command(subcommand)]
    pub command: WorkflowCommands,
}

#[derive(Subcommand, Debug)]
pub enum WorkflowCommands {
    /// List registered workflows
    List,
    /// Show one workflow's registry entry
    Get { id: String },
    /// Delete a workflow and its local draft
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Set element attributes on the engine (manual alternative to auto-fix)
    Configure {
        id: String,
        /// Condition for a sequence flow: FLOW_ID=EXPRESSION
        #[arg(long = "condition", value_parser = parse_assignment)]
        conditions: Vec<(String, String)>,
        /// Form key for a user task: TASK_ID=FORM_KEY
        #[arg(long = "form-key", value_parser = parse_assignment)]
        form_keys: Vec<(String, String)>,
        /// Delegate expression for a service task: TASK_ID=EXPRESSION
        #[arg(long = "delegate", value_parser = parse_assignment)]
        delegates: Vec<(String, String)>,
    },
    /// List user tasks without forms and service tasks without delegates
    Advise { id: String },
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((id, value)) if !id.trim().is_empty() => Ok((id.trim().to_string(), value.to_string())),
        _ => Err(format!("expected ID=VALUE, got '{raw}'")),
    }
}

// ── Output structs ──────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
struct WorkflowSummary {
    id: String,
    title: String,
    ready_to_deploy: bool,
    updated: DateTime<Utc>,
}

impl From<&WorkflowDocument> for WorkflowSummary {
    fn from(document: &WorkflowDocument) -> Self {
        Self {
            id: document.id.clone(),
            title: document.title.clone(),
            ready_to_deploy: document.ready_to_deploy,
            updated: document.update_time,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct WorkflowListOutput {
    workflows: Vec<WorkflowSummary>,
}

impl CommandOutput for WorkflowListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "title", "ready", "updated"]);
        for wf in &self.workflows {
            table.add_row(vec![
                Cell::new(&wf.id),
                Cell::new(truncate(&wf.title, 40)),
                // Engine-side flag; `deploy check` recomputes it.
                Cell::new(if wf.ready_to_deploy { "yes" } else { "no" }),
                Cell::new(wf.updated.format("%Y-%m-%d %H:%M")),
            ]);
        }
        render_list("workflow", &table, self.workflows.len())
    }
}

#[derive(Debug, serde::Serialize)]
struct WorkflowDetailOutput {
    #[serde(flatten)]
    summary: WorkflowSummary,
    created: DateTime<Utc>,
    deploy_file: String,
    content_bytes: usize,
}

impl CommandOutput for WorkflowDetailOutput {
    fn to_human(&self) -> String {
        [
            format!("Workflow: {}", style(&self.summary.title).bold()),
            format!("ID: {}", self.summary.id),
            format!("Deploys as: {}", self.deploy_file),
            format!("Content: {} bytes", self.content_bytes),
            format!("Created: {}", self.created.format("%Y-%m-%d %H:%M:%S")),
            format!("Updated: {}", self.summary.updated.format("%Y-%m-%d %H:%M:%S")),
            format!("Engine readiness flag: {}", self.summary.ready_to_deploy),
        ]
        .join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
struct AdviceOutput {
    workflow_id: String,
    advisories: Vec<ConfigurationAdvisory>,
}

impl CommandOutput for AdviceOutput {
    fn to_human(&self) -> String {
        if self.advisories.is_empty() {
            return format!("No configuration gaps in {}.", self.workflow_id);
        }
        let mut lines = vec![format!("Configuration gaps in {}:", self.workflow_id)];
        for advisory in &self.advisories {
            lines.push(format!("  {} {}", style("!").yellow(), advisory));
        }
        lines.join("\n")
    }
}

// ── Command execution ───────────────────────────────────────────────────

pub async fn execute(args: WorkflowArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    match args.command {
        WorkflowCommands::List => {
            let workflows = ctx
                .engine
                .list_workflows()
                .await
                .map_err(|e| DomainError::retrieval("workflow list", e.to_string()))?;
            let workflows = workflows.iter().map(WorkflowSummary::from).collect();
            output(&WorkflowListOutput { workflows }, json_mode);
        }
        WorkflowCommands::Get { id } => {
            let document = ctx
                .engine
                .get_workflow(&id)
                .await
                .map_err(|e| DomainError::retrieval(format!("workflow {id}"), e.to_string()))?;
            output(
                &WorkflowDetailOutput {
                    summary: WorkflowSummary::from(&document),
                    created: document.creation_time,
                    deploy_file: document.deploy_file_name(),
                    content_bytes: document.content.len(),
                },
                json_mode,
            );
        }
        WorkflowCommands::Delete { id, yes } => {
            if !yes && !json_mode && !confirm(&format!("Delete workflow {id}?"))? {
                bail!("Aborted");
            }
            ctx.draft_service().delete(&id).await?;
            if json_mode {
                println!("{}", serde_json::json!({ "deleted": id }));
            } else {
                println!("Workflow {id} deleted");
            }
        }
        WorkflowCommands::Configure {
            id,
            conditions,
            form_keys,
            delegates,
        } => {
            let entries: Vec<ConfigEntry> = conditions
                .into_iter()
                .map(|(flow, expr)| ConfigEntry::flow_expression(flow, expr))
                .chain(form_keys.into_iter().map(|(task, key)| ConfigEntry::form_key(task, key)))
                .chain(
                    delegates
                        .into_iter()
                        .map(|(task, expr)| ConfigEntry::delegate_expression(task, expr)),
                )
                .collect();
            if entries.is_empty() {
                bail!("Nothing to configure: pass --condition, --form-key or --delegate");
            }

            let document = ctx.draft_service().configure(&id, entries).await?;
            output(
                &WorkflowDetailOutput {
                    summary: WorkflowSummary::from(&document),
                    created: document.creation_time,
                    deploy_file: document.deploy_file_name(),
                    content_bytes: document.content.len(),
                },
                json_mode,
            );
        }
        WorkflowCommands::Advise { id } => {
            let progress = spinner(format!("Reading graph of {id}"), json_mode);
            let advisories = ctx.orchestrator().advise(&id).await;
            progress.finish_and_clear();
            output(
                &AdviceOutput {
                    workflow_id: id,
                    advisories: advisories?,
                },
                json_mode,
            );
        }
    }

    Ok(())
}

/// Yes/no prompt on stderr; anything but y/yes is no.
pub(crate) fn confirm(question: &str) -> Result<bool> {
    let term = console::Term::stderr();
    term.write_str(&format!("{question} [y/N] "))?;
    let answer = term.read_line()?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
