//! Draft CLI commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use console::style;

use crate::cli::context::AppContext;
use crate::cli::output::{list_table, output, render_list, CommandOutput};
use crate::domain::ports::DraftSlot;

#[derive(Args, Debug)]
pub struct DraftArgs {
    #[command(subcommand)]
    pub command: DraftCommands,
}

#[derive(Subcommand, Debug)]
pub enum DraftCommands {
    /// Register a new workflow and open a draft for it
    New {
        /// Workflow title; also names the deployed file
        title: String,
        /// Import BPMN XML instead of starting from the blank template
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Show a draft, loading it from the engine if needed
    Show {
        id: String,
        /// Print the BPMN content
        #[arg(long)]
        content: bool,
    },
    /// Replace a draft's content with a file
    Set { id: String, file: PathBuf },
    /// Discard unsaved edits
    Reset { id: String },
    /// List drafts of the current session
    List,
}

// ── Output structs ──────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
struct DraftOutput {
    id: String,
    session_id: String,
    dirty: bool,
    size: usize,
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

impl DraftOutput {
    fn from_slot(slot: DraftSlot, with_content: bool) -> Self {
        Self {
            dirty: slot.is_dirty(),
            size: slot.content.len(),
            id: slot.slot,
            session_id: slot.session_id,
            updated_at: slot.updated_at,
            content: with_content.then_some(slot.content),
        }
    }
}

impl CommandOutput for DraftOutput {
    fn to_human(&self) -> String {
        let state = if self.dirty {
            style("unsaved changes").yellow().to_string()
        } else {
            style("saved").green().to_string()
        };
        let mut lines = vec![
            format!("Draft: {}", self.id),
            format!("State: {state}"),
            format!("Size: {} bytes", self.size),
            format!("Updated: {}", self.updated_at.format("%Y-%m-%d %H:%M:%S")),
        ];
        if let Some(content) = &self.content {
            lines.push(String::new());
            lines.push(content.clone());
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
struct DraftListOutput {
    drafts: Vec<DraftOutput>,
}

impl CommandOutput for DraftListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "state", "size", "updated"]);
        for draft in &self.drafts {
            table.add_row(vec![
                Cell::new(&draft.id),
                Cell::new(if draft.dirty { "unsaved" } else { "saved" }),
                Cell::new(draft.size),
                Cell::new(draft.updated_at.format("%Y-%m-%d %H:%M")),
            ]);
        }
        render_list("draft", &table, self.drafts.len())
    }
}

#[derive(Debug, serde::Serialize)]
struct DraftCreatedOutput {
    id: String,
    title: String,
}

impl CommandOutput for DraftCreatedOutput {
    fn to_human(&self) -> String {
        format!("Created workflow {} ({})", style(&self.title).bold(), self.id)
    }
}

// ── Command execution ───────────────────────────────────────────────────

pub async fn execute(args: DraftArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let service = ctx.draft_service();

    match args.command {
        DraftCommands::New { title, file } => {
            let content = file
                .map(|path| {
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))
                })
                .transpose()?;
            let document = service.create(&title, content).await?;
            output(
                &DraftCreatedOutput {
                    id: document.id,
                    title: document.title,
                },
                json_mode,
            );
        }
        DraftCommands::Show { id, content } => {
            let slot = service.open(&id).await?;
            output(&DraftOutput::from_slot(slot, content), json_mode);
        }
        DraftCommands::Set { id, file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let slot = service.edit(&id, &content).await?;
            output(&DraftOutput::from_slot(slot, false), json_mode);
        }
        DraftCommands::Reset { id } => {
            service.discard(&id).await?;
            if json_mode {
                println!("{}", serde_json::json!({ "discarded": id }));
            } else {
                println!("Draft {id} discarded");
            }
        }
        DraftCommands::List => {
            let drafts = service
                .list()
                .await?
                .into_iter()
                .map(|slot| DraftOutput::from_slot(slot, false))
                .collect();
            output(&DraftListOutput { drafts }, json_mode);
        }
    }

    Ok(())
}
