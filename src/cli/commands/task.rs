//! Human task CLI commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use console::style;
use serde_json::{Map, Value};

use crate::cli::context::AppContext;
use crate::cli::output::{list_table, ok_mark, output, render_list, spinner, truncate, CommandOutput};
use crate::domain::models::TaskInstance;
use crate::services::{TaskCache, TaskView};

#[derive(Args, Debug)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommands,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// List active tasks
    List,
    /// Show a task with its normalized form
    Show {
        id: String,
        /// Act as this user instead of tasks.actor
        #[arg(long = "as")]
        actor: Option<String>,
    },
    /// Claim a task
    Claim {
        id: String,
        #[arg(long = "as")]
        actor: Option<String>,
    },
    /// Submit a task's form
    Submit {
        id: String,
        #[arg(long = "as")]
        actor: Option<String>,
        /// JSON object with form values
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Single form value: KEY=JSON (plain text is taken as a string)
        #[arg(long = "set", value_parser = parse_field)]
        fields: Vec<(String, Value)>,
    },
}

fn parse_field(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.trim().to_string(), value))
}

// ── Output structs ──────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
struct TaskListOutput {
    tasks: Vec<TaskInstance>,
}

impl CommandOutput for TaskListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "assignee"]);
        for task in &self.tasks {
            table.add_row(vec![
                Cell::new(&task.id),
                Cell::new(truncate(&task.name, 40)),
                Cell::new(task.assignee.as_deref().unwrap_or("-")),
            ]);
        }
        render_list("task", &table, self.tasks.len())
    }
}

#[derive(Debug, serde::Serialize)]
struct TaskViewOutput {
    #[serde(flatten)]
    view: TaskView,
}

impl CommandOutput for TaskViewOutput {
    fn to_human(&self) -> String {
        let view = &self.view;
        let mut lines = vec![
            format!("Task: {} ({})", style(&view.task.name).bold(), view.task.id),
            format!("Assignee: {}", view.task.assignee.as_deref().unwrap_or("-")),
            format!("Phase: {}", view.phase),
        ];
        let fields: Vec<String> = view
            .schema
            .walk()
            .into_iter()
            .filter_map(|c| {
                let key = c.key()?;
                let label = c.label().unwrap_or(key);
                let current = view.form.data.get(key).map(Value::to_string).unwrap_or_default();
                Some(format!("  {label} [{}] {key} = {current}", c.component_type.as_str()))
            })
            .collect();
        if fields.is_empty() {
            lines.push("Form: no fields".to_string());
        } else {
            lines.push("Form:".to_string());
            lines.extend(fields);
        }
        lines.join("\n")
    }
}

// ── Command execution ───────────────────────────────────────────────────

pub async fn execute(args: TaskArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    match args.command {
        TaskCommands::List => {
            let cache = TaskCache::new();
            let tasks = cache.refresh(ctx.engine.as_ref()).await?;
            output(&TaskListOutput { tasks }, json_mode);
        }
        TaskCommands::Show { id, actor } => {
            let controller = ctx.task_controller(actor)?;
            let view = controller.bind(&id).await?;
            output(&TaskViewOutput { view }, json_mode);
        }
        TaskCommands::Claim { id, actor } => {
            let controller = ctx.task_controller(actor)?;
            controller.bind(&id).await?;
            let progress = spinner(format!("Claiming {id} as {}", controller.actor()), json_mode);
            let view = controller.claim(&id).await;
            progress.finish_and_clear();
            let view = view?;
            if !json_mode {
                println!("{} Claimed {id}", ok_mark());
            }
            output(&TaskViewOutput { view }, json_mode);
        }
        TaskCommands::Submit {
            id,
            actor,
            data,
            fields,
        } => {
            let controller = ctx.task_controller(actor)?;
            let view = controller.bind(&id).await?;

            let mut values = match data {
                Some(path) => read_object(&path)?,
                None => Map::new(),
            };
            values.extend(fields);
            let form = view.form.clone().with_data(merge(&view.form.initial_data, values));
            controller.on_form_changed(form)?;

            let progress = spinner(format!("Submitting {id}"), json_mode);
            let view = controller.submit(&id).await;
            progress.finish_and_clear();
            let view = view?;
            if !json_mode {
                println!("{} Completed {id}", ok_mark());
            }
            output(&TaskViewOutput { view }, json_mode);
        }
    }

    Ok(())
}

fn read_object(path: &Path) -> Result<Map<String, Value>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    match serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))? {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("{} must contain a JSON object", path.display()),
    }
}

/// Overlay submitted values on the form's initial data.
fn merge(initial: &Value, values: Map<String, Value>) -> Value {
    let mut data = initial.as_object().cloned().unwrap_or_default();
    data.extend(values);
    Value::Object(data)
}
