//! Deploy CLI commands.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use console::style;
use futures::future::join_all;

use crate::cli::commands::workflow::confirm;
use crate::cli::context::AppContext;
use crate::cli::output::{fail_mark, ok_mark, output, spinner, CommandOutput};
use crate::domain::errors::DomainError;
use crate::domain::models::{DeployDefect, DeployOutcome, DeployPhase, ReadinessVerdict};

#[derive(Args, Debug)]
pub struct DeployArgs {
    #[command(subcommand)]
    pub command: DeployCommands,
}

#[derive(Subcommand, Debug)]
pub enum DeployCommands {
    /// Save the draft, check readiness and deploy
    Run {
        id: String,
        /// Accept an auto-fix offer without asking
        #[arg(short, long, conflicts_with = "no_fix")]
        yes: bool,
        /// Decline any auto-fix offer
        #[arg(long)]
        no_fix: bool,
    },
    /// Check readiness against the engine's current graph without deploying
    Check {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

// ── Output structs ──────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
struct DeployReport {
    workflow_id: String,
    phase: DeployPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    process_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    defects: Vec<DeployDefect>,
    auto_fix_offered: bool,
}

impl DeployReport {
    fn new(workflow_id: &str, outcome: &DeployOutcome) -> Self {
        let (process_id, message, defects) = match outcome {
            DeployOutcome::Deployed { process_id } => (Some(process_id.clone()), None, Vec::new()),
            DeployOutcome::NotReady { defects, .. } => (None, None, defects.clone()),
            DeployOutcome::Rejected { message, .. } => (None, Some(message.clone()), Vec::new()),
        };
        Self {
            workflow_id: workflow_id.to_string(),
            phase: outcome.phase(),
            process_id,
            message,
            defects,
            auto_fix_offered: outcome.auto_fix().is_some(),
        }
    }

    /// Exit status of the command for this outcome.
    fn into_result(self) -> Result<()> {
        match self.phase {
            DeployPhase::Deployed => Ok(()),
            DeployPhase::DeployRejected => Err(DomainError::DeployRejected {
                message: self.message.unwrap_or_default(),
            }
            .into()),
            _ => bail!(
                "Workflow {} is not ready to deploy ({} defect(s))",
                self.workflow_id,
                self.defects.len()
            ),
        }
    }
}

impl CommandOutput for DeployReport {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        match self.phase {
            DeployPhase::Deployed => lines.push(format!(
                "{} Deployed {} as process {}",
                ok_mark(),
                self.workflow_id,
                style(self.process_id.as_deref().unwrap_or("?")).bold()
            )),
            DeployPhase::DeployRejected => lines.push(format!(
                "{} Engine rejected {}: {}",
                fail_mark(),
                self.workflow_id,
                self.message.as_deref().unwrap_or_default()
            )),
            _ => {
                lines.push(format!("{} {} is not ready to deploy:", fail_mark(), self.workflow_id));
                lines.extend(self.defects.iter().map(|d| format!("  - {d}")));
            }
        }
        if self.auto_fix_offered {
            lines.push(format!(
                "{} The engine can repair gateway flows automatically.",
                style("hint:").cyan()
            ));
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
struct CheckEntry {
    workflow_id: String,
    ready: bool,
    defects: Vec<DeployDefect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl CheckEntry {
    fn new(workflow_id: &str, verdict: Result<ReadinessVerdict, DomainError>) -> Self {
        match verdict {
            Ok(verdict) => Self {
                workflow_id: workflow_id.to_string(),
                ready: verdict.is_ready(),
                defects: verdict.defects,
                error: None,
            },
            Err(e) => Self {
                workflow_id: workflow_id.to_string(),
                ready: false,
                defects: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct CheckOutput {
    results: Vec<CheckEntry>,
    all_ready: bool,
}

impl CommandOutput for CheckOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        for entry in &self.results {
            match (&entry.error, entry.ready) {
                (Some(err), _) => lines.push(format!("{} {}: {err}", fail_mark(), entry.workflow_id)),
                (None, true) => lines.push(format!("{} {}: ready", ok_mark(), entry.workflow_id)),
                (None, false) => {
                    lines.push(format!("{} {}: not ready", fail_mark(), entry.workflow_id));
                    lines.extend(entry.defects.iter().map(|d| format!("    - {d}")));
                }
            }
        }
        lines.join("\n")
    }
}

// ── Command execution ───────────────────────────────────────────────────

pub async fn execute(args: DeployArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    match args.command {
        DeployCommands::Run { id, yes, no_fix } => run(ctx, &id, yes, no_fix, json_mode).await,
        DeployCommands::Check { ids } => check(ctx, &ids, json_mode).await,
    }
}

async fn run(ctx: &AppContext, id: &str, yes: bool, no_fix: bool, json_mode: bool) -> Result<()> {
    let drafts = ctx.draft_service();
    let orchestrator = ctx.orchestrator();

    let content = drafts.open(id).await?.content;
    let progress = spinner(format!("Saving and validating {id}"), json_mode);
    let outcome = orchestrator.deploy(id, &content).await;
    progress.finish_and_clear();
    let outcome = outcome?;

    let report = DeployReport::new(id, &outcome);
    output(&report, json_mode);

    let Some(offer) = outcome.into_auto_fix() else {
        return report.into_result();
    };
    let accepted = !no_fix && (yes || (!json_mode && confirm("Apply the engine's gateway auto-fix?")?));
    if !accepted {
        return report.into_result();
    }

    let progress = spinner("Repairing gateway flows", json_mode);
    let verdict = orchestrator.apply_auto_fix(offer).await;
    progress.finish_and_clear();
    let verdict = verdict?;
    output(
        &CheckOutput {
            all_ready: verdict.is_ready(),
            results: vec![CheckEntry::new(id, Ok(verdict.clone()))],
        },
        json_mode,
    );
    if !verdict.is_ready() {
        bail!("Workflow {id} is still not ready after auto-fix");
    }

    // The repaired document is back in the draft; deploy it as a new attempt.
    let content = drafts.open(id).await?.content;
    let progress = spinner(format!("Deploying {id}"), json_mode);
    let outcome = orchestrator.deploy(id, &content).await;
    progress.finish_and_clear();
    let report = DeployReport::new(id, &outcome?);
    output(&report, json_mode);
    report.into_result()
}

async fn check(ctx: &AppContext, ids: &[String], json_mode: bool) -> Result<()> {
    let orchestrator = ctx.orchestrator();

    let progress = spinner(format!("Checking {} workflow(s)", ids.len()), json_mode);
    let verdicts = join_all(ids.iter().map(|id| orchestrator.validate(id))).await;
    progress.finish_and_clear();

    let results: Vec<CheckEntry> = ids
        .iter()
        .zip(verdicts)
        .map(|(id, verdict)| CheckEntry::new(id, verdict))
        .collect();
    let all_ready = results.iter().all(|r| r.ready);
    output(&CheckOutput { results, all_ready }, json_mode);

    if all_ready {
        Ok(())
    } else {
        bail!("Not every workflow is ready to deploy")
    }
}
