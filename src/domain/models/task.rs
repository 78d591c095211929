//! Human task domain model.
//!
//! Tasks are owned by the engine. The client mirrors the assignee only from
//! a successful claim response or a refetch, and tracks its own lifecycle
//! phase on top of that.

use serde::{Deserialize, Serialize};

/// A human task as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInstance {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub assignee: Option<String>,
}

impl TaskInstance {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            assignee: None,
        }
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// Whether the task carries a non-blank assignee.
    pub fn is_claimed(&self) -> bool {
        self.assignee.as_deref().is_some_and(|a| !a.trim().is_empty())
    }

    pub fn is_assigned_to(&self, actor: &str) -> bool {
        self.assignee.as_deref() == Some(actor)
    }
}

/// Client-side lifecycle phase of a bound task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    /// Nobody holds the task
    Unclaimed,
    /// Claimed, form untouched
    Claimed,
    /// Form edited but not submittable
    Editing,
    /// Form edited, valid and changed
    Submittable,
    /// Form submitted and accepted by the engine
    Completed,
}

impl Default for TaskPhase {
    fn default() -> Self {
        Self::Unclaimed
    }
}

impl TaskPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unclaimed => "unclaimed",
            Self::Claimed => "claimed",
            Self::Editing => "editing",
            Self::Submittable => "submittable",
            Self::Completed => "completed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "unclaimed" => Some(Self::Unclaimed),
            "claimed" => Some(Self::Claimed),
            "editing" => Some(Self::Editing),
            "submittable" => Some(Self::Submittable),
            "completed" | "complete" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether the actor currently holds the task in this phase.
    pub fn is_held(&self) -> bool {
        matches!(self, Self::Claimed | Self::Editing | Self::Submittable)
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(&self) -> Vec<TaskPhase> {
        match self {
            Self::Unclaimed => vec![Self::Claimed],
            Self::Claimed => vec![Self::Editing, Self::Submittable, Self::Unclaimed],
            Self::Editing => vec![Self::Submittable, Self::Unclaimed],
            Self::Submittable => vec![Self::Editing, Self::Completed, Self::Unclaimed],
            Self::Completed => vec![],
        }
    }

    pub fn can_transition_to(&self, new_phase: Self) -> bool {
        self.valid_transitions().contains(&new_phase)
    }
}

impl std::fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a submission is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitBlock {
    FormErrors,
    NotAssignedToActor,
    Unchanged,
}

impl SubmitBlock {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FormErrors => "form has errors",
            Self::NotAssignedToActor => "not assigned to actor",
            Self::Unchanged => "no changes",
        }
    }
}

/// Whether a mutating call (claim or submit) is outstanding for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationState {
    #[default]
    Idle,
    Pending,
}
