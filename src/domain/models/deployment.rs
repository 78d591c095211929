//! Deployment lifecycle model.

use serde::{Deserialize, Serialize};

use super::defect::DeployDefect;

/// Phase of a workflow document on its way to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployPhase {
    /// Editable, nothing in flight
    Draft,
    /// Fetching a fresh graph and checking it
    Validating,
    /// Last check found no defects
    Ready,
    /// Last check found defects
    NotReady,
    /// Deploy request in flight
    Deploying,
    /// Engine accepted the deployment
    Deployed,
    /// Engine refused the deployment
    DeployRejected,
    /// Remote repair in flight
    AutoFixing,
}

impl Default for DeployPhase {
    fn default() -> Self {
        Self::Draft
    }
}

impl DeployPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Validating => "validating",
            Self::Ready => "ready",
            Self::NotReady => "not_ready",
            Self::Deploying => "deploying",
            Self::Deployed => "deployed",
            Self::DeployRejected => "deploy_rejected",
            Self::AutoFixing => "auto_fixing",
        }
    }

    /// A remote call for the document is in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Validating | Self::Deploying | Self::AutoFixing)
    }

    pub fn valid_transitions(&self) -> Vec<DeployPhase> {
        match self {
            Self::Draft => vec![Self::Validating],
            Self::Validating => vec![Self::Ready, Self::NotReady, Self::Draft],
            Self::Ready => vec![Self::Deploying, Self::Validating, Self::Draft],
            Self::NotReady => vec![Self::AutoFixing, Self::Validating, Self::Draft],
            Self::Deploying => vec![Self::Deployed, Self::DeployRejected, Self::Draft],
            Self::Deployed => vec![Self::Validating, Self::Draft],
            Self::DeployRejected => vec![Self::AutoFixing, Self::Validating, Self::Draft],
            Self::AutoFixing => vec![Self::Validating, Self::Draft],
        }
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl std::fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an auto-fix is on offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoFixReason {
    ConnectivityDefect,
    DeployRejected,
}

/// Permission to run the remote auto-fix for one document.
///
/// Only the orchestrator creates offers, and applying one consumes it, so an
/// auto-fix always follows an explicit decision by the caller.
#[derive(Debug, PartialEq, Eq)]
pub struct AutoFixOffer {
    document_id: String,
    reason: AutoFixReason,
}

impl AutoFixOffer {
    pub(crate) fn new(document_id: impl Into<String>, reason: AutoFixReason) -> Self {
        Self {
            document_id: document_id.into(),
            reason,
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn reason(&self) -> AutoFixReason {
        self.reason
    }
}

/// When the orchestrator offers an auto-fix after a deploy rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoFixTrigger {
    /// Every client-error rejection offers an auto-fix.
    #[default]
    StatusOnly,
    /// Only rejections whose message names a gateway flow problem.
    DefectKind,
}

impl AutoFixTrigger {
    /// Whether a rejection with this message should come with an offer.
    pub fn offers_for(&self, rejection_message: &str) -> bool {
        match self {
            Self::StatusOnly => true,
            Self::DefectKind => {
                let msg = rejection_message.to_lowercase();
                msg.contains("gateway")
                    && (msg.contains("incoming") || msg.contains("outgoing"))
            }
        }
    }
}

/// Result of a deploy attempt that reached a decision.
#[derive(Debug)]
pub enum DeployOutcome {
    /// Engine accepted the deployment.
    Deployed { process_id: String },
    /// Local check found defects; the engine was not asked to deploy.
    NotReady {
        defects: Vec<DeployDefect>,
        auto_fix: Option<AutoFixOffer>,
    },
    /// Engine refused the deployment with a client error.
    Rejected {
        message: String,
        auto_fix: Option<AutoFixOffer>,
    },
}

impl DeployOutcome {
    pub fn phase(&self) -> DeployPhase {
        match self {
            Self::Deployed { .. } => DeployPhase::Deployed,
            Self::NotReady { .. } => DeployPhase::NotReady,
            Self::Rejected { .. } => DeployPhase::DeployRejected,
        }
    }

    pub fn auto_fix(&self) -> Option<&AutoFixOffer> {
        match self {
            Self::Deployed { .. } => None,
            Self::NotReady { auto_fix, .. } | Self::Rejected { auto_fix, .. } => auto_fix.as_ref(),
        }
    }

    /// Take the offer out of the outcome, if any.
    pub fn into_auto_fix(self) -> Option<AutoFixOffer> {
        match self {
            Self::Deployed { .. } => None,
            Self::NotReady { auto_fix, .. } | Self::Rejected { auto_fix, .. } => auto_fix,
        }
    }
}

/// Message used when the engine rejects a deployment without one.
pub const DEFAULT_REJECTION_MESSAGE: &str =
    "The engine rejected the deployment; some gateways may be missing incoming or outgoing flows";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_phases() {
        let pending: Vec<_> = [
            DeployPhase::Draft,
            DeployPhase::Validating,
            DeployPhase::Ready,
            DeployPhase::NotReady,
            DeployPhase::Deploying,
            DeployPhase::Deployed,
            DeployPhase::DeployRejected,
            DeployPhase::AutoFixing,
        ]
        .into_iter()
        .filter(DeployPhase::is_pending)
        .collect();
        assert_eq!(
            pending,
            vec![DeployPhase::Validating, DeployPhase::Deploying, DeployPhase::AutoFixing]
        );
    }

    #[test]
    fn test_auto_fix_only_after_decision() {
        assert!(!DeployPhase::Draft.can_transition_to(DeployPhase::AutoFixing));
        assert!(!DeployPhase::Ready.can_transition_to(DeployPhase::AutoFixing));
        assert!(DeployPhase::NotReady.can_transition_to(DeployPhase::AutoFixing));
        assert!(DeployPhase::DeployRejected.can_transition_to(DeployPhase::AutoFixing));
        assert!(!DeployPhase::AutoFixing.can_transition_to(DeployPhase::Deploying));
    }

    #[test]
    fn test_trigger_defect_kind_matches_gateway_messages() {
        let trigger = AutoFixTrigger::DefectKind;
        assert!(trigger.offers_for("Exclusive Gateway 'G1' has no outgoing sequence flow"));
        assert!(!trigger.offers_for("Duplicate process key"));
        assert!(AutoFixTrigger::StatusOnly.offers_for("Duplicate process key"));
    }

    #[test]
    fn test_outcome_hands_over_offer() {
        let outcome = DeployOutcome::Rejected {
            message: "bad".to_string(),
            auto_fix: Some(AutoFixOffer::new("wf-1", AutoFixReason::DeployRejected)),
        };
        assert_eq!(outcome.phase(), DeployPhase::DeployRejected);
        let offer = outcome.into_auto_fix().unwrap();
        assert_eq!(offer.document_id(), "wf-1");
    }
}
