//! Deploy-readiness defects and advisories.

use serde::{Deserialize, Serialize};

/// Structural problem that blocks deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DefectKind {
    /// Gateway has no incoming sequence flow
    MissingIncoming,
    /// Gateway has no outgoing sequence flow
    MissingOutgoing,
    /// Diverging gateway has more than one outgoing flow without an expression
    UnconditionedBranch,
}

impl DefectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingIncoming => "missingIncoming",
            Self::MissingOutgoing => "missingOutgoing",
            Self::UnconditionedBranch => "unconditionedBranch",
        }
    }

    /// Connectivity defects are the ones the remote auto-fix can repair.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::MissingIncoming | Self::MissingOutgoing)
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::MissingIncoming => "gateway has no incoming flow",
            Self::MissingOutgoing => "gateway has no outgoing flow",
            Self::UnconditionedBranch => {
                "diverging gateway has more than one outgoing flow without a condition"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployDefect {
    pub gateway_id: String,
    pub kind: DefectKind,
}

impl DeployDefect {
    pub fn new(gateway_id: impl Into<String>, kind: DefectKind) -> Self {
        Self {
            gateway_id: gateway_id.into(),
            kind,
        }
    }
}

impl std::fmt::Display for DeployDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.gateway_id, self.kind.describe())
    }
}

/// Result of a readiness check. Ready exactly when no defects were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessVerdict {
    pub defects: Vec<DeployDefect>,
}

impl ReadinessVerdict {
    pub fn new(defects: Vec<DeployDefect>) -> Self {
        Self { defects }
    }

    pub fn is_ready(&self) -> bool {
        self.defects.is_empty()
    }

    pub fn has_connectivity_defect(&self) -> bool {
        self.defects.iter().any(|d| d.kind.is_connectivity())
    }
}

/// Non-blocking configuration gap on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdvisoryKind {
    UserTaskWithoutForm,
    ServiceTaskWithoutDelegate,
}

impl AdvisoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserTaskWithoutForm => "userTaskWithoutForm",
            Self::ServiceTaskWithoutDelegate => "serviceTaskWithoutDelegate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationAdvisory {
    pub element_id: String,
    pub kind: AdvisoryKind,
}

impl std::fmt::Display for ConfigurationAdvisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let gap = match self.kind {
            AdvisoryKind::UserTaskWithoutForm => "user task has no form key",
            AdvisoryKind::ServiceTaskWithoutDelegate => "service task has no delegate expression",
        };
        write!(f, "{}: {gap}", self.element_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_class() {
        assert!(DefectKind::MissingIncoming.is_connectivity());
        assert!(DefectKind::MissingOutgoing.is_connectivity());
        assert!(!DefectKind::UnconditionedBranch.is_connectivity());
    }

    #[test]
    fn test_verdict_readiness() {
        assert!(ReadinessVerdict::default().is_ready());
        let verdict = ReadinessVerdict::new(vec![DeployDefect::new(
            "G1",
            DefectKind::UnconditionedBranch,
        )]);
        assert!(!verdict.is_ready());
        assert!(!verdict.has_connectivity_defect());
    }

    #[test]
    fn test_defect_wire_format() {
        let json = serde_json::to_value(DeployDefect::new("G1", DefectKind::MissingOutgoing)).unwrap();
        assert_eq!(json, serde_json::json!({"gatewayId": "G1", "kind": "missingOutgoing"}));
    }
}
