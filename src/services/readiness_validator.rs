use crate::domain::models::defect::{
    AdvisoryKind, ConfigurationAdvisory, DefectKind, DeployDefect, ReadinessVerdict,
};
use crate::domain::models::graph::{GatewayDirection, GraphModel, TaskKind};

/// Decides whether a workflow graph is structurally fit to deploy.
///
/// Pure and stateless: the verdict depends only on the graph handed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadinessValidator;

impl ReadinessValidator {
    pub fn new() -> Self {
        Self
    }

    /// All blocking defects, in gateway order; per gateway, connectivity
    /// defects come before routing defects.
    ///
    /// A diverging exclusive or inclusive gateway with two or more outgoing
    /// flows lacking an expression yields a single `UnconditionedBranch`,
    /// however many such flows it has. Parallel gateways never route by
    /// expression and are exempt from that check.
    pub fn validate(&self, graph: &GraphModel) -> Vec<DeployDefect> {
        let mut defects = Vec::new();

        for gateway in graph.gateways() {
            if gateway.incoming.is_empty() {
                defects.push(DeployDefect::new(&gateway.id, DefectKind::MissingIncoming));
            }
            if gateway.outgoing.is_empty() {
                defects.push(DeployDefect::new(&gateway.id, DefectKind::MissingOutgoing));
            }
            if gateway.direction == GatewayDirection::Diverging
                && gateway.kind.routes_by_expression()
                && gateway.unconditioned_outgoing().count() > 1
            {
                defects.push(DeployDefect::new(&gateway.id, DefectKind::UnconditionedBranch));
            }
        }

        defects
    }

    pub fn verdict(&self, graph: &GraphModel) -> ReadinessVerdict {
        ReadinessVerdict::new(self.validate(graph))
    }

    /// Configuration gaps that do not block deployment: user tasks without a
    /// form and service tasks without a delegate.
    pub fn advise(&self, graph: &GraphModel) -> Vec<ConfigurationAdvisory> {
        let missing_form = graph
            .tasks_of_kind(TaskKind::User)
            .filter(|t| t.form_key.is_none())
            .map(|t| ConfigurationAdvisory {
                element_id: t.id.clone(),
                kind: AdvisoryKind::UserTaskWithoutForm,
            });
        let missing_delegate = graph
            .tasks_of_kind(TaskKind::Service)
            .filter(|t| t.delegate_expression.is_none())
            .map(|t| ConfigurationAdvisory {
                element_id: t.id.clone(),
                kind: AdvisoryKind::ServiceTaskWithoutDelegate,
            });

        missing_form.chain(missing_delegate).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::graph::{FlowRef, GatewayKind, GatewayNode, TaskNode};

    fn gateway(id: &str, kind: GatewayKind, incoming: Vec<FlowRef>, outgoing: Vec<FlowRef>) -> GatewayNode {
        GatewayNode {
            id: id.to_string(),
            name: None,
            kind,
            direction: GatewayDirection::Diverging,
            incoming,
            outgoing,
        }
    }

    fn graph(gateways: Vec<GatewayNode>) -> GraphModel {
        GraphModel::from_parts(vec![], gateways)
    }

    #[test]
    fn test_zero_gateways_is_ready() {
        assert!(ReadinessValidator::new().verdict(&GraphModel::new()).is_ready());
    }

    #[test]
    fn test_missing_outgoing() {
        let g = graph(vec![gateway("G1", GatewayKind::Exclusive, vec![FlowRef::unconditioned("f0")], vec![])]);
        assert_eq!(
            ReadinessValidator::new().validate(&g),
            vec![DeployDefect::new("G1", DefectKind::MissingOutgoing)]
        );
    }

    #[test]
    fn test_two_unconditioned_branches_yield_one_defect() {
        let g = graph(vec![gateway(
            "G1",
            GatewayKind::Exclusive,
            vec![FlowRef::unconditioned("f0")],
            vec![
                FlowRef::unconditioned("f1"),
                FlowRef::unconditioned("f2"),
                FlowRef::unconditioned("f3"),
            ],
        )]);
        assert_eq!(
            ReadinessValidator::new().validate(&g),
            vec![DeployDefect::new("G1", DefectKind::UnconditionedBranch)]
        );
    }

    #[test]
    fn test_single_default_branch_is_allowed() {
        let g = graph(vec![gateway(
            "G1",
            GatewayKind::Inclusive,
            vec![FlowRef::unconditioned("f0")],
            vec![FlowRef::new("f1", "${ok}"), FlowRef::unconditioned("f2")],
        )]);
        assert!(ReadinessValidator::new().verdict(&g).is_ready());
    }

    #[test]
    fn test_parallel_gateway_is_exempt_from_routing() {
        let g = graph(vec![gateway(
            "P1",
            GatewayKind::Parallel,
            vec![FlowRef::unconditioned("f0")],
            vec![FlowRef::unconditioned("f1"), FlowRef::unconditioned("f2")],
        )]);
        assert!(ReadinessValidator::new().verdict(&g).is_ready());
    }

    #[test]
    fn test_converging_gateway_is_exempt_from_routing() {
        let mut merge = gateway(
            "G2",
            GatewayKind::Exclusive,
            vec![FlowRef::unconditioned("a"), FlowRef::unconditioned("b")],
            vec![FlowRef::unconditioned("c"), FlowRef::unconditioned("d")],
        );
        merge.direction = GatewayDirection::Converging;
        assert!(ReadinessValidator::new().validate(&graph(vec![merge])).is_empty());
    }

    #[test]
    fn test_defect_order_connectivity_before_routing() {
        let isolated = gateway("G1", GatewayKind::Exclusive, vec![], vec![]);
        let branching = gateway(
            "G2",
            GatewayKind::Exclusive,
            vec![],
            vec![FlowRef::unconditioned("f1"), FlowRef::unconditioned("f2")],
        );
        let kinds: Vec<_> = ReadinessValidator::new()
            .validate(&graph(vec![isolated, branching]))
            .into_iter()
            .map(|d| (d.gateway_id, d.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("G1".to_string(), DefectKind::MissingIncoming),
                ("G1".to_string(), DefectKind::MissingOutgoing),
                ("G2".to_string(), DefectKind::MissingIncoming),
                ("G2".to_string(), DefectKind::UnconditionedBranch),
            ]
        );
    }

    #[test]
    fn test_advisories_do_not_block() {
        let g = GraphModel::from_parts(
            vec![
                TaskNode {
                    id: "Review".to_string(),
                    name: None,
                    kind: TaskKind::User,
                    form_key: None,
                    delegate_expression: None,
                },
                TaskNode {
                    id: "Notify".to_string(),
                    name: None,
                    kind: TaskKind::Service,
                    form_key: None,
                    delegate_expression: Some("${mailer}".to_string()),
                },
            ],
            vec![],
        );
        let validator = ReadinessValidator::new();
        assert!(validator.verdict(&g).is_ready());
        assert_eq!(
            validator.advise(&g),
            vec![ConfigurationAdvisory {
                element_id: "Review".to_string(),
                kind: AdvisoryKind::UserTaskWithoutForm,
            }]
        );
    }
}
