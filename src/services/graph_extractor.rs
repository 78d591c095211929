//! Builds the typed workflow graph from the engine's structural listing.
//!
//! The engine listing is the only source of truth; client-side XML is never
//! parsed. Extraction is typing only: no structure is inferred beyond what
//! the listing states, except a gateway's direction when the engine leaves
//! it open.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::graph::{
    FlowRef, GatewayDirection, GatewayKind, GatewayNode, GraphListing, GraphModel, ListedFlow,
    TaskKind, TaskNode,
};
use crate::domain::ports::ProcessEngine;

/// Fetches and types a workflow's graph.
pub struct GraphExtractor<E: ProcessEngine> {
    engine: Arc<E>,
}

impl<E: ProcessEngine> GraphExtractor<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self { engine }
    }

    /// Fetch the listing for `document_id` and build its graph.
    ///
    /// Engine failures surface as [`DomainError::Retrieval`] and are not retried.
    pub async fn extract(&self, document_id: &str) -> DomainResult<GraphModel> {
        let listing = self
            .engine
            .workflow_graph(document_id)
            .await
            .map_err(|e| DomainError::retrieval(format!("graph of workflow {document_id}"), e.to_string()))?;

        let graph = build_graph(&listing)?;
        debug!(
            document_id,
            tasks = graph.tasks().len(),
            gateways = graph.gateways().len(),
            "extracted workflow graph"
        );
        Ok(graph)
    }
}

/// Type a raw listing.
///
/// Elements of an unknown task or gateway type are skipped with a warning.
pub fn build_graph(listing: &GraphListing) -> DomainResult<GraphModel> {
    let mut graph = GraphModel::new();

    for task in &listing.tasks {
        let Some(kind) = TaskKind::from_element_type(&task.task_type) else {
            warn!(task_id = %task.id, task_type = %task.task_type, "skipping task of unknown type");
            continue;
        };
        graph.push_task(TaskNode {
            id: task.id.clone(),
            name: task.name.clone(),
            kind,
            form_key: task.form_key.clone().filter(|k| !k.trim().is_empty()),
            delegate_expression: task.delegate_expression.clone().filter(|d| !d.trim().is_empty()),
        });
    }

    for gateway in &listing.gateways {
        let Some(kind) = GatewayKind::from_element_type(&gateway.gateway_type) else {
            warn!(
                gateway_id = %gateway.id,
                gateway_type = %gateway.gateway_type,
                "skipping gateway of unknown type"
            );
            continue;
        };
        let outgoing = flow_refs(&gateway.outgoing);
        graph.push_gateway(GatewayNode {
            id: gateway.id.clone(),
            name: gateway.name.clone(),
            kind,
            direction: resolve_direction(gateway.gateway_direction.as_deref(), outgoing.len()),
            incoming: flow_refs(&gateway.incoming),
            outgoing,
        });
    }

    Ok(graph)
}

fn flow_refs(flows: &[ListedFlow]) -> Vec<FlowRef> {
    flows
        .iter()
        .map(|f| FlowRef::new(f.id.clone(), f.expression.clone().unwrap_or_default()))
        .collect()
}

/// Explicit `Diverging`/`Converging` wins; anything else (`Unspecified`,
/// `Mixed`, absent, or a kind name) is decided by fan-out.
fn resolve_direction(raw: Option<&str>, outgoing: usize) -> GatewayDirection {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("diverging") => GatewayDirection::Diverging,
        Some("converging") => GatewayDirection::Converging,
        _ if outgoing > 1 => GatewayDirection::Diverging,
        _ => GatewayDirection::Converging,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing(value: serde_json::Value) -> GraphListing {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_types_gateways_and_defaults_missing_expressions() {
        let graph = build_graph(&listing(json!({
            "tasks": [],
            "gateways": [{
                "id": "G1", "name": "Amount?", "type": "exclusiveGateway",
                "gatewayDirection": "Diverging",
                "incoming": [{"id": "f0", "expression": ""}],
                "outgoing": [{"id": "f1", "expression": "${amount > 100}"}, {"id": "f2"}]
            }]
        })))
        .unwrap();

        let g1 = graph.gateway("G1").unwrap();
        assert_eq!(g1.kind, GatewayKind::Exclusive);
        assert_eq!(g1.direction, GatewayDirection::Diverging);
        assert_eq!(g1.outgoing[1].expression, "");
        assert_eq!(g1.unconditioned_outgoing().count(), 1);
    }

    #[test]
    fn test_direction_by_fan_out() {
        assert_eq!(resolve_direction(None, 2), GatewayDirection::Diverging);
        assert_eq!(resolve_direction(Some("Unspecified"), 1), GatewayDirection::Converging);
        assert_eq!(resolve_direction(Some("Mixed"), 3), GatewayDirection::Diverging);
        assert_eq!(resolve_direction(Some("Parallel"), 1), GatewayDirection::Converging);
        assert_eq!(resolve_direction(Some("Converging"), 3), GatewayDirection::Converging);
    }

    #[test]
    fn test_unknown_task_type_is_skipped() {
        let graph = build_graph(&listing(json!({
            "tasks": [
                {"id": "T1", "type": "userTask", "formKey": ""},
                {"id": "T2", "type": "callActivity"}
            ],
            "gateways": []
        })))
        .unwrap();

        assert_eq!(graph.tasks().len(), 1);
        assert_eq!(graph.task("T1").unwrap().form_key, None);
    }

    #[test]
    fn test_unknown_gateway_type_is_skipped() {
        let graph = build_graph(&listing(json!({
            "gateways": [
                {"id": "G9", "type": "eventBasedGateway", "incoming": [], "outgoing": [{"id": "f1"}, {"id": "f2"}]},
                {"id": "G1", "type": "parallelGateway", "incoming": [{"id": "f0"}], "outgoing": [{"id": "f3"}]}
            ]
        })))
        .unwrap();

        assert_eq!(graph.gateways().len(), 1);
        assert!(graph.gateway("G9").is_none());
        assert_eq!(graph.gateway("G1").unwrap().kind, GatewayKind::Parallel);
    }

    #[test]
    fn test_empty_listing_is_not_an_error() {
        assert!(build_graph(&GraphListing::default()).unwrap().is_empty());
    }
}
