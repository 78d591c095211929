//! Structural graph of a workflow.
//!
//! Two shapes live here:
//! - [`GraphListing`]: the engine's raw task/gateway introspection, exactly
//!   as it arrives on the wire.
//! - [`GraphModel`]: the typed model the readiness validator works on.
//!
//! BPMN graphs may loop back to earlier gateways, so the model is an arena:
//! nodes live in vectors, an id index maps element ids to slots, and edges are
//! plain [`FlowRef`] lists. Nothing owns anything else.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ── Engine listing (wire shape) ─────────────────────────────────────────

/// A sequence flow as reported in the engine listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedFlow {
    pub id: String,
    #[serde(default)]
    pub expression: Option<String>,
}

/// A gateway as reported in the engine listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedGateway {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub gateway_type: String,
    #[serde(default)]
    pub gateway_direction: Option<String>,
    #[serde(default)]
    pub incoming: Vec<ListedFlow>,
    #[serde(default)]
    pub outgoing: Vec<ListedFlow>,
}

/// A task as reported in the engine listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedTask {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub form_key: Option<String>,
    #[serde(default)]
    pub delegate_expression: Option<String>,
}

/// Response of the engine's workflow introspection endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphListing {
    #[serde(default)]
    pub tasks: Vec<ListedTask>,
    #[serde(default)]
    pub gateways: Vec<ListedGateway>,
}

// ── Typed model ─────────────────────────────────────────────────────────

/// Kind of BPMN task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    User,
    Service,
    Send,
    BusinessRule,
    Script,
    Receive,
    Manual,
}

impl TaskKind {
    /// Resolve the engine's element type name (`userTask`, `serviceTask`, ...).
    pub fn from_element_type(s: &str) -> Option<Self> {
        match s {
            "userTask" => Some(Self::User),
            "serviceTask" => Some(Self::Service),
            "sendTask" => Some(Self::Send),
            "businessRuleTask" => Some(Self::BusinessRule),
            "scriptTask" => Some(Self::Script),
            "receiveTask" => Some(Self::Receive),
            "manualTask" => Some(Self::Manual),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Service => "service",
            Self::Send => "send",
            Self::BusinessRule => "businessRule",
            Self::Script => "script",
            Self::Receive => "receive",
            Self::Manual => "manual",
        }
    }
}

/// Kind of BPMN gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GatewayKind {
    Exclusive,
    Parallel,
    Inclusive,
}

impl GatewayKind {
    /// Resolve the engine's element type name (`exclusiveGateway`, ...).
    pub fn from_element_type(s: &str) -> Option<Self> {
        match s {
            "exclusiveGateway" => Some(Self::Exclusive),
            "parallelGateway" => Some(Self::Parallel),
            "inclusiveGateway" => Some(Self::Inclusive),
            _ => None,
        }
    }

    /// Whether outgoing flows of a diverging gateway of this kind are routed
    /// by expressions. Parallel fan-out is unconditional.
    pub fn routes_by_expression(&self) -> bool {
        matches!(self, Self::Exclusive | Self::Inclusive)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exclusive => "exclusive",
            Self::Parallel => "parallel",
            Self::Inclusive => "inclusive",
        }
    }
}

/// Whether a gateway splits or merges flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GatewayDirection {
    Diverging,
    Converging,
}

impl GatewayDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diverging => "diverging",
            Self::Converging => "converging",
        }
    }
}

/// Reference to a sequence flow attached to a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRef {
    pub id: String,
    /// Routing expression; empty when the flow is unconditioned.
    pub expression: String,
}

impl FlowRef {
    pub fn new(id: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            expression: expression.into(),
        }
    }

    /// A flow without a routing expression.
    pub fn unconditioned(id: impl Into<String>) -> Self {
        Self::new(id, "")
    }

    pub fn is_conditioned(&self) -> bool {
        !self.expression.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: String,
    pub name: Option<String>,
    pub kind: TaskKind,
    pub form_key: Option<String>,
    pub delegate_expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayNode {
    pub id: String,
    pub name: Option<String>,
    pub kind: GatewayKind,
    pub direction: GatewayDirection,
    pub incoming: Vec<FlowRef>,
    pub outgoing: Vec<FlowRef>,
}

impl GatewayNode {
    /// Outgoing flows without a routing expression.
    pub fn unconditioned_outgoing(&self) -> impl Iterator<Item = &FlowRef> {
        self.outgoing.iter().filter(|f| !f.is_conditioned())
    }
}

/// Slot of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Task(usize),
    Gateway(usize),
}

/// Typed structural graph of a workflow. Derived, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphModel {
    tasks: Vec<TaskNode>,
    gateways: Vec<GatewayNode>,
    index: HashMap<String, NodeRef>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a model from nodes. Later nodes with a duplicate id shadow
    /// earlier ones in the index but stay in the arena.
    pub fn from_parts(tasks: Vec<TaskNode>, gateways: Vec<GatewayNode>) -> Self {
        let mut model = Self::new();
        for task in tasks {
            model.push_task(task);
        }
        for gateway in gateways {
            model.push_gateway(gateway);
        }
        model
    }

    pub fn push_task(&mut self, task: TaskNode) -> NodeRef {
        let slot = NodeRef::Task(self.tasks.len());
        self.index.insert(task.id.clone(), slot);
        self.tasks.push(task);
        slot
    }

    pub fn push_gateway(&mut self, gateway: GatewayNode) -> NodeRef {
        let slot = NodeRef::Gateway(self.gateways.len());
        self.index.insert(gateway.id.clone(), slot);
        self.gateways.push(gateway);
        slot
    }

    pub fn tasks(&self) -> &[TaskNode] {
        &self.tasks
    }

    pub fn gateways(&self) -> &[GatewayNode] {
        &self.gateways
    }

    pub fn lookup(&self, id: &str) -> Option<NodeRef> {
        self.index.get(id).copied()
    }

    pub fn task(&self, id: &str) -> Option<&TaskNode> {
        match self.lookup(id)? {
            NodeRef::Task(i) => self.tasks.get(i),
            NodeRef::Gateway(_) => None,
        }
    }

    pub fn gateway(&self, id: &str) -> Option<&GatewayNode> {
        match self.lookup(id)? {
            NodeRef::Gateway(i) => self.gateways.get(i),
            NodeRef::Task(_) => None,
        }
    }

    pub fn tasks_of_kind(&self, kind: TaskKind) -> impl Iterator<Item = &TaskNode> {
        self.tasks.iter().filter(move |t| t.kind == kind)
    }

    /// Gateways that reference the given sequence flow on either side.
    pub fn gateways_touching_flow<'a>(
        &'a self,
        flow_id: &'a str,
    ) -> impl Iterator<Item = &'a GatewayNode> + 'a {
        self.gateways.iter().filter(move |g| {
            g.incoming.iter().chain(g.outgoing.iter()).any(|f| f.id == flow_id)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.gateways.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(id: &str, incoming: &[&str], outgoing: &[&str]) -> GatewayNode {
        GatewayNode {
            id: id.to_string(),
            name: None,
            kind: GatewayKind::Exclusive,
            direction: GatewayDirection::Diverging,
            incoming: incoming.iter().map(|f| FlowRef::unconditioned(*f)).collect(),
            outgoing: outgoing.iter().map(|f| FlowRef::unconditioned(*f)).collect(),
        }
    }

    #[test]
    fn test_listing_parses_engine_shape() {
        let json = serde_json::json!({
            "tasks": [
                { "id": "Task_1", "name": "Review", "type": "userTask", "formKey": "review-form" }
            ],
            "gateways": [{
                "id": "G1",
                "name": null,
                "type": "exclusiveGateway",
                "gatewayDirection": "Diverging",
                "incoming": [{ "id": "f0", "expression": null }],
                "outgoing": [{ "id": "f1", "expression": "${ok}" }]
            }]
        });
        let listing: GraphListing = serde_json::from_value(json).unwrap();
        assert_eq!(listing.tasks[0].form_key.as_deref(), Some("review-form"));
        assert_eq!(listing.gateways[0].gateway_direction.as_deref(), Some("Diverging"));
        assert_eq!(listing.gateways[0].incoming[0].expression, None);
    }

    #[test]
    fn test_arena_lookup_by_id() {
        let model = GraphModel::from_parts(
            vec![TaskNode {
                id: "Task_1".to_string(),
                name: None,
                kind: TaskKind::Service,
                form_key: None,
                delegate_expression: Some("${mailer}".to_string()),
            }],
            vec![gateway("G1", &["f0"], &["f1"]), gateway("G2", &["f1"], &["f0"])],
        );

        assert_eq!(model.lookup("G2"), Some(NodeRef::Gateway(1)));
        assert!(model.gateway("Task_1").is_none());
        assert_eq!(model.task("Task_1").map(|t| t.kind), Some(TaskKind::Service));
        // f0 closes a loop between G1 and G2
        assert_eq!(model.gateways_touching_flow("f0").count(), 2);
    }

    #[test]
    fn test_flow_conditioned_ignores_whitespace() {
        assert!(!FlowRef::new("f1", "   ").is_conditioned());
        assert!(FlowRef::new("f1", "${x}").is_conditioned());
    }

    #[test]
    fn test_element_type_resolution() {
        assert_eq!(GatewayKind::from_element_type("inclusiveGateway"), Some(GatewayKind::Inclusive));
        assert_eq!(GatewayKind::from_element_type("eventBasedGateway"), None);
        assert_eq!(TaskKind::from_element_type("businessRuleTask"), Some(TaskKind::BusinessRule));
        assert!(GatewayKind::Inclusive.routes_by_expression());
        assert!(!GatewayKind::Parallel.routes_by_expression());
    }
}
