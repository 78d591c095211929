//! Workflow document domain model.
//!
//! A workflow document is the serialized BPMN graph plus registry metadata.
//! The editor only ever changes `content`; `ready_to_deploy` is computed by
//! the engine and is advisory on the client side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A workflow as stored in the engine's workflow registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
    pub id: String,
    pub title: String,
    /// Serialized BPMN XML.
    #[serde(rename = "workflowContent")]
    pub content: String,
    #[serde(rename = "creationTimestamp", deserialize_with = "timestamp::deserialize")]
    pub creation_time: DateTime<Utc>,
    #[serde(rename = "updateTimestamp", deserialize_with = "timestamp::deserialize")]
    pub update_time: DateTime<Utc>,
    /// Cached readiness verdict. Never trusted for a deploy decision.
    #[serde(default = "default_ready_to_deploy")]
    pub ready_to_deploy: bool,
}

const fn default_ready_to_deploy() -> bool {
    true
}

/// Registry timestamps arrive either as RFC 3339 or as zone-less local
/// date-times; the latter are read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

impl WorkflowDocument {
    /// File name used when the document is packaged for deployment.
    pub fn deploy_file_name(&self) -> String {
        let title = self.title.trim();
        let stem = if title.is_empty() { self.id.as_str() } else { title };
        format!("{stem}.bpmn")
    }

    /// Package the document content as a deployable unit.
    pub fn package(&self) -> DeployableUnit {
        DeployableUnit {
            file_name: self.deploy_file_name(),
            content_type: BPMN_CONTENT_TYPE.to_string(),
            bytes: self.content.clone().into_bytes(),
        }
    }
}

/// Content type sent with deployable BPMN files.
pub const BPMN_CONTENT_TYPE: &str = "application/xml";

/// A workflow packaged for submission to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployableUnit {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Payload for registering a new workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkflow {
    pub title: String,
    pub content: String,
}

/// Partial update of a registered workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Vec<ConfigEntry>>,
}

impl WorkflowUpdate {
    /// Update that replaces only the document content.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Update that applies element configuration entries.
    pub fn config(entries: Vec<ConfigEntry>) -> Self {
        Self {
            config: Some(entries),
            ..Default::default()
        }
    }
}

/// Attribute of a BPMN element that can be configured through the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigAttribute {
    Name,
    FormKey,
    DelegateExpression,
    FlowExpression,
}

/// Element type a configuration entry targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigElementType {
    Task,
    UserTask,
    ServiceTask,
    ScriptTask,
    BusinessRuleTask,
    SendTask,
    ReceiveTask,
    ManualTask,
    SequenceFlow,
    ExclusiveGateway,
    ParallelGateway,
    InclusiveGateway,
}

/// One manual configuration change for a workflow element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntry {
    pub id: String,
    pub attribute_value: String,
    pub attribute: ConfigAttribute,
    #[serde(rename = "type")]
    pub element_type: ConfigElementType,
}

impl ConfigEntry {
    /// Set the routing expression of a sequence flow.
    pub fn flow_expression(flow_id: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            id: flow_id.into(),
            attribute_value: expression.into(),
            attribute: ConfigAttribute::FlowExpression,
            element_type: ConfigElementType::SequenceFlow,
        }
    }

    /// Set the form key of a user task.
    pub fn form_key(task_id: impl Into<String>, form_key: impl Into<String>) -> Self {
        Self {
            id: task_id.into(),
            attribute_value: form_key.into(),
            attribute: ConfigAttribute::FormKey,
            element_type: ConfigElementType::UserTask,
        }
    }

    /// Set the delegate expression of a service task.
    pub fn delegate_expression(task_id: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            id: task_id.into(),
            attribute_value: expression.into(),
            attribute: ConfigAttribute::DelegateExpression,
            element_type: ConfigElementType::ServiceTask,
        }
    }

    /// Rename any element.
    pub fn name(
        element_id: impl Into<String>,
        element_type: ConfigElementType,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: element_id.into(),
            attribute_value: name.into(),
            attribute: ConfigAttribute::Name,
            element_type,
        }
    }
}

/// A process definition deployed on the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDefinition {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    pub version: i32,
    #[serde(default)]
    pub resource_name: Option<String>,
    pub deployment_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub suspended: bool,
}

/// Build the BPMN template a fresh draft starts from.
///
/// Each template carries a unique `Process_<uuid>` process with a single
/// start event, so two fresh drafts never collide on deploy.
pub fn default_bpmn_template() -> String {
    let process_id = format!("Process_{}", Uuid::new_v4());
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL" xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI" xmlns:dc="http://www.omg.org/spec/DD/20100524/DC" xmlns:di="http://www.omg.org/spec/DD/20100524/DI" id="Definitions_1" targetNamespace="http://bpmn.io/schema/bpmn">
  <bpmn:process id="{process_id}" name="{process_id}" isExecutable="true">
    <bpmn:startEvent id="StartEvent_1" />
  </bpmn:process>
  <bpmndi:BPMNDiagram id="BPMNDiagram_1">
    <bpmndi:BPMNPlane id="BPMNPlane_1" bpmnElement="{process_id}">
      <bpmndi:BPMNShape id="_BPMNShape_StartEvent_2" bpmnElement="StartEvent_1">
        <dc:Bounds x="173" y="102" width="36" height="36" />
      </bpmndi:BPMNShape>
    </bpmndi:BPMNPlane>
  </bpmndi:BPMNDiagram>
</bpmn:definitions>
"#
    )
}

/// Minimal sanity check applied to imported BPMN files.
pub fn looks_like_bpmn(content: &str) -> bool {
    content.contains("<?xml") && content.contains("bpmn:")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(title: &str) -> WorkflowDocument {
        WorkflowDocument {
            id: "wf-1".to_string(),
            title: title.to_string(),
            content: "<bpmn:definitions/>".to_string(),
            creation_time: Utc::now(),
            update_time: Utc::now(),
            ready_to_deploy: true,
        }
    }

    #[test]
    fn test_ready_to_deploy_defaults_to_true() {
        let json = serde_json::json!({
            "id": "wf-1",
            "title": "Onboarding",
            "workflowContent": "<xml/>",
            "creationTimestamp": "2025-01-02T10:00:00Z",
            "updateTimestamp": "2025-01-02T11:00:00Z"
        });
        let doc: WorkflowDocument = serde_json::from_value(json).unwrap();
        assert!(doc.ready_to_deploy);
        assert_eq!(doc.content, "<xml/>");
    }

    #[test]
    fn test_local_timestamps_are_read_as_utc() {
        let json = serde_json::json!({
            "id": "wf-1",
            "title": "Onboarding",
            "workflowContent": "<xml/>",
            "creationTimestamp": "2025-01-02T10:00:00.123",
            "updateTimestamp": "2025-01-02T11:00:00",
            "readyToDeploy": false
        });
        let doc: WorkflowDocument = serde_json::from_value(json).unwrap();
        assert_eq!(doc.update_time.to_rfc3339(), "2025-01-02T11:00:00+00:00");
        assert!(!doc.ready_to_deploy);
    }

    #[test]
    fn test_package_uses_title_as_file_name() {
        let unit = document("Onboarding").package();
        assert_eq!(unit.file_name, "Onboarding.bpmn");
        assert_eq!(unit.content_type, BPMN_CONTENT_TYPE);
        assert_eq!(unit.bytes, b"<bpmn:definitions/>".to_vec());
    }

    #[test]
    fn test_package_falls_back_to_id_for_blank_title() {
        assert_eq!(document("  ").deploy_file_name(), "wf-1.bpmn");
    }

    #[test]
    fn test_config_entry_wire_format() {
        let entry = ConfigEntry::flow_expression("Flow_1", "${amount > 100}");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "Flow_1",
                "attributeValue": "${amount > 100}",
                "attribute": "FLOW_EXPRESSION",
                "type": "SEQUENCE_FLOW"
            })
        );
    }

    #[test]
    fn test_update_skips_absent_fields() {
        let json = serde_json::to_value(WorkflowUpdate::content("<xml/>")).unwrap();
        assert_eq!(json, serde_json::json!({ "content": "<xml/>" }));
    }

    #[test]
    fn test_default_template_is_unique_and_valid() {
        let a = default_bpmn_template();
        let b = default_bpmn_template();
        assert_ne!(a, b);
        assert!(looks_like_bpmn(&a));
        assert!(a.contains("StartEvent_1"));
    }
}
