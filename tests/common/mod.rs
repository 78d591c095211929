//! Common test utilities for integration tests
//!
//! Fixtures for workflow documents, engine graph listings and tasks shared
//! across the integration test files.

#![allow(dead_code)]

use std::path::PathBuf;

use chrono::Utc;
use flowgate::domain::models::{GraphListing, WorkflowDocument};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Temporary directory holding a draft database path.
pub fn temp_db_path() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("drafts.db");
    (dir, db_path)
}

/// Initializes a tracing subscriber for test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn document(id: &str, title: &str) -> WorkflowDocument {
    WorkflowDocument {
        id: id.to_string(),
        title: title.to_string(),
        content: "<?xml version=\"1.0\"?><bpmn:definitions/>".to_string(),
        creation_time: Utc::now(),
        update_time: Utc::now(),
        ready_to_deploy: true,
    }
}

pub fn listing(value: Value) -> GraphListing {
    serde_json::from_value(value).expect("valid graph listing")
}

/// Approval split whose diverging gateway has lost its outgoing flows.
pub fn gateway_missing_outgoing() -> GraphListing {
    listing(json!({
        "tasks": [{"id": "Review", "type": "userTask", "formKey": "review-form"}],
        "gateways": [{
            "id": "G1",
            "type": "exclusiveGateway",
            "gatewayDirection": "Diverging",
            "incoming": [{"id": "Flow_in"}],
            "outgoing": []
        }]
    }))
}

/// The same split after the engine rewired and conditioned it.
pub fn gateway_repaired() -> GraphListing {
    listing(json!({
        "tasks": [{"id": "Review", "type": "userTask", "formKey": "review-form"}],
        "gateways": [{
            "id": "G1",
            "type": "exclusiveGateway",
            "gatewayDirection": "Diverging",
            "incoming": [{"id": "Flow_in"}],
            "outgoing": [
                {"id": "Flow_yes", "expression": "${approved}"},
                {"id": "Flow_no", "expression": "${!approved}"}
            ]
        }]
    }))
}

/// Diverging exclusive gateway with two unconditioned branches.
pub fn gateway_unconditioned() -> GraphListing {
    listing(json!({
        "gateways": [{
            "id": "G2",
            "type": "exclusiveGateway",
            "gatewayDirection": "Diverging",
            "incoming": [{"id": "Flow_in"}],
            "outgoing": [{"id": "Flow_a"}, {"id": "Flow_b", "expression": "  "}]
        }]
    }))
}

/// Form with one text field and one checkbox, both with defaults.
pub fn approval_form() -> Value {
    json!({
        "type": "default",
        "components": [
            {"type": "textfield", "key": "comment", "label": "Comment", "defaultValue": ""},
            {"type": "checkbox", "key": "approved", "label": "Approved", "defaultValue": false}
        ]
    })
}
