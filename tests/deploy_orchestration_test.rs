//! End-to-end deploy flows against the mock engine.

mod common;

use std::sync::Arc;

use flowgate::adapters::engine::{MockFailure, MockProcessEngine};
use flowgate::adapters::memory::InMemoryDraftStore;
use flowgate::adapters::sqlite::{create_migrated_test_pool, SqliteDraftStore};
use flowgate::domain::errors::DomainError;
use flowgate::domain::models::{AutoFixTrigger, DefectKind, DeployOutcome, DeployPhase};
use flowgate::domain::ports::DraftStore;
use flowgate::services::DeploymentOrchestrator;

use serde_json::json;

use common::{document, gateway_missing_outgoing, gateway_repaired, gateway_unconditioned, listing};

#[tokio::test]
async fn test_missing_outgoing_blocks_then_auto_fix_unblocks_deploy() {
    common::setup_test_logging();
    let engine = Arc::new(MockProcessEngine::new());
    engine.add_workflow(document("wf-1", "Invoice")).await;
    engine.set_graph("wf-1", gateway_missing_outgoing()).await;
    engine.set_fixed_graph("wf-1", gateway_repaired()).await;
    let drafts = Arc::new(InMemoryDraftStore::default());
    let orchestrator = DeploymentOrchestrator::new(engine.clone(), drafts.clone());

    let outcome = orchestrator.deploy("wf-1", "<bpmn:definitions/>").await.unwrap();
    let DeployOutcome::NotReady { defects, auto_fix } = outcome else {
        panic!("expected NotReady, got {outcome:?}");
    };
    assert_eq!(defects.len(), 1);
    assert_eq!(defects[0].gateway_id, "G1");
    assert_eq!(defects[0].kind, DefectKind::MissingOutgoing);
    assert_eq!(engine.call_count("deploy").await, 0);

    let offer = auto_fix.expect("connectivity defect offers auto-fix");
    let verdict = orchestrator.apply_auto_fix(offer).await.unwrap();
    assert!(verdict.is_ready());
    assert_eq!(orchestrator.phase("wf-1"), DeployPhase::Ready);
    assert_eq!(engine.call_count("deploy").await, 0, "auto-fix never deploys");

    let repaired = drafts.get("wf-1").await.unwrap().unwrap();
    assert!(repaired.content.contains("gateway flows repaired"));
    assert!(!repaired.is_dirty());

    let outcome = orchestrator.deploy("wf-1", &repaired.content).await.unwrap();
    assert!(matches!(outcome, DeployOutcome::Deployed { ref process_id } if process_id == "Invoice"));
    assert_eq!(engine.deployed().await.len(), 1);
}

#[tokio::test]
async fn test_unconditioned_branches_never_reach_deploy_endpoint() {
    let engine = Arc::new(MockProcessEngine::new());
    engine.add_workflow(document("wf-2", "Routing")).await;
    engine.set_graph("wf-2", gateway_unconditioned()).await;
    let orchestrator = DeploymentOrchestrator::new(engine.clone(), Arc::new(InMemoryDraftStore::default()));

    for _ in 0..2 {
        match orchestrator.deploy("wf-2", "<x/>").await.unwrap() {
            DeployOutcome::NotReady { defects, auto_fix } => {
                assert_eq!(defects.len(), 1);
                assert_eq!(defects[0].kind, DefectKind::UnconditionedBranch);
                assert!(auto_fix.is_none());
            }
            other => panic!("expected NotReady, got {other:?}"),
        }
    }
    assert_eq!(engine.call_count("workflow_graph").await, 2, "every attempt revalidates");
    assert_eq!(engine.call_count("deploy").await, 0);
}

#[tokio::test]
async fn test_event_based_gateway_does_not_block_deploy() {
    let engine = Arc::new(MockProcessEngine::new());
    engine.add_workflow(document("wf-3", "Escalation")).await;
    engine
        .set_graph(
            "wf-3",
            listing(json!({
                "tasks": [{"id": "Review", "type": "userTask", "formKey": "review-form"}],
                "gateways": [
                    {
                        "id": "E1",
                        "type": "eventBasedGateway",
                        "gatewayDirection": "Diverging",
                        "incoming": [{"id": "Flow_in"}],
                        "outgoing": [{"id": "Flow_msg"}, {"id": "Flow_timer"}]
                    },
                    {
                        "id": "G1",
                        "type": "exclusiveGateway",
                        "gatewayDirection": "Diverging",
                        "incoming": [{"id": "Flow_msg"}],
                        "outgoing": [
                            {"id": "Flow_yes", "expression": "${approved}"},
                            {"id": "Flow_no", "expression": "${!approved}"}
                        ]
                    }
                ]
            })),
        )
        .await;
    let orchestrator = DeploymentOrchestrator::new(engine.clone(), Arc::new(InMemoryDraftStore::default()));

    let outcome = orchestrator.deploy("wf-3", "<x/>").await.unwrap();
    assert!(matches!(outcome, DeployOutcome::Deployed { ref process_id } if process_id == "Escalation"));
    assert_eq!(engine.call_count("deploy").await, 1);
}

#[tokio::test]
async fn test_second_deploy_is_refused_while_first_is_in_flight() {
    let engine = Arc::new(MockProcessEngine::new());
    engine.add_workflow(document("wf-1", "Invoice")).await;
    let gate = engine.hold("workflow_graph").await;
    let orchestrator = DeploymentOrchestrator::new(engine.clone(), Arc::new(InMemoryDraftStore::default()));

    let first = orchestrator.deploy("wf-1", "<first/>");
    let second = async {
        while engine.call_count("workflow_graph").await == 0 {
            tokio::task::yield_now().await;
        }
        let refused = orchestrator.deploy("wf-1", "<second/>").await;
        gate.add_permits(1);
        refused
    };
    let (first, second) = tokio::join!(first, second);

    assert!(matches!(first.unwrap(), DeployOutcome::Deployed { .. }));
    assert!(matches!(second, Err(DomainError::OperationInFlight { .. })));
    assert_eq!(engine.call_count("update_workflow").await, 1);
    assert_eq!(engine.workflow("wf-1").await.unwrap().content, "<first/>");
}

#[tokio::test]
async fn test_defect_kind_trigger_withholds_offer_for_unrelated_rejection() {
    let engine = Arc::new(MockProcessEngine::new());
    engine.add_workflow(document("wf-1", "Invoice")).await;
    engine
        .fail("deploy", MockFailure::Status(400, r#"{"message":"Duplicate process key"}"#.to_string()))
        .await;
    let orchestrator = DeploymentOrchestrator::new(engine.clone(), Arc::new(InMemoryDraftStore::default()))
        .with_trigger(AutoFixTrigger::DefectKind);

    match orchestrator.deploy("wf-1", "<x/>").await.unwrap() {
        DeployOutcome::Rejected { message, auto_fix } => {
            assert_eq!(message, "Duplicate process key");
            assert!(auto_fix.is_none());
        }
        other => panic!("expected Rejected, got {other:?}"),
    }

    engine
        .fail(
            "deploy",
            MockFailure::Status(400, r#"{"message":"Gateway G1 has no outgoing flow"}"#.to_string()),
        )
        .await;
    orchestrator.abandon("wf-1").unwrap();
    let outcome = orchestrator.deploy("wf-1", "<x/>").await.unwrap();
    assert!(outcome.auto_fix().is_some());
}

#[tokio::test]
async fn test_failed_auto_fix_is_final() {
    let engine = Arc::new(MockProcessEngine::new());
    engine.add_workflow(document("wf-1", "Invoice")).await;
    engine.set_graph("wf-1", gateway_missing_outgoing()).await;
    let orchestrator = DeploymentOrchestrator::new(engine.clone(), Arc::new(InMemoryDraftStore::default()));

    let offer = orchestrator
        .deploy("wf-1", "<x/>")
        .await
        .unwrap()
        .into_auto_fix()
        .unwrap();
    engine.fail("auto_fix", MockFailure::Status(500, "boom".to_string())).await;

    let err = orchestrator.apply_auto_fix(offer).await.unwrap_err();
    assert!(matches!(err, DomainError::AutoFixFailed { .. }));
    assert_eq!(engine.call_count("auto_fix").await, 1);
    assert_eq!(engine.call_count("deploy").await, 0);
    assert_eq!(orchestrator.phase("wf-1"), DeployPhase::NotReady);
}

#[tokio::test]
async fn test_deploy_with_sqlite_drafts_marks_content_saved() {
    let pool = create_migrated_test_pool().await.unwrap();
    let drafts = Arc::new(SqliteDraftStore::new(pool, "session-a"));
    let engine = Arc::new(MockProcessEngine::new());
    engine.add_workflow(document("wf-1", "Invoice")).await;
    let orchestrator = DeploymentOrchestrator::new(engine.clone(), drafts.clone());

    orchestrator.deploy("wf-1", "<edited/>").await.unwrap();

    let slot = drafts.get("wf-1").await.unwrap().unwrap();
    assert_eq!(slot.content, "<edited/>");
    assert_eq!(slot.baseline, "<edited/>");
    assert_eq!(engine.deployed().await[0].file_name, "Invoice.bpmn");
}
