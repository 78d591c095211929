//! Task lifecycle flows across several controllers sharing one engine.

mod common;

use std::sync::Arc;

use flowgate::adapters::engine::MockProcessEngine;
use flowgate::domain::errors::DomainError;
use flowgate::domain::models::{SubmitBlock, TaskInstance, TaskPhase};
use flowgate::services::{TaskCache, TaskLifecycleController};
use serde_json::json;
use tokio_test::assert_ok;

use common::approval_form;

async fn engine_with_task(task: TaskInstance) -> Arc<MockProcessEngine> {
    let engine = Arc::new(MockProcessEngine::new());
    engine.add_task(task, approval_form()).await;
    engine
}

#[tokio::test]
async fn test_second_claimant_gets_conflict() {
    common::setup_test_logging();
    let engine = engine_with_task(TaskInstance::new("T1", "Approve invoice")).await;
    let gate = engine.hold("claim_task").await;
    let cache = Arc::new(TaskCache::new());
    assert_ok!(cache.refresh(engine.as_ref()).await);

    let alice = TaskLifecycleController::new(engine.clone(), "alice").with_cache(cache.clone());
    let bob = TaskLifecycleController::new(engine.clone(), "bob").with_cache(cache.clone());
    assert_ok!(alice.bind("T1").await);
    assert_ok!(bob.bind("T1").await);

    // Bob's request goes out while Alice's is still waiting on the engine.
    let first = alice.claim("T1");
    let second = async {
        while engine.call_count("claim_task").await == 0 {
            tokio::task::yield_now().await;
        }
        bob.claim("T1").await
    };
    let release = async {
        while engine.call_count("claim_task").await < 2 {
            tokio::task::yield_now().await;
        }
        gate.add_permits(1);
        while engine.task("T1").await.and_then(|t| t.assignee).is_none() {
            tokio::task::yield_now().await;
        }
        gate.add_permits(1);
    };
    let (first, second, ()) = tokio::join!(first, second, release);

    assert_eq!(assert_ok!(first).phase, TaskPhase::Claimed);
    let err = second.unwrap_err();
    assert!(matches!(err, DomainError::Conflict { ref task_id, .. } if task_id == "T1"));
    assert_eq!(bob.phase(), Some(TaskPhase::Unclaimed));
    assert!(!bob.view().unwrap().pending);
    assert_eq!(engine.call_count("claim_task").await, 2);
    assert_eq!(engine.task("T1").await.unwrap().assignee.as_deref(), Some("alice"));
    assert_eq!(cache.get("T1").await.unwrap().assignee.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_edit_before_claim_then_submit() {
    let engine = engine_with_task(TaskInstance::new("T1", "Approve invoice")).await;
    let controller = TaskLifecycleController::new(engine.clone(), "alice");

    let view = assert_ok!(controller.bind("T1").await);
    let edited = view.form.clone().with_data(json!({"comment": "ok", "approved": true}));
    assert_eq!(assert_ok!(controller.on_form_changed(edited)), TaskPhase::Unclaimed);

    let view = assert_ok!(controller.claim("T1").await);
    assert_eq!(view.phase, TaskPhase::Submittable);

    let done = assert_ok!(controller.submit("T1").await);
    assert_eq!(done.phase, TaskPhase::Completed);
    assert_eq!(engine.submissions().await, vec![("T1".to_string(), json!({"comment": "ok", "approved": true}))]);
}

#[tokio::test]
async fn test_empty_error_list_blocks_submit() {
    let engine = engine_with_task(TaskInstance::new("T1", "Approve invoice").with_assignee("alice")).await;
    let controller = TaskLifecycleController::new(engine.clone(), "alice");

    let view = assert_ok!(controller.bind("T1").await);
    let mut edited = view.form.clone().with_data(json!({"comment": "ok", "approved": true}));
    edited.errors.insert("comment".to_string(), Vec::new());
    assert_eq!(assert_ok!(controller.on_form_changed(edited)), TaskPhase::Editing);

    match controller.submit("T1").await {
        Err(DomainError::NotSubmittable { blocks, .. }) => assert_eq!(blocks, vec![SubmitBlock::FormErrors]),
        other => panic!("expected NotSubmittable, got {other:?}"),
    }
    assert_eq!(engine.call_count("submit_task_form").await, 0);
}

#[tokio::test]
async fn test_unchanged_form_is_never_submitted() {
    let engine = engine_with_task(TaskInstance::new("T1", "Approve invoice").with_assignee("alice")).await;
    let controller = TaskLifecycleController::new(engine.clone(), "alice");

    let view = assert_ok!(controller.bind("T1").await);
    assert_eq!(view.phase, TaskPhase::Claimed);

    match controller.submit("T1").await {
        Err(DomainError::NotSubmittable { blocks, .. }) => assert_eq!(blocks, vec![SubmitBlock::Unchanged]),
        other => panic!("expected NotSubmittable, got {other:?}"),
    }
    assert_eq!(engine.call_count("submit_task_form").await, 0);
    assert_eq!(controller.phase(), Some(TaskPhase::Claimed));
}

#[tokio::test]
async fn test_edited_form_completes_task() {
    let engine = engine_with_task(TaskInstance::new("T1", "Approve invoice").with_assignee("alice")).await;
    let controller = TaskLifecycleController::new(engine.clone(), "alice");

    let view = assert_ok!(controller.bind("T1").await);
    let edited = view.form.clone().with_data(json!({"comment": "ok", "approved": true}));
    assert_eq!(assert_ok!(controller.on_form_changed(edited)), TaskPhase::Submittable);

    let done = assert_ok!(controller.submit("T1").await);
    assert_eq!(done.phase, TaskPhase::Completed);
    assert!(engine.task("T1").await.is_none());
    assert_eq!(engine.submissions().await, vec![("T1".to_string(), json!({"comment": "ok", "approved": true}))]);
}

#[tokio::test]
async fn test_claim_reply_after_unbind_is_discarded() {
    let engine = engine_with_task(TaskInstance::new("T1", "Approve invoice")).await;
    let gate = engine.hold("claim_task").await;
    let controller = TaskLifecycleController::new(engine.clone(), "alice");
    assert_ok!(controller.bind("T1").await);

    let claim = controller.claim("T1");
    let leave = async {
        while engine.call_count("claim_task").await == 0 {
            tokio::task::yield_now().await;
        }
        controller.unbind();
        gate.add_permits(1);
    };
    let (claimed, ()) = tokio::join!(claim, leave);

    assert!(matches!(claimed, Err(DomainError::Discarded { .. })));
    assert!(controller.view().is_none());
    // The engine still processed the claim; only the late reply was dropped.
    assert_eq!(engine.task("T1").await.unwrap().assignee.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_concurrent_claim_is_refused() {
    let engine = engine_with_task(TaskInstance::new("T1", "Approve invoice")).await;
    let gate = engine.hold("claim_task").await;
    let controller = TaskLifecycleController::new(engine.clone(), "alice");
    assert_ok!(controller.bind("T1").await);

    let first = controller.claim("T1");
    let second = async {
        while engine.call_count("claim_task").await == 0 {
            tokio::task::yield_now().await;
        }
        let refused = controller.claim("T1").await;
        gate.add_permits(1);
        refused
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(assert_ok!(first).phase, TaskPhase::Claimed);
    assert!(matches!(second, Err(DomainError::OperationInFlight { .. })));
    assert_eq!(engine.call_count("claim_task").await, 1);
}

#[tokio::test]
async fn test_reassignment_is_picked_up_on_refresh() {
    let engine = engine_with_task(TaskInstance::new("T1", "Approve invoice").with_assignee("alice")).await;
    let controller = TaskLifecycleController::new(engine.clone(), "alice");
    let view = assert_ok!(controller.bind("T1").await);
    let edited = view.form.clone().with_data(json!({"comment": "draft", "approved": false}));
    assert_ok!(controller.on_form_changed(edited));

    engine.set_assignee("T1", None).await;
    let view = assert_ok!(controller.refresh().await);
    assert_eq!(view.phase, TaskPhase::Unclaimed);

    let err = controller.submit("T1").await.unwrap_err();
    assert!(matches!(err, DomainError::NotSubmittable { ref blocks, .. } if blocks.contains(&SubmitBlock::NotAssignedToActor)));
}
