//! Aborting a running session from outside its `run` call.

mod common;

use std::sync::Arc;
use std::time::Duration;

use agentdeck_core::ClientEvent;
use agentdeck_runtime::ImageAttachment;
use agentdeck_test::{MockRuntime, png_data_uri, system_message};
use common::OrchestratorHarness;

#[tokio::test]
async fn test_abort_interrupts_and_cleans_up() {
    let harness = Arc::new(OrchestratorHarness::new(
        MockRuntime::new()
            .message(system_message("s1"))
            .wait_for_interrupt(),
    ));

    let runner = {
        let harness = Arc::clone(&harness);
        tokio::spawn(async move {
            let request = harness
                .request()
                .image(ImageAttachment::new(png_data_uri()));
            harness.run("describe", request).await
        })
    };

    harness.wait_for_session("s1").await;
    assert_eq!(harness.staged_files().len(), 1);
    assert_eq!(harness.orchestrator.active_session_ids().await, vec!["s1".to_string()]);

    assert!(harness.orchestrator.abort("s1").await);
    assert_eq!(harness.runtime.interrupt_count(), 1);
    assert!(harness.staged_files().is_empty());
    assert!(!harness.orchestrator.is_session_active("s1").await);

    runner.await.unwrap().unwrap();
    assert!(matches!(
        harness.channel.events().last(),
        Some(ClientEvent::ClaudeComplete { exit_code: 0, .. })
    ));

    // Already gone.
    assert!(!harness.orchestrator.abort("s1").await);
    assert_eq!(harness.runtime.interrupt_count(), 1);
}

#[tokio::test]
async fn test_abort_unknown_session_has_no_effect() {
    let harness = OrchestratorHarness::new(MockRuntime::new());
    assert!(!harness.orchestrator.abort("missing").await);
    assert_eq!(harness.runtime.interrupt_count(), 0);
    assert!(harness.channel.events().is_empty());
}

#[tokio::test]
async fn test_interrupt_failure_reports_false() {
    let harness = Arc::new(OrchestratorHarness::new(
        MockRuntime::new()
            .message(system_message("s1"))
            .wait_for_interrupt()
            .fail_on_interrupt("process gone"),
    ));

    let runner = {
        let harness = Arc::clone(&harness);
        tokio::spawn(async move { harness.run("hi", harness.request()).await })
    };

    harness.wait_for_session("s1").await;
    assert!(!harness.orchestrator.abort("s1").await);
    assert!(harness.orchestrator.is_session_active("s1").await);

    runner.abort();
}

#[tokio::test]
async fn test_dropped_run_releases_session() {
    let harness = Arc::new(OrchestratorHarness::new(
        MockRuntime::new()
            .message(system_message("s1"))
            .wait_for_interrupt(),
    ));

    let runner = {
        let harness = Arc::clone(&harness);
        tokio::spawn(async move {
            let request = harness
                .request()
                .image(ImageAttachment::new(png_data_uri()));
            harness.run("describe", request).await
        })
    };

    harness.wait_for_session("s1").await;
    assert_eq!(harness.staged_files().len(), 1);

    runner.abort();
    assert!(runner.await.unwrap_err().is_cancelled());

    // Files go synchronously when the run is dropped.
    assert!(harness.staged_files().is_empty());

    tokio::time::timeout(Duration::from_secs(5), async {
        while !harness.channel.events().last().is_some_and(ClientEvent::is_terminal) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("no terminal event after the run was dropped");

    assert!(harness.orchestrator.active_session_ids().await.is_empty());
    assert_eq!(harness.runtime.interrupt_count(), 1);
    assert!(matches!(
        harness.channel.events().last(),
        Some(ClientEvent::ClaudeError { error, session_id: Some(id) })
            if error.contains("cancelled") && id == "s1"
    ));
}
