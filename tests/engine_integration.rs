//! End-to-end engine tests: edit events in, sink notifications out.

mod common;

use common::{A_PY_V1, A_PY_V2};
use lens::engine::{AnalysisEngine, ChangeDisposition, ChannelSink};
use lens::pipeline::{AnalysisOutcome, PipelineState};
use lens::store::PerformanceStore;
use lens::task::TaskType;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::MockServer;

async fn next(rx: &mut UnboundedReceiver<AnalysisOutcome>, wait: Duration) -> Option<AnalysisOutcome> {
    tokio::time::timeout(wait, rx.recv()).await.ok().flatten()
}

#[tokio::test]
async fn test_a_py_first_and_second_edit() {
    let server = MockServer::start().await;
    common::mount_tags(&server, Duration::ZERO).await;
    common::mount_generate(&server, "Consider handling a missing cwd.").await;
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(&server.uri(), dir.path());

    let (sink, mut rx) = ChannelSink::new();
    let engine = AnalysisEngine::start(&config, Arc::new(sink)).unwrap();

    assert_eq!(
        engine.on_content_changed("a.py", A_PY_V1),
        ChangeDisposition::ScheduledFull
    );
    let first = next(&mut rx, Duration::from_secs(5)).await.unwrap();
    assert_eq!(first.task, TaskType::RealtimeAnalysis);
    assert_eq!(first.state, PipelineState::Completed);
    assert_eq!(
        first.result.as_ref().unwrap().text,
        "Consider handling a missing cwd."
    );

    // Identical content is silent
    assert_eq!(
        engine.on_content_changed("a.py", A_PY_V1),
        ChangeDisposition::Insignificant
    );
    assert!(next(&mut rx, Duration::from_millis(400)).await.is_none());
    assert_eq!(common::generate_calls(&server).await, 1);

    // A new function is a significant, incremental change
    assert_eq!(
        engine.on_content_changed("a.py", A_PY_V2),
        ChangeDisposition::ScheduledIncremental
    );
    let second = next(&mut rx, Duration::from_secs(5)).await.unwrap();
    assert_eq!(second.task, TaskType::IncrementalAnalysis);
    assert_eq!(common::generate_calls(&server).await, 2);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests.last().unwrap().body).unwrap();
    assert!(body["prompt"].as_str().unwrap().contains("+ def helper():"));

    engine.shutdown().await;
}

#[tokio::test]
async fn test_rapid_edits_coalesce_into_one_request() {
    let server = MockServer::start().await;
    common::mount_tags(&server, Duration::ZERO).await;
    common::mount_generate(&server, "ok").await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::test_config(&server.uri(), dir.path());
    config.analysis.incremental_debounce_ms = 300;

    let (sink, mut rx) = ChannelSink::new();
    let engine = AnalysisEngine::start(&config, Arc::new(sink)).unwrap();
    engine.on_content_changed("a.py", A_PY_V1);
    next(&mut rx, Duration::from_secs(5)).await.unwrap();

    for i in 0..5 {
        let content = format!("{}\ndef step_{}():\n    return {}\n", A_PY_V1, i, i);
        engine.on_content_changed("a.py", &content);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let outcome = next(&mut rx, Duration::from_secs(5)).await.unwrap();
    assert_eq!(outcome.task, TaskType::IncrementalAnalysis);
    assert!(next(&mut rx, Duration::from_millis(600)).await.is_none());
    assert_eq!(common::generate_calls(&server).await, 2);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests.last().unwrap().body).unwrap();
    assert!(body["prompt"].as_str().unwrap().contains("step_4"));

    engine.shutdown().await;
}

#[tokio::test]
async fn test_statistics_survive_a_restart() {
    let server = MockServer::start().await;
    common::mount_tags(&server, Duration::ZERO).await;
    common::mount_generate(&server, "fine").await;
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(&server.uri(), dir.path());

    let (sink, _rx) = ChannelSink::new();
    let engine = AnalysisEngine::start(&config, Arc::new(sink)).unwrap();
    let outcome = engine
        .analyze_performance("for x in xs:\n    ys.append(x)\n", "py")
        .await
        .unwrap();
    assert!(outcome.is_success());
    engine.shutdown().await;

    let stored = PerformanceStore::new(dir.path().join("performance.json"))
        .load()
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].task_type, "performance_analysis");
    assert_eq!(stored[0].backend, outcome.served_by);

    let (sink, _rx) = ChannelSink::new();
    let restarted = AnalysisEngine::start(&config, Arc::new(sink)).unwrap();
    assert_eq!(restarted.stats(), stored);
    restarted.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_primary_without_secondary_fails_once() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::test_config(&url, dir.path());
    config.persistence.enabled = false;

    let (sink, mut rx) = ChannelSink::new();
    let engine = AnalysisEngine::start(&config, Arc::new(sink)).unwrap();
    engine.on_content_changed("main.cpp", "#include <vector>\nint main() { return 0; }\n");

    let outcome = next(&mut rx, Duration::from_secs(5)).await.unwrap();
    assert_eq!(outcome.state, PipelineState::Failed);
    assert_eq!(outcome.result.unwrap_err().kind(), "unreachable");
    assert!(next(&mut rx, Duration::from_millis(300)).await.is_none());

    engine.shutdown().await;
}
