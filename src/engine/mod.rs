//! Analysis engine
//!
//! Owns the shared router state and wires the pieces together:
//!
//! ```text
//! on_content_changed -> classify -> debounce (full | incremental)
//!                    -> route -> FallbackPipeline -> AnalysisSink
//! ```
//!
//! Each debounce channel has a dispatcher that routes and submits requests
//! as they fire, and a delivery task that awaits outcomes in submission
//! order. Requests from different channels run concurrently.

pub mod error;
pub mod sink;

pub use error::EngineError;
pub use sink::{deliver, AnalysisSink, ChannelSink, LogSink};

use crate::agent::{DisabledLauncher, InferenceAgent, OllamaAgent, ProcessLauncher, SecondaryLauncher};
use crate::config::LensConfig;
use crate::debounce::{DebounceHandle, Debouncer};
use crate::logging::preview;
use crate::pipeline::{AnalysisOutcome, FallbackPipeline, PipelineSettings};
use crate::router::{RequestRouter, RouteContext};
use crate::scoring::{PerformanceRecord, Priority};
use crate::significance::Delta;
use crate::state::{RouterState, SharedState};
use crate::store::PerformanceStore;
use crate::task::TaskType;
use crate::telemetry;
use chrono::Utc;
use reqwest::Client;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What happened to one edit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDisposition {
    /// Content too short to analyze
    Ignored,
    /// Real-time analysis is switched off
    Disabled,
    /// Identical or below the significance bar
    Insignificant,
    /// First sighting, queued for a whole-file analysis
    ScheduledFull,
    /// Significant edit, queued for an incremental analysis
    ScheduledIncremental,
}

impl ChangeDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeDisposition::Ignored => "ignored",
            ChangeDisposition::Disabled => "disabled",
            ChangeDisposition::Insignificant => "insignificant",
            ChangeDisposition::ScheduledFull => "full",
            ChangeDisposition::ScheduledIncremental => "incremental",
        }
    }

    pub fn is_scheduled(&self) -> bool {
        matches!(
            self,
            ChangeDisposition::ScheduledFull | ChangeDisposition::ScheduledIncremental
        )
    }
}

impl fmt::Display for ChangeDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct AnalysisEngine {
    state: SharedState,
    router: RequestRouter,
    pipeline: Arc<FallbackPipeline>,
    incremental: DebounceHandle<Delta>,
    full: DebounceHandle<Delta>,
    realtime: AtomicBool,
    min_content_len: usize,
    preview_chars: Option<usize>,
    store: Option<PerformanceStore>,
    cancel_token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    store_token: CancellationToken,
    writer: Option<JoinHandle<()>>,
}

impl AnalysisEngine {
    /// Start an engine talking to the configured Ollama endpoint.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &LensConfig, sink: Arc<dyn AnalysisSink>) -> Result<Self, EngineError> {
        let client = Arc::new(Client::new());
        let agent: Arc<dyn InferenceAgent> =
            Arc::new(OllamaAgent::from_config(&config.primary, client));
        let launcher: Arc<dyn SecondaryLauncher> = if config.secondary.enabled {
            Arc::new(ProcessLauncher::from_config(&config.secondary))
        } else {
            Arc::new(DisabledLauncher)
        };
        Self::start_with(config, agent, launcher, sink)
    }

    /// Start an engine with explicit collaborators.
    pub fn start_with(
        config: &LensConfig,
        agent: Arc<dyn InferenceAgent>,
        launcher: Arc<dyn SecondaryLauncher>,
        sink: Arc<dyn AnalysisSink>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let cancel_token = CancellationToken::new();
        let store_token = CancellationToken::new();
        let state = RouterState::from_config(config).into_shared();
        let mut tasks = Vec::new();

        let store = config.persistence.enabled.then(|| {
            let store = PerformanceStore::new(config.persistence.resolve_path());
            let seeded = state.lock().scorer.seed(store.load_or_empty());
            tracing::info!(
                path = %store.path().display(),
                records = seeded,
                "Seeded backend statistics"
            );
            store
        });
        let writer = store.as_ref().map(|store| {
            store.clone().start(
                state.clone(),
                config.persistence.interval(),
                store_token.clone(),
            )
        });

        let preview_chars = config
            .logging
            .enable_content_logging
            .then_some(config.logging.preview_chars);
        let mut router = RequestRouter::new(state.clone());
        if let Some(limit) = preview_chars {
            router = router.with_content_logging(limit);
        }
        let pipeline = Arc::new(FallbackPipeline::new(
            agent,
            launcher,
            state.clone(),
            PipelineSettings::from_config(config),
        ));

        let priority = config.analysis.priority;
        let (debouncer, incremental, incremental_rx) =
            Debouncer::new("incremental", config.analysis.incremental_debounce());
        tasks.push(debouncer.start(cancel_token.clone()));
        let (debouncer, full, full_rx) = Debouncer::new("full", config.analysis.full_debounce());
        tasks.push(debouncer.start(cancel_token.clone()));

        for (channel, rx) in [("incremental", incremental_rx), ("full", full_rx)] {
            tasks.extend(spawn_channel(
                channel,
                rx,
                router.clone(),
                Arc::clone(&pipeline),
                Arc::clone(&sink),
                priority,
                cancel_token.clone(),
            ));
        }

        tracing::info!(
            realtime = config.analysis.realtime_enabled,
            priority = %priority,
            backends = state.lock().scorer.catalog().len(),
            "Analysis engine started"
        );

        Ok(Self {
            state,
            router,
            pipeline,
            incremental,
            full,
            realtime: AtomicBool::new(config.analysis.realtime_enabled),
            min_content_len: config.analysis.min_content_len,
            preview_chars,
            store,
            cancel_token,
            tasks,
            store_token,
            writer,
        })
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn is_realtime_enabled(&self) -> bool {
        self.realtime.load(Ordering::SeqCst)
    }

    /// Handle an edit event. Never blocks on a backend.
    pub fn on_content_changed(&self, path: &str, content: &str) -> ChangeDisposition {
        let disposition = self.classify_change(path, content);
        telemetry::record_change(disposition.as_str());
        if disposition.is_scheduled() {
            tracing::debug!(path, disposition = %disposition, "Analysis scheduled");
        } else {
            tracing::trace!(path, disposition = %disposition, "Content change skipped");
        }
        disposition
    }

    fn classify_change(&self, path: &str, content: &str) -> ChangeDisposition {
        if content.trim().chars().count() < self.min_content_len {
            return ChangeDisposition::Ignored;
        }
        if !self.is_realtime_enabled() {
            return ChangeDisposition::Disabled;
        }

        let delta = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            state
                .classifier
                .classify(&mut state.tracker, path, content, Utc::now())
        };

        if let Some(limit) = self.preview_chars {
            tracing::debug!(path, content_preview = %preview(content, limit), "Edit content");
        }

        if !delta.is_significant {
            return ChangeDisposition::Insignificant;
        }
        if delta.first_sight {
            self.full.push(delta);
            ChangeDisposition::ScheduledFull
        } else {
            self.incremental.push(delta);
            ChangeDisposition::ScheduledIncremental
        }
    }

    /// Stop tracking a closed file.
    pub fn on_file_closed(&self, path: &str) -> bool {
        let forgotten = self.state.lock().tracker.forget(path);
        tracing::debug!(path, forgotten, "File closed");
        forgotten
    }

    /// Switch real-time analysis; switching off drops pending work.
    pub fn set_realtime_enabled(&self, enabled: bool) {
        let previous = self.realtime.swap(enabled, Ordering::SeqCst);
        if !enabled {
            self.incremental.clear();
            self.full.clear();
        }
        if previous != enabled {
            tracing::info!(enabled, "Real-time analysis toggled");
        }
    }

    pub async fn analyze_performance(
        &self,
        code: &str,
        language: &str,
    ) -> Result<AnalysisOutcome, EngineError> {
        self.analyze(TaskType::PerformanceAnalysis, code, language, Priority::Balanced)
            .await
    }

    pub async fn generate_tests(
        &self,
        code: &str,
        language: &str,
    ) -> Result<AnalysisOutcome, EngineError> {
        self.analyze(TaskType::TestGeneration, code, language, Priority::Balanced)
            .await
    }

    pub async fn contextual_suggestions(
        &self,
        code: &str,
        language: &str,
    ) -> Result<AnalysisOutcome, EngineError> {
        self.analyze(TaskType::ContextualSuggestions, code, language, Priority::Balanced)
            .await
    }

    /// Run a direct request and wait for its outcome.
    ///
    /// The outcome goes to the caller, not to the sink.
    pub async fn analyze(
        &self,
        task: TaskType,
        code: &str,
        language: &str,
        priority: Priority,
    ) -> Result<AnalysisOutcome, EngineError> {
        let request = self
            .router
            .route_task(task, code, language, RouteContext::new(priority))?;
        self.pipeline
            .submit(request)
            .await
            .map_err(|_| EngineError::Cancelled)
    }

    /// Current per-(backend, task) statistics.
    pub fn stats(&self) -> Vec<PerformanceRecord> {
        self.state.lock().scorer.snapshot()
    }

    /// Stop background tasks, writing statistics one last time.
    ///
    /// Requests already submitted settle and are recorded before the final
    /// write.
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Engine task ended abnormally");
            }
        }
        self.pipeline.drain().await;

        self.store_token.cancel();
        if let Some(writer) = self.writer {
            if let Err(e) = writer.await {
                tracing::warn!(error = %e, "Statistics writer ended abnormally");
            }
        }
        if let Some(store) = &self.store {
            tracing::debug!(path = %store.path().display(), "Statistics flushed");
        }
        tracing::info!("Analysis engine stopped");
    }
}

/// Dispatcher and in-order delivery for one debounce channel.
fn spawn_channel(
    channel: &'static str,
    mut rx: mpsc::UnboundedReceiver<Delta>,
    router: RequestRouter,
    pipeline: Arc<FallbackPipeline>,
    sink: Arc<dyn AnalysisSink>,
    priority: Priority,
    cancel_token: CancellationToken,
) -> [JoinHandle<()>; 2] {
    let (queue_tx, mut queue_rx) = mpsc::unbounded_channel::<oneshot::Receiver<AnalysisOutcome>>();

    let dispatch_cancel = cancel_token.clone();
    let dispatcher = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = dispatch_cancel.cancelled() => break,
                delta = rx.recv() => {
                    let Some(delta) = delta else { break };
                    match router.route(&delta, RouteContext::new(priority)) {
                        Ok(request) => {
                            if queue_tx.send(pipeline.submit(request)).is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::warn!(
                            channel,
                            path = %delta.path,
                            error = %e,
                            "Could not route change"
                        ),
                    }
                }
            }
        }
    });

    let delivery = tokio::spawn(async move {
        while let Some(pending) = queue_rx.recv().await {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                outcome = pending => match outcome {
                    Ok(outcome) => deliver(sink.as_ref(), &outcome),
                    Err(_) => tracing::debug!(channel, "Request settled without an outcome"),
                },
            }
        }
    });

    [dispatcher, delivery]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentError, GenerateRequest, HealthStatus, LaunchedServer};
    use crate::pipeline::PipelineState;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct EchoAgent {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl InferenceAgent for EchoAgent {
        fn id(&self) -> &str {
            "echo"
        }

        fn name(&self) -> &str {
            "Echo agent"
        }

        fn base_url(&self) -> &str {
            "http://echo"
        }

        async fn health_check(&self, _timeout: Duration) -> Result<HealthStatus, AgentError> {
            Ok(HealthStatus::Healthy { model_count: 1 })
        }

        async fn generate(&self, request: GenerateRequest) -> Result<String, AgentError> {
            self.prompts.lock().unwrap().push(request.prompt);
            Ok(r#"{"response":"Looks fine.","done":true}"#.to_string())
        }
    }

    /// Answers after a fixed delay.
    struct SlowAgent(Duration);

    #[async_trait]
    impl InferenceAgent for SlowAgent {
        fn id(&self) -> &str {
            "slow"
        }

        fn name(&self) -> &str {
            "Slow agent"
        }

        fn base_url(&self) -> &str {
            "http://slow"
        }

        async fn health_check(&self, _timeout: Duration) -> Result<HealthStatus, AgentError> {
            Ok(HealthStatus::Healthy { model_count: 1 })
        }

        async fn generate(&self, _request: GenerateRequest) -> Result<String, AgentError> {
            tokio::time::sleep(self.0).await;
            Ok(r#"{"response":"Done.","done":true}"#.to_string())
        }
    }

    struct NoLauncher;

    #[async_trait]
    impl SecondaryLauncher for NoLauncher {
        async fn launch(&self, _model: &str) -> Result<LaunchedServer, AgentError> {
            Err(AgentError::Launch("not available".into()))
        }

        fn adopt(&self, _server: LaunchedServer) {}
    }

    fn engine() -> (
        AnalysisEngine,
        Arc<EchoAgent>,
        mpsc::UnboundedReceiver<AnalysisOutcome>,
    ) {
        let mut config = LensConfig::default();
        config.persistence.enabled = false;
        let agent = Arc::new(EchoAgent::default());
        let (sink, rx) = ChannelSink::new();
        let engine = AnalysisEngine::start_with(
            &config,
            agent.clone(),
            Arc::new(NoLauncher),
            Arc::new(sink),
        )
        .unwrap();
        (engine, agent, rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<AnalysisOutcome>) -> Option<AnalysisOutcome> {
        tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .ok()
            .flatten()
    }

    const A_PY: &str = "def main():\n    print('hello')\n";

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_records_in_flight_requests() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("performance.json");
        let mut config = LensConfig::default();
        config.persistence.path = Some(path.clone());
        let (sink, _rx) = ChannelSink::new();
        let engine = AnalysisEngine::start_with(
            &config,
            Arc::new(SlowAgent(Duration::from_secs(20))),
            Arc::new(NoLauncher),
            Arc::new(sink),
        )
        .unwrap();

        engine.on_content_changed("a.py", A_PY);
        tokio::time::sleep(config.analysis.full_debounce() + Duration::from_secs(1)).await;
        assert!(engine.stats().is_empty());

        engine.shutdown().await;

        let stored = PerformanceStore::new(path).load().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].usage_count, 1);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_at_start() {
        let mut config = LensConfig::default();
        config.persistence.interval_seconds = 0;
        let (sink, _rx) = ChannelSink::new();
        let result = AnalysisEngine::start_with(
            &config,
            Arc::new(EchoAgent::default()),
            Arc::new(NoLauncher),
            Arc::new(sink),
        );
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_edit_runs_full_analysis_once() {
        let (engine, agent, mut rx) = engine();

        assert_eq!(
            engine.on_content_changed("a.py", A_PY),
            ChangeDisposition::ScheduledFull
        );
        let outcome = next(&mut rx).await.unwrap();
        assert_eq!(outcome.task, TaskType::RealtimeAnalysis);
        assert_eq!(outcome.state, PipelineState::Completed);
        assert_eq!(outcome.path.as_deref(), Some("a.py"));

        assert_eq!(
            engine.on_content_changed("a.py", A_PY),
            ChangeDisposition::Insignificant
        );
        assert!(next(&mut rx).await.is_none());
        assert_eq!(agent.prompts.lock().unwrap().len(), 1);

        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_edits_coalesces_to_last() {
        let (engine, agent, mut rx) = engine();
        engine.on_content_changed("a.py", A_PY);
        next(&mut rx).await.unwrap();

        for i in 0..5 {
            let content = format!("{}def helper_{}():\n    return {}\n", A_PY, i, i);
            assert_eq!(
                engine.on_content_changed("a.py", &content),
                ChangeDisposition::ScheduledIncremental
            );
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let outcome = next(&mut rx).await.unwrap();
        assert_eq!(outcome.task, TaskType::IncrementalAnalysis);
        assert!(next(&mut rx).await.is_none());

        let prompts = agent.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("helper_4"));
        drop(prompts);

        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_content_is_ignored() {
        let (engine, _agent, mut rx) = engine();
        assert_eq!(
            engine.on_content_changed("a.py", "x = 1"),
            ChangeDisposition::Ignored
        );
        assert!(next(&mut rx).await.is_none());
        assert!(!engine.state().lock().tracker.contains("a.py"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabling_realtime_drops_pending_work() {
        let (engine, agent, mut rx) = engine();
        engine.on_content_changed("a.py", A_PY);
        engine.set_realtime_enabled(false);

        assert_eq!(
            engine.on_content_changed("b.py", A_PY),
            ChangeDisposition::Disabled
        );
        assert!(next(&mut rx).await.is_none());
        assert!(agent.prompts.lock().unwrap().is_empty());

        engine.set_realtime_enabled(true);
        assert_eq!(
            engine.on_content_changed("b.py", A_PY),
            ChangeDisposition::ScheduledFull
        );
        assert!(next(&mut rx).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_a_file_forgets_it() {
        let (engine, _agent, mut rx) = engine();
        engine.on_content_changed("a.py", A_PY);
        next(&mut rx).await.unwrap();

        assert!(engine.on_file_closed("a.py"));
        assert!(!engine.on_file_closed("a.py"));
        assert_eq!(
            engine.on_content_changed("a.py", A_PY),
            ChangeDisposition::ScheduledFull
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_requests_return_to_caller() {
        let (engine, agent, mut rx) = engine();

        let outcome = engine
            .analyze_performance("for i in range(n):\n    total += i\n", "py")
            .await
            .unwrap();
        assert_eq!(outcome.task, TaskType::PerformanceAnalysis);
        assert!(outcome.is_success());

        let outcome = engine.generate_tests("int add(int a, int b);", "cpp").await.unwrap();
        assert_eq!(outcome.task, TaskType::TestGeneration);

        let outcome = engine
            .contextual_suggestions("class Cache:\n    pass\n", "py")
            .await
            .unwrap();
        assert_eq!(outcome.task, TaskType::ContextualSuggestions);
        assert!(agent
            .prompts
            .lock()
            .unwrap()
            .last()
            .unwrap()
            .starts_with("CONTEXTUAL SUGGESTIONS for py:"));

        assert!(matches!(
            engine.generate_tests("   ", "cpp").await,
            Err(EngineError::Route(_))
        ));
        assert_eq!(agent.prompts.lock().unwrap().len(), 3);
        assert!(next(&mut rx).await.is_none());
        assert_eq!(engine.stats().len(), 3);
    }
}
