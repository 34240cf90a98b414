//! Fallback request pipeline
//!
//! Every routed request runs through one state machine:
//!
//! ```text
//! Idle -> ProbingPrimary -> Connected ----------> AwaitingResponse -> Completed | Failed
//!                        \-> StartingSecondary -/
//! ```
//!
//! The primary endpoint is probed first. When it does not answer, the
//! secondary serving process is launched, given a grace period, and the
//! request is tried once more. A connection that drops mid-request on the
//! direct path gets the same single retry. One global deadline covers the
//! whole run; whichever of the run and the deadline finishes first settles
//! the request, and only that outcome is recorded and delivered.

pub mod error;
pub mod response;
pub mod state;

pub use error::AnalysisError;
pub use response::{AnalysisResult, CodeSuggestion, SuggestionKind};
pub use state::{PipelineState, RunTrace};

use crate::agent::{AgentError, GenerateRequest, InferenceAgent, SamplingOptions, SecondaryLauncher};
use crate::config::LensConfig;
use crate::logging::{path_field, preview};
use crate::router::PendingRequest;
use crate::state::SharedState;
use crate::task::TaskType;
use crate::telemetry;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

/// Timing and sampling knobs for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub primary_url: String,
    pub probe_timeout: Duration,
    pub grace: Duration,
    pub global_timeout: Duration,
    pub sampling: SamplingOptions,
    /// Log answer previews of this many characters
    pub preview_chars: Option<usize>,
}

impl PipelineSettings {
    pub fn from_config(config: &LensConfig) -> Self {
        Self {
            primary_url: config.primary.url.clone(),
            probe_timeout: config.primary.probe_timeout(),
            grace: config.secondary.grace(),
            global_timeout: config.pipeline.global_timeout(),
            sampling: SamplingOptions::from(&config.primary),
            preview_chars: config
                .logging
                .enable_content_logging
                .then_some(config.logging.preview_chars),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&LensConfig::default())
    }
}

/// Terminal outcome of one request.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub request_id: Uuid,
    pub task: TaskType,
    pub path: Option<String>,
    /// Backend the router picked
    pub routed_to: String,
    /// Backend the outcome was recorded against
    pub served_by: String,
    pub state: PipelineState,
    pub trace: Vec<PipelineState>,
    pub elapsed_ms: u64,
    #[serde(serialize_with = "serialize_result")]
    pub result: Result<AnalysisResult, AnalysisError>,
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

fn serialize_result<S: serde::Serializer>(
    result: &Result<AnalysisResult, AnalysisError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(1))?;
    match result {
        Ok(r) => map.serialize_entry("ok", r)?,
        Err(e) => map.serialize_entry("error", &e.to_string())?,
    }
    map.end()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FallbackReason {
    /// The probe failed
    Unreachable,
    /// The direct request lost its connection
    Dropped,
}

pub struct FallbackPipeline {
    agent: Arc<dyn InferenceAgent>,
    launcher: Arc<dyn SecondaryLauncher>,
    state: SharedState,
    settings: PipelineSettings,
    in_flight: TaskTracker,
}

impl FallbackPipeline {
    pub fn new(
        agent: Arc<dyn InferenceAgent>,
        launcher: Arc<dyn SecondaryLauncher>,
        state: SharedState,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            agent,
            launcher,
            state,
            settings,
            in_flight: TaskTracker::new(),
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run a request on its own task; the receiver yields its single outcome.
    ///
    /// The sender is dropped without a value when something else settled the
    /// request first.
    pub fn submit(self: &Arc<Self>, request: PendingRequest) -> oneshot::Receiver<AnalysisOutcome> {
        let (tx, rx) = oneshot::channel();
        let pipeline = Arc::clone(self);
        self.in_flight.spawn(async move {
            if let Some(outcome) = pipeline.execute(request).await {
                let _ = tx.send(outcome);
            }
        });
        rx
    }

    /// Wait for every submitted request to settle and record its outcome.
    ///
    /// Bounded by the global timeout. Requests submitted afterwards still run.
    pub async fn drain(&self) {
        let pending = self.in_flight.len();
        if pending > 0 {
            tracing::debug!(pending, "Waiting for in-flight requests");
        }
        self.in_flight.close();
        self.in_flight.wait().await;
        self.in_flight.reopen();
    }

    /// Drive a request to its terminal state.
    ///
    /// Returns None when the request was settled elsewhere (its token was
    /// cancelled) before the pipeline finished.
    pub async fn execute(&self, request: PendingRequest) -> Option<AnalysisOutcome> {
        let started = Instant::now();
        let trace = RunTrace::new(&request.backend);
        let token = request.cancel_token();

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            r = tokio::time::timeout(self.settings.global_timeout, self.run(&request, &trace)) => Some(r),
        };

        let result = match result {
            None => {
                self.state.lock().scorer.end_request(&request.backend);
                tracing::debug!(request_id = %request.id, "Request settled elsewhere");
                return None;
            }
            Some(Ok(result)) => result,
            Some(Err(_)) => Err(AnalysisError::Timeout {
                seconds: self.settings.global_timeout.as_secs(),
            }),
        };

        if !request.settle() {
            self.state.lock().scorer.end_request(&request.backend);
            return None;
        }

        let terminal = match &result {
            Ok(_) => PipelineState::Completed,
            Err(AnalysisError::Timeout { .. }) => PipelineState::TimedOut,
            Err(_) => PipelineState::Failed,
        };
        trace.enter(terminal);

        let elapsed = started.elapsed();
        let served_by = trace.backend();
        {
            let mut state = self.state.lock();
            state.scorer.end_request(&request.backend);
            state.scorer.record_outcome(
                &served_by,
                request.task,
                elapsed.as_secs_f64() * 1000.0,
                result.is_ok(),
                Utc::now(),
            );
        }
        telemetry::record_request(&served_by, request.task.as_str(), terminal.as_str(), elapsed);

        match &result {
            Ok(analysis) => {
                tracing::info!(
                    request_id = %request.id,
                    task_type = %request.task,
                    backend = %served_by,
                    path = path_field(request.path.as_deref()),
                    elapsed_ms = elapsed.as_millis() as u64,
                    suggestions = analysis.suggestions.len(),
                    "Analysis completed"
                );
                if let Some(limit) = self.settings.preview_chars {
                    tracing::debug!(
                        request_id = %request.id,
                        answer_preview = %preview(&analysis.text, limit),
                        "Answer preview"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %request.id,
                    task_type = %request.task,
                    backend = %served_by,
                    path = path_field(request.path.as_deref()),
                    elapsed_ms = elapsed.as_millis() as u64,
                    error_kind = e.kind(),
                    error = %e,
                    "Analysis failed"
                );
            }
        }

        Some(AnalysisOutcome {
            request_id: request.id,
            task: request.task,
            path: request.path.clone(),
            routed_to: request.backend.clone(),
            served_by,
            state: terminal,
            trace: trace.states(),
            elapsed_ms: elapsed.as_millis() as u64,
            result,
        })
    }

    async fn run(
        &self,
        request: &PendingRequest,
        trace: &RunTrace,
    ) -> Result<AnalysisResult, AnalysisError> {
        trace.enter(PipelineState::ProbingPrimary);
        let probe = self.agent.health_check(self.settings.probe_timeout).await;

        let detail = match probe {
            Ok(status) if status.is_healthy() => {
                trace.enter(PipelineState::Connected);
                trace.enter(PipelineState::AwaitingResponse);
                match self.agent.generate(self.generate_request(&request.backend, request)).await {
                    Ok(body) => return self.decode(body, request),
                    Err(AgentError::Upstream { status, message }) => {
                        return Err(AnalysisError::Upstream { status, message })
                    }
                    Err(e) => {
                        tracing::warn!(
                            request_id = %request.id,
                            error = %e,
                            "Direct request dropped, retrying through secondary path"
                        );
                        return self.via_secondary(request, trace, FallbackReason::Dropped, e.to_string()).await;
                    }
                }
            }
            Ok(_) => "probe returned an error status".to_string(),
            Err(e) => e.to_string(),
        };

        tracing::info!(
            request_id = %request.id,
            url = %self.agent.base_url(),
            reason = %detail,
            "Primary endpoint unreachable, starting secondary"
        );
        self.via_secondary(request, trace, FallbackReason::Unreachable, detail)
            .await
    }

    async fn via_secondary(
        &self,
        request: &PendingRequest,
        trace: &RunTrace,
        reason: FallbackReason,
        detail: String,
    ) -> Result<AnalysisResult, AnalysisError> {
        trace.enter(PipelineState::StartingSecondary);

        let server = match self.launcher.launch(&request.backend).await {
            Ok(server) => {
                telemetry::record_secondary_start(true);
                Some(server)
            }
            Err(e) => {
                telemetry::record_secondary_start(false);
                tracing::warn!(
                    request_id = %request.id,
                    error = %e,
                    "Secondary launch failed, retrying anyway"
                );
                None
            }
        };

        let model = server
            .as_ref()
            .map(|s| s.served_model.clone())
            .unwrap_or_else(|| request.backend.clone());
        trace.set_backend(&model);

        if !server.as_ref().is_some_and(|s| s.is_reused()) {
            tokio::time::sleep(self.settings.grace).await;
        }

        trace.enter(PipelineState::AwaitingResponse);
        let result = self.agent.generate(self.generate_request(&model, request)).await;

        // A process that answered at all keeps running for later requests
        if matches!(result, Ok(_) | Err(AgentError::Upstream { .. })) {
            if let Some(server) = server {
                self.launcher.adopt(server);
            }
        }

        match result {
            Ok(body) => self.decode(body, request),
            Err(AgentError::Upstream { status, message }) => {
                Err(AnalysisError::Upstream { status, message })
            }
            Err(e) => Err(match reason {
                FallbackReason::Unreachable => AnalysisError::UnreachablePrimary {
                    url: self.settings.primary_url.clone(),
                    detail: format!("{}; after fallback: {}", detail, e),
                },
                FallbackReason::Dropped => AnalysisError::Transport(e.to_string()),
            }),
        }
    }

    fn generate_request(&self, model: &str, request: &PendingRequest) -> GenerateRequest {
        GenerateRequest {
            model: model.to_string(),
            prompt: request.prompt.clone(),
            options: self.settings.sampling,
        }
    }

    fn decode(&self, body: String, request: &PendingRequest) -> Result<AnalysisResult, AnalysisError> {
        response::decode(&body, request.path.as_deref(), request.task.expects_suggestions())
            .ok_or(AnalysisError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{HealthStatus, LaunchedServer};
    use crate::config::BackendConfig;
    use crate::scoring::{BackendScorer, Priority, ScoringWeights};
    use crate::significance::SignificanceClassifier;
    use crate::state::RouterState;
    use crate::tracker::ChangeTracker;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedAgent {
        probe: Result<HealthStatus, AgentError>,
        probe_delay: Duration,
        replies: Mutex<VecDeque<Result<String, AgentError>>>,
        reply_delay: Duration,
        models: Mutex<Vec<String>>,
    }

    impl ScriptedAgent {
        fn new(probe: Result<HealthStatus, AgentError>, replies: Vec<Result<String, AgentError>>) -> Self {
            Self {
                probe,
                probe_delay: Duration::ZERO,
                replies: Mutex::new(replies.into()),
                reply_delay: Duration::ZERO,
                models: Mutex::new(Vec::new()),
            }
        }

        fn healthy(replies: Vec<Result<String, AgentError>>) -> Self {
            Self::new(Ok(HealthStatus::Healthy { model_count: 1 }), replies)
        }

        fn models(&self) -> Vec<String> {
            self.models.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InferenceAgent for ScriptedAgent {
        fn id(&self) -> &str {
            "scripted"
        }

        fn name(&self) -> &str {
            "Scripted agent"
        }

        fn base_url(&self) -> &str {
            "http://scripted"
        }

        async fn health_check(&self, timeout: Duration) -> Result<HealthStatus, AgentError> {
            if self.probe_delay >= timeout {
                tokio::time::sleep(timeout).await;
                return Err(AgentError::Timeout(timeout.as_millis() as u64));
            }
            tokio::time::sleep(self.probe_delay).await;
            self.probe.clone()
        }

        async fn generate(&self, request: GenerateRequest) -> Result<String, AgentError> {
            self.models.lock().unwrap().push(request.model.clone());
            tokio::time::sleep(self.reply_delay).await;
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AgentError::Network("connection refused".into())))
        }
    }

    #[derive(Default)]
    struct CountingLauncher {
        served_model: Option<String>,
        fail: bool,
        launches: AtomicUsize,
        adopted: AtomicUsize,
    }

    #[async_trait]
    impl SecondaryLauncher for CountingLauncher {
        async fn launch(&self, model: &str) -> Result<LaunchedServer, AgentError> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AgentError::Launch("no such binary".into()));
            }
            Ok(LaunchedServer::started(
                self.served_model.clone().unwrap_or_else(|| model.to_string()),
                None,
            ))
        }

        fn adopt(&self, _server: LaunchedServer) {
            self.adopted.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn shared_state() -> SharedState {
        RouterState::new(
            ChangeTracker::new(8),
            SignificanceClassifier::default(),
            BackendScorer::new(
                vec![BackendConfig::new("ollama/codellama:7b", 0.85, 0.8)],
                ScoringWeights::default(),
            ),
        )
        .into_shared()
    }

    fn pending(state: &SharedState) -> PendingRequest {
        state.lock().scorer.begin_request("ollama/codellama:7b");
        PendingRequest::new(
            TaskType::RealtimeAnalysis,
            "py",
            Priority::Speed,
            "ollama/codellama:7b",
            "REALTIME CODE ANALYSIS",
            Some("a.py".into()),
        )
    }

    fn pipeline(
        agent: Arc<ScriptedAgent>,
        launcher: Arc<CountingLauncher>,
        state: SharedState,
    ) -> FallbackPipeline {
        FallbackPipeline::new(agent, launcher, state, PipelineSettings::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_reachable_primary_completes_directly() {
        let state = shared_state();
        let agent = Arc::new(ScriptedAgent::healthy(vec![Ok(
            r#"{"response":"{\"suggestions\":[{\"type\":\"warning\",\"description\":\"shadowed name\",\"lineNumber\":2}]}","done":true}"#.to_string(),
        )]));
        let launcher = Arc::new(CountingLauncher::default());
        let p = pipeline(agent, launcher.clone(), state.clone());

        let outcome = p.execute(pending(&state)).await.unwrap();
        assert_eq!(outcome.state, PipelineState::Completed);
        assert_eq!(
            outcome.trace,
            vec![
                PipelineState::Idle,
                PipelineState::ProbingPrimary,
                PipelineState::Connected,
                PipelineState::AwaitingResponse,
                PipelineState::Completed
            ]
        );
        let result = outcome.result.unwrap();
        assert_eq!(result.suggestions[0].kind, SuggestionKind::Warning);
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 0);

        let guard = state.lock();
        let record = guard
            .scorer
            .record("ollama/codellama:7b", TaskType::RealtimeAnalysis)
            .unwrap();
        assert_eq!(record.usage_count, 1);
        assert_eq!(record.success_rate, 1.0);
        assert_eq!(guard.scorer.profile("ollama/codellama:7b").unwrap().in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout_falls_back_and_records_serving_backend() {
        let state = shared_state();
        let mut agent = ScriptedAgent::healthy(vec![Ok("Use a dict lookup.".to_string())]);
        agent.probe_delay = Duration::from_secs(60);
        let agent = Arc::new(agent);
        let launcher = Arc::new(CountingLauncher {
            served_model: Some("ollama/phi3:mini".into()),
            ..Default::default()
        });
        let p = pipeline(agent.clone(), launcher.clone(), state.clone());

        let started = tokio::time::Instant::now();
        let outcome = p.execute(pending(&state)).await.unwrap();

        assert_eq!(outcome.state, PipelineState::Completed);
        assert!(outcome.trace.contains(&PipelineState::StartingSecondary));
        assert!(!outcome.trace.contains(&PipelineState::Connected));
        assert_eq!(outcome.served_by, "ollama/phi3:mini");
        assert_eq!(outcome.routed_to, "ollama/codellama:7b");
        assert_eq!(outcome.result.unwrap().text, "Use a dict lookup.");
        // 5 s probe timeout + 3 s grace
        assert!(started.elapsed() >= Duration::from_secs(8));
        assert_eq!(agent.models(), vec!["ollama/phi3:mini".to_string()]);
        assert_eq!(launcher.adopted.load(Ordering::SeqCst), 1);

        let guard = state.lock();
        assert!(guard
            .scorer
            .record("ollama/phi3:mini", TaskType::RealtimeAnalysis)
            .is_some_and(|r| r.success_rate == 1.0));
        assert!(guard
            .scorer
            .record("ollama/codellama:7b", TaskType::RealtimeAnalysis)
            .is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_failure_still_retries() {
        let state = shared_state();
        let agent = Arc::new(ScriptedAgent::new(
            Err(AgentError::Network("connection refused".into())),
            vec![Ok("fine".to_string())],
        ));
        let launcher = Arc::new(CountingLauncher {
            fail: true,
            ..Default::default()
        });
        let p = pipeline(agent.clone(), launcher.clone(), state.clone());

        let outcome = p.execute(pending(&state)).await.unwrap();
        assert_eq!(outcome.state, PipelineState::Completed);
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.served_by, "ollama/codellama:7b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_everywhere_fails_once() {
        let state = shared_state();
        let agent = Arc::new(ScriptedAgent::new(
            Err(AgentError::Network("connection refused".into())),
            vec![],
        ));
        let launcher = Arc::new(CountingLauncher::default());
        let p = pipeline(agent.clone(), launcher, state.clone());

        let outcome = p.execute(pending(&state)).await.unwrap();
        assert_eq!(outcome.state, PipelineState::Failed);
        assert!(matches!(
            outcome.result,
            Err(AnalysisError::UnreachablePrimary { .. })
        ));
        assert_eq!(agent.models().len(), 1);
        let guard = state.lock();
        let record = guard
            .scorer
            .record("ollama/codellama:7b", TaskType::RealtimeAnalysis)
            .unwrap();
        assert_eq!(record.success_rate, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_connection_retries_through_secondary() {
        let state = shared_state();
        let agent = Arc::new(ScriptedAgent::healthy(vec![
            Err(AgentError::Network("connection reset".into())),
            Ok(r#"{"response":"recovered"}"#.to_string()),
        ]));
        let launcher = Arc::new(CountingLauncher::default());
        let p = pipeline(agent.clone(), launcher.clone(), state.clone());

        let outcome = p.execute(pending(&state)).await.unwrap();
        assert_eq!(outcome.state, PipelineState::Completed);
        assert_eq!(outcome.result.unwrap().text, "recovered");
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
        assert_eq!(agent.models().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_connection_twice_is_transport_error() {
        let state = shared_state();
        let agent = Arc::new(ScriptedAgent::healthy(vec![
            Err(AgentError::Network("connection reset".into())),
            Err(AgentError::Network("connection reset".into())),
        ]));
        let p = pipeline(agent.clone(), Arc::new(CountingLauncher::default()), state.clone());

        let outcome = p.execute(pending(&state)).await.unwrap();
        assert!(matches!(outcome.result, Err(AnalysisError::Transport(_))));
        assert_eq!(agent.models().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_fails_without_retry() {
        let state = shared_state();
        let agent = Arc::new(ScriptedAgent::healthy(vec![Err(AgentError::Upstream {
            status: 500,
            message: "boom".into(),
        })]));
        let launcher = Arc::new(CountingLauncher::default());
        let p = pipeline(agent.clone(), launcher.clone(), state.clone());

        let outcome = p.execute(pending(&state)).await.unwrap();
        let err = outcome.result.unwrap_err();
        assert_eq!(
            err,
            AnalysisError::Upstream {
                status: 500,
                message: "boom".into()
            }
        );
        assert!(err.user_message().starts_with("Server error (500)"));
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 0);
        assert_eq!(agent.models().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_answer_is_a_failure() {
        let state = shared_state();
        let agent = Arc::new(ScriptedAgent::healthy(vec![Ok(
            r#"{"response":"","done":true}"#.to_string(),
        )]));
        let p = pipeline(agent, Arc::new(CountingLauncher::default()), state.clone());

        let outcome = p.execute(pending(&state)).await.unwrap();
        assert_eq!(outcome.result.unwrap_err(), AnalysisError::EmptyResponse);
        assert_eq!(outcome.state, PipelineState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_global_timeout_beats_late_success() {
        let state = shared_state();
        let mut agent = ScriptedAgent::healthy(vec![Ok("too late".to_string())]);
        agent.reply_delay = Duration::from_secs(600);
        let p = Arc::new(pipeline(
            Arc::new(agent),
            Arc::new(CountingLauncher::default()),
            state.clone(),
        ));

        let request = pending(&state);
        let token = request.cancel_token();
        let rx = p.submit(request);
        let outcome = rx.await.unwrap();

        assert_eq!(outcome.state, PipelineState::TimedOut);
        assert_eq!(outcome.result, Err(AnalysisError::Timeout { seconds: 300 }));
        assert!(token.is_cancelled());
        assert_eq!(outcome.trace.last(), Some(&PipelineState::TimedOut));

        let guard = state.lock();
        let record = guard
            .scorer
            .record("ollama/codellama:7b", TaskType::RealtimeAnalysis)
            .unwrap();
        assert_eq!(record.usage_count, 1);
        assert_eq!(record.success_rate, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_elsewhere_yields_no_outcome() {
        let state = shared_state();
        let agent = Arc::new(ScriptedAgent::healthy(vec![Ok("fine".to_string())]));
        let p = Arc::new(pipeline(agent, Arc::new(CountingLauncher::default()), state.clone()));

        let request = pending(&state);
        assert!(request.settle());
        let rx = p.submit(request);
        assert!(rx.await.is_err());

        let guard = state.lock();
        assert!(guard
            .scorer
            .record("ollama/codellama:7b", TaskType::RealtimeAnalysis)
            .is_none());
        assert_eq!(guard.scorer.profile("ollama/codellama:7b").unwrap().in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_waits_for_submitted_requests() {
        let state = shared_state();
        let agent = Arc::new(ScriptedAgent::healthy(vec![Ok("fine".to_string())]));
        let p = Arc::new(pipeline(agent, Arc::new(CountingLauncher::default()), state.clone()));

        drop(p.submit(pending(&state)));
        p.drain().await;

        let guard = state.lock();
        let record = guard
            .scorer
            .record("ollama/codellama:7b", TaskType::RealtimeAnalysis)
            .unwrap();
        assert_eq!(record.usage_count, 1);
        assert_eq!(guard.scorer.profile("ollama/codellama:7b").unwrap().in_flight(), 0);
    }

    #[test]
    fn test_outcome_serializes_result_variant() {
        let outcome = AnalysisOutcome {
            request_id: Uuid::nil(),
            task: TaskType::TestGeneration,
            path: None,
            routed_to: "ollama/a".into(),
            served_by: "ollama/a".into(),
            state: PipelineState::Failed,
            trace: vec![PipelineState::Idle, PipelineState::Failed],
            elapsed_ms: 5,
            result: Err(AnalysisError::EmptyResponse),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["result"]["error"], "Backend returned an empty response");
    }
}
