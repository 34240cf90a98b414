//! Outcome delivery

use crate::pipeline::{AnalysisError, AnalysisOutcome, AnalysisResult};
use tokio::sync::mpsc;

/// Receives the single terminal notification for each analyzed change.
pub trait AnalysisSink: Send + Sync + 'static {
    fn on_analysis_result(&self, outcome: &AnalysisOutcome, result: &AnalysisResult);

    fn on_analysis_error(&self, outcome: &AnalysisOutcome, error: &AnalysisError);
}

/// Route an outcome to the matching sink callback.
pub fn deliver(sink: &dyn AnalysisSink, outcome: &AnalysisOutcome) {
    match &outcome.result {
        Ok(result) => sink.on_analysis_result(outcome, result),
        Err(error) => sink.on_analysis_error(outcome, error),
    }
}

/// Forwards every outcome over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<AnalysisOutcome>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AnalysisOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, outcome: &AnalysisOutcome) {
        if self.tx.send(outcome.clone()).is_err() {
            tracing::debug!(request_id = %outcome.request_id, "Outcome receiver dropped");
        }
    }
}

impl AnalysisSink for ChannelSink {
    fn on_analysis_result(&self, outcome: &AnalysisOutcome, _result: &AnalysisResult) {
        self.forward(outcome);
    }

    fn on_analysis_error(&self, outcome: &AnalysisOutcome, _error: &AnalysisError) {
        self.forward(outcome);
    }
}

/// Sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl AnalysisSink for LogSink {
    fn on_analysis_result(&self, outcome: &AnalysisOutcome, result: &AnalysisResult) {
        tracing::info!(
            request_id = %outcome.request_id,
            suggestions = result.suggestions.len(),
            "Analysis delivered"
        );
    }

    fn on_analysis_error(&self, outcome: &AnalysisOutcome, error: &AnalysisError) {
        tracing::warn!(
            request_id = %outcome.request_id,
            error = %error.user_message(),
            "Analysis error delivered"
        );
    }
}
