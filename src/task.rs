//! Analysis task types and their prompt templates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of analysis requested from a backend.
///
/// Each variant owns its prompt template; statistics are kept per task type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Whole-file review after a first sighting or a quiet period
    RealtimeAnalysis,
    /// Review of the changed lines only
    IncrementalAnalysis,
    /// Bottleneck and optimization review
    PerformanceAnalysis,
    /// Unit test generation
    TestGeneration,
    /// Patterns and best practices for the code at hand
    ContextualSuggestions,
}

/// Material a prompt is built from.
#[derive(Debug, Clone, Copy)]
pub struct PromptSubject<'a> {
    /// File the code belongs to, when known
    pub path: Option<&'a str>,
    /// File type or language tag
    pub language: &'a str,
    /// Full source for whole-file tasks, rendered diff for incremental ones
    pub body: &'a str,
}

impl TaskType {
    pub const ALL: [TaskType; 5] = [
        TaskType::RealtimeAnalysis,
        TaskType::IncrementalAnalysis,
        TaskType::PerformanceAnalysis,
        TaskType::TestGeneration,
        TaskType::ContextualSuggestions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::RealtimeAnalysis => "realtime_analysis",
            TaskType::IncrementalAnalysis => "incremental_analysis",
            TaskType::PerformanceAnalysis => "performance_analysis",
            TaskType::TestGeneration => "test_generation",
            TaskType::ContextualSuggestions => "contextual_suggestions",
        }
    }

    /// Score bonus for a backend that lists this task among its strengths.
    pub fn affinity_boost(&self) -> f64 {
        match self {
            TaskType::RealtimeAnalysis | TaskType::IncrementalAnalysis => 0.05,
            TaskType::PerformanceAnalysis
            | TaskType::TestGeneration
            | TaskType::ContextualSuggestions => 0.1,
        }
    }

    /// Whether the answer is expected as `{"suggestions": [...]}` JSON.
    pub fn expects_suggestions(&self) -> bool {
        matches!(
            self,
            TaskType::RealtimeAnalysis | TaskType::IncrementalAnalysis
        )
    }

    pub fn build_prompt(&self, subject: &PromptSubject<'_>) -> String {
        let path = subject.path.unwrap_or("<unsaved>");
        match self {
            TaskType::RealtimeAnalysis => format!(
                "REALTIME CODE ANALYSIS:\n\
                 File: {path}\n\
                 Analyze this code for immediate issues and provide quick suggestions.\n\
                 Focus on: syntax errors, potential bugs, optimization opportunities.\n\
                 Respond with JSON format: {{\"suggestions\": [{{\"type\": \"error|warning|suggestion\", \
                 \"description\": \"...\", \"lineNumber\": 0, \"fixedCode\": \"...\", \"confidence\": 0.95}}]}}\n\n\
                 CODE:\n{body}",
                body = subject.body
            ),
            TaskType::IncrementalAnalysis => format!(
                "INCREMENTAL CODE ANALYSIS:\n\
                 File: {path}\n\
                 Analyze only the following code changes for quick feedback.\n\
                 Focus on: syntax issues in changed lines, immediate logical errors, type mismatches.\n\
                 Provide fast, targeted suggestions only for the modified parts.\n\
                 Respond with JSON: {{\"suggestions\": [{{\"type\": \"error|warning|info\", \
                 \"description\": \"...\", \"lineNumber\": 0, \"confidence\": 0.95}}]}}\n\n\
                 CHANGES:\n{body}",
                body = subject.body
            ),
            TaskType::PerformanceAnalysis => format!(
                "PERFORMANCE ANALYSIS for {language}:\n\
                 Analyze this code for performance bottlenecks and optimization opportunities.\n\
                 Focus on: algorithmic complexity, memory usage, I/O operations, parallel processing.\n\
                 Provide specific optimization recommendations with code examples.\n\n\
                 CODE:\n{body}",
                language = subject.language,
                body = subject.body
            ),
            TaskType::TestGeneration => format!(
                "GENERATE COMPREHENSIVE TESTS for {language}:\n\
                 Create unit tests that cover:\n\
                 - Normal operation cases\n\
                 - Edge cases and boundary conditions\n\
                 - Error conditions and exception handling\n\
                 - Performance edge cases\n\
                 Use appropriate testing framework for {language}.\n\n\
                 CODE TO TEST:\n{body}",
                language = subject.language,
                body = subject.body
            ),
            TaskType::ContextualSuggestions => format!(
                "CONTEXTUAL SUGGESTIONS for {language}:\n\
                 Based on the current code context, suggest improvements, common patterns, \
                 and best practices specific to {language} development.\n\
                 Consider: design patterns, performance, readability, maintainability.\n\n\
                 CODE:\n{body}",
                language = subject.language,
                body = subject.body
            ),
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "realtime" | "realtime_analysis" => Ok(TaskType::RealtimeAnalysis),
            "incremental" | "incremental_analysis" => Ok(TaskType::IncrementalAnalysis),
            "performance" | "performance_analysis" => Ok(TaskType::PerformanceAnalysis),
            "tests" | "test_generation" => Ok(TaskType::TestGeneration),
            "contextual" | "contextual_suggestions" => Ok(TaskType::ContextualSuggestions),
            _ => Err(format!("Invalid task type: {}", s)),
        }
    }
}
