//! Response decoding
//!
//! Backends answer in one of three shapes: a single JSON envelope with a
//! `response` field, newline-delimited streaming chunks each carrying a
//! `response` fragment, or plain text. The answer text may in turn hold a
//! `{"suggestions": [...]}` document; anything else becomes a single
//! informational suggestion.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence given to free-text answers
pub const FREE_TEXT_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Error,
    Warning,
    Suggestion,
    Info,
}

impl SuggestionKind {
    /// Unknown labels are treated as informational.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "error" => SuggestionKind::Error,
            "warning" => SuggestionKind::Warning,
            "suggestion" => SuggestionKind::Suggestion,
            _ => SuggestionKind::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionKind::Error => "error",
            SuggestionKind::Warning => "warning",
            SuggestionKind::Suggestion => "suggestion",
            SuggestionKind::Info => "info",
        }
    }
}

impl fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One actionable finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSuggestion {
    pub kind: SuggestionKind,
    pub description: String,
    /// Replacement snippet, when the backend offered one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_code: Option<String>,
    /// 1-based line, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    /// 0.0..=1.0
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// Final text and the suggestions parsed from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub text: String,
    pub suggestions: Vec<CodeSuggestion>,
}

#[derive(Deserialize)]
struct Envelope {
    response: String,
}

#[derive(Deserialize)]
struct SuggestionDocument {
    suggestions: Vec<RawSuggestion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSuggestion {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    fixed_code: Option<String>,
    #[serde(default)]
    line_number: Option<i64>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Pull the answer text out of a raw response body.
pub fn extract_answer(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(envelope) = serde_json::from_str::<Envelope>(trimmed) {
        return envelope.response;
    }

    let mut fragments = Vec::new();
    for line in trimmed.lines().filter(|l| !l.trim().is_empty()) {
        match serde_json::from_str::<Envelope>(line) {
            Ok(chunk) => fragments.push(chunk.response),
            Err(_) => return body.to_string(),
        }
    }
    if fragments.is_empty() {
        return body.to_string();
    }
    fragments.concat()
}

/// Parse suggestions from answer text, falling back to one info entry.
pub fn parse_suggestions(answer: &str, file_path: Option<&str>) -> Vec<CodeSuggestion> {
    match find_document(answer) {
        Some(doc) => doc
            .suggestions
            .into_iter()
            .filter(|s| !s.description.trim().is_empty())
            .map(|s| CodeSuggestion {
                kind: SuggestionKind::parse(&s.kind),
                description: s.description,
                fixed_code: s.fixed_code.filter(|c| !c.is_empty()),
                line_number: s
                    .line_number
                    .filter(|n| *n > 0)
                    .and_then(|n| u32::try_from(n).ok()),
                confidence: s.confidence.unwrap_or(FREE_TEXT_CONFIDENCE).clamp(0.0, 1.0),
                file_path: file_path.map(str::to_string),
            })
            .collect(),
        None => vec![free_text(answer, file_path)],
    }
}

fn free_text(answer: &str, file_path: Option<&str>) -> CodeSuggestion {
    CodeSuggestion {
        kind: SuggestionKind::Info,
        description: answer.trim().to_string(),
        fixed_code: None,
        line_number: None,
        confidence: FREE_TEXT_CONFIDENCE,
        file_path: file_path.map(str::to_string),
    }
}

/// Decode the answer text into a result; an empty answer is an error.
///
/// Only `structured` answers are searched for a suggestions document.
pub fn decode(body: &str, file_path: Option<&str>, structured: bool) -> Option<AnalysisResult> {
    let text = extract_answer(body);
    if text.trim().is_empty() {
        return None;
    }
    let suggestions = if structured {
        parse_suggestions(&text, file_path)
    } else {
        vec![free_text(&text, file_path)]
    };
    Some(AnalysisResult { text, suggestions })
}

// Models often wrap the JSON document in prose or code fences.
fn find_document(answer: &str) -> Option<SuggestionDocument> {
    let trimmed = answer.trim();
    if let Ok(doc) = serde_json::from_str::<SuggestionDocument>(trimmed) {
        return Some(doc);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<SuggestionDocument>(&trimmed[start..=end]).ok()
}
