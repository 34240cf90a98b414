//! Change significance
//!
//! Turns a new file body into a [`Delta`] against the tracked snapshot and
//! decides whether the change is worth an analysis pass. The decision is a
//! cheap heuristic: structural keywords in the changed lines, or enough
//! changed lines.

use crate::tracker::{content_hash, ChangeTracker, FileAnalysisState};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;

/// One side of a changed line pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Removed(String),
    Added(String),
}

impl DiffLine {
    pub fn text(&self) -> &str {
        match self {
            DiffLine::Removed(s) | DiffLine::Added(s) => s,
        }
    }
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffLine::Removed(s) => write!(f, "- {}", s),
            DiffLine::Added(s) => write!(f, "+ {}", s),
        }
    }
}

/// Outcome of classifying one edit event.
#[derive(Debug, Clone, PartialEq)]
pub struct Delta {
    pub path: String,
    /// Lower-cased extension, empty when the path has none
    pub file_type: String,
    pub lines: Vec<DiffLine>,
    pub is_significant: bool,
    /// The path was not tracked before this event
    pub first_sight: bool,
    pub content: String,
}

impl Delta {
    /// Diff in `- old` / `+ new` form, one entry per line.
    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Keywords whose presence in a changed line marks a structural edit.
pub fn structural_keywords(file_type: &str) -> &'static [&'static str] {
    match file_type {
        "cpp" | "h" | "hpp" | "cc" | "cxx" | "c" => &[
            "class",
            "struct",
            "function",
            "#include",
            "namespace",
            "template",
        ],
        "py" => &["def", "class", "import", "from", "if __name__"],
        "js" | "ts" | "jsx" | "tsx" => &[
            "function", "class", "const", "let", "var", "import", "export",
        ],
        "rs" => &["fn", "struct", "enum", "impl", "trait", "mod", "use"],
        "go" => &["func", "type", "import", "package"],
        "java" | "kt" => &["class", "interface", "import", "package", "fun"],
        _ => &[],
    }
}

pub fn file_type_of(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Pair line i of the old text with line i of the new text.
pub fn positional_diff(old: &str, new: &str) -> Vec<DiffLine> {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let len = old_lines.len().max(new_lines.len());

    let mut out = Vec::new();
    for i in 0..len {
        let before = old_lines.get(i).copied().unwrap_or("");
        let after = new_lines.get(i).copied().unwrap_or("");
        if before == after {
            continue;
        }
        if !before.is_empty() {
            out.push(DiffLine::Removed(before.to_string()));
        }
        if !after.is_empty() {
            out.push(DiffLine::Added(after.to_string()));
        }
    }
    out
}

/// Decides significance and keeps the tracker in step with accepted changes.
#[derive(Debug, Clone)]
pub struct SignificanceClassifier {
    line_threshold: usize,
    snapshot_limit: usize,
}

impl Default for SignificanceClassifier {
    fn default() -> Self {
        Self::new(3, 10_000)
    }
}

impl SignificanceClassifier {
    pub fn new(line_threshold: usize, snapshot_limit: usize) -> Self {
        Self {
            line_threshold,
            snapshot_limit,
        }
    }

    /// Classify new content for a path.
    ///
    /// Unseen paths are registered and always significant. Significant
    /// changes replace the tracked state; anything else leaves it untouched.
    pub fn classify(
        &self,
        tracker: &mut ChangeTracker,
        path: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Delta {
        let file_type = file_type_of(path);

        let previous = match tracker.get(path) {
            Some(state) => state,
            None => {
                tracker.upsert(FileAnalysisState::capture(
                    path,
                    content,
                    self.snapshot_limit,
                    now,
                ));
                return Delta {
                    path: path.to_string(),
                    file_type,
                    lines: Vec::new(),
                    is_significant: true,
                    first_sight: true,
                    content: content.to_string(),
                };
            }
        };

        if previous.last_content_hash == content_hash(content) {
            return Delta {
                path: path.to_string(),
                file_type,
                lines: Vec::new(),
                is_significant: false,
                first_sight: false,
                content: content.to_string(),
            };
        }

        let lines = positional_diff(&previous.snapshot, content);
        let is_significant = self.is_significant(&file_type, &lines);
        if is_significant {
            tracker.upsert(FileAnalysisState::capture(
                path,
                content,
                self.snapshot_limit,
                now,
            ));
        }

        Delta {
            path: path.to_string(),
            file_type,
            lines,
            is_significant,
            first_sight: false,
            content: content.to_string(),
        }
    }

    pub fn is_significant(&self, file_type: &str, lines: &[DiffLine]) -> bool {
        if lines.len() > self.line_threshold {
            return true;
        }
        let keywords = structural_keywords(file_type);
        lines.iter().any(|line| {
            let lower = line.text().to_lowercase();
            keywords.iter().any(|kw| lower.contains(kw))
        })
    }
}
