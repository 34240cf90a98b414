//! Per-file analysis state
//!
//! The tracker remembers, for every file the editor has reported, what was
//! last analyzed: a hash of the whitespace-normalized content, a bounded
//! snapshot used as the diff base, and a few cheap size and complexity
//! measures. Files are evicted least-recently-used once the cache is full.

use chrono::{DateTime, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;

/// Line counts are capped here.
pub const MAX_COUNTED_LINES: usize = 10_000;

const BRANCH_KEYWORDS: [&str; 9] = [
    "if", "else", "for", "while", "switch", "case", "catch", "&&", "||",
];

/// What was last analyzed for one path.
#[derive(Debug, Clone, PartialEq)]
pub struct FileAnalysisState {
    pub path: String,
    /// blake3 hex of the whitespace-normalized content
    pub last_content_hash: String,
    pub last_analyzed_at: DateTime<Utc>,
    pub line_count: usize,
    pub complexity_score: f64,
    /// Diff base, truncated to the snapshot limit
    pub snapshot: String,
}

impl FileAnalysisState {
    pub fn capture(path: &str, content: &str, snapshot_limit: usize, now: DateTime<Utc>) -> Self {
        Self {
            path: path.to_string(),
            last_content_hash: content_hash(content),
            last_analyzed_at: now,
            line_count: count_lines(content),
            complexity_score: complexity_score(content),
            snapshot: truncate_chars(content, snapshot_limit).to_string(),
        }
    }
}

/// Bounded map of path to [`FileAnalysisState`].
#[derive(Debug)]
pub struct ChangeTracker {
    files: LruCache<String, FileAnalysisState>,
}

impl ChangeTracker {
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            files: LruCache::new(capacity),
        }
    }

    /// Look up a path, refreshing its recency.
    pub fn get(&mut self, path: &str) -> Option<&FileAnalysisState> {
        self.files.get(path)
    }

    /// Look up a path without touching recency.
    pub fn peek(&self, path: &str) -> Option<&FileAnalysisState> {
        self.files.peek(path)
    }

    /// Store a state, evicting the least recently used path when full.
    pub fn upsert(&mut self, state: FileAnalysisState) {
        let path = state.path.clone();
        // push hands back either the replaced entry or the evicted one
        if let Some((evicted, _)) = self.files.push(path.clone(), state) {
            if evicted != path {
                tracing::trace!(path = %evicted, "Evicted file analysis state");
            }
        }
    }

    /// Drop a path; returns whether it was tracked.
    pub fn forget(&mut self, path: &str) -> bool {
        self.files.pop(path).is_some()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}

/// Hash of the content with every whitespace run collapsed to one space.
pub fn content_hash(content: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    for (i, word) in content.split_whitespace().enumerate() {
        if i > 0 {
            hasher.update(b" ");
        }
        hasher.update(word.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

pub fn count_lines(content: &str) -> usize {
    content.lines().take(MAX_COUNTED_LINES).count()
}

/// Rough branching complexity: keyword hits plus nesting depth.
pub fn complexity_score(content: &str) -> f64 {
    let lower = content.to_lowercase();
    let keyword_hits: usize = BRANCH_KEYWORDS
        .iter()
        .map(|kw| lower.matches(kw).count())
        .sum();

    let mut depth: usize = 0;
    let mut max_depth: usize = 0;
    for c in content.chars() {
        match c {
            '{' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    1.0 + keyword_hits as f64 * 0.5 + max_depth as f64 * 0.3
}

/// Prefix of at most `limit` characters, cut on a char boundary.
pub fn truncate_chars(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
