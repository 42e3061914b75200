use serde::{Deserialize, Serialize};

/// Ceiling on how many roots the backend will monitor at once.
pub const MAX_ROOTS: usize = 5;

/// Cap applied to both the session result set and the durable indexing log.
pub const MAX_LOGGED_RESULTS: usize = 50;

/// Unknown phase strings from newer backends decode as `Idle`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum IndexingPhase {
    #[default]
    Idle,
    Indexing,
    Complete,
}

impl From<String> for IndexingPhase {
    fn from(value: String) -> Self {
        match value.as_str() {
            "indexing" => IndexingPhase::Indexing,
            "complete" => IndexingPhase::Complete,
            _ => IndexingPhase::Idle,
        }
    }
}

/// Snapshot of backend indexing state, fetched fresh on every poll and never
/// persisted. `percentage` is backend-computed; the client does not derive it
/// from the file counts.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct IndexingProgress {
    #[serde(default)]
    pub indexing: bool,
    #[serde(default)]
    pub phase: IndexingPhase,
    #[serde(default)]
    pub percentage: u8,
    #[serde(default)]
    pub current_file: Option<String>,
    #[serde(default)]
    pub processed_files: u64,
    #[serde(default)]
    pub total_files: u64,
}

/// One ranked search hit in canonical client form.
///
/// `score` is always a 0..=1 fraction. Backends that report a 0..=100
/// `similarity` percentage are converted at the decode boundary in
/// [`crate::backend`]; nothing past that boundary ever sees a percentage.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SearchResult {
    pub path: String,
    pub filename: String,
    pub score: f32,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub matched_terms: Vec<String>,
}

impl SearchResult {
    /// Display form of the score, rounded to a whole percentage.
    pub fn score_percent(&self) -> u8 {
        (self.score.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}
