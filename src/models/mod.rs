use serde::{Deserialize, Serialize};

pub mod tmdb;

pub use tmdb::{TmdbKeywords, TmdbMovieDetails, TmdbMovieListPage, TmdbMovieListing, TmdbNamedEntity};

/// Textual features of one movie, as fetched from the catalog.
///
/// `text_features` is the whitespace-joined bag of words built from genre
/// names, keyword names, and the synopsis. Immutable once built; lives for
/// a single pipeline run (and, serialized, in the catalog cache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieFeatureRecord {
    pub id: i64,
    pub title: String,
    pub text_features: String,
}

/// One candidate with its cosine similarity to the user profile vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub movie_id: i64,
    /// In [-1, 1]; [0, 1] in practice since term weights are non-negative.
    pub score: f64,
}

/// Terminal result of a successful pipeline run.
///
/// A closed set rather than free-form strings: transport adapters match on
/// the variant to pick response codes, and `message` stays stable for
/// callers that classify on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// A fresh ranking was computed and persisted.
    RecommendationsStored { count: usize },
    /// The user has no liked movies; the stored list was reset to empty.
    RecommendationsCleared,
    /// Nothing new to recommend; the stored list was left untouched.
    NoNewCandidates,
}

impl PipelineOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            PipelineOutcome::RecommendationsStored { .. } => {
                "Recommendations generated and stored"
            }
            PipelineOutcome::RecommendationsCleared => {
                "User has no liked movies; recommendations cleared"
            }
            PipelineOutcome::NoNewCandidates => {
                "No new candidates to recommend; existing recommendations unchanged"
            }
        }
    }
}
