//! Content-based ranking over a term-weighted feature space.
//!
//! Fits a TF-IDF vector space over the feature soups of one run's movies
//! (liked ∪ candidates), averages the liked rows into a user profile
//! vector, and scores every candidate by cosine similarity against it.
//! The space is rebuilt from scratch every run; nothing here is shared
//! across users or runs.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::error::InsufficientData;
use crate::models::{MovieFeatureRecord, ScoredCandidate};

/// Tunable ranking policy. The defaults are the tested baseline.
#[derive(Debug, Clone)]
pub struct RankingPolicy {
    /// Maximum number of recommendations returned.
    pub top_n: usize,
    /// Terms appearing in fewer than this many movies are pruned from the
    /// vocabulary. With tiny or fully disjoint document sets this can
    /// empty the vocabulary; that surfaces as `EmptyVocabulary`.
    pub min_doc_freq: usize,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self {
            top_n: 20,
            min_doc_freq: 2,
        }
    }
}

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
        "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
        "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few",
        "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
        "herself", "him", "himself", "his", "how", "if", "in", "into", "is", "it", "its",
        "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of",
        "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over",
        "own", "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
        "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those",
        "through", "to", "too", "under", "until", "up", "very", "was", "we", "were", "what",
        "when", "where", "which", "while", "who", "whom", "why", "will", "with", "you", "your",
        "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

/// Tokenize a feature soup: lowercase, split on non-alphanumeric runs,
/// drop single-character tokens and English stop words.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() > 1 && !STOP_WORDS.contains(token))
        .map(str::to_owned)
        .collect()
}

/// TF-IDF vector space fitted over one run's document set.
///
/// idf uses the smoothed form ln((1 + n) / (1 + df)) + 1, and every row
/// produced by [`FeatureSpace::vector_for`] is L2-normalized, so the dot
/// product of two rows is their cosine similarity.
pub struct FeatureSpace {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl FeatureSpace {
    /// Fits vocabulary and idf weights over tokenized documents, pruning
    /// terms that appear in fewer than `min_doc_freq` of them.
    pub fn fit(documents: &[Vec<String>], min_doc_freq: usize) -> Result<Self, InsufficientData> {
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for tokens in documents {
            let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let mut terms: Vec<&str> = doc_freq
            .iter()
            .filter(|(_, &df)| df >= min_doc_freq)
            .map(|(&term, _)| term)
            .collect();
        if terms.is_empty() {
            return Err(InsufficientData::EmptyVocabulary);
        }
        // Deterministic column order
        terms.sort_unstable();

        let n = documents.len() as f64;
        let mut vocabulary = HashMap::with_capacity(terms.len());
        let mut idf = Vec::with_capacity(terms.len());
        for (index, term) in terms.into_iter().enumerate() {
            let df = doc_freq[term] as f64;
            vocabulary.insert(term.to_owned(), index);
            idf.push(((1.0 + n) / (1.0 + df)).ln() + 1.0);
        }

        Ok(Self { vocabulary, idf })
    }

    pub fn dimension(&self) -> usize {
        self.idf.len()
    }

    /// L2-normalized TF-IDF row for one tokenized document. Documents
    /// sharing no term with the vocabulary come out as the zero vector.
    pub fn vector_for(&self, tokens: &[String]) -> Vec<f64> {
        let mut row = vec![0.0; self.idf.len()];
        for token in tokens {
            if let Some(&index) = self.vocabulary.get(token.as_str()) {
                row[index] += 1.0;
            }
        }
        for (value, idf) in row.iter_mut().zip(&self.idf) {
            *value *= idf;
        }

        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in &mut row {
                *value /= norm;
            }
        }
        row
    }
}

fn mean_vector(rows: &[&Vec<f64>], dimension: usize) -> Vec<f64> {
    let mut mean = vec![0.0; dimension];
    for row in rows {
        for (accum, value) in mean.iter_mut().zip(row.iter()) {
            *accum += value;
        }
    }
    let count = rows.len() as f64;
    for value in &mut mean {
        *value /= count;
    }
    mean
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Scores candidates against the mean profile of the liked movies.
///
/// Unions liked and candidate records (first occurrence of an id wins, so
/// a movie appearing in both sets enters the space exactly once), fits
/// the TF-IDF space over the union, and returns at most `policy.top_n`
/// candidates sorted by descending similarity. The sort is stable, so
/// ties keep their original candidate order. Ids present in the liked set
/// are never scored.
pub fn rank_candidates(
    liked: &[MovieFeatureRecord],
    candidates: &[MovieFeatureRecord],
    policy: &RankingPolicy,
) -> Result<Vec<ScoredCandidate>, InsufficientData> {
    let mut seen = HashSet::new();
    let mut records: Vec<&MovieFeatureRecord> = Vec::with_capacity(liked.len() + candidates.len());
    for record in liked.iter().chain(candidates) {
        if seen.insert(record.id) {
            records.push(record);
        }
    }

    if records.len() < 2 {
        return Err(InsufficientData::NotEnoughMovies);
    }

    let token_lists: Vec<Vec<String>> = records
        .iter()
        .map(|record| tokenize(&record.text_features))
        .collect();
    let space = FeatureSpace::fit(&token_lists, policy.min_doc_freq)?;
    let rows: Vec<Vec<f64>> = token_lists
        .iter()
        .map(|tokens| space.vector_for(tokens))
        .collect();

    let liked_ids: HashSet<i64> = liked.iter().map(|record| record.id).collect();
    let liked_rows: Vec<&Vec<f64>> = records
        .iter()
        .zip(&rows)
        .filter(|(record, _)| liked_ids.contains(&record.id))
        .map(|(_, row)| row)
        .collect();
    if liked_rows.is_empty() {
        return Err(InsufficientData::EmptyProfile);
    }
    let profile = mean_vector(&liked_rows, space.dimension());

    let mut scored: Vec<ScoredCandidate> = records
        .iter()
        .zip(&rows)
        .filter(|(record, _)| !liked_ids.contains(&record.id))
        .map(|(record, row)| ScoredCandidate {
            movie_id: record.id,
            score: cosine_similarity(&profile, row),
        })
        .collect();

    // Stable sort: equal scores keep candidate order
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(policy.top_n);
    Ok(scored)
}
