/// Response shapes for the TMDB movie catalog.
///
/// Only the fields the pipeline consumes are modeled; everything else in
/// the payload is ignored by serde.
use serde::Deserialize;

use super::MovieFeatureRecord;

#[derive(Debug, Deserialize)]
pub struct TmdbNamedEntity {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TmdbKeywords {
    #[serde(default)]
    pub keywords: Vec<TmdbNamedEntity>,
}

/// `/movie/{id}?append_to_response=keywords` payload.
#[derive(Debug, Deserialize)]
pub struct TmdbMovieDetails {
    pub id: i64,
    pub title: Option<String>,
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbNamedEntity>,
    pub keywords: Option<TmdbKeywords>,
}

#[derive(Debug, Deserialize)]
pub struct TmdbMovieListing {
    pub id: i64,
}

/// One page of a ranked list endpoint (`/movie/popular`, `/movie/top_rated`).
#[derive(Debug, Deserialize)]
pub struct TmdbMovieListPage {
    #[serde(default)]
    pub results: Vec<TmdbMovieListing>,
}

impl TmdbMovieDetails {
    /// Builds the feature soup for this movie.
    ///
    /// Genre and keyword names each contribute `field_weight` copies so
    /// they outweigh synopsis words in the term-frequency counts, and
    /// their internal whitespace is removed so multi-word names stay a
    /// single vocabulary term ("Science Fiction" → "ScienceFiction").
    /// Synopsis tokens are appended once.
    pub fn into_feature_record(self, field_weight: usize) -> MovieFeatureRecord {
        let mut tokens: Vec<String> = Vec::new();

        for genre in &self.genres {
            let compact: String = genre.name.split_whitespace().collect();
            for _ in 0..field_weight {
                tokens.push(compact.clone());
            }
        }

        if let Some(keywords) = &self.keywords {
            for keyword in &keywords.keywords {
                let compact: String = keyword.name.split_whitespace().collect();
                for _ in 0..field_weight {
                    tokens.push(compact.clone());
                }
            }
        }

        if let Some(overview) = &self.overview {
            tokens.extend(overview.split_whitespace().map(str::to_owned));
        }

        MovieFeatureRecord {
            id: self.id,
            title: self.title.unwrap_or_else(|| "N/A".to_string()),
            text_features: tokens.join(" "),
        }
    }
}
