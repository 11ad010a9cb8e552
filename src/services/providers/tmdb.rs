/// TMDB catalog provider
///
/// Fetches per-movie textual features (genres, keywords, synopsis, merged
/// into a feature soup) and the ranked lists backing the candidate pool.
/// Detail responses and list pages are cached in Redis; a cold cache costs
/// one catalog call per movie per day.
use reqwest::Client as HttpClient;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{MovieFeatureRecord, TmdbMovieDetails, TmdbMovieListPage},
    services::providers::CatalogProvider,
};

/// Ranked lists merged into the candidate pool, in pool order.
const CANDIDATE_LISTS: [&str; 2] = ["popular", "top_rated"];

const FEATURE_CACHE_TTL: u64 = 86_400; // 1 day
const CANDIDATE_CACHE_TTL: u64 = 1_800; // 30 minutes

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
    /// Copies of each genre/keyword token in the soup.
    field_weight: usize,
}

impl TmdbProvider {
    /// The `http_client` should carry the configured request timeout and
    /// is reused across runs.
    pub fn new(
        http_client: HttpClient,
        api_key: String,
        api_url: String,
        cache: Cache,
        field_weight: usize,
    ) -> Self {
        Self {
            http_client,
            api_key,
            api_url,
            cache,
            field_weight,
        }
    }

    /// Fetches the first page of one ranked list, read through the cache.
    async fn fetch_list_ids(&self, list: &'static str) -> AppResult<Vec<i64>> {
        cached!(
            self.cache,
            CacheKey::CandidateList(list),
            CANDIDATE_CACHE_TTL,
            async move {
                let url = format!("{}/movie/{}", self.api_url, list);

                let response = self
                    .http_client
                    .get(&url)
                    .query(&[
                        ("api_key", self.api_key.as_str()),
                        ("language", "en-US"),
                        ("page", "1"),
                    ])
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(AppError::UpstreamFetch(format!(
                        "catalog list {} returned status {}",
                        list,
                        response.status()
                    )));
                }

                let page: TmdbMovieListPage = response.json().await?;
                let ids: Vec<i64> = page.results.into_iter().map(|movie| movie.id).collect();

                tracing::debug!(list, count = ids.len(), provider = "tmdb", "Ranked list fetched");
                Ok(ids)
            }
        )
    }
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbProvider {
    async fn fetch_movie_features(&self, movie_id: i64) -> AppResult<MovieFeatureRecord> {
        cached!(
            self.cache,
            CacheKey::MovieFeatures(movie_id),
            FEATURE_CACHE_TTL,
            async move {
                let url = format!("{}/movie/{}", self.api_url, movie_id);

                let response = self
                    .http_client
                    .get(&url)
                    .query(&[
                        ("api_key", self.api_key.as_str()),
                        ("append_to_response", "keywords"),
                    ])
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(AppError::UpstreamFetch(format!(
                        "catalog returned status {} for movie {}",
                        response.status(),
                        movie_id
                    )));
                }

                let details: TmdbMovieDetails = response.json().await?;
                Ok(details.into_feature_record(self.field_weight))
            }
        )
    }

    async fn fetch_candidate_ids(&self) -> AppResult<Vec<i64>> {
        let mut pool = Vec::new();
        for list in CANDIDATE_LISTS {
            match self.fetch_list_ids(list).await {
                Ok(ids) => pool.extend(ids),
                Err(e) => {
                    tracing::warn!(list, error = %e, "Candidate list fetch failed, pool degraded");
                }
            }
        }

        let pool = dedup_preserving_order(pool);
        tracing::info!(count = pool.len(), provider = "tmdb", "Candidate pool assembled");
        Ok(pool)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

/// De-duplicates ids keeping the first occurrence of each, so the pool
/// order stays stable across runs (popular page first, then top_rated).
fn dedup_preserving_order(ids: Vec<i64>) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
