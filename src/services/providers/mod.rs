/// Movie-catalog provider abstraction
///
/// The pipeline talks to the external movie catalog through this trait so
/// tests can substitute fakes and so another catalog could be dropped in
/// without touching the orchestration or the similarity engine.
use crate::{error::AppResult, models::MovieFeatureRecord};

pub mod tmdb;

pub use tmdb::TmdbProvider;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetches the textual features of a single movie.
    ///
    /// Any failure (network, non-2xx status, malformed payload) surfaces
    /// as an error; callers decide whether to skip the movie or abort.
    /// There is no retry; a failed fetch means the movie is unavailable
    /// for this run.
    async fn fetch_movie_features(&self, movie_id: i64) -> AppResult<MovieFeatureRecord>;

    /// Returns a de-duplicated pool of generally relevant movie ids drawn
    /// from the catalog's ranked lists, in first-seen order.
    ///
    /// A failing source list shrinks the pool instead of erroring; if
    /// every list fails the pool is empty.
    async fn fetch_candidate_ids(&self) -> AppResult<Vec<i64>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
