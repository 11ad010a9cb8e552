//! Recommendation pipeline for one user.
//!
//! Sequences user-store reads, catalog fetches, the similarity engine,
//! and the final write: LOAD_USER → FETCH_LIKED_DETAILS →
//! FETCH_CANDIDATES → FETCH_CANDIDATE_DETAILS → SCORE_AND_RANK → PERSIST.
//! Degenerate inputs exit early with a [`PipelineOutcome`] variant or an
//! [`InsufficientData`] error; only the PERSIST stage mutates the store.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::{
    db::UserStore,
    error::{AppResult, InsufficientData},
    models::{MovieFeatureRecord, PipelineOutcome},
    services::providers::CatalogProvider,
    services::similarity::{self, RankingPolicy},
};

pub struct RecommendationPipeline {
    catalog: Arc<dyn CatalogProvider>,
    store: Arc<dyn UserStore>,
    policy: RankingPolicy,
    fetch_concurrency: usize,
}

impl RecommendationPipeline {
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        store: Arc<dyn UserStore>,
        policy: RankingPolicy,
        fetch_concurrency: usize,
    ) -> Self {
        Self {
            catalog,
            store,
            policy,
            fetch_concurrency: fetch_concurrency.max(1),
        }
    }

    /// Recomputes and persists the recommendation list for one user.
    ///
    /// Every exit path is either a [`PipelineOutcome`] or an error from
    /// the closed taxonomy; the stored list is only written on the
    /// stored/cleared outcomes, never partially.
    pub async fn refresh_for_user(&self, user_key: &str) -> AppResult<PipelineOutcome> {
        tracing::info!(user_key, "Starting recommendation run");

        let mut liked_ids = self.store.read_liked(user_key).await?;
        let mut seen = HashSet::new();
        liked_ids.retain(|id| seen.insert(*id));

        if liked_ids.is_empty() {
            // Deliberate reset: no likes means no profile to rank against.
            self.store.write_recommendations(user_key, &[]).await?;
            tracing::info!(user_key, "No liked movies; cleared stored recommendations");
            return Ok(PipelineOutcome::RecommendationsCleared);
        }

        let liked_records = self.fetch_feature_records(&liked_ids).await;
        tracing::info!(
            user_key,
            liked = liked_ids.len(),
            resolved = liked_records.len(),
            "Liked movie details fetched"
        );

        let liked_set: HashSet<i64> = liked_ids.iter().copied().collect();
        let pool = self.catalog.fetch_candidate_ids().await?;
        let candidate_ids: Vec<i64> = pool
            .into_iter()
            .filter(|id| !liked_set.contains(id))
            .collect();

        if candidate_ids.is_empty() {
            tracing::info!(user_key, "Candidate pool empty after filtering liked movies");
            return Ok(PipelineOutcome::NoNewCandidates);
        }

        let candidate_records = self.fetch_feature_records(&candidate_ids).await;

        let unique_ids: HashSet<i64> = liked_records
            .iter()
            .chain(&candidate_records)
            .map(|record| record.id)
            .collect();
        if unique_ids.len() < 2 {
            return Err(InsufficientData::NotEnoughMovies.into());
        }
        if candidate_records.is_empty() {
            tracing::warn!(user_key, "No candidate details resolved; nothing to rank");
            return Ok(PipelineOutcome::NoNewCandidates);
        }

        let ranked = similarity::rank_candidates(&liked_records, &candidate_records, &self.policy)?;
        let recommended: Vec<i64> = ranked.iter().map(|candidate| candidate.movie_id).collect();

        self.store
            .write_recommendations(user_key, &recommended)
            .await?;

        tracing::info!(user_key, count = recommended.len(), "Recommendation run complete");
        Ok(PipelineOutcome::RecommendationsStored {
            count: recommended.len(),
        })
    }

    /// Fetches feature records for the given ids with bounded concurrency.
    ///
    /// Failed fetches are logged and omitted; the surviving records keep
    /// the input id order.
    async fn fetch_feature_records(&self, movie_ids: &[i64]) -> Vec<MovieFeatureRecord> {
        let semaphore = Arc::new(Semaphore::new(self.fetch_concurrency));
        let mut tasks = Vec::with_capacity(movie_ids.len());

        for &movie_id in movie_ids {
            let catalog = Arc::clone(&self.catalog);
            let semaphore = Arc::clone(&semaphore);
            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                catalog.fetch_movie_features(movie_id).await
            }));
        }

        let mut records = Vec::with_capacity(movie_ids.len());
        for (task, &movie_id) in tasks.into_iter().zip(movie_ids) {
            match task.await {
                Ok(Ok(record)) => records.push(record),
                Ok(Err(e)) => {
                    tracing::warn!(movie_id, error = %e, "Movie unavailable for this run")
                }
                Err(e) => {
                    tracing::error!(movie_id, error = %e, "Metadata fetch task failed to join")
                }
            }
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users::MockUserStore;
    use crate::error::AppError;
    use crate::services::providers::MockCatalogProvider;

    fn record(id: i64, soup: &str) -> MovieFeatureRecord {
        MovieFeatureRecord {
            id,
            title: format!("Movie {id}"),
            text_features: soup.to_string(),
        }
    }

    fn soup_for(id: i64) -> &'static str {
        match id {
            1 => "action space adventure galaxy",
            2 => "action space battle stars",
            3 => "action space galaxy battle",
            4 => "romance paris wedding vows",
            _ => "uncharted placeholder soup",
        }
    }

    fn pipeline(
        catalog: MockCatalogProvider,
        store: MockUserStore,
        min_doc_freq: usize,
    ) -> RecommendationPipeline {
        RecommendationPipeline::new(
            Arc::new(catalog),
            Arc::new(store),
            RankingPolicy {
                top_n: 20,
                min_doc_freq,
            },
            4,
        )
    }

    #[tokio::test]
    async fn unknown_user_surfaces_not_found() {
        let catalog = MockCatalogProvider::new();
        let mut store = MockUserStore::new();
        store
            .expect_read_liked()
            .returning(|key| Err(AppError::NotFound(format!("user {} not found", key))));

        let err = pipeline(catalog, store, 1)
            .refresh_for_user("ghost@example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_liked_list_resets_recommendations() {
        let catalog = MockCatalogProvider::new();
        let mut store = MockUserStore::new();
        store.expect_read_liked().returning(|_| Ok(vec![]));
        store
            .expect_write_recommendations()
            .withf(|_, ids| ids.is_empty())
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = pipeline(catalog, store, 1)
            .refresh_for_user("alice@example.com")
            .await
            .unwrap();

        assert_eq!(outcome, PipelineOutcome::RecommendationsCleared);
    }

    #[tokio::test]
    async fn fully_liked_pool_leaves_store_untouched() {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_fetch_movie_features()
            .returning(|id| Ok(record(id, soup_for(id))));
        catalog
            .expect_fetch_candidate_ids()
            .returning(|| Ok(vec![1, 2]));

        let mut store = MockUserStore::new();
        store.expect_read_liked().returning(|_| Ok(vec![1, 2]));
        store.expect_write_recommendations().times(0);

        let outcome = pipeline(catalog, store, 1)
            .refresh_for_user("alice@example.com")
            .await
            .unwrap();

        assert_eq!(outcome, PipelineOutcome::NoNewCandidates);
    }

    #[tokio::test]
    async fn ranks_and_stores_filtered_candidates() {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_fetch_movie_features()
            .returning(|id| Ok(record(id, soup_for(id))));
        catalog
            .expect_fetch_candidate_ids()
            .returning(|| Ok(vec![1, 3, 4]));

        let mut store = MockUserStore::new();
        store.expect_read_liked().returning(|_| Ok(vec![1, 2]));
        store
            .expect_write_recommendations()
            .withf(|_, ids| ids == [3, 4])
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = pipeline(catalog, store, 1)
            .refresh_for_user("alice@example.com")
            .await
            .unwrap();

        assert_eq!(outcome, PipelineOutcome::RecommendationsStored { count: 2 });
    }

    #[tokio::test]
    async fn duplicate_liked_ids_are_fetched_once() {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_fetch_movie_features()
            .times(3) // liked 1 (deduped) + candidates 3, 4
            .returning(|id| Ok(record(id, soup_for(id))));
        catalog
            .expect_fetch_candidate_ids()
            .returning(|| Ok(vec![3, 4]));

        let mut store = MockUserStore::new();
        store.expect_read_liked().returning(|_| Ok(vec![1, 1, 1]));
        store
            .expect_write_recommendations()
            .times(1)
            .returning(|_, _| Ok(()));

        pipeline(catalog, store, 1)
            .refresh_for_user("alice@example.com")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_candidate_fetch_is_absorbed() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_fetch_movie_features().returning(|id| {
            if id == 4 {
                Err(AppError::UpstreamFetch(format!(
                    "catalog returned status 404 for movie {}",
                    id
                )))
            } else {
                Ok(record(id, soup_for(id)))
            }
        });
        catalog
            .expect_fetch_candidate_ids()
            .returning(|| Ok(vec![3, 4]));

        let mut store = MockUserStore::new();
        store.expect_read_liked().returning(|_| Ok(vec![1, 2]));
        store
            .expect_write_recommendations()
            .withf(|_, ids| ids == [3])
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = pipeline(catalog, store, 1)
            .refresh_for_user("alice@example.com")
            .await
            .unwrap();

        assert_eq!(outcome, PipelineOutcome::RecommendationsStored { count: 1 });
    }

    #[tokio::test]
    async fn all_candidate_fetches_failing_changes_nothing() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_fetch_movie_features().returning(|id| {
            if id >= 3 {
                Err(AppError::UpstreamFetch("catalog unavailable".to_string()))
            } else {
                Ok(record(id, soup_for(id)))
            }
        });
        catalog
            .expect_fetch_candidate_ids()
            .returning(|| Ok(vec![3, 4]));

        let mut store = MockUserStore::new();
        store.expect_read_liked().returning(|_| Ok(vec![1, 2]));
        store.expect_write_recommendations().times(0);

        let outcome = pipeline(catalog, store, 1)
            .refresh_for_user("alice@example.com")
            .await
            .unwrap();

        assert_eq!(outcome, PipelineOutcome::NoNewCandidates);
    }

    #[tokio::test]
    async fn single_surviving_movie_is_not_enough_data() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_fetch_movie_features().returning(|id| {
            if id == 1 {
                Err(AppError::UpstreamFetch("catalog unavailable".to_string()))
            } else {
                Ok(record(id, soup_for(id)))
            }
        });
        catalog
            .expect_fetch_candidate_ids()
            .returning(|| Ok(vec![3]));

        let mut store = MockUserStore::new();
        store.expect_read_liked().returning(|_| Ok(vec![1]));
        store.expect_write_recommendations().times(0);

        let err = pipeline(catalog, store, 1)
            .refresh_for_user("alice@example.com")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::InsufficientData(InsufficientData::NotEnoughMovies)
        ));
    }

    #[tokio::test]
    async fn disjoint_vocabulary_fails_without_write() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_fetch_movie_features().returning(|id| {
            let soup = match id {
                1 => "zorblax quintessence",
                2 => "mythril cascade",
                _ => "nebulon vortexia",
            };
            Ok(record(id, soup))
        });
        catalog
            .expect_fetch_candidate_ids()
            .returning(|| Ok(vec![3]));

        let mut store = MockUserStore::new();
        store.expect_read_liked().returning(|_| Ok(vec![1, 2]));
        store.expect_write_recommendations().times(0);

        let err = pipeline(catalog, store, 2)
            .refresh_for_user("alice@example.com")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::InsufficientData(InsufficientData::EmptyVocabulary)
        ));
    }

    #[tokio::test]
    async fn write_failure_surfaces_as_persistence_error() {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_fetch_movie_features()
            .returning(|id| Ok(record(id, soup_for(id))));
        catalog
            .expect_fetch_candidate_ids()
            .returning(|| Ok(vec![3, 4]));

        let mut store = MockUserStore::new();
        store.expect_read_liked().returning(|_| Ok(vec![1, 2]));
        store
            .expect_write_recommendations()
            .returning(|_, _| Err(AppError::Persistence("connection reset".to_string())));

        let err = pipeline(catalog, store, 1)
            .refresh_for_user("alice@example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Persistence(_)));
    }
}
