use async_trait::async_trait;
use sqlx::types::BigDecimal;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};

/// Read/write access to a user's movie-id lists, keyed by an opaque user
/// key (an email address in practice).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the user's liked movie ids, or `NotFound` when no user
    /// exists under the key.
    async fn read_liked(&self, user_key: &str) -> AppResult<Vec<i64>>;

    /// Replaces the user's stored recommendation list in a single
    /// statement; there is no partial update.
    async fn write_recommendations(&self, user_key: &str, movie_ids: &[i64]) -> AppResult<()>;
}

/// Postgres-backed user store.
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Stored ids are NUMERIC and may carry a decimal point from legacy
/// imports. Coerce to an integer id, or None when the value isn't numeric.
fn coerce_movie_id(raw: &BigDecimal) -> Option<i64> {
    raw.to_string().parse::<f64>().ok().map(|value| value.round() as i64)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn read_liked(&self, user_key: &str) -> AppResult<Vec<i64>> {
        let row: Option<Option<Vec<BigDecimal>>> =
            sqlx::query_scalar("SELECT liked_movies FROM users WHERE email = $1")
                .bind(user_key)
                .fetch_optional(&self.pool)
                .await?;

        let Some(liked) = row else {
            return Err(AppError::NotFound(format!("user {} not found", user_key)));
        };

        let raw = liked.unwrap_or_default();
        let mut ids = Vec::with_capacity(raw.len());
        for value in &raw {
            match coerce_movie_id(value) {
                Some(id) => ids.push(id),
                None => {
                    tracing::warn!(user_key, raw = %value, "Skipping non-numeric liked movie id")
                }
            }
        }

        Ok(ids)
    }

    async fn write_recommendations(&self, user_key: &str, movie_ids: &[i64]) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE users SET recommended_movies = $1::numeric[] WHERE email = $2")
                .bind(movie_ids)
                .bind(user_key)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::Persistence(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user {} not found", user_key)));
        }

        tracing::info!(user_key, count = movie_ids.len(), "Stored recommendations");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn coerce_plain_integer() {
        let raw = BigDecimal::from_str("603").unwrap();
        assert_eq!(coerce_movie_id(&raw), Some(603));
    }

    #[test]
    fn coerce_decimal_form() {
        let raw = BigDecimal::from_str("603.0").unwrap();
        assert_eq!(coerce_movie_id(&raw), Some(603));
    }

    #[test]
    fn coerce_rounds_fractional_values() {
        let raw = BigDecimal::from_str("41.7").unwrap();
        assert_eq!(coerce_movie_id(&raw), Some(42));
    }

    #[test]
    fn coerce_negative_id_survives() {
        // Never expected from the catalog, but the coercion itself is total
        let raw = BigDecimal::from_str("-7").unwrap();
        assert_eq!(coerce_movie_id(&raw), Some(-7));
    }
}
