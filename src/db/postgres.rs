use sqlx::{postgres::PgPoolOptions, PgPool};

/// Creates the PostgreSQL connection pool backing the user store.
///
/// Built once at startup and shared across runs; the pool manages
/// connection lifecycle and caps concurrent connections.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}
