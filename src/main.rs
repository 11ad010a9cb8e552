use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use cinerec_api::{
    api::{create_router, AppState},
    config::Config,
    db::{self, Cache, PgUserStore},
    services::{providers::TmdbProvider, recommendations::RecommendationPipeline, similarity::RankingPolicy},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let redis_client = db::create_redis_client(&config.redis_url)?;
    let cache = Cache::new(redis_client);

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.catalog_timeout_secs))
        .build()?;

    let catalog = Arc::new(TmdbProvider::new(
        http_client,
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        cache,
        config.feature_field_weight,
    ));
    let store = Arc::new(PgUserStore::new(pool));

    let pipeline = Arc::new(RecommendationPipeline::new(
        catalog,
        store,
        RankingPolicy {
            top_n: config.top_n,
            min_doc_freq: config.min_doc_freq,
        },
        config.fetch_concurrency,
    ));

    let app = create_router(AppState::new(pipeline));

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(host = %config.host, port = config.port, "cinerec API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
