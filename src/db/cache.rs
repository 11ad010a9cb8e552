use std::fmt::Display;

use redis::{AsyncCommands, Client};

use crate::error::AppResult;

/// Keys for cached catalog data. Only catalog responses are cached;
/// feature spaces, profile vectors, and per-user data never are.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    MovieFeatures(i64),
    CandidateList(&'static str),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::MovieFeatures(movie_id) => write!(f, "movie:{}", movie_id),
            CacheKey::CandidateList(list) => write!(f, "candidates:{}", list),
        }
    }
}

/// Creates a Redis client for caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Best-effort read-through cache over Redis.
///
/// Lookups that hit a broken Redis report a miss instead of an error, and
/// writes happen in a detached task, so cache trouble can slow a pipeline
/// run down but never fail it.
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
}

impl Cache {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }

    /// Retrieves a cached value, treating every failure as a miss.
    ///
    /// Entries that no longer deserialize into `T` (stale shape after a
    /// deploy) also read as misses and get overwritten by the next store.
    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.read(key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }

    async fn read<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;
        Ok(cached.and_then(|json| serde_json::from_str(&json).ok()))
    }

    /// Serializes and stores a value in a spawned task so the caller never
    /// waits on Redis.
    pub fn put_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Cache serialization error");
                return;
            }
        };

        let client = self.redis_client.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            if let Err(e) = Self::write(&client, &key, &json, ttl).await {
                tracing::warn!(key = %key, error = %e, "Cache write failed");
            }
        });
    }

    async fn write(client: &Client, key: &str, json: &str, ttl: u64) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key, json, ttl).await?;
        Ok(())
    }
}

/// Read-through caching: return the cached value when present, otherwise
/// run the fetch block, store its result in the background, and return it.
///
/// The block must evaluate to an `AppResult<T>`; the whole expression does
/// too.
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache.get(&$key).await {
            Some(hit) => Ok(hit),
            None => {
                let value = $block.await?;
                $cache.put_background(&$key, &value, $ttl);
                Ok(value)
            }
        }
    }};
}
