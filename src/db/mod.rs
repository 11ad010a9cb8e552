pub mod cache;
pub mod postgres;
pub mod users;

pub use cache::create_redis_client;
pub use cache::Cache;
pub use cache::CacheKey;
pub use postgres::create_pool;
pub use users::{PgUserStore, UserStore};
