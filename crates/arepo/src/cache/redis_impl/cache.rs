//! Redis-backed cache, for decorators shared by several processes.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use arepo_core::cache::{Cache, Result};

use super::error::map_redis_error;

/// Redis rejects expiry times past the range of its clock.
const MAX_TTL_MILLIS: u64 = u32::MAX as u64 * 1_000;

/// How a value is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expiry {
    /// Plain `SET`; the key lives until deleted or evicted.
    Persist,
    /// `PSETEX` with a millisecond TTL.
    Millis(u64),
}

impl Expiry {
    fn from_ttl(ttl: Option<Duration>) -> Self {
        match ttl {
            None => Self::Persist,
            // PSETEX refuses 0, so sub-millisecond TTLs round up.
            Some(ttl) => {
                let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
                Self::Millis(millis.clamp(1, MAX_TTL_MILLIS))
            }
        }
    }
}

/// Cache backend storing encoded documents as Redis strings.
///
/// Keys are used as given; the decorators already scope them under their
/// radical. Cloning is cheap and shares the underlying connection manager.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connects to `url` and checks that the server answers `PING`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` for a malformed URL, an
    /// unreachable server or rejected credentials.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let mut conn = ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;

        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .map_err(map_redis_error)?;

        tracing::debug!("Connected to Redis cache");
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(map_redis_error)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        let written = match Expiry::from_ttl(ttl) {
            Expiry::Persist => conn.set::<_, _, ()>(key, value).await,
            Expiry::Millis(millis) => conn.pset_ex::<_, _, ()>(key, value, millis).await,
        };
        written.map_err(map_redis_error)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(map_redis_error)
    }
}
