use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;

use crate::redis_client::RedisClient;
use crate::store::{HoldStore, StoreError, StoreResult};

/// Deletes KEYS[1] only while its JSON value names ARGV[1] as holder.
const RELEASE_IF_HOLDER: &str = r#"
local v = redis.call('GET', KEYS[1])
if not v then return 0 end
local ok, d = pcall(cjson.decode, v)
if ok and d['holder'] == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

#[derive(Clone)]
pub struct RedisHoldStore {
    redis: RedisClient,
}

impl RedisHoldStore {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }
}

fn map_redis(err: redis::RedisError) -> StoreError {
    if err.is_timeout() || err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        StoreError::Unavailable(err.to_string())
    } else {
        tracing::error!("redis error: {:?}", err);
        StoreError::Backend(err.to_string())
    }
}

#[async_trait]
impl HoldStore for RedisHoldStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.redis.conn.clone();

        // SET NX EX replies OK on write and nil when the key already exists.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(map_redis)?;

        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.redis.conn.clone();
        conn.get(key).await.map_err(map_redis)
    }

    async fn delete_if_holder(&self, key: &str, holder: &str) -> StoreResult<bool> {
        let mut conn = self.redis.conn.clone();
        let deleted: i64 = redis::Script::new(RELEASE_IF_HOLDER)
            .key(key)
            .arg(holder)
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis)?;
        Ok(deleted > 0)
    }

    async fn exists_many(&self, keys: &[String]) -> StoreResult<Vec<bool>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.redis.conn.clone();
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.exists(key);
        }
        pipe.query_async(&mut conn).await.map_err(map_redis)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.redis.ping().await.map_err(map_redis)
    }
}
