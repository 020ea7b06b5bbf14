//! Redis-backed bucket store.
//!
//! The whole update protocol runs server-side as a Lua script, so the
//! read-refill-consume-write sequence is indivisible under concurrent
//! callers sharing a key. The script is EVALSHA'd by hash; `redis::Script`
//! re-registers it transparently if the server has not seen it.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;
use std::time::Duration;
use tracing::debug;

use super::{BucketStore, BucketUpdate};
use crate::error::{Result, TurnstileError};
use crate::policy::Policy;

/// Namespace prefix for bucket keys in the shared store.
const KEY_PREFIX: &str = "rate_limit";

/// Atomic token bucket update.
///
/// Mirrors `BucketRecord::apply`: initialize absent buckets full, refill by
/// elapsed wall-clock time, consume on admission, persist the refilled
/// state even on denial, and reset the expiry either way. Tokens are
/// returned as a string because Redis truncates Lua numbers to integers.
const UPDATE_SCRIPT: &str = r#"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local rate = tonumber(ARGV[2])
local capacity = tonumber(ARGV[3])
local cost = tonumber(ARGV[4])
local ttl = tonumber(ARGV[5])

local state = redis.call("HMGET", key, "tokens", "last_update")
local tokens = tonumber(state[1])
local last_update = tonumber(state[2])

if tokens == nil then
    tokens = capacity
    last_update = now
end

local elapsed = math.max(0, now - last_update)
tokens = math.min(capacity, tokens + elapsed * rate)

local allowed = 0
if tokens >= cost then
    tokens = tokens - cost
    allowed = 1
end

redis.call("HSET", key, "tokens", tokens, "last_update", now)
redis.call("EXPIRE", key, ttl)
return {allowed, tostring(tokens)}
"#;

/// Bucket store backed by a shared Redis instance.
pub struct RedisStore {
    connection: ConnectionManager,
    script: Script,
    timeout: Duration,
}

impl RedisStore {
    /// Connect to the store at `url`.
    ///
    /// The connection manager re-establishes dropped connections in the
    /// background, so a store that becomes reachable again is picked up
    /// without any explicit recovery step.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let connection = tokio::time::timeout(timeout, client.get_connection_manager())
            .await
            .map_err(|_| TurnstileError::StoreTimeout)??;

        debug!(url = %url, "Connected to bucket store");

        Ok(Self {
            connection,
            script: Script::new(UPDATE_SCRIPT),
            timeout,
        })
    }
}

#[async_trait]
impl BucketStore for RedisStore {
    async fn update(
        &self,
        key: &str,
        policy: &Policy,
        cost: f64,
        now: f64,
        ttl_secs: u64,
    ) -> Result<BucketUpdate> {
        let mut connection = self.connection.clone();

        let mut invocation = self.script.prepare_invoke();
        invocation
            .key(format!("{}:{}", KEY_PREFIX, key))
            .arg(now)
            .arg(policy.rate)
            .arg(policy.capacity)
            .arg(cost)
            .arg(ttl_secs);

        let (allowed, tokens): (i64, f64) =
            tokio::time::timeout(self.timeout, invocation.invoke_async(&mut connection))
                .await
                .map_err(|_| TurnstileError::StoreTimeout)??;

        Ok(BucketUpdate {
            allowed: allowed == 1,
            tokens,
        })
    }
}
