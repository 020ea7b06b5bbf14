//! Shared bucket state and the atomic update protocol.

mod bucket;
mod memory;
mod redis;

pub use bucket::BucketRecord;
pub use memory::MemoryStore;
pub use redis::RedisStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::policy::Policy;

/// Post-update bucket state echoed to the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketUpdate {
    /// Whether the requested cost was consumed
    pub allowed: bool,
    /// Tokens left in the bucket after refill and (on admission) consumption
    pub tokens: f64,
}

/// A shared store of bucket records.
///
/// `update` runs the whole refill-and-consume transition as one atomic
/// unit: concurrent callers on the same key observe a linear history of
/// consumed tokens and can never double-spend. Operations on different
/// keys are independent and must not contend.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Atomically refill the bucket at `key` to `now`, consume `cost`
    /// tokens if enough are available, and reset its expiry to
    /// `ttl_secs`. The refilled state is persisted on denial too.
    async fn update(
        &self,
        key: &str,
        policy: &Policy,
        cost: f64,
        now: f64,
        ttl_secs: u64,
    ) -> Result<BucketUpdate>;
}
