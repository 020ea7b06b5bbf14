//! In-process bucket store.
//!
//! Byte-for-byte the same protocol the Redis script runs, held in a
//! process-local map. Used by tests and by embedders that want admission
//! control without a shared store (single-instance deployments).

use async_trait::async_trait;
use dashmap::DashMap;

use super::bucket::BucketRecord;
use super::{BucketStore, BucketUpdate};
use crate::error::Result;
use crate::policy::Policy;

struct StoredBucket {
    record: BucketRecord,
    /// Epoch seconds after which the bucket counts as reaped
    expires_at: f64,
}

/// Bucket store backed by a concurrent in-process map.
///
/// The map's entry lock scopes mutual exclusion to a single key, matching
/// the store contract: updates on one identifier serialize, updates on
/// different identifiers do not contend. Expiry is enforced lazily: a
/// record whose TTL has lapsed is indistinguishable from an absent one.
#[derive(Default)]
pub struct MemoryStore {
    buckets: DashMap<String, StoredBucket>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Number of live (unexpired) buckets, for test assertions.
    pub fn bucket_count(&self, now: f64) -> usize {
        self.buckets
            .iter()
            .filter(|entry| entry.expires_at > now)
            .count()
    }
}

#[async_trait]
impl BucketStore for MemoryStore {
    async fn update(
        &self,
        key: &str,
        policy: &Policy,
        cost: f64,
        now: f64,
        ttl_secs: u64,
    ) -> Result<BucketUpdate> {
        let mut entry = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| StoredBucket {
                record: BucketRecord::fresh(policy.capacity, now),
                expires_at: now + ttl_secs as f64,
            });

        if entry.expires_at <= now {
            entry.record = BucketRecord::fresh(policy.capacity, now);
        }

        let allowed = entry.record.apply(policy.rate, policy.capacity, cost, now);
        entry.expires_at = now + ttl_secs as f64;

        Ok(BucketUpdate {
            allowed,
            tokens: entry.record.tokens,
        })
    }
}
