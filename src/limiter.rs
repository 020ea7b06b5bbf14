//! The admission decision facade.
//!
//! `Limiter::admit` is the one public operation of the crate: resolve the
//! caller to a bucket key, look up the endpoint-class policy, run one
//! atomic bucket update against the shared store, and translate the result
//! into a [`Decision`].
//!
//! The facade also owns the degradation policy. A rate limiter outage must
//! never become an outage of the protected service, so every store failure
//! degrades to admission: construction without a reachable store starts in
//! the disabled state, and a store error during a call fails open for that
//! call. The store is re-attempted on every call; the first success resumes
//! normal accounting with no cooldown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::LimiterConfig;
use crate::decision::Decision;
use crate::identity::RequestContext;
use crate::policy::{EndpointClass, PolicyTable};
use crate::store::{BucketStore, RedisStore};

/// Tokens spent per admission check. The store protocol takes an arbitrary
/// cost; the facade currently always spends one.
const REQUEST_COST: f64 = 1.0;

/// The rate limiting decision layer.
///
/// Construct once per process and share behind an `Arc`; `admit` is safe
/// under arbitrary concurrency and never blocks on anything except the
/// timeout-bounded store round-trip.
pub struct Limiter {
    policies: PolicyTable,
    store: Option<Arc<dyn BucketStore>>,
    clock: Arc<dyn Clock>,
    /// Edge detector so degradation transitions are logged once, not per
    /// call. Correctness never reads this flag.
    degraded: AtomicBool,
}

impl Limiter {
    /// Build a limiter against the configured Redis store.
    ///
    /// A missing URL or an unreachable store does not fail construction:
    /// the limiter starts disabled and admits everything until restart.
    pub async fn connect(config: LimiterConfig) -> Self {
        let timeout = Duration::from_millis(config.store.timeout_ms);

        let store: Option<Arc<dyn BucketStore>> = match config.store.url.as_deref() {
            Some(url) => match RedisStore::connect(url, timeout).await {
                Ok(store) => Some(Arc::new(store)),
                Err(e) => {
                    warn!(
                        error = %e,
                        "Bucket store unreachable at startup, rate limiting disabled"
                    );
                    None
                }
            },
            None => {
                warn!("No bucket store configured, rate limiting disabled");
                None
            }
        };

        Self {
            policies: config.policies,
            store,
            clock: Arc::new(SystemClock::new()),
            degraded: AtomicBool::new(false),
        }
    }

    /// Build a limiter over an explicit store and clock.
    ///
    /// This is the embedding seam: single-instance deployments pass a
    /// `MemoryStore`, tests pass a manual clock.
    pub fn with_store(
        policies: PolicyTable,
        store: Arc<dyn BucketStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            policies,
            store: Some(store),
            clock,
            degraded: AtomicBool::new(false),
        }
    }

    /// Build a limiter that is permanently disabled.
    pub fn disabled(policies: PolicyTable) -> Self {
        Self {
            policies,
            store: None,
            clock: Arc::new(SystemClock::new()),
            degraded: AtomicBool::new(false),
        }
    }

    /// Whether admission checks are currently hitting the store.
    pub fn is_enabled(&self) -> bool {
        self.store.is_some() && !self.degraded.load(Ordering::Relaxed)
    }

    /// Decide admission for one request.
    ///
    /// Exactly one bucket record is atomically updated per call. Denial is
    /// a normal return value; every infrastructure failure degrades to
    /// silent admission.
    pub async fn admit(&self, ctx: &RequestContext, class: EndpointClass) -> Decision {
        let Some(store) = self.store.as_ref() else {
            return Decision::unlimited();
        };

        let identifier = ctx.bucket_key();
        let policy = self.policies.lookup(class, ctx.is_authenticated());
        let now = self.clock.epoch_seconds();

        let result = store
            .update(
                &identifier,
                policy,
                REQUEST_COST,
                now,
                policy.idle_ttl_secs(),
            )
            .await;

        match result {
            Ok(update) => {
                if self.degraded.swap(false, Ordering::Relaxed) {
                    info!("Bucket store recovered, rate limiting re-enabled");
                }

                let decision =
                    Decision::evaluate(update.allowed, update.tokens, REQUEST_COST, policy);

                if !decision.allowed {
                    debug!(
                        identifier = %identifier,
                        class = %class,
                        retry_after = ?decision.retry_after,
                        "Rate limit exceeded"
                    );
                }

                decision
            }
            Err(e) => {
                if !self.degraded.swap(true, Ordering::Relaxed) {
                    warn!(error = %e, "Bucket store unavailable, failing open");
                }
                Decision::unlimited()
            }
        }
    }
}
