//! The token-bucket state transition.
//!
//! One bucket record per caller+scope, refilled as a pure function of
//! elapsed wall-clock time. The in-memory store applies this transition
//! directly; the Redis store runs the identical computation server-side
//! in its update script.

/// Mutable state of one token bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketRecord {
    /// Available permits, always within `[0, capacity]`
    pub tokens: f64,
    /// Fractional epoch seconds of the last applied update
    pub last_update: f64,
}

impl BucketRecord {
    /// A bucket that has never been touched: full, as of `now`.
    pub fn fresh(capacity: u32, now: f64) -> Self {
        Self {
            tokens: capacity as f64,
            last_update: now,
        }
    }

    /// Refill to `now` and try to consume `cost` tokens.
    ///
    /// Returns whether the consumption was admitted. The refilled value is
    /// kept on denial as well, and `last_update` is rewritten to `now` on
    /// every invocation, so no update is ever lost; a concurrent operation
    /// committing later observes a `last_update` at least as recent and a
    /// correspondingly smaller or zero elapsed interval.
    pub fn apply(&mut self, rate: f64, capacity: u32, cost: f64, now: f64) -> bool {
        let elapsed = (now - self.last_update).max(0.0);
        self.tokens = (self.tokens + elapsed * rate).min(capacity as f64);
        self.last_update = now;

        if self.tokens >= cost {
            self.tokens -= cost;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_bucket_is_full() {
        let record = BucketRecord::fresh(5, 100.0);
        assert_eq!(record.tokens, 5.0);
        assert_eq!(record.last_update, 100.0);
    }

    #[test]
    fn test_burst_drains_to_denial() {
        let mut record = BucketRecord::fresh(5, 100.0);

        for _ in 0..5 {
            assert!(record.apply(1.0, 5, 1.0, 100.0));
        }
        assert!(!record.apply(1.0, 5, 1.0, 100.0));
        assert_eq!(record.tokens, 0.0);
    }

    #[test]
    fn test_refill_is_elapsed_times_rate() {
        let mut record = BucketRecord::fresh(10, 100.0);

        for _ in 0..10 {
            record.apply(2.0, 10, 1.0, 100.0);
        }
        assert_eq!(record.tokens, 0.0);

        // 3 seconds at 2 tokens/s
        assert!(record.apply(2.0, 10, 1.0, 103.0));
        assert_eq!(record.tokens, 5.0);
    }

    #[test]
    fn test_refill_never_exceeds_capacity() {
        let mut record = BucketRecord::fresh(5, 100.0);
        record.apply(1.0, 5, 1.0, 100.0);

        // A long idle period refills to capacity, not beyond
        assert!(record.apply(1.0, 5, 1.0, 10_000.0));
        assert_eq!(record.tokens, 4.0);
    }

    #[test]
    fn test_fractional_rate_refill() {
        let mut record = BucketRecord::fresh(2, 100.0);
        record.apply(0.5, 2, 1.0, 100.0);
        record.apply(0.5, 2, 1.0, 100.0);
        assert_eq!(record.tokens, 0.0);

        // one token every two seconds
        assert!(!record.apply(0.5, 2, 1.0, 101.0));
        assert!(record.apply(0.5, 2, 1.0, 103.0));
    }

    #[test]
    fn test_denial_keeps_refilled_tokens() {
        let mut record = BucketRecord::fresh(5, 100.0);
        for _ in 0..5 {
            record.apply(1.0, 5, 1.0, 100.0);
        }

        // Over-asking is denied, but the refill progress is not lost
        assert!(!record.apply(1.0, 5, 3.0, 102.0));
        assert_eq!(record.tokens, 2.0);
        assert_eq!(record.last_update, 102.0);
    }

    #[test]
    fn test_clock_skew_is_clamped() {
        let mut record = BucketRecord::fresh(5, 100.0);
        record.apply(1.0, 5, 1.0, 100.0);

        // An earlier timestamp refills nothing and never drives tokens up
        assert!(record.apply(1.0, 5, 1.0, 90.0));
        assert_eq!(record.tokens, 3.0);
        assert_eq!(record.last_update, 90.0);
    }

    #[test]
    fn test_tokens_never_negative() {
        let mut record = BucketRecord::fresh(2, 100.0);

        for i in 0..20 {
            record.apply(0.5, 2, 1.0, 100.0 + i as f64 * 0.1);
            assert!(record.tokens >= 0.0);
            assert!(record.tokens <= 2.0);
        }
    }
}
