//! Admission decisions and their caller-facing quota metadata.

use serde::Serialize;

use crate::policy::Policy;

/// Quota value reported while the limiter is disabled: the caller sees a
/// well-formed decision whose limits read as "unbounded/unknown".
const UNLIMITED_SENTINEL: u32 = 999;

/// Fixed reset window, in seconds, advertised when no denial-derived reset
/// time exists.
const FALLBACK_RESET_SECS: u64 = 60;

/// The outcome of one admission check.
///
/// Denial is a first-class value, not an error. Quota fields echo the
/// bucket state so the host layer can emit response headers without a
/// second store round-trip.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Whole tokens left in the bucket after this check
    pub tokens_remaining: u32,
    /// Burst capacity of the governing policy
    pub limit: u32,
    /// Refill rate of the governing policy, tokens per second
    pub rate: f64,
    /// Seconds until a retry of the denied request can succeed; present
    /// only on denial
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl Decision {
    /// Translate a bucket update into a decision under `policy`.
    ///
    /// On denial the retry delay is the time for the shortfall to refill,
    /// `ceil((cost - tokens) / rate)`, floored at one second so float
    /// noise can never produce a zero or negative wait.
    pub fn evaluate(allowed: bool, tokens: f64, cost: f64, policy: &Policy) -> Self {
        let retry_after = if allowed {
            None
        } else {
            let wait = ((cost - tokens) / policy.rate).ceil();
            Some((wait as u64).max(1))
        };

        Self {
            allowed,
            tokens_remaining: tokens.floor() as u32,
            limit: policy.capacity,
            rate: policy.rate,
            retry_after,
        }
    }

    /// The decision returned while the limiter is running disabled:
    /// always admit, with sentinel quota values.
    pub fn unlimited() -> Self {
        Self {
            allowed: true,
            tokens_remaining: UNLIMITED_SENTINEL,
            limit: UNLIMITED_SENTINEL,
            rate: UNLIMITED_SENTINEL as f64,
            retry_after: None,
        }
    }

    /// Quota headers for the host layer's response.
    ///
    /// `RateLimit-Reset` is an absolute epoch timestamp: the retry delay
    /// when one exists, else a fixed fallback window.
    pub fn quota_headers(&self, now_epoch: u64) -> Vec<(&'static str, String)> {
        let reset = now_epoch + self.retry_after.unwrap_or(FALLBACK_RESET_SECS);

        let mut headers = vec![
            ("RateLimit-Limit", self.limit.to_string()),
            ("RateLimit-Remaining", self.tokens_remaining.to_string()),
            ("RateLimit-Reset", reset.to_string()),
        ];

        if let Some(retry_after) = self.retry_after {
            headers.push(("Retry-After", retry_after.to_string()));
        }

        headers
    }

    /// Structured body for a "too many requests" rejection.
    pub fn rejection_body(&self) -> serde_json::Value {
        let retry_after = self.retry_after.unwrap_or(1);
        serde_json::json!({
            "error": "Rate limit exceeded",
            "message": format!(
                "Too many requests. Please try again in {} seconds.",
                retry_after
            ),
            "retry_after": retry_after,
            "limit": self.limit,
            "rate": format!("{} requests/second", self.rate),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admitted_decision_has_no_retry() {
        let policy = Policy::new(1.0, 10);
        let decision = Decision::evaluate(true, 9.0, 1.0, &policy);

        assert!(decision.allowed);
        assert_eq!(decision.tokens_remaining, 9);
        assert_eq!(decision.limit, 10);
        assert_eq!(decision.retry_after, None);
    }

    #[test]
    fn test_denied_retry_is_shortfall_over_rate() {
        // 0 tokens at 0.5/s: one token is 2 seconds away
        let policy = Policy::new(0.5, 2);
        let decision = Decision::evaluate(false, 0.0, 1.0, &policy);

        assert!(!decision.allowed);
        assert_eq!(decision.retry_after, Some(2));
    }

    #[test]
    fn test_denied_retry_floors_at_one_second() {
        // 0.99 tokens at 10/s refills the shortfall in ~1ms
        let policy = Policy::new(10.0, 20);
        let decision = Decision::evaluate(false, 0.99, 1.0, &policy);

        assert_eq!(decision.retry_after, Some(1));
    }

    #[test]
    fn test_fractional_tokens_report_floored() {
        let policy = Policy::new(1.0, 10);
        let decision = Decision::evaluate(true, 3.7, 1.0, &policy);

        assert_eq!(decision.tokens_remaining, 3);
    }

    #[test]
    fn test_unlimited_sentinels() {
        let decision = Decision::unlimited();

        assert!(decision.allowed);
        assert_eq!(decision.tokens_remaining, 999);
        assert_eq!(decision.limit, 999);
        assert_eq!(decision.retry_after, None);
    }

    #[test]
    fn test_quota_headers_on_admission() {
        let policy = Policy::new(5.0, 10);
        let decision = Decision::evaluate(true, 4.0, 1.0, &policy);

        let headers = decision.quota_headers(1_000);
        assert_eq!(
            headers,
            vec![
                ("RateLimit-Limit", "10".to_string()),
                ("RateLimit-Remaining", "4".to_string()),
                ("RateLimit-Reset", "1060".to_string()),
            ]
        );
    }

    #[test]
    fn test_quota_headers_on_denial_carry_retry_after() {
        let policy = Policy::new(0.5, 2);
        let decision = Decision::evaluate(false, 0.0, 1.0, &policy);

        let headers = decision.quota_headers(1_000);
        assert!(headers.contains(&("Retry-After", "2".to_string())));
        assert!(headers.contains(&("RateLimit-Reset", "1002".to_string())));
    }

    #[test]
    fn test_rejection_body_fields() {
        let policy = Policy::new(0.5, 3);
        let decision = Decision::evaluate(false, 0.5, 1.0, &policy);

        let body = decision.rejection_body();
        assert_eq!(body["retry_after"], 1);
        assert_eq!(body["limit"], 3);
        assert_eq!(body["rate"], "0.5 requests/second");
    }

    #[test]
    fn test_retry_after_omitted_from_serialized_admission() {
        let policy = Policy::new(1.0, 5);
        let decision = Decision::evaluate(true, 4.0, 1.0, &policy);

        let json = serde_json::to_value(&decision).unwrap();
        assert!(json.get("retry_after").is_none());
    }
}
