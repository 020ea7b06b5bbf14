//! Bucket key resolution from the calling context.

use std::net::IpAddr;

/// Fallback address component when neither a forwarded chain nor a
/// transport peer address is available.
const UNKNOWN_ADDRESS: &str = "unknown";

/// The calling context for one admission check.
///
/// Assembled by the host layer from whatever it knows about the request:
/// the transport peer, the forwarded-address header chain when the service
/// sits behind a proxy, and the verified identity when authentication has
/// already run. The identity value is opaque and used as-is for key
/// construction.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Verified caller identity, if any
    pub identity: Option<String>,
    /// Raw forwarded-address header chain (comma-separated, proxy order)
    pub forwarded_for: Option<String>,
    /// Transport-level peer address
    pub peer_addr: Option<IpAddr>,
}

impl RequestContext {
    /// Context for an anonymous caller reached directly.
    pub fn anonymous(peer_addr: IpAddr) -> Self {
        Self {
            identity: None,
            forwarded_for: None,
            peer_addr: Some(peer_addr),
        }
    }

    /// Context for an authenticated caller.
    pub fn authenticated(identity: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
            forwarded_for: None,
            peer_addr: None,
        }
    }

    pub fn with_forwarded_for(mut self, chain: impl Into<String>) -> Self {
        self.forwarded_for = Some(chain.into());
        self
    }

    pub fn with_peer_addr(mut self, peer_addr: IpAddr) -> Self {
        self.peer_addr = Some(peer_addr);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Resolve the bucket key for this context.
    ///
    /// Identity wins strictly over address: an authenticated caller is
    /// never charged against an anonymous quota and cannot escape its own
    /// by rotating source addresses. Anonymous callers are keyed by the
    /// left-most forwarded entry when a proxy chain is present, else the
    /// transport peer.
    pub fn bucket_key(&self) -> String {
        if let Some(ref identity) = self.identity {
            return format!("user:{}", identity);
        }

        let address = self
            .forwarded_for
            .as_deref()
            .and_then(|chain| chain.split(',').next())
            .map(|entry| entry.trim().to_string())
            .filter(|entry| !entry.is_empty())
            .or_else(|| self.peer_addr.map(|addr| addr.to_string()))
            .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string());

        format!("ip:{}", address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn localhost() -> IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    #[test]
    fn test_identity_key() {
        let ctx = RequestContext::authenticated("42");
        assert_eq!(ctx.bucket_key(), "user:42");
    }

    #[test]
    fn test_identity_wins_over_addresses() {
        let ctx = RequestContext::authenticated("42")
            .with_forwarded_for("203.0.113.9")
            .with_peer_addr(localhost());

        assert_eq!(ctx.bucket_key(), "user:42");
    }

    #[test]
    fn test_same_identity_different_addresses_share_a_key() {
        let a = RequestContext::authenticated("42").with_peer_addr(localhost());
        let b = RequestContext::authenticated("42").with_peer_addr("10.0.0.7".parse().unwrap());

        assert_eq!(a.bucket_key(), b.bucket_key());
    }

    #[test]
    fn test_different_identities_same_address_get_separate_keys() {
        let a = RequestContext::authenticated("42").with_peer_addr(localhost());
        let b = RequestContext::authenticated("43").with_peer_addr(localhost());

        assert_ne!(a.bucket_key(), b.bucket_key());
    }

    #[test]
    fn test_forwarded_chain_uses_leftmost_entry() {
        let ctx = RequestContext::default().with_forwarded_for("203.0.113.9, 10.0.0.1, 10.0.0.2");
        assert_eq!(ctx.bucket_key(), "ip:203.0.113.9");
    }

    #[test]
    fn test_forwarded_entry_is_trimmed() {
        let ctx = RequestContext::default().with_forwarded_for("  203.0.113.9 , 10.0.0.1");
        assert_eq!(ctx.bucket_key(), "ip:203.0.113.9");
    }

    #[test]
    fn test_forwarded_wins_over_peer() {
        let ctx = RequestContext::anonymous(localhost()).with_forwarded_for("203.0.113.9");
        assert_eq!(ctx.bucket_key(), "ip:203.0.113.9");
    }

    #[test]
    fn test_peer_address_fallback() {
        let ctx = RequestContext::anonymous(localhost());
        assert_eq!(ctx.bucket_key(), "ip:127.0.0.1");
    }

    #[test]
    fn test_unknown_sentinel_when_nothing_available() {
        let ctx = RequestContext::default();
        assert_eq!(ctx.bucket_key(), "ip:unknown");
    }

    #[test]
    fn test_empty_forwarded_chain_falls_through() {
        let ctx = RequestContext::anonymous(localhost()).with_forwarded_for("  ");
        assert_eq!(ctx.bucket_key(), "ip:127.0.0.1");
    }
}
