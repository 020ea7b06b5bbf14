//! Rate limit policies per endpoint class.
//!
//! Endpoint classes partition the API surface by rate-limit economics:
//! `ai` covers calls into the expensive generation backend, `api` covers
//! ordinary reads and writes, and `auth` covers identity-establishing
//! operations (login, signup), which are throttled the same way whether or
//! not the caller is authenticated. Lookup is total: every
//! (class, authenticated) pair maps to exactly one policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TurnstileError;

/// Coarse category of API operations sharing one set of limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointClass {
    /// Expensive generation endpoints
    Ai,
    /// Ordinary API endpoints
    Api,
    /// Login/signup endpoints
    Auth,
}

impl fmt::Display for EndpointClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EndpointClass::Ai => "ai",
            EndpointClass::Api => "api",
            EndpointClass::Auth => "auth",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for EndpointClass {
    type Err = TurnstileError;

    /// An unknown class label is a programming error in the caller, not a
    /// runtime admission outcome, so it surfaces as a loud `Config` error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ai" => Ok(EndpointClass::Ai),
            "api" => Ok(EndpointClass::Api),
            "auth" => Ok(EndpointClass::Auth),
            other => Err(TurnstileError::Config(format!(
                "unknown endpoint class: {}",
                other
            ))),
        }
    }
}

/// A token-bucket configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Tokens added per second; fractional rates are valid
    /// (0.5 = one token every two seconds).
    pub rate: f64,
    /// Maximum burst size and upper bound on stored tokens.
    pub capacity: u32,
}

impl Policy {
    pub const fn new(rate: f64, capacity: u32) -> Self {
        Self { rate, capacity }
    }

    /// Store expiry for buckets under this policy: twice the time a drained
    /// bucket needs to refill completely, plus a fixed buffer. Long enough
    /// that an active bucket is never evicted mid-conversation, short
    /// enough to bound memory for abandoned ones.
    pub fn idle_ttl_secs(&self) -> u64 {
        (self.capacity as f64 / self.rate * 2.0) as u64 + 60
    }
}

/// Policies for one endpoint class, split by authentication status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassPolicies {
    pub authenticated: Policy,
    pub anonymous: Policy,
}

impl ClassPolicies {
    fn select(&self, authenticated: bool) -> &Policy {
        if authenticated {
            &self.authenticated
        } else {
            &self.anonymous
        }
    }
}

/// The static policy table consulted on every admission check.
///
/// Read-only after construction; the built-in defaults give authenticated
/// callers 4x the anonymous rate on `ai` and 2x on `api`, while `auth`
/// carries a single strict policy to blunt credential guessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyTable {
    #[serde(default = "default_ai_policies")]
    pub ai: ClassPolicies,

    #[serde(default = "default_api_policies")]
    pub api: ClassPolicies,

    #[serde(default = "default_auth_policy")]
    pub auth: Policy,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            ai: default_ai_policies(),
            api: default_api_policies(),
            auth: default_auth_policy(),
        }
    }
}

fn default_ai_policies() -> ClassPolicies {
    ClassPolicies {
        authenticated: Policy::new(2.0, 5),
        anonymous: Policy::new(0.5, 2),
    }
}

fn default_api_policies() -> ClassPolicies {
    ClassPolicies {
        authenticated: Policy::new(10.0, 20),
        anonymous: Policy::new(5.0, 10),
    }
}

fn default_auth_policy() -> Policy {
    Policy::new(0.5, 3)
}

impl PolicyTable {
    /// Look up the policy for an endpoint class and authentication status.
    ///
    /// Total: every valid pair resolves, with no partial matches.
    pub fn lookup(&self, class: EndpointClass, authenticated: bool) -> &Policy {
        match class {
            EndpointClass::Ai => self.ai.select(authenticated),
            EndpointClass::Api => self.api.select(authenticated),
            EndpointClass::Auth => &self.auth,
        }
    }
}
