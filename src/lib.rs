//! Turnstile - Distributed Token-Bucket Admission Control
//!
//! This crate implements the rate-limiting decision layer for a
//! request-serving API. Each call to [`limiter::Limiter::admit`] resolves
//! the caller to a bucket key, looks up the endpoint-class policy, and
//! executes one atomic token-bucket update against a shared Redis store.
//! When the store is unavailable the limiter fails open: admission control
//! degrades to allow-all rather than taking the protected service down.

pub mod clock;
pub mod config;
pub mod decision;
pub mod error;
pub mod identity;
pub mod limiter;
pub mod policy;
pub mod store;
