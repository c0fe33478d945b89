//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Limits are keyed by client IP. [`SmartIpKeyExtractor`] reads the usual
//! proxy headers (`x-forwarded-for`, `x-real-ip`, `forwarded`) and falls back
//! to the peer address, so the server must be started with
//! `into_make_service_with_connect_info::<SocketAddr>()`.

use std::sync::Arc;

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};

use crate::config::RateLimitConfig;

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Seconds between replenished sign-in attempts.
const AUTH_REPLENISH_SECONDS: u64 = 6;

/// Sign-in attempts allowed in a burst.
const AUTH_BURST: u32 = 5;

/// Create the rate limiter for cart endpoints from configuration.
///
/// # Panics
///
/// Never in practice: both values in [`RateLimitConfig`] are non-zero, which
/// is all `GovernorConfigBuilder::finish` checks.
#[must_use]
pub fn cart_rate_limiter(config: &RateLimitConfig) -> RateLimiterLayer {
    let governor = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .per_second(config.per_second.get())
        .burst_size(config.burst.get())
        .finish()
        .expect("non-zero rate limit settings are accepted by governor");
    GovernorLayer::new(Arc::new(governor))
}

/// Create the rate limiter for sign-in endpoints: about 10 per minute per IP.
///
/// # Panics
///
/// Never in practice: the replenish period and burst are non-zero constants.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let governor = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .per_second(AUTH_REPLENISH_SECONDS)
        .burst_size(AUTH_BURST)
        .finish()
        .expect("non-zero rate limit constants are accepted by governor");
    GovernorLayer::new(Arc::new(governor))
}
