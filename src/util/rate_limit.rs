//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Eye-data messages per second accepted from one relay client.
/// Browser trackers emit at camera rate, usually 30-60 Hz.
pub const EYE_DATA_RATE_LIMIT: u32 = 120;

/// Per-connection rate limiter state
#[derive(Clone)]
pub struct ClientRateLimiter {
    eye_data_limiter: Arc<Limiter>,
}

impl ClientRateLimiter {
    pub fn new() -> Self {
        Self::with_rate(EYE_DATA_RATE_LIMIT)
    }

    pub fn with_rate(per_second: u32) -> Self {
        Self {
            eye_data_limiter: create_limiter(per_second),
        }
    }

    /// Check if an eye-data message is allowed (returns true if allowed)
    pub fn check_eye_data(&self) -> bool {
        self.eye_data_limiter.check().is_ok()
    }
}

impl Default for ClientRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_beyond_quota_is_rejected() {
        let limiter = ClientRateLimiter::with_rate(5);
        let allowed = (0..20).filter(|_| limiter.check_eye_data()).count();
        assert_eq!(allowed, 5);
    }
}
