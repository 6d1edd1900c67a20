//! Expiry rules for cached bookings.
//!
//! Two independent clocks decide whether a cached record may be served:
//!
//! - **Validity**: the booking's own `expiry_time` must lie in the future.
//! - **Freshness**: the record must have been fetched less than the cache
//!   TTL ago (300 seconds by default).
//!
//! A record that fails either check is re-fetched on read and removed by
//! the purge routine.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::BookingRecord;

/// Default maximum age of a cached record.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Outcome of evaluating a cached record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Valid and fetched within the TTL.
    Fresh,
    /// The booking itself has expired, or its expiry is unparseable.
    Expired,
    /// The booking is valid but the cached copy is too old.
    Stale,
}

/// Cache expiry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    cache_ttl: Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self { cache_ttl: DEFAULT_CACHE_TTL }
    }
}

impl ExpiryPolicy {
    pub fn new(cache_ttl: Duration) -> Self {
        Self { cache_ttl }
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Age of the cached copy at `now`. Zero if the fetch timestamp is in the future.
    pub fn cache_age(&self, booking: &BookingRecord, now: DateTime<Utc>) -> Duration {
        (now - booking.fetch_timestamp).to_std().unwrap_or(Duration::ZERO)
    }

    /// True once the cached copy has reached the TTL.
    pub fn is_stale(&self, booking: &BookingRecord, now: DateTime<Utc>) -> bool {
        self.cache_age(booking, now) >= self.cache_ttl
    }

    pub fn freshness(&self, booking: &BookingRecord, now: DateTime<Utc>) -> Freshness {
        if !booking.is_valid_at(now) {
            Freshness::Expired
        } else if self.is_stale(booking, now) {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }

    /// Whether the record may be served without fetching.
    pub fn is_fresh(&self, booking: &BookingRecord, now: DateTime<Utc>) -> bool {
        self.freshness(booking, now) == Freshness::Fresh
    }

    /// Whether the purge routine should delete the record.
    pub fn should_purge(&self, booking: &BookingRecord, now: DateTime<Utc>) -> bool {
        !self.is_fresh(booking, now)
    }
}
