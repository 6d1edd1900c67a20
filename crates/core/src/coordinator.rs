//! Read-through booking cache.
//!
//! `BookingCoordinator` decides whether to serve the cached booking or fetch
//! a fresh one, writes fetched records back to the store, and purges
//! records that are expired or stale.
//!
//! ### Read path
//! - `get()` serves the earliest-expiring stored record if it is fresh,
//!   otherwise fetches and caches.
//! - `refresh()` always fetches and caches.
//! - `cached()` only reads; it never fetches.
//!
//! ### Write path
//! A fetched record only counts as success once it is stored. A failed
//! write fails the whole operation even though data was fetched.
//!
//! ### Concurrency
//! Concurrent fetches are not coalesced. Two callers racing through
//! `get()` and `refresh()` both fetch and both write; the store's
//! insert-or-replace makes the last write win.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::expiry::{ExpiryPolicy, Freshness};
use crate::{BookingRecord, Error, RecordStore, RemoteFetcher};

/// Cache coordinator shared by every consumer in the process.
///
/// Cloning is cheap; clones share the store and fetcher.
#[derive(Clone)]
pub struct BookingCoordinator {
    store: Arc<dyn RecordStore>,
    fetcher: Arc<dyn RemoteFetcher>,
    policy: ExpiryPolicy,
}

impl std::fmt::Debug for BookingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingCoordinator").field("policy", &self.policy).finish_non_exhaustive()
    }
}

impl BookingCoordinator {
    /// Build a coordinator and purge expired records from the store.
    ///
    /// # Errors
    ///
    /// Returns the store error if the startup purge fails. The coordinator
    /// must not be used against a store it could not clean.
    pub async fn open(
        store: Arc<dyn RecordStore>, fetcher: Arc<dyn RemoteFetcher>, policy: ExpiryPolicy,
    ) -> Result<Self, Error> {
        let coordinator = Self { store, fetcher, policy };
        coordinator.purge_expired().await?;
        Ok(coordinator)
    }

    /// Return the cached booking if fresh, otherwise fetch and cache a new one.
    pub async fn get(&self) -> Result<BookingRecord, Error> {
        if let Some(booking) = self.store.earliest_expiring().await? {
            let now = Utc::now();
            match self.policy.freshness(&booking, now) {
                Freshness::Fresh => {
                    debug!(
                        ship_reference = %booking.ship_reference,
                        age_secs = self.policy.cache_age(&booking, now).as_secs(),
                        "cache hit"
                    );
                    return Ok(booking);
                }
                Freshness::Expired => {
                    debug!(ship_reference = %booking.ship_reference, expiry_time = %booking.expiry_time, "booking expired");
                }
                Freshness::Stale => {
                    debug!(
                        ship_reference = %booking.ship_reference,
                        age_secs = self.policy.cache_age(&booking, now).as_secs(),
                        max_age_secs = self.policy.cache_ttl().as_secs(),
                        "cached booking too old"
                    );
                }
            }
        } else {
            debug!("cache empty");
        }

        self.fetch_and_cache().await
    }

    /// Fetch and cache a new booking, ignoring whatever is cached.
    pub async fn refresh(&self) -> Result<BookingRecord, Error> {
        self.fetch_and_cache().await
    }

    /// Read the cached booking without fetching.
    ///
    /// # Errors
    ///
    /// - `Error::NoDataAvailable` if the store is empty
    /// - `Error::DataExpired` if the cached booking is expired or stale
    pub async fn cached(&self) -> Result<BookingRecord, Error> {
        let booking = self.store.earliest_expiring().await?.ok_or(Error::NoDataAvailable)?;
        if self.policy.is_fresh(&booking, Utc::now()) { Ok(booking) } else { Err(Error::DataExpired) }
    }

    /// Delete every stored booking that is expired or stale.
    ///
    /// Returns the number of deleted records; an empty match is a no-op.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let policy = self.policy;
        let now = Utc::now();
        let deleted = self
            .store
            .delete_where(Box::new(move |booking: &BookingRecord| policy.should_purge(booking, now)))
            .await?;

        if deleted > 0 {
            info!(deleted, "purged expired bookings");
        } else {
            debug!("no expired bookings in cache");
        }
        Ok(deleted)
    }

    /// Run `purge_expired` every `period` until `shutdown` fires.
    ///
    /// The first purge happens one period after spawning. Failures are
    /// logged and the task keeps running.
    pub fn spawn_purge_task(&self, period: Duration, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = coordinator.purge_expired().await {
                            warn!(error = %e, "periodic purge failed");
                        }
                    }
                    _ = shutdown.recv() => {
                        debug!("purge task received shutdown signal");
                        break;
                    }
                }
            }
        })
    }

    async fn fetch_and_cache(&self) -> Result<BookingRecord, Error> {
        let fetcher = Arc::clone(&self.fetcher);
        let started = Instant::now();

        let booking = tokio::spawn(async move { fetcher.fetch_booking().await })
            .await
            .map_err(|e| {
                warn!(error = %e, "fetch task ended without a result");
                Error::NoDataAvailable
            })?
            .map_err(|e| {
                warn!(error = %e, "booking fetch failed");
                Error::Network(e)
            })?;

        debug!(
            ship_reference = %booking.ship_reference,
            fetch_ms = started.elapsed().as_millis() as u64,
            "fetched booking"
        );

        if let Err(e) = self.store.upsert_booking(&booking).await {
            warn!(ship_reference = %booking.ship_reference, error = %e, "failed to cache booking");
            return Err(e);
        }

        Ok(booking)
    }
}
