//! Persistent record store for bookings.
//!
//! `RecordStore` is the seam the coordinator talks to. `CacheDb` implements
//! it on SQLite through tokio-rusqlite:
//!
//! - Every statement runs on one dedicated connection thread
//! - Schema migrations are tracked in a `_migrations` table
//! - Each mutation is a single transaction; partial writes are never visible

pub mod bookings;
pub mod connection;
pub mod migrations;

use async_trait::async_trait;

use crate::{BookingRecord, Error};

pub use connection::CacheDb;

/// Predicate used for bulk deletion.
pub type BookingPredicate = Box<dyn Fn(&BookingRecord) -> bool + Send + 'static>;

/// Queryable key-value store holding booking records.
///
/// Implementations must serialize mutations; callers may issue them
/// concurrently.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert the booking, replacing any record with the same `ship_reference`.
    async fn upsert_booking(&self, booking: &BookingRecord) -> Result<(), Error>;

    /// The record with the earliest `expiry_time`, first in insertion order on ties.
    async fn earliest_expiring(&self) -> Result<Option<BookingRecord>, Error>;

    /// Delete every record matching `predicate` in one transaction.
    ///
    /// Returns the number of deleted records. No write happens when nothing matches.
    async fn delete_where(&self, predicate: BookingPredicate) -> Result<u64, Error>;
}
