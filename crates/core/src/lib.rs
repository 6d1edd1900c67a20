//! Core types and the read-through booking cache.
//!
//! This crate provides:
//! - The booking data model and its permissive JSON decoding
//! - The expiry policy (booking validity and cache freshness)
//! - A SQLite-backed record store
//! - `BookingCoordinator`, which serves cached bookings and refreshes them
//! - Unified error types and layered configuration

pub mod config;
pub mod coordinator;
pub mod error;
pub mod expiry;
pub mod fetcher;
pub mod models;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use coordinator::BookingCoordinator;
pub use error::{Error, NetworkError};
pub use expiry::{ExpiryPolicy, Freshness};
pub use fetcher::RemoteFetcher;
pub use models::{BookingRecord, Location, OriginAndDestinationPair, Segment};
pub use store::{CacheDb, RecordStore};
