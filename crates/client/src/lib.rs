//! Booking sources for the cache coordinator.
//!
//! This crate provides the `RemoteFetcher` implementations:
//!
//! - `BundledFetcher`: reads the bundled `booking.json` after a simulated delay
//! - `HttpFetcher` (feature `http`): fetches the document from a URL

pub mod bundled;
#[cfg(feature = "http")]
pub mod http;

pub use bundled::{BOOKING_RESOURCE, BundledFetcher};
#[cfg(feature = "http")]
pub use http::HttpFetcher;
