//! Remote fetcher seam.

use async_trait::async_trait;

use crate::{BookingRecord, NetworkError};

/// Source of fresh booking records.
///
/// Each call produces at most one record. Implementations decide their own
/// latency and timeouts; the coordinator imposes none.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn fetch_booking(&self) -> Result<BookingRecord, NetworkError>;
}
