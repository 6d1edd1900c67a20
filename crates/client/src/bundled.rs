//! Bundled booking source.
//!
//! Stands in for a remote endpoint: reads `booking.json` from a resource
//! directory after a fixed delay (`AppConfig::fetch_delay`, one second by
//! default).

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use booking_core::{BookingRecord, NetworkError, RemoteFetcher};

/// File name of the bundled booking document.
pub const BOOKING_RESOURCE: &str = "booking.json";

/// Fetcher reading the bundled booking document.
#[derive(Debug, Clone)]
pub struct BundledFetcher {
    path: PathBuf,
    delay: Duration,
}

impl BundledFetcher {
    /// Fetcher for `<resource_dir>/booking.json`.
    pub fn new(resource_dir: impl AsRef<Path>, delay: Duration) -> Self {
        Self { path: resource_dir.as_ref().join(BOOKING_RESOURCE), delay }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RemoteFetcher for BundledFetcher {
    async fn fetch_booking(&self) -> Result<BookingRecord, NetworkError> {
        tokio::time::sleep(self.delay).await;

        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "bundled booking document not found");
                return Err(NetworkError::InvalidUrl);
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read bundled booking document");
                return Err(NetworkError::InvalidData);
            }
        };

        let booking = BookingRecord::from_json(&bytes)?;
        tracing::debug!(ship_reference = %booking.ship_reference, path = %self.path.display(), "loaded bundled booking");
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn write_booking(dir: &Path, contents: &str) {
        std::fs::write(dir.join(BOOKING_RESOURCE), contents).unwrap();
    }

    #[tokio::test]
    async fn test_fetch_bundled_document() {
        let dir = tempfile::tempdir().unwrap();
        write_booking(dir.path(), r#"{"shipReference": "ABCDEF", "expiryTime": "9999999999", "segments": [{"id": 1}]}"#);

        let fetcher = BundledFetcher::new(dir.path(), Duration::ZERO);
        let booking = fetcher.fetch_booking().await.unwrap();
        assert_eq!(booking.ship_reference, "ABCDEF");
        assert_eq!(booking.segments.len(), 1);
        assert!(booking.is_valid());
    }

    #[tokio::test]
    async fn test_missing_document_is_invalid_url() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = BundledFetcher::new(dir.path(), Duration::ZERO);
        assert_eq!(fetcher.fetch_booking().await, Err(NetworkError::InvalidUrl));
    }

    #[tokio::test]
    async fn test_malformed_document_is_decoding_error() {
        let dir = tempfile::tempdir().unwrap();
        write_booking(dir.path(), "<html>not a booking</html>");

        let fetcher = BundledFetcher::new(dir.path(), Duration::ZERO);
        assert_eq!(fetcher.fetch_booking().await, Err(NetworkError::DecodingError));
    }

    #[tokio::test]
    async fn test_empty_document_is_decoding_error() {
        let dir = tempfile::tempdir().unwrap();
        write_booking(dir.path(), "");

        let fetcher = BundledFetcher::new(dir.path(), Duration::ZERO);
        assert_eq!(fetcher.fetch_booking().await, Err(NetworkError::DecodingError));
    }

    #[tokio::test]
    async fn test_fetch_waits_for_delay() {
        let dir = tempfile::tempdir().unwrap();
        write_booking(dir.path(), "{}");

        let fetcher = BundledFetcher::new(dir.path(), Duration::from_millis(50));
        let started = Instant::now();
        fetcher.fetch_booking().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_resource_path() {
        let fetcher = BundledFetcher::new("/srv/resources", Duration::from_secs(1));
        assert_eq!(fetcher.path(), Path::new("/srv/resources/booking.json"));
    }
}
