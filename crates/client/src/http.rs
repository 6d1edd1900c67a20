//! HTTP booking source.
//!
//! Fetches the booking document from a URL and classifies failures:
//!
//! - Unparseable or non-http(s) URL: `InvalidUrl`
//! - Transport failure or non-success, non-5xx status: `InvalidResponse`
//! - 5xx status: `ServerError` carrying the status code
//! - Unreadable or oversized body: `InvalidData`
//! - Empty body or body that is not JSON: `DecodingError`

use std::time::{Duration, Instant};

use async_trait::async_trait;
use booking_core::{BookingRecord, NetworkError, RemoteFetcher};
use reqwest::{Client, StatusCode, header};
use url::Url;

/// Maximum accepted body size (1MB).
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Map a non-success status to its network error.
pub fn classify_status(status: StatusCode) -> Option<NetworkError> {
    if status.is_success() {
        None
    } else if status.is_server_error() {
        Some(NetworkError::ServerError(status.as_u16().to_string()))
    } else {
        Some(NetworkError::InvalidResponse)
    }
}

/// Fetcher reading the booking document over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
    url: Url,
}

impl HttpFetcher {
    /// Create a fetcher for `url`.
    ///
    /// # Errors
    ///
    /// `NetworkError::InvalidUrl` if the URL does not parse or is not http(s);
    /// `NetworkError::InvalidResponse` if the HTTP client cannot be built.
    pub fn new(url: &str, user_agent: &str, timeout: Duration) -> Result<Self, NetworkError> {
        let url = Url::parse(url.trim()).map_err(|e| {
            tracing::warn!(url, error = %e, "invalid booking source URL");
            NetworkError::InvalidUrl
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(NetworkError::InvalidUrl);
        }

        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .use_rustls_tls()
            .gzip(true)
            .build()
            .map_err(|e| {
                tracing::warn!(error = %e, "failed to build HTTP client");
                NetworkError::InvalidResponse
            })?;

        Ok(Self { http, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch_booking(&self) -> Result<BookingRecord, NetworkError> {
        let start = Instant::now();

        let response = self
            .http
            .get(self.url.as_str())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %self.url, error = %e, "booking request failed");
                NetworkError::InvalidResponse
            })?;

        if let Some(err) = classify_status(response.status()) {
            tracing::warn!(url = %self.url, status = response.status().as_u16(), "booking request rejected");
            return Err(err);
        }

        if let Some(len) = response.content_length()
            && len as usize > MAX_BODY_BYTES
        {
            return Err(NetworkError::InvalidData);
        }

        let bytes = response.bytes().await.map_err(|e| {
            tracing::warn!(url = %self.url, error = %e, "failed to read booking response");
            NetworkError::InvalidData
        })?;

        if bytes.len() > MAX_BODY_BYTES {
            return Err(NetworkError::InvalidData);
        }

        let booking = BookingRecord::from_json(&bytes)?;

        tracing::debug!(
            "fetched booking {} from {} in {}ms ({} bytes)",
            booking.ship_reference,
            self.url,
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::OK), None);
        assert_eq!(classify_status(StatusCode::SERVICE_UNAVAILABLE), Some(NetworkError::ServerError("503".into())));
        assert_eq!(classify_status(StatusCode::INTERNAL_SERVER_ERROR), Some(NetworkError::ServerError("500".into())));
        assert_eq!(classify_status(StatusCode::NOT_FOUND), Some(NetworkError::InvalidResponse));
        assert_eq!(classify_status(StatusCode::FOUND), Some(NetworkError::InvalidResponse));
    }

    #[test]
    fn test_new_rejects_bad_urls() {
        let timeout = Duration::from_secs(5);
        assert_eq!(HttpFetcher::new("not a url", "test", timeout).unwrap_err(), NetworkError::InvalidUrl);
        assert_eq!(HttpFetcher::new("ftp://example.com/b.json", "test", timeout).unwrap_err(), NetworkError::InvalidUrl);
    }

    #[tokio::test]
    async fn test_new_accepts_https() {
        let fetcher = HttpFetcher::new(" https://example.com/booking.json ", "test", Duration::from_secs(5)).unwrap();
        assert_eq!(fetcher.url().as_str(), "https://example.com/booking.json");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_invalid_response() {
        let fetcher = HttpFetcher::new("http://127.0.0.1:9/booking.json", "test", Duration::from_millis(500)).unwrap();
        assert_eq!(fetcher.fetch_booking().await, Err(NetworkError::InvalidResponse));
    }
}
