//! Booking data model.
//!
//! A `BookingRecord` owns its ordered `Segment`s; each segment carries at
//! most one `OriginAndDestinationPair`, which in turn holds value copies of
//! its `Location`s. Nothing below the record has an identity of its own.

pub(crate) mod lenient;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::NetworkError;

/// A place referenced by a segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, deserialize_with = "lenient::string")]
    pub code: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub display_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub url: String,
}

/// Origin and destination of a single segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginAndDestinationPair {
    #[serde(default, deserialize_with = "lenient::object")]
    pub origin: Option<Location>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub destination: Option<Location>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub origin_city: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub destination_city: String,
}

/// One leg of the itinerary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Display key only; not required to be unique.
    #[serde(default, deserialize_with = "lenient::int")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient::object")]
    pub origin_and_destination_pair: Option<OriginAndDestinationPair>,
}

/// The cached unit.
///
/// `expiry_time` governs whether the booking itself is still valid;
/// `fetch_timestamp` governs whether the cached copy is still fresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    #[serde(default, deserialize_with = "lenient::string")]
    pub ship_reference: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub ship_token: String,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub can_issue_ticket_checking: bool,
    /// Unix seconds, as text.
    #[serde(default, deserialize_with = "lenient::string")]
    pub expiry_time: String,
    #[serde(default, deserialize_with = "lenient::int")]
    pub duration: i64,
    #[serde(default, deserialize_with = "lenient::list")]
    pub segments: Vec<Segment>,
    #[serde(skip_deserializing, default = "Utc::now")]
    pub fetch_timestamp: DateTime<Utc>,
}

impl Default for BookingRecord {
    fn default() -> Self {
        Self {
            ship_reference: String::new(),
            ship_token: String::new(),
            can_issue_ticket_checking: false,
            expiry_time: String::new(),
            duration: 0,
            segments: Vec::new(),
            fetch_timestamp: Utc::now(),
        }
    }
}

impl BookingRecord {
    /// Decode a booking document, stamping it as fetched now.
    ///
    /// # Errors
    ///
    /// `NetworkError::DecodingError` if the document is empty or not JSON.
    /// A JSON root that is not an object decodes to an all-default booking.
    pub fn from_json(bytes: &[u8]) -> Result<Self, NetworkError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| {
            tracing::debug!(error = %e, "booking document is not valid JSON");
            NetworkError::DecodingError
        })?;

        let mut booking: Self = if value.is_object() {
            serde_json::from_value(value).map_err(|e| {
                tracing::debug!(error = %e, "booking document failed to decode");
                NetworkError::DecodingError
            })?
        } else {
            tracing::debug!("booking document root is not an object");
            Self::default()
        };
        booking.fetch_timestamp = Utc::now();
        Ok(booking)
    }

    /// The booking's own expiry instant in Unix seconds, if `expiry_time` is a finite number.
    pub fn expiry_seconds(&self) -> Option<f64> {
        self.expiry_time.parse::<f64>().ok().filter(|secs| secs.is_finite())
    }

    /// Whether the booking is still valid at `now`.
    ///
    /// An unparseable expiry is never valid.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry_seconds() {
            Some(expiry) => (now.timestamp_millis() as f64 / 1000.0) < expiry,
            None => false,
        }
    }

    /// Whether the booking is still valid right now.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SAMPLE: &str = r#"{
        "shipReference": "ABCDEF",
        "shipToken": "AAAABBBCCCCDDD",
        "canIssueTicketChecking": false,
        "expiryTime": "1722409261",
        "duration": 2430,
        "segments": [
            {
                "id": 1,
                "originAndDestinationPair": {
                    "destination": {"code": "BBB", "displayName": "BBB DisplayName", "url": "www.ship.com"},
                    "destinationCity": "AAA",
                    "origin": {"code": "AAA", "displayName": "AAA DisplayName", "url": "www.ship.com"},
                    "originCity": "BBB"
                }
            },
            {"id": 2}
        ]
    }"#;

    fn with_expiry(expiry: &str) -> BookingRecord {
        BookingRecord { ship_reference: "REF".into(), expiry_time: expiry.into(), ..Default::default() }
    }

    #[test]
    fn test_decode_full_document() {
        let booking = BookingRecord::from_json(SAMPLE.as_bytes()).unwrap();
        assert_eq!(booking.ship_reference, "ABCDEF");
        assert_eq!(booking.ship_token, "AAAABBBCCCCDDD");
        assert!(!booking.can_issue_ticket_checking);
        assert_eq!(booking.expiry_time, "1722409261");
        assert_eq!(booking.duration, 2430);
        assert_eq!(booking.segments.len(), 2);

        let pair = booking.segments[0].origin_and_destination_pair.as_ref().unwrap();
        assert_eq!(pair.origin_city, "BBB");
        assert_eq!(pair.destination_city, "AAA");
        assert_eq!(pair.origin.as_ref().unwrap().code, "AAA");
        assert_eq!(pair.destination.as_ref().unwrap().display_name, "BBB DisplayName");

        assert_eq!(booking.segments[1].id, 2);
        assert!(booking.segments[1].origin_and_destination_pair.is_none());
    }

    #[test]
    fn test_decode_stamps_fetch_time() {
        let before = Utc::now();
        let booking = BookingRecord::from_json(br#"{"shipReference":"X","fetchTimestamp":"1970-01-01T00:00:00Z"}"#).unwrap();
        assert!(booking.fetch_timestamp >= before);
    }

    #[test]
    fn test_decode_empty_object_defaults() {
        let booking = BookingRecord::from_json(b"{}").unwrap();
        assert_eq!(booking.ship_reference, "");
        assert_eq!(booking.expiry_time, "");
        assert_eq!(booking.duration, 0);
        assert!(booking.segments.is_empty());
    }

    #[test]
    fn test_decode_mistyped_nested_values() {
        let json = r#"{"segments": [{"id": "7", "originAndDestinationPair": {"origin": "nope"}}, 3], "expiryTime": 42}"#;
        let booking = BookingRecord::from_json(json.as_bytes()).unwrap();
        assert_eq!(booking.expiry_time, "42");
        assert_eq!(booking.segments.len(), 2);
        assert_eq!(booking.segments[0].id, 7);
        let pair = booking.segments[0].origin_and_destination_pair.as_ref().unwrap();
        assert_eq!(pair.origin, Some(Location::default()));
        assert_eq!(pair.destination, None);
        assert_eq!(booking.segments[1], Segment::default());
    }

    #[test]
    fn test_decode_segments_not_array() {
        let booking = BookingRecord::from_json(br#"{"segments": {"id": 1}}"#).unwrap();
        assert!(booking.segments.is_empty());
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        assert_eq!(BookingRecord::from_json(b""), Err(NetworkError::DecodingError));
        assert_eq!(BookingRecord::from_json(b"  \n"), Err(NetworkError::DecodingError));
        assert_eq!(BookingRecord::from_json(b"{not json"), Err(NetworkError::DecodingError));
    }

    #[test]
    fn test_decode_non_object_root_defaults() {
        for doc in [&b"[1, 2]"[..], b"\"text\"", b"42", b"null"] {
            let booking = BookingRecord::from_json(doc).unwrap();
            assert_eq!(booking.ship_reference, "");
            assert_eq!(booking.expiry_time, "");
            assert!(booking.segments.is_empty());
            assert!(!booking.is_valid());
        }
    }

    #[test]
    fn test_decode_null_nested_objects_are_absent() {
        let doc = br#"{"segments": [
            {"id": 1, "originAndDestinationPair": null},
            {"id": 2, "originAndDestinationPair": {"origin": null, "destination": "BBB"}}
        ]}"#;
        let booking = BookingRecord::from_json(doc).unwrap();
        assert!(booking.segments[0].origin_and_destination_pair.is_none());

        let pair = booking.segments[1].origin_and_destination_pair.as_ref().unwrap();
        assert!(pair.origin.is_none());
        assert_eq!(pair.destination, Some(Location::default()));
    }

    #[test]
    fn test_validity_far_future() {
        assert!(with_expiry("9999999999").is_valid());
    }

    #[test]
    fn test_validity_past() {
        assert!(!with_expiry("1").is_valid());
    }

    #[test]
    fn test_validity_unparseable() {
        assert!(!with_expiry("").is_valid());
        assert!(!with_expiry("tomorrow").is_valid());
        assert!(!with_expiry("inf").is_valid());
        assert!(!with_expiry("NaN").is_valid());
    }

    #[test]
    fn test_validity_boundary_is_exclusive() {
        let now = Utc::now();
        let exact = with_expiry(&(now.timestamp_millis() as f64 / 1000.0).to_string());
        assert!(!exact.is_valid_at(now));
        assert!(exact.is_valid_at(now - Duration::seconds(1)));
    }

    #[test]
    fn test_validity_fractional_seconds() {
        let now = Utc::now();
        let expiry = format!("{}.5", now.timestamp());
        assert!(with_expiry(&expiry).is_valid_at(now - Duration::seconds(1)));
    }
}
