//! Booking CRUD operations.
//!
//! A booking is stored as one row in `bookings` plus one row per segment in
//! `segments`, keyed by `(ship_reference, position)` so itinerary order
//! survives the round trip. Absent locations are stored as NULL columns.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, Row, Transaction, types::Type};

use super::connection::CacheDb;
use super::{BookingPredicate, RecordStore};
use crate::models::{Location, OriginAndDestinationPair, Segment};
use crate::{BookingRecord, Error};

const BOOKING_COLUMNS: &str =
    "ship_reference, ship_token, can_issue_ticket_checking, expiry_time, duration, fetch_timestamp";

fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_timestamp(idx: usize, raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn booking_from_row(row: &Row<'_>) -> Result<BookingRecord, rusqlite::Error> {
    let fetch_timestamp: String = row.get(5)?;
    Ok(BookingRecord {
        ship_reference: row.get(0)?,
        ship_token: row.get(1)?,
        can_issue_ticket_checking: row.get::<_, i32>(2)? == 1,
        expiry_time: row.get(3)?,
        duration: row.get(4)?,
        segments: Vec::new(),
        fetch_timestamp: decode_timestamp(5, &fetch_timestamp)?,
    })
}

fn location_from_row(row: &Row<'_>, first: usize) -> Result<Option<Location>, rusqlite::Error> {
    let code: Option<String> = row.get(first)?;
    Ok(match code {
        Some(code) => Some(Location {
            code,
            display_name: row.get::<_, Option<String>>(first + 1)?.unwrap_or_default(),
            url: row.get::<_, Option<String>>(first + 2)?.unwrap_or_default(),
        }),
        None => None,
    })
}

fn segment_from_row(row: &Row<'_>) -> Result<Segment, rusqlite::Error> {
    let has_pair = row.get::<_, i32>(1)? == 1;
    let pair = if has_pair {
        Some(OriginAndDestinationPair {
            origin_city: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            destination_city: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            origin: location_from_row(row, 4)?,
            destination: location_from_row(row, 7)?,
        })
    } else {
        None
    };
    Ok(Segment { id: row.get(0)?, origin_and_destination_pair: pair })
}

fn load_segments(conn: &rusqlite::Connection, ship_reference: &str) -> Result<Vec<Segment>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT
            segment_id, has_pair, origin_city, destination_city,
            origin_code, origin_display_name, origin_url,
            destination_code, destination_display_name, destination_url
        FROM segments WHERE ship_reference = ?1 ORDER BY position ASC",
    )?;
    let segments = stmt
        .query_map(params![ship_reference], segment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(segments)
}

fn load_all(conn: &rusqlite::Connection) -> Result<Vec<BookingRecord>, rusqlite::Error> {
    let mut bookings = {
        let mut stmt = conn.prepare(&format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY rowid ASC"))?;
        stmt.query_map([], booking_from_row)?.collect::<Result<Vec<_>, _>>()?
    };
    for booking in &mut bookings {
        booking.segments = load_segments(conn, &booking.ship_reference)?;
    }
    Ok(bookings)
}

fn write_booking(tx: &Transaction<'_>, booking: &BookingRecord) -> Result<(), rusqlite::Error> {
    tx.execute(
        "INSERT INTO bookings (
            ship_reference, ship_token, can_issue_ticket_checking,
            expiry_time, duration, fetch_timestamp
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(ship_reference) DO UPDATE SET
            ship_token = excluded.ship_token,
            can_issue_ticket_checking = excluded.can_issue_ticket_checking,
            expiry_time = excluded.expiry_time,
            duration = excluded.duration,
            fetch_timestamp = excluded.fetch_timestamp",
        params![
            &booking.ship_reference,
            &booking.ship_token,
            booking.can_issue_ticket_checking as i32,
            &booking.expiry_time,
            booking.duration,
            encode_timestamp(&booking.fetch_timestamp),
        ],
    )?;

    tx.execute("DELETE FROM segments WHERE ship_reference = ?1", params![&booking.ship_reference])?;

    let mut stmt = tx.prepare(
        "INSERT INTO segments (
            ship_reference, position, segment_id, has_pair, origin_city, destination_city,
            origin_code, origin_display_name, origin_url,
            destination_code, destination_display_name, destination_url
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )?;

    for (position, segment) in booking.segments.iter().enumerate() {
        let pair = segment.origin_and_destination_pair.as_ref();
        let origin = pair.and_then(|p| p.origin.as_ref());
        let destination = pair.and_then(|p| p.destination.as_ref());
        stmt.execute(params![
            &booking.ship_reference,
            position as i64,
            segment.id,
            pair.is_some() as i32,
            pair.map(|p| p.origin_city.as_str()),
            pair.map(|p| p.destination_city.as_str()),
            origin.map(|l| l.code.as_str()),
            origin.map(|l| l.display_name.as_str()),
            origin.map(|l| l.url.as_str()),
            destination.map(|l| l.code.as_str()),
            destination.map(|l| l.display_name.as_str()),
            destination.map(|l| l.url.as_str()),
        ])?;
    }

    Ok(())
}

impl CacheDb {
    /// Insert or replace a booking and its segments in one transaction.
    pub async fn upsert_booking(&self, booking: &BookingRecord) -> Result<(), Error> {
        let booking = booking.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                write_booking(&tx, &booking)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a booking by its primary key.
    pub async fn get_booking(&self, ship_reference: &str) -> Result<Option<BookingRecord>, Error> {
        let ship_reference = ship_reference.to_string();
        self.conn
            .call(move |conn| -> Result<Option<BookingRecord>, Error> {
                let result = conn.query_row(
                    &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE ship_reference = ?1"),
                    params![ship_reference],
                    booking_from_row,
                );

                match result {
                    Ok(mut booking) => {
                        booking.segments = load_segments(conn, &booking.ship_reference)?;
                        Ok(Some(booking))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Get the booking with the numerically earliest `expiry_time`.
    ///
    /// Non-numeric expiry values sort first. Ties resolve in insertion order.
    pub async fn earliest_expiring(&self) -> Result<Option<BookingRecord>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<BookingRecord>, Error> {
                let result = conn.query_row(
                    &format!(
                        "SELECT {BOOKING_COLUMNS} FROM bookings
                        ORDER BY CAST(expiry_time AS REAL) ASC, rowid ASC LIMIT 1"
                    ),
                    [],
                    booking_from_row,
                );

                match result {
                    Ok(mut booking) => {
                        booking.segments = load_segments(conn, &booking.ship_reference)?;
                        Ok(Some(booking))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Get every stored booking in insertion order.
    pub async fn all_bookings(&self) -> Result<Vec<BookingRecord>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<BookingRecord>, Error> { Ok(load_all(conn)?) })
            .await
            .map_err(Error::from)
    }

    /// Number of stored bookings.
    pub async fn count_bookings(&self) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM bookings", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every booking matching `predicate`.
    ///
    /// The scan and the delete share one transaction. Segments go with their
    /// booking through the foreign key cascade. Returns the number of deleted
    /// bookings.
    pub async fn delete_where(&self, predicate: BookingPredicate) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let doomed: Vec<String> = load_all(&tx)?
                    .into_iter()
                    .filter(|booking| predicate(booking))
                    .map(|booking| booking.ship_reference)
                    .collect();

                if doomed.is_empty() {
                    return Ok(0);
                }

                let mut deleted = 0u64;
                {
                    let mut stmt = tx.prepare("DELETE FROM bookings WHERE ship_reference = ?1")?;
                    for ship_reference in &doomed {
                        deleted += stmt.execute(params![ship_reference])? as u64;
                    }
                }
                tx.commit()?;
                Ok(deleted)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl RecordStore for CacheDb {
    async fn upsert_booking(&self, booking: &BookingRecord) -> Result<(), Error> {
        CacheDb::upsert_booking(self, booking).await
    }

    async fn earliest_expiring(&self) -> Result<Option<BookingRecord>, Error> {
        CacheDb::earliest_expiring(self).await
    }

    async fn delete_where(&self, predicate: BookingPredicate) -> Result<u64, Error> {
        CacheDb::delete_where(self, predicate).await
    }
}
