/// file: src/types.rs
/// description: type definitions and data structures for the evently REST api payloads
use crate::error::BackendError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Format accepted for operator-entered start times (`datetime-local` shape).
pub const LOCAL_START_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

// Core data structures based on the evently API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub venue: String,
    pub start_time: String, // ISO-8601 as stored by the backend
    pub total_capacity: u32,
    #[serde(default)]
    pub tickets_booked: u32,
}

impl Event {
    pub fn seats_left(&self) -> u32 {
        self.total_capacity.saturating_sub(self.tickets_booked)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub seat_number: String,
    pub is_available: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analytics {
    pub total_bookings: u64,
    #[serde(default)]
    pub most_popular_events: Vec<PopularEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularEvent {
    pub event_name: String,
    pub booking_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBooking {
    pub event_name: String,
    pub venue: String,
    pub start_time: String,
    pub booking_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBookings {
    pub bookings: Vec<UserBooking>,
}

// Request bodies
#[derive(Debug, Clone, Serialize)]
pub struct BookingRequest<'a> {
    pub user_id: i64,
    pub event_id: i64,
    pub seat_numbers: Vec<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub venue: String,
    pub start_time: String,
    pub total_capacity: u32,
}

impl NewEvent {
    /// Builds a creation request from operator input, converting the local
    /// start time into the wire format.
    pub fn from_local(
        name: &str,
        venue: &str,
        local_start: &str,
        total_capacity: u32,
    ) -> Result<Self, BackendError> {
        if name.trim().is_empty() {
            return Err(BackendError::Validation("event name is required".into()));
        }
        if venue.trim().is_empty() {
            return Err(BackendError::Validation("venue is required".into()));
        }
        Ok(Self {
            name: name.trim().to_string(),
            venue: venue.trim().to_string(),
            start_time: format_start_time(local_start)?,
            total_capacity,
        })
    }
}

/// Appends seconds and the UTC suffix to a `YYYY-MM-DDTHH:MM` value.
///
/// The backend expects exactly `"<local-datetime>:00Z"`; the input is
/// validated but otherwise passed through untouched.
pub fn format_start_time(local: &str) -> Result<String, BackendError> {
    let local = local.trim();
    NaiveDateTime::parse_from_str(local, LOCAL_START_TIME_FORMAT).map_err(|e| {
        BackendError::Validation(format!(
            "start time '{local}' must look like 2025-01-31T19:30 ({e})"
        ))
    })?;
    Ok(format!("{local}:00Z"))
}

// Response envelopes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Either a typed payload or the backend's `{"error": ...}` object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiReply<T> {
    Failure(ErrorBody),
    Success(T),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_time_gets_seconds_and_utc_suffix() {
        assert_eq!(
            format_start_time("2025-09-01T19:30").unwrap(),
            "2025-09-01T19:30:00Z"
        );
    }

    #[test]
    fn start_time_rejects_other_shapes() {
        for bad in ["", "2025-09-01", "2025-09-01T19:30:00", "tomorrow"] {
            assert!(matches!(
                format_start_time(bad),
                Err(BackendError::Validation(_))
            ));
        }
    }

    #[test]
    fn seat_list_reply_accepts_error_object() {
        let reply: ApiReply<Vec<Seat>> =
            serde_json::from_str(r#"{"error": "event not found"}"#).unwrap();
        assert!(matches!(reply, ApiReply::Failure(body) if body.error == "event not found"));

        let reply: ApiReply<Vec<Seat>> =
            serde_json::from_str(r#"[{"seat_number": "1A", "is_available": true}]"#).unwrap();
        assert!(matches!(reply, ApiReply::Success(seats) if seats.len() == 1));
    }

    #[test]
    fn event_defaults_missing_booking_count() {
        let event: Event = serde_json::from_str(
            r#"{"id": 3, "name": "Gala", "venue": "Hall", "start_time": "2025-09-01 19:30:00+00:00", "total_capacity": 10}"#,
        )
        .unwrap();
        assert_eq!(event.tickets_booked, 0);
        assert_eq!(event.seats_left(), 10);
    }

    #[test]
    fn new_event_requires_name_and_venue() {
        assert!(NewEvent::from_local(" ", "Hall", "2025-09-01T19:30", 5).is_err());
        assert!(NewEvent::from_local("Gala", "", "2025-09-01T19:30", 5).is_err());
        let event = NewEvent::from_local("Gala", "Hall", "2025-09-01T19:30", 5).unwrap();
        assert_eq!(event.start_time, "2025-09-01T19:30:00Z");
    }
}
