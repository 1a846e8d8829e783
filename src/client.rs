// file: src/client.rs
// description: REST client for the evently ticketing backend

use crate::{
    config::BackendConfig,
    error::{BackendError, EventlyError},
    mode::AdminGrant,
    monitoring,
    types::{
        Analytics, ApiReply, BookingRequest, Event, Message, NewEvent, Seat, UserBooking,
        UserBookings,
    },
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, trace, warn};

const ADMIN_KEY_HEADER: &str = "X-API-Key";

/// Operations the evently backend exposes to this client.
///
/// Admin operations take an [`AdminGrant`], so they can only be issued after
/// the mode toggle has authorized the operator.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_events(&self, search: Option<&str>) -> Result<Vec<Event>, BackendError>;

    async fn get_event(&self, event_id: i64) -> Result<Event, BackendError>;

    async fn list_seats(&self, event_id: i64) -> Result<Vec<Seat>, BackendError>;

    /// Books every seat in `seat_numbers`; an empty set is rejected before
    /// anything is sent.
    async fn create_booking(
        &self,
        user_id: i64,
        event_id: i64,
        seat_numbers: &BTreeSet<String>,
    ) -> Result<Message, BackendError>;

    async fn cancel_booking(&self, booking_id: i64) -> Result<Message, BackendError>;

    async fn list_user_bookings(&self, user_id: i64) -> Result<Vec<UserBooking>, BackendError>;

    async fn fetch_analytics(&self, grant: &AdminGrant) -> Result<Analytics, BackendError>;

    async fn create_event(
        &self,
        grant: &AdminGrant,
        event: &NewEvent,
    ) -> Result<Message, BackendError>;

    /// Returns `false` when the backend has no such event.
    async fn delete_event(
        &self,
        grant: &AdminGrant,
        event_id: i64,
    ) -> Result<bool, BackendError>;

    async fn generate_seats(
        &self,
        grant: &AdminGrant,
        event_id: i64,
    ) -> Result<Message, BackendError>;

    /// Monotonic counter advanced by every successful mutation. Listings
    /// fetched under an older epoch are stale.
    fn data_epoch(&self) -> u64;
}

pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    epoch: AtomicU64,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, EventlyError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("evently/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| EventlyError::Config(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            epoch: AtomicU64::new(0),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn invalidate(&self, operation: &'static str) {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(operation, epoch, "Cached listings invalidated");
    }

    async fn send(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, BackendError> {
        monitoring::REQUEST_COUNTER.increment(1);
        trace!(operation, "Sending request");
        request.send().await.map_err(|e| {
            warn!(operation, error = %e, "Request failed in transport");
            let err = BackendError::Network(e.to_string());
            monitoring::record_failure(operation, &err);
            err
        })
    }

    /// Decodes a JSON reply, mapping `{"error": ...}` bodies and non-success
    /// statuses through `classify`.
    async fn read_reply<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        response: reqwest::Response,
        classify: fn(StatusCode, Failure) -> BackendError,
    ) -> Result<T, BackendError> {
        let status = response.status();
        let result = match response.text().await {
            Err(e) => Err(BackendError::Network(e.to_string())),
            Ok(body) => match serde_json::from_str::<ApiReply<T>>(&body) {
                Ok(ApiReply::Success(value)) if status.is_success() => Ok(value),
                Ok(ApiReply::Success(_)) => Err(classify(
                    status,
                    Failure::Unreadable(format!("unexpected status {status}")),
                )),
                Ok(ApiReply::Failure(err)) => Err(classify(status, Failure::Reported(err.error))),
                Err(e) if status.is_success() => Err(BackendError::Parse(e.to_string())),
                Err(_) => Err(classify(status, Failure::Unreadable(truncate(&body)))),
            },
        };

        if let Err(err) = &result {
            warn!(operation, status = status.as_u16(), error = %err, "Backend call failed");
            monitoring::record_failure(operation, err);
        }
        result
    }
}

/// Why a reply did not decode as a success.
enum Failure {
    /// The backend answered with an `{"error": ...}` body.
    Reported(String),
    /// Unexpected status, or a body that is not the expected JSON.
    Unreadable(String),
}

impl Failure {
    fn into_message(self) -> String {
        match self {
            Failure::Reported(message) | Failure::Unreadable(message) => message,
        }
    }
}

fn classify_status(status: StatusCode, failure: Failure) -> BackendError {
    let message = failure.into_message();
    match status {
        StatusCode::NOT_FOUND => BackendError::NotFound(message),
        StatusCode::CONFLICT => BackendError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            BackendError::Validation(message)
        }
        _ => BackendError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

// Any error field from the seat endpoint means the seat map is unavailable,
// whatever the status; the backend sends those with a 500.
fn classify_seats(status: StatusCode, failure: Failure) -> BackendError {
    match failure {
        Failure::Reported(message) => BackendError::NotFound(message),
        unreadable => classify_status(status, unreadable),
    }
}

fn classify_booking(status: StatusCode, failure: Failure) -> BackendError {
    match failure {
        Failure::Reported(message) if message.contains("already booked") => {
            BackendError::Conflict(message)
        }
        other => classify_status(status, other),
    }
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "empty response body".to_string();
    }
    body.chars().take(200).collect()
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_events(&self, search: Option<&str>) -> Result<Vec<Event>, BackendError> {
        let mut request = self.http.get(self.url("events"));
        if let Some(term) = search.map(str::trim).filter(|term| !term.is_empty()) {
            request = request.query(&[("search", term)]);
        }
        let response = self.send("list_events", request).await?;
        let events: Vec<Event> = self
            .read_reply("list_events", response, classify_status)
            .await?;
        debug!(count = events.len(), ?search, "Fetched events");
        Ok(events)
    }

    async fn get_event(&self, event_id: i64) -> Result<Event, BackendError> {
        let request = self.http.get(self.url(&format!("events/{event_id}")));
        let response = self.send("get_event", request).await?;
        self.read_reply("get_event", response, classify_status)
            .await
    }

    async fn list_seats(&self, event_id: i64) -> Result<Vec<Seat>, BackendError> {
        let request = self.http.get(self.url(&format!("events/{event_id}/seats")));
        let response = self.send("list_seats", request).await?;
        let seats: Vec<Seat> = self
            .read_reply("list_seats", response, classify_seats)
            .await?;
        debug!(event_id, count = seats.len(), "Fetched seat map");
        Ok(seats)
    }

    async fn create_booking(
        &self,
        user_id: i64,
        event_id: i64,
        seat_numbers: &BTreeSet<String>,
    ) -> Result<Message, BackendError> {
        if seat_numbers.is_empty() {
            return Err(BackendError::Validation(
                "select at least one seat".to_string(),
            ));
        }

        let body = BookingRequest {
            user_id,
            event_id,
            seat_numbers: seat_numbers.iter().map(String::as_str).collect(),
        };
        let request = self.http.post(self.url("bookings")).json(&body);
        let response = self.send("create_booking", request).await?;
        let message: Message = self
            .read_reply("create_booking", response, classify_booking)
            .await?;

        monitoring::BOOKING_COUNTER.increment(1);
        info!(user_id, event_id, seats = seat_numbers.len(), "Booking confirmed");
        self.invalidate("create_booking");
        Ok(message)
    }

    async fn cancel_booking(&self, booking_id: i64) -> Result<Message, BackendError> {
        let request = self.http.delete(self.url(&format!("bookings/{booking_id}")));
        let response = self.send("cancel_booking", request).await?;
        let message: Message = self
            .read_reply("cancel_booking", response, classify_status)
            .await?;
        info!(booking_id, "Booking canceled");
        self.invalidate("cancel_booking");
        Ok(message)
    }

    async fn list_user_bookings(&self, user_id: i64) -> Result<Vec<UserBooking>, BackendError> {
        let request = self.http.get(self.url(&format!("users/{user_id}/bookings")));
        let response = self.send("list_user_bookings", request).await?;
        let bookings: UserBookings = self
            .read_reply("list_user_bookings", response, classify_status)
            .await?;
        Ok(bookings.bookings)
    }

    async fn fetch_analytics(&self, grant: &AdminGrant) -> Result<Analytics, BackendError> {
        let request = self
            .http
            .get(self.url("admin/analytics"))
            .header(ADMIN_KEY_HEADER, grant.api_key());
        let response = self.send("fetch_analytics", request).await?;
        self.read_reply("fetch_analytics", response, classify_status)
            .await
    }

    async fn create_event(
        &self,
        grant: &AdminGrant,
        event: &NewEvent,
    ) -> Result<Message, BackendError> {
        let request = self
            .http
            .post(self.url("admin/events"))
            .header(ADMIN_KEY_HEADER, grant.api_key())
            .json(event);
        let response = self.send("create_event", request).await?;
        let message: Message = self
            .read_reply("create_event", response, classify_status)
            .await?;
        info!(name = %event.name, id = ?message.id, "Event created");
        self.invalidate("create_event");
        Ok(message)
    }

    async fn delete_event(
        &self,
        grant: &AdminGrant,
        event_id: i64,
    ) -> Result<bool, BackendError> {
        let request = self
            .http
            .delete(self.url(&format!("admin/events/{event_id}")))
            .header(ADMIN_KEY_HEADER, grant.api_key());
        let response = self.send("delete_event", request).await?;
        let status = response.status();

        if status.is_success() {
            info!(event_id, "Event deleted");
            self.invalidate("delete_event");
            return Ok(true);
        }
        if status == StatusCode::NOT_FOUND {
            warn!(event_id, "Event to delete does not exist");
            return Ok(false);
        }

        let err = BackendError::Server {
            status: status.as_u16(),
            message: "failed to delete event".to_string(),
        };
        warn!(event_id, status = status.as_u16(), "Event deletion rejected");
        monitoring::record_failure("delete_event", &err);
        Err(err)
    }

    async fn generate_seats(
        &self,
        grant: &AdminGrant,
        event_id: i64,
    ) -> Result<Message, BackendError> {
        let request = self
            .http
            .post(self.url(&format!("admin/events/{event_id}/generate-seats")))
            .header(ADMIN_KEY_HEADER, grant.api_key());
        let response = self.send("generate_seats", request).await?;
        let message: Message = self
            .read_reply("generate_seats", response, classify_status)
            .await?;
        info!(event_id, "Seat inventory generated");
        self.invalidate("generate_seats");
        Ok(message)
    }

    fn data_epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }
}
