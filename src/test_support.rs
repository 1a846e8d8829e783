//! In-memory backend that records every call, for state machine and
//! controller tests.

use crate::{
    client::Backend,
    error::BackendError,
    mode::AdminGrant,
    types::{Analytics, Event, Message, NewEvent, PopularEvent, Seat, UserBooking},
    view::{Render, ViewModel},
};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    ListEvents(Option<String>),
    GetEvent(i64),
    ListSeats(i64),
    CreateBooking {
        user_id: i64,
        event_id: i64,
        seats: Vec<String>,
    },
    CancelBooking(i64),
    ListUserBookings(i64),
    FetchAnalytics,
    CreateEvent(NewEvent),
    DeleteEvent(i64),
    GenerateSeats(i64),
}

pub fn seat(number: &str, available: bool) -> Seat {
    Seat {
        seat_number: number.to_string(),
        is_available: available,
    }
}

pub fn event(id: i64, name: &str, capacity: u32, booked: u32) -> Event {
    Event {
        id,
        name: name.to_string(),
        venue: "Main Hall".to_string(),
        start_time: "2025-09-01 19:30:00+00:00".to_string(),
        total_capacity: capacity,
        tickets_booked: booked,
    }
}

pub struct RecordingBackend {
    calls: Mutex<Vec<BackendCall>>,
    events: Result<Vec<Event>, BackendError>,
    seats: HashMap<i64, Result<Vec<Seat>, BackendError>>,
    booking: Result<Message, BackendError>,
    analytics: Result<Analytics, BackendError>,
    epoch: AtomicU64,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            events: Ok(Vec::new()),
            seats: HashMap::new(),
            booking: Ok(message("Booking successful!")),
            analytics: Ok(Analytics {
                total_bookings: 3,
                most_popular_events: vec![PopularEvent {
                    event_name: "Gala".to_string(),
                    booking_count: 3,
                }],
            }),
            epoch: AtomicU64::new(0),
        }
    }
}

fn message(text: &str) -> Message {
    Message {
        message: text.to_string(),
        id: None,
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events = Ok(events);
        self
    }

    pub fn with_events_error(mut self, err: BackendError) -> Self {
        self.events = Err(err);
        self
    }

    pub fn with_seats(mut self, event_id: i64, seats: Vec<Seat>) -> Self {
        self.seats.insert(event_id, Ok(seats));
        self
    }

    pub fn with_seats_error(mut self, event_id: i64, err: BackendError) -> Self {
        self.seats.insert(event_id, Err(err));
        self
    }

    pub fn with_booking_result(mut self, result: Result<Message, BackendError>) -> Self {
        self.booking = result;
        self
    }

    pub fn with_analytics_error(mut self, err: BackendError) -> Self {
        self.analytics = Err(err);
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn mutated<T>(&self, result: Result<T, BackendError>) -> Result<T, BackendError> {
        if result.is_ok() {
            self.epoch.fetch_add(1, Ordering::AcqRel);
        }
        result
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    async fn list_events(&self, search: Option<&str>) -> Result<Vec<Event>, BackendError> {
        self.record(BackendCall::ListEvents(search.map(str::to_string)));
        self.events.clone()
    }

    async fn get_event(&self, event_id: i64) -> Result<Event, BackendError> {
        self.record(BackendCall::GetEvent(event_id));
        self.events
            .clone()?
            .into_iter()
            .find(|event| event.id == event_id)
            .ok_or_else(|| BackendError::NotFound("Event not found".to_string()))
    }

    async fn list_seats(&self, event_id: i64) -> Result<Vec<Seat>, BackendError> {
        self.record(BackendCall::ListSeats(event_id));
        self.seats.get(&event_id).cloned().unwrap_or(Ok(Vec::new()))
    }

    async fn create_booking(
        &self,
        user_id: i64,
        event_id: i64,
        seat_numbers: &BTreeSet<String>,
    ) -> Result<Message, BackendError> {
        if seat_numbers.is_empty() {
            return Err(BackendError::Validation("select at least one seat".into()));
        }
        self.record(BackendCall::CreateBooking {
            user_id,
            event_id,
            seats: seat_numbers.iter().cloned().collect(),
        });
        self.mutated(self.booking.clone())
    }

    async fn cancel_booking(&self, booking_id: i64) -> Result<Message, BackendError> {
        self.record(BackendCall::CancelBooking(booking_id));
        self.mutated(Ok(message("Booking canceled successfully")))
    }

    async fn list_user_bookings(&self, user_id: i64) -> Result<Vec<UserBooking>, BackendError> {
        self.record(BackendCall::ListUserBookings(user_id));
        Ok(vec![UserBooking {
            event_name: "Gala".to_string(),
            venue: "Main Hall".to_string(),
            start_time: "2025-09-01 19:30:00+00:00".to_string(),
            booking_time: "2025-08-01 10:00:00+00:00".to_string(),
        }])
    }

    async fn fetch_analytics(&self, _grant: &AdminGrant) -> Result<Analytics, BackendError> {
        self.record(BackendCall::FetchAnalytics);
        self.analytics.clone()
    }

    async fn create_event(
        &self,
        _grant: &AdminGrant,
        event: &NewEvent,
    ) -> Result<Message, BackendError> {
        self.record(BackendCall::CreateEvent(event.clone()));
        self.mutated(Ok(message("Event created successfully!")))
    }

    async fn delete_event(
        &self,
        _grant: &AdminGrant,
        event_id: i64,
    ) -> Result<bool, BackendError> {
        self.record(BackendCall::DeleteEvent(event_id));
        self.mutated(Ok(true))
    }

    async fn generate_seats(
        &self,
        _grant: &AdminGrant,
        event_id: i64,
    ) -> Result<Message, BackendError> {
        self.record(BackendCall::GenerateSeats(event_id));
        self.mutated(Ok(message("Seats generated")))
    }

    fn data_epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }
}

/// Renderer that keeps every model it was handed.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    models: Arc<Mutex<Vec<ViewModel>>>,
}

impl RecordingRenderer {
    pub fn last(&self) -> Option<ViewModel> {
        self.models.lock().expect("models lock").last().cloned()
    }

    pub fn notices(&self) -> Vec<String> {
        self.models
            .lock()
            .expect("models lock")
            .iter()
            .filter_map(|model| model.notice.as_ref().map(|notice| notice.text.clone()))
            .collect()
    }
}

impl Render for RecordingRenderer {
    fn render(&mut self, model: &ViewModel) {
        self.models.lock().expect("models lock").push(model.clone());
    }
}
