/// file: src/view.rs
/// description: pure projection from client state to a renderable view model
use crate::{
    client_state::{ClientState, Notice},
    mode::ViewMode,
    selection::{SeatMap, SeatSelection, SelectionPhase},
    types::{Analytics, UserBooking},
};
use serde::Serialize;

/// Presentation surface. Called after every state change with the full model.
pub trait Render: Send {
    fn render(&mut self, model: &ViewModel);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewModel {
    pub mode: &'static str,
    pub search: Option<String>,
    pub events: Vec<EventRow>,
    pub analytics: Option<Analytics>,
    pub seat_modal: Option<SeatModal>,
    pub bookings: Option<Vec<UserBooking>>,
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRow {
    pub id: i64,
    pub name: String,
    pub venue: String,
    pub start_time: String,
    pub seats_left: u32,
    pub tickets_booked: u32,
    pub total_capacity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Available,
    Selected,
    Booked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatView {
    pub seat_number: String,
    pub status: SeatStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatModal {
    pub event_id: i64,
    pub event_name: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    pub seats: Vec<SeatView>,
    pub chosen: Vec<String>,
    pub can_submit: bool,
    pub submitting: bool,
}

pub fn project(state: &ClientState, selection: &SeatSelection, mode: &ViewMode) -> ViewModel {
    let events = state
        .events()
        .iter()
        .map(|event| EventRow {
            id: event.id,
            name: event.name.clone(),
            venue: event.venue.clone(),
            start_time: event.start_time.clone(),
            seats_left: event.seats_left(),
            tickets_booked: event.tickets_booked,
            total_capacity: event.total_capacity,
        })
        .collect();

    ViewModel {
        mode: mode.label(),
        // admin listings are never filtered
        search: (!mode.is_admin())
            .then(|| state.search().map(str::to_string))
            .flatten(),
        events,
        analytics: mode
            .is_admin()
            .then(|| state.analytics().cloned())
            .flatten(),
        seat_modal: project_modal(state, selection),
        bookings: state.bookings().map(<[UserBooking]>::to_vec),
        notice: state.notice().cloned(),
    }
}

fn project_modal(state: &ClientState, selection: &SeatSelection) -> Option<SeatModal> {
    let (event_id, seats, chosen, submitting) = match selection.phase() {
        SelectionPhase::Closed => return None,
        SelectionPhase::Open {
            event_id,
            seats,
            chosen,
            ..
        } => (*event_id, seats, chosen, false),
        SelectionPhase::Submitting {
            event_id,
            seats,
            chosen,
            ..
        } => (*event_id, seats, chosen, true),
    };

    let (loading, error, seat_views) = match seats {
        SeatMap::Loading => (true, None, Vec::new()),
        SeatMap::Failed(message) => (false, Some(message.clone()), Vec::new()),
        SeatMap::Loaded(map) => {
            let views = map
                .iter()
                .map(|(number, available)| SeatView {
                    seat_number: number.clone(),
                    status: match (*available, chosen.contains(number)) {
                        (false, _) => SeatStatus::Booked,
                        (true, true) => SeatStatus::Selected,
                        (true, false) => SeatStatus::Available,
                    },
                })
                .collect();
            (false, None, views)
        }
    };

    Some(SeatModal {
        event_id,
        event_name: state.event(event_id).map(|event| event.name.clone()),
        loading,
        error,
        seats: seat_views,
        chosen: chosen.iter().cloned().collect(),
        can_submit: selection.can_submit(),
        submitting,
    })
}
