/// file: src/selection.rs
/// description: seat selection and booking workflow state machine
use crate::{
    client::Backend,
    error::{BackendError, EventlyError},
    monitoring,
    types::{Message, Seat},
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Identifies one selection session (one open of the seat modal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionToken(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatMap {
    Loading,
    Loaded(BTreeMap<String, bool>), // seat number -> available
    Failed(String),
}

impl SeatMap {
    pub fn is_selectable(&self, seat_number: &str) -> bool {
        match self {
            SeatMap::Loaded(seats) => seats.get(seat_number).copied().unwrap_or(false),
            SeatMap::Loading | SeatMap::Failed(_) => false,
        }
    }

    pub fn selectable_count(&self) -> usize {
        match self {
            SeatMap::Loaded(seats) => seats.values().filter(|available| **available).count(),
            SeatMap::Loading | SeatMap::Failed(_) => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPhase {
    Closed,
    Open {
        session: SessionToken,
        event_id: i64,
        seats: SeatMap,
        chosen: BTreeSet<String>,
    },
    Submitting {
        session: SessionToken,
        event_id: i64,
        seats: SeatMap,
        chosen: BTreeSet<String>,
    },
}

impl SelectionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            SelectionPhase::Closed => "closed",
            SelectionPhase::Open { .. } => "open",
            SelectionPhase::Submitting { .. } => "submitting",
        }
    }
}

/// What a submission needs once the state machine has committed to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingTicket {
    pub session: SessionToken,
    pub event_id: i64,
    pub seats: BTreeSet<String>,
}

/// Owns the chosen-seat set. Nothing outside this type mutates it.
#[derive(Debug)]
pub struct SeatSelection {
    phase: SelectionPhase,
    last_session: u64,
}

impl Default for SeatSelection {
    fn default() -> Self {
        Self {
            phase: SelectionPhase::Closed,
            last_session: 0,
        }
    }
}

impl SeatSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &SelectionPhase {
        &self.phase
    }

    pub fn target_event(&self) -> Option<i64> {
        match &self.phase {
            SelectionPhase::Closed => None,
            SelectionPhase::Open { event_id, .. } | SelectionPhase::Submitting { event_id, .. } => {
                Some(*event_id)
            }
        }
    }

    pub fn chosen(&self) -> Option<&BTreeSet<String>> {
        match &self.phase {
            SelectionPhase::Closed => None,
            SelectionPhase::Open { chosen, .. } | SelectionPhase::Submitting { chosen, .. } => {
                Some(chosen)
            }
        }
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.phase, SelectionPhase::Submitting { .. })
    }

    pub fn can_submit(&self) -> bool {
        matches!(&self.phase, SelectionPhase::Open { chosen, .. } if !chosen.is_empty())
    }

    fn invalid(&self, action: &'static str) -> EventlyError {
        EventlyError::InvalidTransition {
            action,
            state: self.phase.name(),
        }
    }

    /// Starts a selection session for `event_id`. The seat map stays
    /// `Loading` until [`SeatSelection::apply_seats`] delivers it.
    pub fn begin_open(&mut self, event_id: i64) -> Result<SessionToken, EventlyError> {
        if !matches!(self.phase, SelectionPhase::Closed) {
            return Err(self.invalid("open a seat map"));
        }

        self.last_session += 1;
        let session = SessionToken(self.last_session);
        self.phase = SelectionPhase::Open {
            session,
            event_id,
            seats: SeatMap::Loading,
            chosen: BTreeSet::new(),
        };
        debug!(event_id, ?session, "Selection session opened");
        Ok(session)
    }

    /// Installs a fetched seat map. Returns `false` and leaves the state
    /// untouched when `session` is no longer the open session.
    pub fn apply_seats(
        &mut self,
        session: SessionToken,
        result: Result<Vec<Seat>, BackendError>,
    ) -> bool {
        let is_current = matches!(
            &self.phase,
            SelectionPhase::Open { session: current, seats: SeatMap::Loading, .. }
                if *current == session
        );
        if !is_current {
            return self.discard_stale(session, "seat map");
        }
        let SelectionPhase::Open { seats, event_id, .. } = &mut self.phase else {
            return false;
        };

        *seats = match result {
            Ok(list) => SeatMap::Loaded(
                list.into_iter()
                    .map(|seat| (seat.seat_number, seat.is_available))
                    .collect(),
            ),
            Err(e) => {
                warn!(event_id = *event_id, error = %e, "Seat map unavailable");
                SeatMap::Failed(e.to_string())
            }
        };
        true
    }

    fn discard_stale(&self, session: SessionToken, what: &'static str) -> bool {
        monitoring::STALE_RESULTS_COUNTER.increment(1);
        debug!(?session, what, state = self.phase.name(), "Discarding stale result");
        false
    }

    /// Flips membership of an available seat. Unknown or booked seats are
    /// ignored. Returns whether the chosen set changed.
    pub fn toggle(&mut self, seat_number: &str) -> Result<bool, EventlyError> {
        let SelectionPhase::Open { seats, chosen, .. } = &mut self.phase else {
            return Err(self.invalid("toggle a seat"));
        };

        if !seats.is_selectable(seat_number) {
            debug!(seat_number, "Ignoring toggle on unavailable seat");
            return Ok(false);
        }
        if !chosen.remove(seat_number) {
            chosen.insert(seat_number.to_string());
        }
        Ok(true)
    }

    /// Commits the current choice for booking. Rejected without any state
    /// change when nothing is chosen.
    pub fn begin_submit(&mut self) -> Result<BookingTicket, EventlyError> {
        match std::mem::replace(&mut self.phase, SelectionPhase::Closed) {
            SelectionPhase::Open {
                session,
                event_id,
                seats,
                chosen,
            } if !chosen.is_empty() => {
                let ticket = BookingTicket {
                    session,
                    event_id,
                    seats: chosen.clone(),
                };
                self.phase = SelectionPhase::Submitting {
                    session,
                    event_id,
                    seats,
                    chosen,
                };
                info!(event_id, seats = ticket.seats.len(), "Submitting booking");
                Ok(ticket)
            }
            phase @ SelectionPhase::Open { .. } => {
                self.phase = phase;
                Err(BackendError::Validation("select at least one seat".to_string()).into())
            }
            phase => {
                self.phase = phase;
                Err(self.invalid("submit a booking"))
            }
        }
    }

    /// Ends a submission whatever its outcome. Returns `false` if `session`
    /// is not the submission in flight.
    pub fn finish_submit(&mut self, session: SessionToken) -> bool {
        match &self.phase {
            SelectionPhase::Submitting { session: current, .. } if *current == session => {
                self.phase = SelectionPhase::Closed;
                true
            }
            _ => self.discard_stale(session, "booking outcome"),
        }
    }

    /// Abandons the open session. A no-op when already closed; refused while a
    /// submission is in flight.
    pub fn close(&mut self) -> Result<(), EventlyError> {
        match self.phase {
            SelectionPhase::Closed => Ok(()),
            SelectionPhase::Open { .. } => {
                self.phase = SelectionPhase::Closed;
                Ok(())
            }
            SelectionPhase::Submitting { .. } => Err(self.invalid("close the seat map")),
        }
    }
}

/// Drives a [`SeatSelection`] end to end against a backend, awaiting each
/// call in place.
pub struct BookingWorkflow<'a> {
    backend: &'a dyn Backend,
    user_id: i64,
}

impl<'a> BookingWorkflow<'a> {
    pub fn new(backend: &'a dyn Backend, user_id: i64) -> Self {
        Self { backend, user_id }
    }

    pub async fn open(
        &self,
        selection: &mut SeatSelection,
        event_id: i64,
    ) -> Result<(), EventlyError> {
        let session = selection.begin_open(event_id)?;
        let result = self.backend.list_seats(event_id).await;
        selection.apply_seats(session, result);
        Ok(())
    }

    pub async fn submit(&self, selection: &mut SeatSelection) -> Result<Message, EventlyError> {
        let ticket = selection.begin_submit()?;
        let result = self
            .backend
            .create_booking(self.user_id, ticket.event_id, &ticket.seats)
            .await;
        selection.finish_submit(ticket.session);
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seat, BackendCall, RecordingBackend};
    use proptest::prelude::*;

    fn opened(seats: Vec<Seat>) -> SeatSelection {
        let mut selection = SeatSelection::new();
        let session = selection.begin_open(5).expect("open");
        assert!(selection.apply_seats(session, Ok(seats)));
        selection
    }

    fn chosen(selection: &SeatSelection) -> Vec<String> {
        selection
            .chosen()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    proptest! {
        #[test]
        fn toggle_membership_follows_call_parity(count in 0usize..40) {
            let mut selection = opened(vec![seat("3D", true)]);
            for _ in 0..count {
                selection.toggle("3D").expect("toggle");
            }
            let present = selection.chosen().is_some_and(|set| set.contains("3D"));
            prop_assert_eq!(present, count % 2 == 1);
        }

        #[test]
        fn toggling_booked_seat_never_changes_choice(count in 1usize..20, pre_pick in any::<bool>()) {
            let mut selection = opened(vec![seat("1A", true), seat("1B", false)]);
            if pre_pick {
                selection.toggle("1A").expect("toggle");
            }
            let before = chosen(&selection);
            for _ in 0..count {
                prop_assert!(!selection.toggle("1B").expect("toggle"));
            }
            prop_assert_eq!(chosen(&selection), before);
        }
    }

    #[test]
    fn double_toggle_restores_previous_choice() {
        let mut selection = opened(vec![seat("2B", true), seat("2C", true)]);
        selection.toggle("2B").expect("toggle");
        let before = chosen(&selection);
        selection.toggle("2C").expect("toggle");
        selection.toggle("2C").expect("toggle");
        assert_eq!(chosen(&selection), before);
    }

    #[test]
    fn open_is_only_valid_from_closed() {
        let mut selection = opened(vec![seat("1A", true)]);
        assert!(matches!(
            selection.begin_open(6),
            Err(EventlyError::InvalidTransition { state: "open", .. })
        ));
        assert_eq!(selection.target_event(), Some(5));
    }

    #[test]
    fn toggle_requires_open_session() {
        let mut selection = SeatSelection::new();
        assert!(selection.toggle("1A").is_err());
        assert!(selection.chosen().is_none());
    }

    #[test]
    fn seats_are_not_selectable_while_loading() {
        let mut selection = SeatSelection::new();
        selection.begin_open(5).expect("open");
        assert!(!selection.toggle("1A").expect("toggle"));
        assert!(!selection.can_submit());
    }

    #[test]
    fn failed_seat_map_leaves_nothing_selectable() {
        let mut selection = SeatSelection::new();
        let session = selection.begin_open(9).expect("open");
        selection.apply_seats(
            session,
            Err(BackendError::NotFound("event not found".to_string())),
        );

        assert!(matches!(
            selection.phase(),
            SelectionPhase::Open { seats: SeatMap::Failed(_), .. }
        ));
        assert!(!selection.toggle("1").expect("toggle"));
        assert!(matches!(
            selection.begin_submit(),
            Err(EventlyError::Backend(BackendError::Validation(_)))
        ));
    }

    #[test]
    fn seat_map_arriving_after_close_is_discarded() {
        let mut selection = SeatSelection::new();
        let first = selection.begin_open(5).expect("open");
        selection.close().expect("close");
        assert!(!selection.apply_seats(first, Ok(vec![seat("1A", true)])));
        assert_eq!(selection.phase(), &SelectionPhase::Closed);

        let second = selection.begin_open(5).expect("reopen");
        assert!(!selection.apply_seats(first, Ok(vec![seat("9Z", true)])));
        assert!(selection.apply_seats(second, Ok(vec![seat("1A", true)])));
        assert!(!selection.toggle("9Z").expect("toggle"));
        assert!(selection.toggle("1A").expect("toggle"));
    }

    #[test]
    fn close_discards_choice_but_not_while_submitting() {
        let mut selection = opened(vec![seat("1A", true)]);
        selection.toggle("1A").expect("toggle");
        let ticket = selection.begin_submit().expect("submit");

        assert!(matches!(
            selection.close(),
            Err(EventlyError::InvalidTransition { state: "submitting", .. })
        ));
        assert!(selection.finish_submit(ticket.session));
        assert!(selection.chosen().is_none());
        assert!(selection.target_event().is_none());
        selection.close().expect("close when closed");
    }

    #[test]
    fn finish_submit_ignores_foreign_session() {
        let mut selection = opened(vec![seat("1A", true)]);
        selection.toggle("1A").expect("toggle");
        let ticket = selection.begin_submit().expect("submit");
        assert!(!selection.finish_submit(SessionToken(ticket.session.0 + 1)));
        assert!(selection.is_submitting());
    }

    #[tokio::test]
    async fn booking_scenario_books_only_available_choice_once() {
        let backend = RecordingBackend::new().with_seats(5, vec![seat("1A", true), seat("1B", false)]);
        let workflow = BookingWorkflow::new(&backend, 1);
        let mut selection = SeatSelection::new();

        workflow.open(&mut selection, 5).await.expect("open");
        assert!(selection.toggle("1A").expect("toggle"));
        assert_eq!(chosen(&selection), vec!["1A".to_string()]);
        assert!(!selection.toggle("1B").expect("toggle"));
        assert_eq!(chosen(&selection), vec!["1A".to_string()]);

        workflow.submit(&mut selection).await.expect("booked");

        let bookings: Vec<_> = backend
            .calls()
            .into_iter()
            .filter(|call| matches!(call, BackendCall::CreateBooking { .. }))
            .collect();
        assert_eq!(
            bookings,
            vec![BackendCall::CreateBooking {
                user_id: 1,
                event_id: 5,
                seats: vec!["1A".to_string()],
            }]
        );
        assert_eq!(selection.phase(), &SelectionPhase::Closed);
    }

    #[tokio::test]
    async fn failed_booking_still_returns_to_closed() {
        let backend = RecordingBackend::new()
            .with_seats(5, vec![seat("1A", true)])
            .with_booking_result(Err(BackendError::Conflict("Seat 1A is already booked.".into())));
        let workflow = BookingWorkflow::new(&backend, 1);
        let mut selection = SeatSelection::new();

        workflow.open(&mut selection, 5).await.expect("open");
        selection.toggle("1A").expect("toggle");
        let err = workflow.submit(&mut selection).await.expect_err("conflict");

        assert!(matches!(err, EventlyError::Backend(BackendError::Conflict(_))));
        assert_eq!(selection.phase(), &SelectionPhase::Closed);
        assert!(selection.chosen().is_none());
    }

    #[tokio::test]
    async fn empty_submit_makes_no_network_call() {
        let backend = RecordingBackend::new().with_seats(5, vec![seat("1A", true)]);
        let workflow = BookingWorkflow::new(&backend, 1);
        let mut selection = SeatSelection::new();

        workflow.open(&mut selection, 5).await.expect("open");
        assert!(workflow.submit(&mut selection).await.is_err());
        assert!(matches!(selection.phase(), SelectionPhase::Open { .. }));
        assert_eq!(backend.calls(), vec![BackendCall::ListSeats(5)]);
    }

    #[tokio::test]
    async fn missing_seat_map_scenario_keeps_submit_rejected() {
        let backend = RecordingBackend::new()
            .with_seats_error(9, BackendError::NotFound("event not found".into()));
        let workflow = BookingWorkflow::new(&backend, 1);
        let mut selection = SeatSelection::new();

        workflow.open(&mut selection, 9).await.expect("open");
        let SelectionPhase::Open { seats, .. } = selection.phase() else {
            panic!("expected open phase");
        };
        assert_eq!(seats.selectable_count(), 0);
        assert!(workflow.submit(&mut selection).await.is_err());
        assert!(!backend
            .calls()
            .iter()
            .any(|call| matches!(call, BackendCall::CreateBooking { .. })));
    }
}
