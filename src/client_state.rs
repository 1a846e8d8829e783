/// file: src/client_state.rs
/// description: cached listings and notices, kept apart from the controller logic
use crate::{
    client::Backend,
    error::BackendError,
    mode::RefreshPlan,
    types::{Analytics, Event, UserBooking},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Result of one listing refresh, tagged with the backend data epoch
/// observed before the fetch started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub events: Vec<Event>,
    pub analytics: Option<Analytics>,
    pub epoch: u64,
}

/// Runs a refresh plan. In admin mode events and analytics are fetched
/// together and either failure fails the whole listing.
pub async fn fetch_listing(
    backend: &dyn Backend,
    plan: &RefreshPlan,
    search: Option<&str>,
) -> Result<Listing, BackendError> {
    let epoch = backend.data_epoch();
    match plan {
        RefreshPlan::Events => Ok(Listing {
            events: backend.list_events(search).await?,
            analytics: None,
            epoch,
        }),
        RefreshPlan::EventsAndAnalytics(grant) => {
            let (events, analytics) =
                tokio::try_join!(backend.list_events(None), backend.fetch_analytics(grant))?;
            Ok(Listing {
                events,
                analytics: Some(analytics),
                epoch,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

#[derive(Debug)]
pub struct ClientState {
    pub session_id: String,
    events: Vec<Event>,
    analytics: Option<Analytics>,
    bookings: Option<Vec<UserBooking>>,
    search: Option<String>,
    epoch: Option<u64>,
    last_refreshed: Option<DateTime<Utc>>,
    notice: Option<Notice>,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            events: Vec::new(),
            analytics: None,
            bookings: None,
            search: None,
            epoch: None,
            last_refreshed: None,
            notice: None,
        }
    }
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn event(&self, event_id: i64) -> Option<&Event> {
        self.events.iter().find(|event| event.id == event_id)
    }

    pub fn analytics(&self) -> Option<&Analytics> {
        self.analytics.as_ref()
    }

    pub fn bookings(&self) -> Option<&[UserBooking]> {
        self.bookings.as_deref()
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn set_search(&mut self, term: &str) {
        let term = term.trim();
        self.search = (!term.is_empty()).then(|| term.to_string());
    }

    /// True when nothing has been fetched yet or a mutation happened since.
    pub fn is_stale(&self, current_epoch: u64) -> bool {
        self.epoch.is_none_or(|epoch| epoch < current_epoch)
    }

    pub fn apply_listing(&mut self, listing: Listing) {
        debug!(
            events = listing.events.len(),
            analytics = listing.analytics.is_some(),
            epoch = listing.epoch,
            "Applying listing"
        );
        self.events = listing.events;
        self.analytics = listing.analytics;
        self.epoch = Some(listing.epoch);
        self.last_refreshed = Some(Utc::now());
    }

    pub fn apply_bookings(&mut self, bookings: Vec<UserBooking>) {
        self.bookings = Some(bookings);
    }

    pub fn clear_bookings(&mut self) {
        self.bookings = None;
    }

    pub fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notice = Some(Notice {
            level,
            text: text.into(),
        });
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::AdminGrant;
    use crate::test_support::{event, BackendCall, RecordingBackend};

    #[tokio::test]
    async fn user_listing_applies_search_and_skips_analytics() {
        let backend = RecordingBackend::new().with_events(vec![event(1, "Gala", 10, 2)]);
        let listing = fetch_listing(&backend, &RefreshPlan::Events, Some("gala"))
            .await
            .expect("listing");

        assert_eq!(listing.events.len(), 1);
        assert!(listing.analytics.is_none());
        assert_eq!(
            backend.calls(),
            vec![BackendCall::ListEvents(Some("gala".to_string()))]
        );
    }

    #[tokio::test]
    async fn admin_listing_is_all_or_nothing() {
        let backend = RecordingBackend::new()
            .with_events(vec![event(1, "Gala", 10, 2)])
            .with_analytics_error(BackendError::Network("reset".into()));
        let plan = RefreshPlan::EventsAndAnalytics(AdminGrant::new("k"));

        let err = fetch_listing(&backend, &plan, None)
            .await
            .expect_err("analytics failure aborts listing");
        assert!(matches!(err, BackendError::Network(_)));
    }

    #[test]
    fn listing_goes_stale_after_epoch_advances() {
        let mut state = ClientState::new();
        assert!(state.is_stale(0));
        state.apply_listing(Listing {
            events: vec![],
            analytics: None,
            epoch: 2,
        });
        assert!(!state.is_stale(2));
        assert!(state.is_stale(3));
        assert!(state.last_refreshed().is_some());
    }

    #[test]
    fn blank_search_clears_term() {
        let mut state = ClientState::new();
        state.set_search(" jazz ");
        assert_eq!(state.search(), Some("jazz"));
        state.set_search("   ");
        assert_eq!(state.search(), None);
    }
}
