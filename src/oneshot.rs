/// file: src/oneshot.rs
/// description: non-interactive subcommands that run one workflow and render the result once
use crate::{
    cli::Commands,
    client::Backend,
    client_state::{fetch_listing, ClientState, Listing, NoticeLevel},
    error::{BackendError, EventlyError},
    mode::{AdminAuthorizer, RefreshPlan, ViewMode},
    selection::{BookingWorkflow, SeatMap, SeatSelection, SelectionPhase},
    view::{project, Render},
};
use std::collections::BTreeSet;
use tracing::{debug, info};

pub struct OneShot<'a> {
    pub backend: &'a dyn Backend,
    pub authorizer: &'a dyn AdminAuthorizer,
    pub admin_key: Option<&'a str>,
    pub user_id: i64,
}

impl OneShot<'_> {
    pub async fn run(
        &self,
        command: &Commands,
        renderer: &mut dyn Render,
    ) -> Result<(), EventlyError> {
        debug!(?command, "Running one-shot command");
        let mut state = ClientState::new();
        let mut selection = SeatSelection::new();
        let mut mode = ViewMode::User;

        match command {
            Commands::Shell => {
                return Err(EventlyError::Config(
                    "the shell runs through the interactive controller".to_string(),
                ));
            }
            Commands::Events { search } => {
                if let Some(term) = search {
                    state.set_search(term);
                }
                let listing =
                    fetch_listing(self.backend, &RefreshPlan::Events, state.search()).await?;
                state.apply_listing(listing);
            }
            Commands::Seats { event_id } => {
                self.load_event(&mut state, *event_id).await?;
                BookingWorkflow::new(self.backend, self.user_id)
                    .open(&mut selection, *event_id)
                    .await?;
            }
            Commands::Book { event_id, seats } => {
                self.load_event(&mut state, *event_id).await?;
                let workflow = BookingWorkflow::new(self.backend, self.user_id);
                workflow.open(&mut selection, *event_id).await?;
                if let SelectionPhase::Open {
                    seats: SeatMap::Failed(message),
                    ..
                } = selection.phase()
                {
                    return Err(BackendError::NotFound(message.clone()).into());
                }
                let wanted: BTreeSet<&str> = seats.iter().map(String::as_str).collect();
                for seat_number in &wanted {
                    if !selection.toggle(seat_number)? {
                        return Err(BackendError::Validation(format!(
                            "seat {seat_number} is not available"
                        ))
                        .into());
                    }
                }
                let message = workflow.submit(&mut selection).await?;
                info!(event_id = *event_id, seats = wanted.len(), "Booked from command line");
                state.notify(NoticeLevel::Info, message.message);
                self.load_event(&mut state, *event_id).await?;
            }
            Commands::Bookings => {
                let bookings = self.backend.list_user_bookings(self.user_id).await?;
                state.apply_bookings(bookings);
            }
            Commands::Analytics => {
                let grant = self
                    .authorizer
                    .authorize(self.admin_key.unwrap_or_default())
                    .await?;
                let plan = RefreshPlan::EventsAndAnalytics(grant.clone());
                state.apply_listing(fetch_listing(self.backend, &plan, None).await?);
                mode = ViewMode::Admin(grant);
            }
        }

        renderer.render(&project(&state, &selection, &mode));
        Ok(())
    }

    async fn load_event(&self, state: &mut ClientState, event_id: i64) -> Result<(), EventlyError> {
        let epoch = self.backend.data_epoch();
        let event = self.backend.get_event(event_id).await?;
        state.apply_listing(Listing {
            events: vec![event],
            analytics: None,
            epoch,
        });
        Ok(())
    }
}
