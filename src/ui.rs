/// file: src/ui.rs
/// description: controller that owns selection, mode and cached data, and dispatches commands
use crate::{
    client::Backend,
    client_state::{fetch_listing, ClientState, NoticeLevel},
    error::{BackendError, EventlyError},
    events::{AdminAction, AppEvent, Command, EventReceiver, EventSender, HELP},
    mode::{AdminAuthorizer, AdminGrant, ModeToggle, RefreshRequest},
    monitoring,
    selection::SeatSelection,
    view::{project, Render},
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

pub struct UIController {
    backend: Arc<dyn Backend>,
    authorizer: Arc<dyn AdminAuthorizer>,
    renderer: Box<dyn Render>,
    event_sender: EventSender,
    event_receiver: EventReceiver,
    state: ClientState,
    selection: SeatSelection,
    mode: ModeToggle,
    user_id: i64,
    in_flight: usize,
    input_closed: bool,
}

pub struct UIOptions {
    pub user_id: i64,
}

impl UIController {
    pub fn new(
        backend: Arc<dyn Backend>,
        authorizer: Arc<dyn AdminAuthorizer>,
        renderer: Box<dyn Render>,
        channel: (EventSender, EventReceiver),
        options: UIOptions,
    ) -> Self {
        let (event_sender, event_receiver) = channel;
        Self {
            backend,
            authorizer,
            renderer,
            event_sender,
            event_receiver,
            state: ClientState::new(),
            selection: SeatSelection::new(),
            mode: ModeToggle::new(),
            user_id: options.user_id,
            in_flight: 0,
            input_closed: false,
        }
    }

    pub fn selection(&self) -> &SeatSelection {
        &self.selection
    }

    pub fn mode(&self) -> &ModeToggle {
        &self.mode
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    /// Number of spawned backend calls whose completion has not been handled.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub async fn run(&mut self) {
        let span = info_span!("controller", session_id = %self.state.session_id);
        async {
            info!(user_id = self.user_id, "Controller started");
            self.start();
            while self.step().await {}
            info!("Controller stopped");
        }
        .instrument(span)
        .await
    }

    /// Enters user mode and kicks off the first listing.
    pub fn start(&mut self) {
        let request = self.mode.enter_user();
        self.start_refresh(request);
        self.render();
    }

    /// Waits for and handles one event. Returns `false` once the controller
    /// should stop.
    pub async fn step(&mut self) -> bool {
        match self.event_receiver.recv().await {
            Some(event) => self.handle_event(event).await,
            None => false,
        }
    }

    pub async fn handle_event(&mut self, event: AppEvent) -> bool {
        let keep_running = match event {
            AppEvent::Command(command) => self.dispatch(command).await,
            AppEvent::InputRejected(reason) => {
                self.state.notify(NoticeLevel::Error, reason);
                true
            }
            AppEvent::InputClosed => {
                debug!(in_flight = self.in_flight, "Input closed");
                self.input_closed = true;
                true
            }
            AppEvent::ListingLoaded { token, result } => {
                self.completed();
                if !self.mode.is_current(token) {
                    monitoring::STALE_RESULTS_COUNTER.increment(1);
                    debug!(?token, "Discarding superseded listing");
                } else {
                    match result {
                        Ok(listing) => self.state.apply_listing(listing),
                        Err(e) => self.report("Could not load events", &e),
                    }
                }
                true
            }
            AppEvent::SeatsLoaded { session, result } => {
                self.completed();
                self.selection.apply_seats(session, result);
                true
            }
            AppEvent::BookingFinished { session, result } => {
                self.completed();
                self.selection.finish_submit(session);
                match result {
                    Ok(message) => self.state.notify(NoticeLevel::Info, message.message),
                    Err(e) => self.report("Booking failed", &e),
                }
                self.refresh_if_stale();
                true
            }
            AppEvent::AdminActionFinished { action, result } => {
                self.completed();
                match result {
                    Ok(message) => self.state.notify(NoticeLevel::Info, message),
                    Err(e) => {
                        let context = match action {
                            AdminAction::CreateEvent => "Failed to create event",
                            AdminAction::DeleteEvent(_) => "Failed to delete event",
                            AdminAction::GenerateSeats(_) => "Failed to generate seats",
                        };
                        self.report(context, &e);
                    }
                }
                self.refresh_if_stale();
                true
            }
            AppEvent::BookingsLoaded(result) => {
                self.completed();
                match result {
                    Ok(bookings) => self.state.apply_bookings(bookings),
                    Err(e) => self.report("Could not load bookings", &e),
                }
                true
            }
            AppEvent::BookingCanceled(result) => {
                self.completed();
                match result {
                    Ok(message) => {
                        self.state.clear_bookings();
                        self.state.notify(NoticeLevel::Info, message.message);
                    }
                    Err(e) => self.report("Cancellation failed", &e),
                }
                self.refresh_if_stale();
                true
            }
        };

        self.render();
        keep_running && !(self.input_closed && self.in_flight == 0)
    }

    async fn dispatch(&mut self, command: Command) -> bool {
        debug!(?command, "Dispatching command");
        match command {
            Command::Search(term) => {
                self.state.set_search(&term);
                let request = self.mode.refresh();
                self.start_refresh(request);
            }
            Command::Refresh => {
                let request = self.mode.refresh();
                self.start_refresh(request);
            }
            Command::Open(event_id) => match self.selection.begin_open(event_id) {
                Ok(session) => {
                    let backend = Arc::clone(&self.backend);
                    self.spawn_task(async move {
                        AppEvent::SeatsLoaded {
                            session,
                            result: backend.list_seats(event_id).await,
                        }
                    });
                }
                Err(e) => self.report_error(&e),
            },
            Command::Toggle(seat_number) => {
                if let Err(e) = self.selection.toggle(&seat_number) {
                    self.report_error(&e);
                }
            }
            Command::Submit => match self.selection.begin_submit() {
                Ok(ticket) => {
                    let backend = Arc::clone(&self.backend);
                    let user_id = self.user_id;
                    self.spawn_task(async move {
                        AppEvent::BookingFinished {
                            session: ticket.session,
                            result: backend
                                .create_booking(user_id, ticket.event_id, &ticket.seats)
                                .await,
                        }
                    });
                }
                Err(e) => self.report_error(&e),
            },
            Command::Close => {
                if let Err(e) = self.selection.close() {
                    self.report_error(&e);
                }
            }
            Command::SwitchMode { credential } => self.switch_mode(credential).await,
            Command::CreateEvent(new_event) => {
                if let Some(grant) = self.require_admin() {
                    let backend = Arc::clone(&self.backend);
                    self.spawn_task(async move {
                        AppEvent::AdminActionFinished {
                            action: AdminAction::CreateEvent,
                            result: backend
                                .create_event(&grant, &new_event)
                                .await
                                .map(|message| message.message),
                        }
                    });
                }
            }
            Command::DeleteEvent {
                event_id,
                confirmed,
            } => {
                if !confirmed {
                    self.state.notify(
                        NoticeLevel::Info,
                        format!(
                            "Deleting event {event_id} removes its seats and bookings; \
                             repeat with --yes to confirm"
                        ),
                    );
                } else if let Some(grant) = self.require_admin() {
                    let backend = Arc::clone(&self.backend);
                    self.spawn_task(async move {
                        let result =
                            backend
                                .delete_event(&grant, event_id)
                                .await
                                .and_then(|deleted| {
                                    if deleted {
                                        Ok("Event deleted successfully!".to_string())
                                    } else {
                                        Err(BackendError::NotFound(format!(
                                            "event {event_id} does not exist"
                                        )))
                                    }
                                });
                        AppEvent::AdminActionFinished {
                            action: AdminAction::DeleteEvent(event_id),
                            result,
                        }
                    });
                }
            }
            Command::GenerateSeats {
                event_id,
                confirmed,
            } => {
                if !confirmed {
                    self.state.notify(
                        NoticeLevel::Info,
                        format!(
                            "Generating seats for event {event_id} cannot be undone; \
                             repeat with --yes to confirm"
                        ),
                    );
                } else if let Some(grant) = self.require_admin() {
                    let backend = Arc::clone(&self.backend);
                    self.spawn_task(async move {
                        AppEvent::AdminActionFinished {
                            action: AdminAction::GenerateSeats(event_id),
                            result: backend
                                .generate_seats(&grant, event_id)
                                .await
                                .map(|message| message.message),
                        }
                    });
                }
            }
            Command::MyBookings => {
                let backend = Arc::clone(&self.backend);
                let user_id = self.user_id;
                self.spawn_task(async move {
                    AppEvent::BookingsLoaded(backend.list_user_bookings(user_id).await)
                });
            }
            Command::CancelBooking(booking_id) => {
                let backend = Arc::clone(&self.backend);
                self.spawn_task(async move {
                    AppEvent::BookingCanceled(backend.cancel_booking(booking_id).await)
                });
            }
            Command::Help => self.state.notify(NoticeLevel::Info, HELP),
            Command::Quit => {
                if self.selection.is_submitting() {
                    self.state.notify(
                        NoticeLevel::Error,
                        "A booking is in flight; wait for it to finish before quitting",
                    );
                } else {
                    return false;
                }
            }
        }
        true
    }

    async fn switch_mode(&mut self, credential: Option<String>) {
        if self.mode.mode().is_admin() {
            let request = self.mode.enter_user();
            self.state.notify(NoticeLevel::Info, "Switched to user mode");
            self.start_refresh(request);
            return;
        }

        let Some(credential) = credential else {
            self.state
                .notify(NoticeLevel::Error, "Admin key required: admin <key>");
            return;
        };
        match self
            .mode
            .enter_admin(self.authorizer.as_ref(), &credential)
            .await
        {
            Ok(request) => {
                self.state.notify(NoticeLevel::Info, "Switched to admin mode");
                self.start_refresh(request);
            }
            Err(e) => self.report_error(&e),
        }
    }

    fn require_admin(&mut self) -> Option<AdminGrant> {
        let grant = self.mode.mode().grant().cloned();
        if grant.is_none() {
            self.state
                .notify(NoticeLevel::Error, "Switch to admin mode first: admin <key>");
        }
        grant
    }

    fn refresh_if_stale(&mut self) {
        if self.state.is_stale(self.backend.data_epoch()) {
            let request = self.mode.refresh();
            self.start_refresh(request);
        }
    }

    fn start_refresh(&mut self, request: RefreshRequest) {
        let backend = Arc::clone(&self.backend);
        let search = self.state.search().map(str::to_string);
        self.spawn_task(async move {
            let result = fetch_listing(backend.as_ref(), &request.plan, search.as_deref()).await;
            AppEvent::ListingLoaded {
                token: request.token,
                result,
            }
        });
    }

    /// Runs `task` on the runtime and feeds its completion back through the
    /// event channel.
    fn spawn_task<F>(&mut self, task: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        self.in_flight += 1;
        let sender = self.event_sender.clone();
        tokio::spawn(async move {
            let event = task.await;
            if sender.send(event).await.is_err() {
                debug!("Controller gone; dropping completion");
            }
        });
    }

    fn completed(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    fn report(&mut self, context: &str, err: &BackendError) {
        warn!(kind = err.kind(), error = %err, "{}", context);
        self.state
            .notify(NoticeLevel::Error, format!("{context}: {err}"));
    }

    fn report_error(&mut self, err: &EventlyError) {
        warn!(error = %err, "Command rejected");
        let text = match err {
            EventlyError::Backend(BackendError::Validation(message)) => {
                format!("Please {message}.")
            }
            other => other.to_string(),
        };
        self.state.notify(NoticeLevel::Error, text);
    }

    fn render(&mut self) {
        let model = project(&self.state, &self.selection, self.mode.mode());
        self.renderer.render(&model);
        self.state.take_notice();
    }
}
