/// file: src/events.rs
/// description: typed commands and the event bus between input, backend tasks and the controller
use crate::{
    client_state::Listing,
    error::BackendError,
    mode::RefreshToken,
    selection::SessionToken,
    types::{Message, NewEvent, Seat, UserBooking},
};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// User intent, decoupled from whatever surface produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(String),
    Refresh,
    Open(i64),
    Toggle(String),
    Submit,
    Close,
    SwitchMode { credential: Option<String> },
    CreateEvent(NewEvent),
    DeleteEvent { event_id: i64, confirmed: bool },
    GenerateSeats { event_id: i64, confirmed: bool },
    MyBookings,
    CancelBooking(i64),
    Help,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty input")]
    Empty,

    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    Invalid(String),
}

pub const HELP: &str = "\
commands:
  search [term]          filter events by name or venue (blank clears)
  refresh                reload events (and analytics in admin mode)
  open <event-id>        open the seat map for an event
  toggle <seat>          select or deselect a seat
  submit                 book the selected seats
  close                  close the seat map without booking
  admin [key]            switch to admin mode (or back to user mode)
  create <name> | <venue> | <YYYY-MM-DDTHH:MM> | <capacity>
  delete <event-id> --yes
  generate <event-id> --yes
  bookings               list your bookings
  cancel <booking-id>    cancel a booking
  quit";

fn parse_id(arg: Option<&str>, usage: &'static str) -> Result<i64, CommandError> {
    arg.and_then(|value| value.parse().ok())
        .ok_or(CommandError::Usage(usage))
}

fn parse_confirmed(rest: &[&str]) -> bool {
    rest.iter().any(|arg| matches!(*arg, "--yes" | "-y"))
}

fn parse_create(rest: &str) -> Result<Command, CommandError> {
    const USAGE: &str = "create <name> | <venue> | <YYYY-MM-DDTHH:MM> | <capacity>";
    let parts: Vec<&str> = rest.split('|').map(str::trim).collect();
    let [name, venue, start, capacity] = parts.as_slice() else {
        return Err(CommandError::Usage(USAGE));
    };
    let capacity: u32 = capacity
        .parse()
        .map_err(|_| CommandError::Invalid(format!("capacity '{capacity}' is not a number")))?;
    NewEvent::from_local(name, venue, start, capacity)
        .map(Command::CreateEvent)
        .map_err(|e| CommandError::Invalid(e.to_string()))
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map(|(verb, rest)| (verb, rest.trim()))
        .unwrap_or((line, ""));
    let args: Vec<&str> = rest.split_whitespace().collect();

    match verb.to_ascii_lowercase().as_str() {
        "" => Err(CommandError::Empty),
        "search" | "find" => Ok(Command::Search(rest.to_string())),
        "refresh" | "ls" => Ok(Command::Refresh),
        "open" => parse_id(args.first().copied(), "open <event-id>").map(Command::Open),
        "toggle" | "seat" => match args.as_slice() {
            [seat] => Ok(Command::Toggle(seat.to_string())),
            _ => Err(CommandError::Usage("toggle <seat>")),
        },
        "submit" | "confirm" => Ok(Command::Submit),
        "close" => Ok(Command::Close),
        "admin" | "mode" => Ok(Command::SwitchMode {
            credential: args.first().map(|key| key.to_string()),
        }),
        "create" => parse_create(rest),
        "delete" => Ok(Command::DeleteEvent {
            event_id: parse_id(args.first().copied(), "delete <event-id> --yes")?,
            confirmed: parse_confirmed(&args[1..]),
        }),
        "generate" => Ok(Command::GenerateSeats {
            event_id: parse_id(args.first().copied(), "generate <event-id> --yes")?,
            confirmed: parse_confirmed(&args[1..]),
        }),
        "bookings" => Ok(Command::MyBookings),
        "cancel" => {
            parse_id(args.first().copied(), "cancel <booking-id>").map(Command::CancelBooking)
        }
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

/// Admin operations whose completion is reported back to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    CreateEvent,
    DeleteEvent(i64),
    GenerateSeats(i64),
}

#[derive(Debug)]
pub enum AppEvent {
    Command(Command),
    InputRejected(String),
    InputClosed,
    ListingLoaded {
        token: RefreshToken,
        result: Result<Listing, BackendError>,
    },
    SeatsLoaded {
        session: SessionToken,
        result: Result<Vec<Seat>, BackendError>,
    },
    BookingFinished {
        session: SessionToken,
        result: Result<Message, BackendError>,
    },
    AdminActionFinished {
        action: AdminAction,
        result: Result<String, BackendError>,
    },
    BookingsLoaded(Result<Vec<UserBooking>, BackendError>),
    BookingCanceled(Result<Message, BackendError>),
}

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub type EventSender = mpsc::Sender<AppEvent>;
pub type EventReceiver = mpsc::Receiver<AppEvent>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}

/// Parses each input line into a command and forwards it until EOF or the
/// controller goes away.
pub async fn forward_input<R>(reader: R, sender: EventSender) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        trace!(line = %line, "Input line");
        let event = match parse_command(&line) {
            Ok(command) => AppEvent::Command(command),
            Err(CommandError::Empty) => continue,
            Err(e) => AppEvent::InputRejected(e.to_string()),
        };
        if sender.send(event).await.is_err() {
            debug!("Controller stopped; dropping remaining input");
            return Ok(());
        }
    }

    let _ = sender.send(AppEvent::InputClosed).await;
    Ok(())
}
