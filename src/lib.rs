#![doc = include_str!("../docs/rustdoc.md")]

/// Command-line argument definitions.
pub mod cli;
/// Backend trait and its HTTP implementation.
pub mod client;
/// Cached listing, bookings and notices.
pub mod client_state;
/// Runtime configuration model.
pub mod config;
/// Error types used across the crate.
pub mod error;
/// Commands, input parsing and the event bus.
pub mod events;
/// Terminal output formatters.
pub mod formatter;
/// User/admin mode toggle and admin authorization.
pub mod mode;
/// Metrics counters and the Prometheus exporter.
pub mod monitoring;
/// Non-interactive subcommands.
pub mod oneshot;
/// Seat selection state machine and booking workflow.
pub mod selection;
/// Tracing/logging initialization.
pub mod tracing_setup;
/// Ticketing data models and wire types.
pub mod types;
/// UI controller and presentation loop.
pub mod ui;
/// View model projection and the render seam.
pub mod view;

#[cfg(test)]
pub(crate) mod test_support;

/// Primary crate error type.
pub use error::EventlyError;
