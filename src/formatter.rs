use crate::{
    client_state::NoticeLevel,
    view::{EventRow, Render, SeatModal, SeatStatus, ViewModel},
    types::{Analytics, UserBooking},
};
use std::fmt::Write as _;

// ANSI color codes
pub struct Colors;

impl Colors {
    pub const RESET: &'static str = "\x1b[0m";
    pub const BOLD: &'static str = "\x1b[1m";
    pub const DIM: &'static str = "\x1b[2m";

    pub const GRAY: &'static str = "\x1b[90m";

    // Bright colors
    pub const BRIGHT_RED: &'static str = "\x1b[91m";
    pub const BRIGHT_GREEN: &'static str = "\x1b[92m";
    pub const BRIGHT_YELLOW: &'static str = "\x1b[93m";
    pub const BRIGHT_CYAN: &'static str = "\x1b[96m";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Plain,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "plain" | "minimal" => OutputFormat::Plain,
            "json" => OutputFormat::Json,
            _ => OutputFormat::Table,
        }
    }
}

const SEATS_PER_ROW: usize = 10;

fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}

/// Prints view models to stdout, re-printing only the sections that changed
/// since the previous render.
pub struct TerminalRenderer {
    format: OutputFormat,
    colored: bool,
    last: Option<ViewModel>,
}

impl TerminalRenderer {
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self {
            format,
            colored,
            last: None,
        }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.colored {
            format!("{}{}{}", color, text, Colors::RESET)
        } else {
            text.to_string()
        }
    }

    /// Text for `model`, given what was rendered before. Empty when nothing
    /// visible changed.
    pub fn format_model(&mut self, model: &ViewModel) -> String {
        if self.format == OutputFormat::Json {
            self.last = Some(model.clone());
            return serde_json::to_string(model).unwrap_or_default();
        }

        let last = self.last.take();
        let changed = |same: bool| last.is_none() || !same;
        let mut out = String::new();

        if changed(last.as_ref().is_some_and(|l| l.mode == model.mode)) {
            self.write_banner(&mut out, model);
        }
        if changed(last.as_ref().is_some_and(|l| {
            l.events == model.events && l.search == model.search && l.mode == model.mode
        })) {
            self.write_events(&mut out, model);
        }
        if let Some(analytics) = &model.analytics
            && changed(last.as_ref().is_some_and(|l| l.analytics == model.analytics))
        {
            self.write_analytics(&mut out, analytics);
        }
        if last.as_ref().is_some_and(|l| l.seat_modal.is_some()) && model.seat_modal.is_none() {
            let _ = writeln!(out, "{}", self.paint(Colors::DIM, "[seat map closed]"));
        }
        if let Some(modal) = &model.seat_modal
            && changed(last.as_ref().is_some_and(|l| l.seat_modal.as_ref() == Some(modal)))
        {
            self.write_modal(&mut out, modal);
        }
        if let Some(bookings) = &model.bookings
            && changed(last.as_ref().is_some_and(|l| l.bookings.as_ref() == Some(bookings)))
        {
            self.write_bookings(&mut out, bookings);
        }
        if let Some(notice) = &model.notice {
            let (color, tag) = match notice.level {
                NoticeLevel::Info => (Colors::BRIGHT_GREEN, "[OK]"),
                NoticeLevel::Error => (Colors::BRIGHT_RED, "[ERROR]"),
            };
            let _ = writeln!(out, "{} {}", self.paint(color, tag), notice.text);
        }

        self.last = Some(model.clone());
        out
    }

    fn write_banner(&self, out: &mut String, model: &ViewModel) {
        let title = format!("EVENTLY · {} MODE", model.mode);
        match self.format {
            OutputFormat::Table => {
                let bar = "═".repeat(60);
                let _ = writeln!(out, "{}", self.paint(Colors::BRIGHT_CYAN, &format!("╔{bar}╗")));
                let _ = writeln!(
                    out,
                    "{}",
                    self.paint(Colors::BRIGHT_CYAN, &format!("║ {:<58} ║", title))
                );
                let _ = writeln!(out, "{}", self.paint(Colors::BRIGHT_CYAN, &format!("╚{bar}╝")));
            }
            _ => {
                let _ = writeln!(out, "== {title} ==");
            }
        }
    }

    fn write_events(&self, out: &mut String, model: &ViewModel) {
        let admin = model.mode == "ADMIN";
        if let Some(term) = &model.search {
            let _ = writeln!(out, "{}", self.paint(Colors::DIM, &format!("search: {term}")));
        }
        if model.events.is_empty() {
            let _ = writeln!(out, "{}", self.paint(Colors::DIM, "no events"));
            return;
        }

        if self.format == OutputFormat::Plain {
            for row in &model.events {
                let _ = writeln!(out, "{}", plain_event_line(row, admin));
            }
            return;
        }

        let gray = |s: &str| self.paint(Colors::GRAY, s);
        if admin {
            let _ = writeln!(out, "{}", gray("┌──────┬──────────────────────────┬──────────┬──────────┐"));
            let _ = writeln!(
                out,
                "│ {:<4} │ {:<24} │ {:>8} │ {:>8} │",
                "ID", "NAME", "BOOKED", "CAPACITY"
            );
            let _ = writeln!(out, "{}", gray("├──────┼──────────────────────────┼──────────┼──────────┤"));
            for row in &model.events {
                let _ = writeln!(
                    out,
                    "│ {:<4} │ {:<24} │ {:>8} │ {:>8} │",
                    row.id,
                    fit(&row.name, 24),
                    row.tickets_booked,
                    row.total_capacity
                );
            }
            let _ = writeln!(out, "{}", gray("└──────┴──────────────────────────┴──────────┴──────────┘"));
        } else {
            let _ = writeln!(out, "{}", gray("┌──────┬──────────────────────┬──────────────────┬───────────────────────────┬────────────┐"));
            let _ = writeln!(
                out,
                "│ {:<4} │ {:<20} │ {:<16} │ {:<25} │ {:>10} │",
                "ID", "NAME", "VENUE", "TIME", "SEATS LEFT"
            );
            let _ = writeln!(out, "{}", gray("├──────┼──────────────────────┼──────────────────┼───────────────────────────┼────────────┤"));
            for row in &model.events {
                let left = format!("{:>10}", row.seats_left);
                let left = if row.seats_left == 0 {
                    self.paint(Colors::BRIGHT_RED, &left)
                } else {
                    left
                };
                let _ = writeln!(
                    out,
                    "│ {:<4} │ {:<20} │ {:<16} │ {:<25} │ {} │",
                    row.id,
                    fit(&row.name, 20),
                    fit(&row.venue, 16),
                    fit(&row.start_time, 25),
                    left
                );
            }
            let _ = writeln!(out, "{}", gray("└──────┴──────────────────────┴──────────────────┴───────────────────────────┴────────────┘"));
        }
    }

    fn write_analytics(&self, out: &mut String, analytics: &Analytics) {
        let _ = writeln!(out, "{}", self.paint(Colors::BOLD, "Analytics"));
        let _ = writeln!(out, "  Total bookings: {}", analytics.total_bookings);
        let _ = writeln!(out, "  Most popular events:");
        for popular in &analytics.most_popular_events {
            let _ = writeln!(
                out,
                "    {}: {} bookings",
                popular.event_name, popular.booking_count
            );
        }
    }

    fn write_modal(&self, out: &mut String, modal: &SeatModal) {
        let title = match &modal.event_name {
            Some(name) => format!("Seats for {name} (#{})", modal.event_id),
            None => format!("Seats for event #{}", modal.event_id),
        };
        let _ = writeln!(out, "{}", self.paint(Colors::BOLD, &title));

        if modal.loading {
            let _ = writeln!(out, "  {}", self.paint(Colors::DIM, "loading seats..."));
            return;
        }
        if let Some(error) = &modal.error {
            let _ = writeln!(out, "  {}", self.paint(Colors::BRIGHT_RED, error));
            return;
        }
        if modal.seats.is_empty() {
            let _ = writeln!(out, "  {}", self.paint(Colors::DIM, "no seats generated yet"));
        }

        for row in modal.seats.chunks(SEATS_PER_ROW) {
            let cells: Vec<String> = row
                .iter()
                .map(|seat| match seat.status {
                    SeatStatus::Available => {
                        self.paint(Colors::BRIGHT_GREEN, &format!("[{}]", seat.seat_number))
                    }
                    SeatStatus::Selected => {
                        self.paint(Colors::BRIGHT_YELLOW, &format!("<{}>", seat.seat_number))
                    }
                    SeatStatus::Booked => {
                        self.paint(Colors::GRAY, &format!("({})", seat.seat_number))
                    }
                })
                .collect();
            let _ = writeln!(out, "  {}", cells.join(" "));
        }

        if modal.submitting {
            let _ = writeln!(out, "  {}", self.paint(Colors::BRIGHT_YELLOW, "booking..."));
        } else if modal.can_submit {
            let _ = writeln!(
                out,
                "  selected: {} (type 'submit' to book)",
                modal.chosen.join(", ")
            );
        }
    }

    fn write_bookings(&self, out: &mut String, bookings: &[UserBooking]) {
        let _ = writeln!(out, "{}", self.paint(Colors::BOLD, "Your bookings"));
        if bookings.is_empty() {
            let _ = writeln!(out, "  {}", self.paint(Colors::DIM, "none"));
        }
        for booking in bookings {
            let _ = writeln!(
                out,
                "  {} | {} | {} | booked {}",
                booking.event_name, booking.venue, booking.start_time, booking.booking_time
            );
        }
    }
}

fn plain_event_line(row: &EventRow, admin: bool) -> String {
    if admin {
        format!(
            "#{} {} | Booked: {} | Capacity: {}",
            row.id, row.name, row.tickets_booked, row.total_capacity
        )
    } else {
        format!(
            "#{} {} | Venue: {} | Time: {} | Seats Left: {}",
            row.id, row.name, row.venue, row.start_time, row.seats_left
        )
    }
}

impl Render for TerminalRenderer {
    fn render(&mut self, model: &ViewModel) {
        let text = self.format_model(model);
        if text.is_empty() {
            return;
        }
        if text.ends_with('\n') {
            print!("{text}");
        } else {
            println!("{text}");
        }
    }
}
