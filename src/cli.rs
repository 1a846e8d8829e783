use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "evently",
    about = "terminal client for the evently ticketing backend",
    version
)]
pub struct Args {
    /// Backend base URL
    #[arg(short, long, env = "EVENTLY_URL", default_value = "http://127.0.0.1:5000")]
    pub url: String,

    /// User id that bookings are made for
    #[arg(long, env = "EVENTLY_USER_ID", default_value = "1")]
    pub user_id: i64,

    /// Admin API key accepted when switching to admin mode
    #[arg(long, env = "EVENTLY_ADMIN_KEY", hide_env_values = true)]
    pub admin_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "10")]
    pub timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,

    /// Enable metrics server
    #[arg(long)]
    pub metrics: bool,

    /// Metrics server port
    #[arg(long, default_value = "9090")]
    pub metrics_port: u16,

    /// Output format: table, plain, json
    #[arg(long, default_value = "table")]
    pub format: String,

    /// Disable colored output (useful for piping to files)
    #[arg(long)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Interactive shell reading commands from stdin (default)
    Shell,

    /// List events, optionally filtered by name or venue
    Events {
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show the seat map of an event
    Seats { event_id: i64 },

    /// Book one or more seats for an event
    Book {
        event_id: i64,
        #[arg(required = true)]
        seats: Vec<String>,
    },

    /// List bookings of the configured user
    Bookings,

    /// Show booking analytics (requires the admin key)
    Analytics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_subcommand_collects_seats() {
        let args = Args::try_parse_from(["evently", "book", "5", "1A", "1C"]).expect("args");
        assert_eq!(
            args.command,
            Some(Commands::Book {
                event_id: 5,
                seats: vec!["1A".to_string(), "1C".to_string()],
            })
        );
    }

    #[test]
    fn book_requires_at_least_one_seat() {
        assert!(Args::try_parse_from(["evently", "book", "5"]).is_err());
    }
}
