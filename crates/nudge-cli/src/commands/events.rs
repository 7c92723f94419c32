use chrono::{DateTime, Utc};
use clap::Args;
use nudge_core::Config;

use crate::common::{open_engine, parse_at, print_json};

#[derive(Args)]
pub struct MessageArgs {
    /// Conversation token
    pub token: String,
    /// Short text shown with the audible alert
    #[arg(long, default_value = "New message")]
    pub summary: String,
    /// Event time as RFC 3339 (defaults to now)
    #[arg(long, value_parser = parse_at)]
    pub at: Option<DateTime<Utc>>,
}

pub fn run_message(args: MessageArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let engine = open_engine(&config)?;
    let now = args.at.unwrap_or_else(Utc::now);
    let outcome = engine.on_message_received(&args.token, &args.summary, now)?;
    print_json(&outcome)
}

pub fn run_read(token: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let engine = open_engine(&config)?;
    match engine.on_conversation_read(token)? {
        Some(event) => print_json(&event),
        None => {
            println!("{token} has no unread messages");
            Ok(())
        }
    }
}
