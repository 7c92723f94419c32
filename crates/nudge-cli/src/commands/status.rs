use clap::Args;
use nudge_core::Config;

use crate::common::{open_engine, print_json};

#[derive(Args)]
pub struct ClearArgs {
    /// Conversation token to forget
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub token: Option<String>,
    /// Forget every conversation
    #[arg(long)]
    pub all: bool,
}

pub fn run_status(token: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let engine = open_engine(&config)?;
    match token {
        Some(token) => print_json(&engine.status(token)?),
        None => print_json(&engine.status_all()?),
    }
}

pub fn run_clear(args: ClearArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let engine = open_engine(&config)?;
    match (args.token, args.all) {
        (Some(token), false) => {
            if engine.clear(&token)? {
                println!("cleared {token}");
            } else {
                println!("{token} was not tracked");
            }
        }
        _ => {
            let removed = engine.clear_all()?;
            println!("cleared {removed} conversations");
        }
    }
    Ok(())
}
