pub mod config;
pub mod events;
pub mod scan;
pub mod status;
