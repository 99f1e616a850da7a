//! Kitchen production engine: turns outlet orders into scheduled tasks,
//! commits finished and raw stock as tasks complete, lays out the day
//! timeline and expands standing order guides.

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
mod production;


pub use config::ProductionConfig;
pub use db::{SqliteStore, Store};
pub use error::{ProductionError, Result};
pub use production::{Clock, Production};

/// Installs the global `tracing` subscriber, honouring `RUST_LOG`.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
