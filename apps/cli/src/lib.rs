//! # Park Now CLI Library
//!
//! Application layer for Park Now: configuration, session, commands, the
//! countdown ticker and the vehicle catalog client.
//!
//! ## Module Organization
//! ```text
//! parknow_cli/
//! ├── lib.rs          ◄─── You are here (logging & run)
//! ├── cli.rs          ◄─── clap subcommands, JSON output, live views
//! ├── config.rs       ◄─── AppConfig (file + environment)
//! ├── error.rs        ◄─── ApiError returned by every command
//! ├── countdown.rs    ◄─── Periodic "time left" ticker
//! ├── catalog.rs      ◄─── VehicleCatalog trait + FIPE client
//! ├── state/
//! │   ├── app.rs      ◄─── AppState (Database, config, catalog)
//! │   └── session.rs  ◄─── Session (user id + admin flag)
//! └── commands/
//!     ├── vehicle.rs  ◄─── Registry commands
//!     ├── rental.rs   ◄─── Quote / rent / receipt
//!     ├── admin.rs    ◄─── Plate search
//!     └── catalog.rs  ◄─── Make/model suggestions
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Application Startup                               │
//! │                                                                         │
//! │  1. Initialize Logging (stderr, RUST_LOG overrides the default filter)  │
//! │  2. Parse arguments                                                     │
//! │  3. Load AppConfig: defaults → parknow.toml → PARKNOW_* env → validate  │
//! │  4. Open the database (WAL, migrations) and build the catalog client    │
//! │  5. Resolve the session from --user and admin_flags                     │
//! │  6. Run the command, print JSON                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod countdown;
pub mod error;
pub mod state;

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::Cli;

/// Parses arguments and runs one command.
pub async fn run() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    info!("Starting Park Now CLI");

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            match serde_json::to_string_pretty(&err) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("{err}"),
            }
            ExitCode::FAILURE
        }
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=parknow=trace` - Show trace for parknow crates only
/// - Default: INFO, DEBUG for parknow crates, WARN for sqlx
///
/// Logs go to stderr so stdout carries only command output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,parknow=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
