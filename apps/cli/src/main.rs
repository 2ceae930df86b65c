//! # Park Now CLI Entry Point
//!
//! All logic lives in `parknow_cli`.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    parknow_cli::run().await
}
