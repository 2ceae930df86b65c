//! # Command-Line Interface
//!
//! `parknow` subcommands. Results are printed to stdout as JSON; errors are
//! printed to stderr as `{ "code", "message" }`. Logs go to stderr.
//!
//! ```text
//! parknow --user alice register --model Onix --make Chevrolet --plate abc1d23 --body-type hatch
//! parknow --user alice list
//! parknow --user alice quote <id> --hours 3
//! parknow --user alice rent <id> --hours 3 --payment pix
//! parknow --user alice receipt <id>
//! parknow --user alice watch
//! parknow --user boss search abc1d23 --follow
//! parknow grant-admin boss
//! parknow makes chev
//! parknow models 23
//! ```

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use parknow_core::{rental_state, ReceiptVisibility, RentalState, Vehicle, VehicleDraft};

use crate::commands::{admin, catalog, rental, vehicle};
use crate::config::AppConfig;
use crate::countdown::{Countdown, CountdownHandle, CountdownTick};
use crate::error::ApiError;
use crate::state::{AppState, Session};

#[derive(Debug, Parser)]
#[command(name = "parknow", about = "Park Now vehicle registry and parking rentals", long_about = None)]
pub struct Cli {
    /// Acting user id, as issued by the identity provider
    #[arg(short, long, env = "PARKNOW_USER", global = true)]
    user: Option<String>,

    /// Config file (default: parknow.toml in the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a vehicle
    Register(VehicleArgs),

    /// List your vehicles
    List,

    /// Show one of your vehicles
    Get { id: String },

    /// Edit a vehicle that is not rented
    Edit {
        id: String,

        #[command(flatten)]
        vehicle: VehicleArgs,

        /// Reject the edit if the vehicle changed since this version
        #[arg(long)]
        expected_version: Option<i64>,
    },

    /// Delete a vehicle that is not rented
    Delete { id: String },

    /// Price a rental
    Quote {
        id: String,

        #[arg(long, default_value = "")]
        hours: String,
    },

    /// Rent a parking spot
    Rent {
        id: String,

        #[arg(long, default_value = "")]
        hours: String,

        /// credit_card | debit_card | pix
        #[arg(long)]
        payment: Option<String>,
    },

    /// Show the receipt of the current rental
    Receipt { id: String },

    /// Follow your vehicles with live countdowns until Ctrl-C
    Watch,

    /// Search vehicles by plate (admin only)
    Search {
        plate: String,

        /// Keep following the plate until Ctrl-C
        #[arg(long)]
        follow: bool,
    },

    /// Set or clear a user's admin flag
    GrantAdmin {
        user_id: String,

        #[arg(long)]
        revoke: bool,
    },

    /// Suggest vehicle makes
    Makes {
        #[arg(default_value = "")]
        partial: String,
    },

    /// Suggest models for a make code
    Models { make_code: String },
}

/// Form fields. Blank values are rejected by validation, not by the parser.
#[derive(Debug, Args)]
struct VehicleArgs {
    #[arg(long, default_value = "")]
    model: String,

    #[arg(long, default_value = "")]
    make: String,

    #[arg(long, default_value = "")]
    plate: String,

    /// sub_compact | compact | hatch | suv | sedan | pickup
    #[arg(long, default_value = "")]
    body_type: String,

    #[arg(long)]
    electric: bool,
}

impl From<VehicleArgs> for VehicleDraft {
    fn from(args: VehicleArgs) -> Self {
        VehicleDraft {
            model: args.model,
            make: args.make,
            plate: args.plate,
            body_type: args.body_type,
            electric: args.electric,
        }
    }
}

impl Cli {
    pub async fn run(self) -> Result<(), ApiError> {
        let config = AppConfig::load(self.config)?;
        let state = AppState::connect(config).await?;
        let user = self.user.unwrap_or_default();
        let now = Utc::now();

        match self.command {
            Command::GrantAdmin { user_id, revoke } => {
                print_json(&admin::grant_admin(&state, &user_id, !revoke, now).await?)
            }
            Command::Makes { partial } => print_json(&catalog::suggest_makes(&state, &partial).await),
            Command::Models { make_code } => {
                print_json(&catalog::suggest_models(&state, &make_code).await)
            }
            command => {
                let session = Session::resolve(&state, &user).await?;
                run_session_command(&state, &session, command).await
            }
        }
    }
}

async fn run_session_command(
    state: &AppState,
    session: &Session,
    command: Command,
) -> Result<(), ApiError> {
    let now = Utc::now();

    match command {
        Command::Register(args) => {
            print_json(&vehicle::register_vehicle(state, session, &args.into(), now).await?)
        }
        Command::List => print_json(&vehicle::list_vehicles(state, session, now).await?),
        Command::Get { id } => print_json(&vehicle::get_vehicle(state, session, &id, now).await?),
        Command::Edit {
            id,
            vehicle: args,
            expected_version,
        } => print_json(
            &vehicle::edit_vehicle(state, session, &id, &args.into(), expected_version, now).await?,
        ),
        Command::Delete { id } => {
            vehicle::delete_vehicle(state, session, &id, now).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Command::Quote { id, hours } => {
            print_json(&rental::quote_rental(state, session, &id, &hours).await?)
        }
        Command::Rent { id, hours, payment } => print_json(
            &rental::rent_vehicle(state, session, &id, &hours, payment.as_deref(), now).await?,
        ),
        Command::Receipt { id } => print_json(&rental::get_receipt(state, session, &id, now).await?),
        Command::Watch => watch(state, session).await,
        Command::Search { plate, follow } => {
            if follow {
                follow_plate(state, session, &plate).await
            } else {
                print_json(&admin::search_by_plate(state, session, &plate, now).await?)
            }
        }
        Command::GrantAdmin { .. } | Command::Makes { .. } | Command::Models { .. } => {
            Err(ApiError::internal("command does not take a session"))
        }
    }
}

// =============================================================================
// Live Views
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CountdownLine {
    plate: String,
    countdown: CountdownTick,
}

/// Ticker for one rented vehicle of the watched list.
struct LiveCountdown {
    plate: String,
    expires_at: i64,
    handle: CountdownHandle,
}

/// One countdown per rented vehicle in the snapshot.
fn start_countdowns(vehicles: &[Vehicle], now: i64, period: Duration) -> Vec<LiveCountdown> {
    vehicles
        .iter()
        .filter_map(|v| match rental_state(v, now) {
            RentalState::Rented { expires_at } => Some(LiveCountdown {
                plate: v.plate.clone(),
                expires_at,
                handle: Countdown::start(expires_at, now, period),
            }),
            RentalState::Available => None,
        })
        .collect()
}

/// Reads every countdown once and removes the expired ones.
///
/// An expired countdown appears in exactly one batch of lines. The second
/// value is the latest expiration among the removed ones.
fn drain_ticks(countdowns: &mut Vec<LiveCountdown>) -> (Vec<CountdownLine>, Option<i64>) {
    let mut lines = Vec::with_capacity(countdowns.len());
    let mut expired_at = None;

    countdowns.retain(|live| {
        let countdown = live.handle.current();
        let running = !countdown.is_expired();
        if !running {
            expired_at = expired_at.max(Some(live.expires_at));
        }
        lines.push(CountdownLine {
            plate: live.plate.clone(),
            countdown,
        });
        running
    });

    (lines, expired_at)
}

/// Views re-derived once a countdown ends. No store write marks the end of a
/// rental, so the change feed stays silent.
fn project_after_expiry(
    vehicles: &[Vehicle],
    expired_at: i64,
    visibility: ReceiptVisibility,
) -> Vec<vehicle::VehicleView> {
    let now = Utc::now().timestamp_millis().max(expired_at);
    vehicle::VehicleView::project_all(vehicles, now, visibility)
}

async fn watch(state: &AppState, session: &Session) -> Result<(), ApiError> {
    let period = state.config().countdown_tick();
    let visibility = state.config().receipt_visibility();

    let mut live = vehicle::watch_vehicles(state, session).await?;
    let mut vehicles: Vec<Vehicle> = Vec::new();
    let mut countdowns: Vec<LiveCountdown> = Vec::new();
    let mut refresh = tokio::time::interval(period);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            snapshot = live.next() => {
                let Some(snapshot) = snapshot else { break };
                vehicles = snapshot;
                let now = Utc::now().timestamp_millis();
                print_json(&vehicle::VehicleView::project_all(&vehicles, now, visibility))?;
                // Replacing the list drops (and stops) the previous tickers.
                countdowns = start_countdowns(&vehicles, now, period);
            }
            _ = refresh.tick(), if !countdowns.is_empty() => {
                let (lines, expired_at) = drain_ticks(&mut countdowns);
                print_json_line(&lines)?;
                if let Some(expired_at) = expired_at {
                    print_json(&project_after_expiry(&vehicles, expired_at, visibility))?;
                }
            }
        }
    }

    live.cancel().await;
    for countdown in countdowns {
        countdown.handle.cancel().await;
    }
    Ok(())
}

async fn follow_plate(state: &AppState, session: &Session, plate: &str) -> Result<(), ApiError> {
    let mut search = admin::PlateSearch::new(state, session)?;
    print_json(&search.set_query(plate, Utc::now()).await?)?;

    if !search.is_live() {
        return Ok(());
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            results = search.refresh(Utc::now()) => match results {
                Some(results) => print_json(&results)?,
                None => break,
            },
        }
    }

    search.close().await;
    Ok(())
}

// =============================================================================
// Output
// =============================================================================

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), ApiError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::internal(format!("Failed to encode output: {e}")))?;
    println!("{json}");
    Ok(())
}

fn print_json_line<T: Serialize + ?Sized>(value: &T) -> Result<(), ApiError> {
    let json = serde_json::to_string(value)
        .map_err(|e| ApiError::internal(format!("Failed to encode output: {e}")))?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use parknow_core::BodyType;

    #[test]
    fn test_parse_register() {
        let cli = Cli::try_parse_from([
            "parknow",
            "--user",
            "alice",
            "register",
            "--model",
            "Onix",
            "--make",
            "Chevrolet",
            "--plate",
            "abc1d23",
            "--body-type",
            "hatch",
            "--electric",
        ])
        .unwrap();

        assert_eq!(cli.user.as_deref(), Some("alice"));
        let Command::Register(args) = cli.command else {
            panic!("expected register");
        };
        let draft: VehicleDraft = args.into();
        assert_eq!(draft.plate, "abc1d23");
        assert!(draft.electric);
    }

    #[test]
    fn test_parse_rent_without_payment() {
        let cli = Cli::try_parse_from(["parknow", "rent", "v1", "--hours", "2", "-u", "bob"]).unwrap();
        match cli.command {
            Command::Rent { id, hours, payment } => {
                assert_eq!(id, "v1");
                assert_eq!(hours, "2");
                assert!(payment.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_missing_fields_reach_validation() {
        let cli = Cli::try_parse_from(["parknow", "register", "--model", "Onix"]).unwrap();
        let Command::Register(args) = cli.command else {
            panic!("expected register");
        };
        assert_eq!(args.plate, "");
    }

    #[test]
    fn test_parse_grant_admin_and_search() {
        let cli = Cli::try_parse_from(["parknow", "grant-admin", "boss", "--revoke"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::GrantAdmin { ref user_id, revoke: true } if user_id == "boss"
        ));

        let cli = Cli::try_parse_from(["parknow", "-u", "boss", "search", "abc1d23", "--follow"]).unwrap();
        assert!(matches!(cli.command, Command::Search { follow: true, .. }));
    }

    fn rented(id: &str, plate: &str, expiration_time: Option<i64>) -> Vehicle {
        let created = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        Vehicle {
            id: id.to_string(),
            owner_id: "alice".to_string(),
            model: "Onix".to_string(),
            make: "Chevrolet".to_string(),
            plate: plate.to_string(),
            body_type: BodyType::Hatch,
            electric: false,
            expiration_time,
            receipt: None,
            created_at: created,
            updated_at: created,
            sync_version: 1,
        }
    }

    #[tokio::test]
    async fn test_start_countdowns_only_for_rented() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap().timestamp_millis();
        let vehicles = [
            rented("v1", "ABC1D23", Some(now + 90_000)),
            rented("v2", "XYZ9Z99", None),
        ];

        let countdowns = start_countdowns(&vehicles, now, Duration::from_secs(1));
        assert_eq!(countdowns.len(), 1);
        assert_eq!(countdowns[0].plate, "ABC1D23");
        assert_eq!(countdowns[0].expires_at, now + 90_000);
        assert_eq!(
            countdowns[0].handle.current(),
            CountdownTick::Remaining("00:01:30".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_countdown_reported_once_then_removed() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap().timestamp_millis();
        let vehicles = [
            rented("v1", "ABC1D23", Some(now + 2_000)),
            rented("v2", "XYZ9Z99", Some(now + 3_600_000)),
        ];
        let mut countdowns = start_countdowns(&vehicles, now, Duration::from_secs(1));

        let (lines, expired_at) = drain_ticks(&mut countdowns);
        assert_eq!(lines.len(), 2);
        assert!(expired_at.is_none());
        assert_eq!(countdowns.len(), 2);

        // Runs until the short rental's ticker stops.
        while countdowns[0].handle.changed().await.is_some() {}

        let (lines, expired_at) = drain_ticks(&mut countdowns);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].plate, "ABC1D23");
        assert_eq!(lines[0].countdown, CountdownTick::Expired);
        assert_eq!(expired_at, Some(now + 2_000));
        assert_eq!(countdowns.len(), 1);
        assert_eq!(countdowns[0].plate, "XYZ9Z99");

        let (lines, expired_at) = drain_ticks(&mut countdowns);
        assert_eq!(lines.len(), 1);
        assert!(!lines[0].countdown.is_expired());
        assert!(expired_at.is_none());
    }

    #[test]
    fn test_views_after_expiry_show_available() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap().timestamp_millis();
        let vehicles = [rented("v1", "ABC1D23", Some(now + 2_000))];

        let views = project_after_expiry(&vehicles, now + 2_000, ReceiptVisibility::WhileRented);
        assert_eq!(views[0].state, RentalState::Available);
        assert!(views[0].remaining.is_none());
        assert!(views[0].can_modify);
    }
}
