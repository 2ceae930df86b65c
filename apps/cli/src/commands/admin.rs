//! # Admin Commands
//!
//! Plate lookup across every owner, for admin-flagged sessions.
//!
//! ## Search Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Plate Search Flow                                    │
//! │                                                                         │
//! │  Admin types " abc1d23 "                                               │
//! │       │                                                                 │
//! │       ├── session.is_admin()? ─ no ─► ADMIN_REQUIRED                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  normalize: trim + uppercase → "ABC1D23"                               │
//! │       │                                                                 │
//! │       ├── blank? ──► [] (store not queried)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  find_by_plate("ABC1D23")  exact match, all owners                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PlateMatch { vehicle, remaining_ms, state, remaining_display }        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use parknow_core::validation::{normalize_plate_query, validate_user_id};
use parknow_core::{remaining_display, remaining_ms, rental_state, AdminFlag, RentalState, Vehicle};
use parknow_db::{Subscription, SubscriptionKey, VehicleRepository};

use crate::error::ApiError;
use crate::state::{AppState, Session};

/// One search hit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateMatch {
    pub vehicle: Vehicle,
    /// `expiration_time - now`; a missing expiration counts as 0. May be negative.
    pub remaining_ms: i64,
    pub state: RentalState,
    /// `HH:MM:SS` while rented, otherwise the "not rented" message.
    pub remaining_display: String,
}

impl PlateMatch {
    pub fn project(vehicle: Vehicle, now: i64) -> Self {
        PlateMatch {
            remaining_ms: remaining_ms(&vehicle, now),
            state: rental_state(&vehicle, now),
            remaining_display: remaining_display(&vehicle, now),
            vehicle,
        }
    }

    pub fn project_all(vehicles: Vec<Vehicle>, now: i64) -> Vec<Self> {
        vehicles
            .into_iter()
            .map(|v| PlateMatch::project(v, now))
            .collect()
    }
}

/// Exact, case-normalized plate search across all vehicles.
///
/// The admin's own vehicles are included.
pub async fn search_by_plate(
    state: &AppState,
    session: &Session,
    query: &str,
    now: DateTime<Utc>,
) -> Result<Vec<PlateMatch>, ApiError> {
    session.require_admin()?;

    let Some(plate) = normalize_plate_query(query) else {
        debug!("Blank plate query, skipping store");
        return Ok(Vec::new());
    };

    let vehicles = state.db().vehicles().find_by_plate(&plate).await?;
    info!(plate = %plate, count = vehicles.len(), "Plate search complete");

    Ok(PlateMatch::project_all(vehicles, now.timestamp_millis()))
}

/// Live variant of [`search_by_plate`]. `None` for a blank query.
pub async fn watch_plate(
    state: &AppState,
    session: &Session,
    query: &str,
) -> Result<Option<Subscription>, ApiError> {
    session.require_admin()?;

    match normalize_plate_query(query) {
        Some(plate) => {
            let subscription = state
                .db()
                .vehicles()
                .subscribe(SubscriptionKey::Plate(plate))
                .await?;
            Ok(Some(subscription))
        }
        None => Ok(None),
    }
}

/// Writes the admin flag for `user_id`. Maintenance only: no session check.
pub async fn grant_admin(
    state: &AppState,
    user_id: &str,
    is_admin: bool,
    now: DateTime<Utc>,
) -> Result<AdminFlag, ApiError> {
    let user_id = validate_user_id(user_id)?;
    Ok(state.db().admins().set_admin(&user_id, is_admin, now).await?)
}

// =============================================================================
// Plate Search Session
// =============================================================================

/// The admin search screen: one query, one live subscription, current results.
///
/// ## User Workflow
/// ```text
/// set_query("abc1d23") ── subscribe(Plate) ──► results = first snapshot
///      │
///      ▼
/// refresh(now) ── next snapshot after a matching write ──► results
///      │
///      ▼
/// set_query("") ── cancel subscription ──► results = []
/// ```
pub struct PlateSearch {
    vehicles: VehicleRepository,
    query: Option<String>,
    live: Option<Subscription>,
    results: Vec<PlateMatch>,
}

impl PlateSearch {
    pub fn new(state: &AppState, session: &Session) -> Result<Self, ApiError> {
        session.require_admin()?;
        Ok(PlateSearch {
            vehicles: state.db().vehicles(),
            query: None,
            live: None,
            results: Vec::new(),
        })
    }

    /// Replaces the query. A blank query cancels the live subscription and
    /// clears the results.
    pub async fn set_query(&mut self, query: &str, now: DateTime<Utc>) -> Result<&[PlateMatch], ApiError> {
        if let Some(previous) = self.live.take() {
            previous.cancel().await;
        }
        self.results.clear();
        self.query = normalize_plate_query(query);

        let Some(plate) = self.query.clone() else {
            return Ok(&self.results);
        };

        let mut live = self.vehicles.subscribe(SubscriptionKey::Plate(plate)).await?;
        if let Some(snapshot) = live.next().await {
            self.results = PlateMatch::project_all(snapshot, now.timestamp_millis());
        }
        self.live = Some(live);

        Ok(&self.results)
    }

    /// Waits for the next snapshot. `None` when there is no live query.
    pub async fn refresh(&mut self, now: DateTime<Utc>) -> Option<&[PlateMatch]> {
        let snapshot = self.live.as_mut()?.next().await?;
        self.results = PlateMatch::project_all(snapshot, now.timestamp_millis());
        Some(&self.results)
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn results(&self) -> &[PlateMatch] {
        &self.results
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    /// Cancels the live subscription, if any.
    pub async fn close(mut self) {
        if let Some(live) = self.live.take() {
            live.cancel().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::rental::rent_vehicle;
    use crate::commands::vehicle::{edit_vehicle, register_vehicle};
    use crate::error::ErrorCode;
    use chrono::Duration;
    use parknow_core::{VehicleDraft, NOT_RENTED_MESSAGE};

    fn session(user_id: &str, is_admin: bool) -> Session {
        Session::for_test(user_id, is_admin)
    }

    fn draft(plate: &str) -> VehicleDraft {
        VehicleDraft {
            model: "Kwid".to_string(),
            make: "Renault".to_string(),
            plate: plate.to_string(),
            body_type: "compact".to_string(),
            electric: false,
        }
    }

    #[tokio::test]
    async fn test_search_requires_admin() {
        let state = AppState::in_memory().await.unwrap();
        let err = search_by_plate(&state, &session("alice", false), "ABC1D23", Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AdminRequired);

        let err = PlateSearch::new(&state, &session("alice", false))
            .err()
            .unwrap();
        assert_eq!(err.code, ErrorCode::AdminRequired);
    }

    #[tokio::test]
    async fn test_search_exact_and_case_normalized() {
        let state = AppState::in_memory().await.unwrap();
        let admin = session("boss", true);
        let now = Utc::now();

        register_vehicle(&state, &session("alice", false), &draft("ABC1D23"), now)
            .await
            .unwrap();
        register_vehicle(&state, &session("bob", false), &draft("abc1d23"), now)
            .await
            .unwrap();
        register_vehicle(&state, &session("carol", false), &draft("ABC1D2"), now)
            .await
            .unwrap();
        register_vehicle(&state, &admin, &draft("ABC1D23"), now)
            .await
            .unwrap();

        let found = search_by_plate(&state, &admin, "  abc1d23 ", now).await.unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|m| m.vehicle.plate == "ABC1D23"));
        assert!(found.iter().any(|m| m.vehicle.owner_id == "boss"));

        let hit = &found[0];
        assert_eq!(hit.state, RentalState::Available);
        assert_eq!(hit.remaining_ms, -now.timestamp_millis());
        assert_eq!(hit.remaining_display, NOT_RENTED_MESSAGE);
    }

    #[tokio::test]
    async fn test_blank_query_returns_empty() {
        let state = AppState::in_memory().await.unwrap();
        let admin = session("boss", true);
        register_vehicle(&state, &admin, &draft("ABC1D23"), Utc::now())
            .await
            .unwrap();

        assert!(search_by_plate(&state, &admin, "   ", Utc::now())
            .await
            .unwrap()
            .is_empty());
        assert!(watch_plate(&state, &admin, "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rented_match_shows_countdown() {
        let state = AppState::in_memory().await.unwrap();
        let alice = session("alice", false);
        let admin = session("boss", true);
        let now = Utc::now();

        let view = register_vehicle(&state, &alice, &draft("ABC1D23"), now)
            .await
            .unwrap();
        rent_vehicle(&state, &alice, &view.id, "1", Some("pix"), now)
            .await
            .unwrap();

        let later = now + Duration::seconds(61);
        let found = search_by_plate(&state, &admin, "abc1d23", later).await.unwrap();
        assert_eq!(found[0].remaining_ms, 3_600_000 - 61_000);
        assert_eq!(found[0].remaining_display, "00:58:59");
        assert!(found[0].state.is_rented());
    }

    #[tokio::test]
    async fn test_plate_search_session() {
        let state = AppState::in_memory().await.unwrap();
        let alice = session("alice", false);
        let now = Utc::now();
        let view = register_vehicle(&state, &alice, &draft("ABC1D23"), now)
            .await
            .unwrap();

        let mut search = PlateSearch::new(&state, &session("boss", true)).unwrap();
        let results = search.set_query("abc1d23", now).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(search.query(), Some("ABC1D23"));

        // Another vehicle takes the plate: the live query picks it up.
        register_vehicle(&state, &session("bob", false), &draft("ABC1D23"), now)
            .await
            .unwrap();
        assert_eq!(search.refresh(now).await.unwrap().len(), 2);

        // Alice renames hers away from the plate.
        edit_vehicle(&state, &alice, &view.id, &draft("ZZZ9Z99"), None, now)
            .await
            .unwrap();
        assert_eq!(search.refresh(now).await.unwrap().len(), 1);

        let results = search.set_query("  ", now).await.unwrap();
        assert!(results.is_empty());
        assert!(!search.is_live());
        assert!(search.refresh(now).await.is_none());

        search.close().await;
    }

    #[tokio::test]
    async fn test_grant_admin() {
        let state = AppState::in_memory().await.unwrap();
        let flag = grant_admin(&state, " boss ", true, Utc::now()).await.unwrap();
        assert_eq!(flag.user_id, "boss");

        let session = Session::resolve(&state, "boss").await.unwrap();
        assert!(session.is_admin());

        let err = grant_admin(&state, "", true, Utc::now()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
