//! # Vehicle Commands
//!
//! Owner-scoped registry: register, list, get, edit, delete, live list.
//!
//! ## Guard Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Edit / Delete Flow                                   │
//! │                                                                         │
//! │  edit_vehicle(session, id, draft)                                      │
//! │       │                                                                 │
//! │       ├── validate_vehicle_draft ──► VALIDATION_ERROR (no store call)  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  load vehicle ──────────────────────► NOT_FOUND                        │
//! │       │                                                                 │
//! │       ├── ensure_owner ─────────────► NOT_OWNER                        │
//! │       ├── ensure_available ─────────► VEHICLE_RENTED                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  conditional UPDATE (owner + available re-checked) ──► CONFLICT        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

use parknow_core::validation::validate_vehicle_draft;
use parknow_core::{
    ensure_available, ensure_owner, receipt_for, remaining_ms, rental_state, BodyType,
    ReceiptVisibility, RentalState, Vehicle, VehicleDraft,
};
use parknow_db::{Subscription, SubscriptionKey};

use crate::error::ApiError;
use crate::state::{AppState, Session};

/// Vehicle as the presentation layer sees it at one instant.
///
/// `can_modify` drives the edit/delete/rent buttons; `receipt_available`
/// drives "Ver comprovante".
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleView {
    pub id: String,
    pub model: String,
    pub make: String,
    pub plate: String,
    pub body_type: BodyType,
    pub body_type_label: String,
    pub electric: bool,
    pub state: RentalState,
    /// `HH:MM:SS` while rented.
    pub remaining: Option<String>,
    pub can_modify: bool,
    pub receipt_available: bool,
    pub sync_version: i64,
}

impl VehicleView {
    pub fn project(vehicle: &Vehicle, now: i64, visibility: ReceiptVisibility) -> Self {
        let state = rental_state(vehicle, now);
        let remaining = state
            .is_rented()
            .then(|| parknow_core::format_remaining(remaining_ms(vehicle, now)));

        VehicleView {
            id: vehicle.id.clone(),
            model: vehicle.model.clone(),
            make: vehicle.make.clone(),
            plate: vehicle.plate.clone(),
            body_type: vehicle.body_type,
            body_type_label: vehicle.body_type.label().to_string(),
            electric: vehicle.electric,
            can_modify: !state.is_rented(),
            state,
            remaining,
            receipt_available: receipt_for(vehicle, now, visibility).is_ok(),
            sync_version: vehicle.sync_version,
        }
    }

    pub fn project_all(vehicles: &[Vehicle], now: i64, visibility: ReceiptVisibility) -> Vec<Self> {
        vehicles
            .iter()
            .map(|v| VehicleView::project(v, now, visibility))
            .collect()
    }
}

/// Loads a vehicle and checks the session owns it.
pub(crate) async fn load_owned(
    state: &AppState,
    session: &Session,
    vehicle_id: &str,
) -> Result<Vehicle, ApiError> {
    let vehicle = state
        .db()
        .vehicles()
        .get_by_id(vehicle_id.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("Vehicle", vehicle_id))?;

    ensure_owner(&vehicle, session.user_id())?;
    Ok(vehicle)
}

/// Registers a vehicle for the session user.
///
/// ## User Workflow
/// ```text
/// Form: Modelo / Marca / Placa / Carroceria / Elétrico
///      │
///      ▼ "Cadastrar"
/// register_vehicle ── blank field? ──► "Por favor, preencha todos os campos."
///      │
///      ▼
/// vehicles.insert ──► Created on the change feed ──► owner list refreshes
/// ```
pub async fn register_vehicle(
    state: &AppState,
    session: &Session,
    draft: &VehicleDraft,
    now: DateTime<Utc>,
) -> Result<VehicleView, ApiError> {
    let fields = validate_vehicle_draft(draft)?;
    let vehicle = state
        .db()
        .vehicles()
        .insert(session.user_id(), &fields, now)
        .await?;

    info!(id = %vehicle.id, plate = %vehicle.plate, "Vehicle registered");
    Ok(VehicleView::project(
        &vehicle,
        now.timestamp_millis(),
        state.config().receipt_visibility(),
    ))
}

/// One-shot read of the session user's vehicles, oldest first.
pub async fn list_vehicles(
    state: &AppState,
    session: &Session,
    now: DateTime<Utc>,
) -> Result<Vec<VehicleView>, ApiError> {
    let start = Instant::now();
    let vehicles = state
        .db()
        .vehicles()
        .list_by_owner(session.user_id())
        .await?;

    debug!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        count = vehicles.len(),
        "list_vehicles complete"
    );

    Ok(VehicleView::project_all(
        &vehicles,
        now.timestamp_millis(),
        state.config().receipt_visibility(),
    ))
}

pub async fn get_vehicle(
    state: &AppState,
    session: &Session,
    vehicle_id: &str,
    now: DateTime<Utc>,
) -> Result<VehicleView, ApiError> {
    let vehicle = load_owned(state, session, vehicle_id).await?;
    Ok(VehicleView::project(
        &vehicle,
        now.timestamp_millis(),
        state.config().receipt_visibility(),
    ))
}

/// Replaces the descriptive fields of an Available vehicle.
///
/// `expected_version` rejects the write if someone else saved first.
pub async fn edit_vehicle(
    state: &AppState,
    session: &Session,
    vehicle_id: &str,
    draft: &VehicleDraft,
    expected_version: Option<i64>,
    now: DateTime<Utc>,
) -> Result<VehicleView, ApiError> {
    let fields = validate_vehicle_draft(draft)?;
    let vehicle = load_owned(state, session, vehicle_id).await?;
    ensure_available(&vehicle, now.timestamp_millis())?;

    let updated = state
        .db()
        .vehicles()
        .update(&vehicle.id, session.user_id(), &fields, now, expected_version)
        .await?;

    info!(id = %updated.id, version = updated.sync_version, "Vehicle edited");
    Ok(VehicleView::project(
        &updated,
        now.timestamp_millis(),
        state.config().receipt_visibility(),
    ))
}

pub async fn delete_vehicle(
    state: &AppState,
    session: &Session,
    vehicle_id: &str,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    let vehicle = load_owned(state, session, vehicle_id).await?;
    ensure_available(&vehicle, now.timestamp_millis())?;

    state
        .db()
        .vehicles()
        .delete(&vehicle.id, session.user_id(), now)
        .await?;

    info!(id = %vehicle.id, "Vehicle deleted");
    Ok(())
}

/// Live list of the session user's vehicles.
///
/// The first snapshot is available immediately. Release with
/// [`Subscription::cancel`] (or drop) when the view closes.
pub async fn watch_vehicles(state: &AppState, session: &Session) -> Result<Subscription, ApiError> {
    let subscription = state
        .db()
        .vehicles()
        .subscribe(SubscriptionKey::Owner(session.user_id().to_string()))
        .await?;
    Ok(subscription)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use chrono::Duration;
    use parknow_core::{plan_purchase, PaymentMethod};

    fn draft(plate: &str) -> VehicleDraft {
        VehicleDraft {
            model: "Onix".to_string(),
            make: "Chevrolet".to_string(),
            plate: plate.to_string(),
            body_type: "hatch".to_string(),
            electric: false,
        }
    }

    fn session(user_id: &str) -> Session {
        Session::for_test(user_id, false)
    }

    async fn rent(state: &AppState, owner: &Session, vehicle_id: &str, now: DateTime<Utc>) {
        let vehicle = state
            .db()
            .vehicles()
            .get_by_id(vehicle_id)
            .await
            .unwrap()
            .unwrap();
        let plan = plan_purchase(&vehicle, 2, Some(PaymentMethod::Pix), &now).unwrap();
        state
            .db()
            .vehicles()
            .apply_rental(owner.user_id(), &plan, now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_register_and_list() {
        let state = AppState::in_memory().await.unwrap();
        let alice = session("alice");
        let now = Utc::now();

        let view = register_vehicle(&state, &alice, &draft(" abc1d23 "), now)
            .await
            .unwrap();
        assert_eq!(view.plate, "ABC1D23");
        assert_eq!(view.body_type, BodyType::Hatch);
        assert_eq!(view.body_type_label, "Hatch");
        assert_eq!(view.state, RentalState::Available);
        assert!(view.can_modify);
        assert!(!view.receipt_available);
        assert!(view.remaining.is_none());

        let listed = list_vehicles(&state, &alice, now).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(list_vehicles(&state, &session("bob"), now)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_blank_field_without_store_write() {
        let state = AppState::in_memory().await.unwrap();
        let mut incomplete = draft("ABC1D23");
        incomplete.make = "  ".to_string();

        let err = register_vehicle(&state, &session("alice"), &incomplete, Utc::now())
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "Por favor, preencha todos os campos.");
        assert_eq!(state.db().vehicles().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_edit_and_delete_require_owner() {
        let state = AppState::in_memory().await.unwrap();
        let now = Utc::now();
        let view = register_vehicle(&state, &session("alice"), &draft("ABC1D23"), now)
            .await
            .unwrap();

        let err = edit_vehicle(&state, &session("bob"), &view.id, &draft("XYZ"), None, now)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotOwner);

        let err = delete_vehicle(&state, &session("bob"), &view.id, now)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotOwner);

        let err = get_vehicle(&state, &session("bob"), &view.id, now)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotOwner);
    }

    #[tokio::test]
    async fn test_rented_vehicle_cannot_be_edited_or_deleted() {
        let state = AppState::in_memory().await.unwrap();
        let alice = session("alice");
        let now = Utc::now();
        let view = register_vehicle(&state, &alice, &draft("ABC1D23"), now)
            .await
            .unwrap();
        rent(&state, &alice, &view.id, now).await;

        let err = edit_vehicle(&state, &alice, &view.id, &draft("NEW0A00"), None, now)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::VehicleRented);

        let err = delete_vehicle(&state, &alice, &view.id, now)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::VehicleRented);

        let stored = get_vehicle(&state, &alice, &view.id, now).await.unwrap();
        assert_eq!(stored.plate, "ABC1D23");
        assert!(!stored.can_modify);
        assert!(stored.receipt_available);
        assert_eq!(stored.remaining.as_deref(), Some("02:00:00"));

        // After expiry the same record is Available again.
        let later = now + Duration::hours(3);
        let edited = edit_vehicle(&state, &alice, &view.id, &draft("NEW0A00"), None, later)
            .await
            .unwrap();
        assert_eq!(edited.plate, "NEW0A00");
        assert!(!edited.receipt_available);
        delete_vehicle(&state, &alice, &view.id, later).await.unwrap();
        assert_eq!(state.db().vehicles().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_edit_with_stale_version_conflicts() {
        let state = AppState::in_memory().await.unwrap();
        let alice = session("alice");
        let now = Utc::now();
        let view = register_vehicle(&state, &alice, &draft("ABC1D23"), now)
            .await
            .unwrap();

        edit_vehicle(&state, &alice, &view.id, &draft("FIRST00"), Some(view.sync_version), now)
            .await
            .unwrap();

        let err = edit_vehicle(&state, &alice, &view.id, &draft("SECOND0"), Some(view.sync_version), now)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn test_get_unknown_vehicle() {
        let state = AppState::in_memory().await.unwrap();
        let err = get_vehicle(&state, &session("alice"), "missing", Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_watch_vehicles_pushes_changes() {
        let state = AppState::in_memory().await.unwrap();
        let alice = session("alice");
        let now = Utc::now();

        let mut live = watch_vehicles(&state, &alice).await.unwrap();
        assert!(live.next().await.unwrap().is_empty());

        register_vehicle(&state, &alice, &draft("ABC1D23"), now)
            .await
            .unwrap();
        let snapshot = live.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);

        live.cancel().await;
    }
}
