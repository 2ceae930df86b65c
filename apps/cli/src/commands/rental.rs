//! # Rental Commands
//!
//! Quote, purchase and receipt.
//!
//! ## Purchase Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    "Alugar vaga" Flow                                   │
//! │                                                                         │
//! │  hours text + payment label                                            │
//! │       │                                                                 │
//! │       ├── parse_hours ────────────► "insira um número de horas válido" │
//! │       ├── parse_payment_method ───► "selecione uma forma de pagamento" │
//! │       │          (no store call yet)                                    │
//! │       ▼                                                                 │
//! │  load vehicle + ensure_owner                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  plan_purchase(vehicle, hours, method, now in display offset)          │
//! │       │   cost, new_expiration, receipt                                 │
//! │       ▼                                                                 │
//! │  apply_rental: ONE conditional write (expiration_time + receipt)       │
//! │       │                                                                 │
//! │       ├── lost the race ──► CONFLICT                                   │
//! │       ▼                                                                 │
//! │  RentalConfirmation { vehicle, receipt }                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use parknow_core::pricing::{first_hour_cost, ADDITIONAL_HOUR_COST};
use parknow_core::validation::{parse_hours, parse_payment_method};
use parknow_core::{plan_purchase, quote, receipt_for, Money, Receipt};

use super::vehicle::{load_owned, VehicleView};
use crate::error::ApiError;
use crate::state::{AppState, Session};

/// Price shown before the user confirms.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalQuote {
    pub vehicle_id: String,
    pub hours: u32,
    pub first_hour: Money,
    pub additional_hour: Money,
    pub total: Money,
    /// `R$ 6.50`
    pub total_display: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalConfirmation {
    pub vehicle: VehicleView,
    pub receipt: Receipt,
}

/// Prices a rental without changing anything.
pub async fn quote_rental(
    state: &AppState,
    session: &Session,
    vehicle_id: &str,
    hours: &str,
) -> Result<RentalQuote, ApiError> {
    let hours = parse_hours(hours)?;
    let vehicle = load_owned(state, session, vehicle_id).await?;
    let total = quote(&vehicle, i64::from(hours))?;

    Ok(RentalQuote {
        vehicle_id: vehicle.id,
        hours,
        first_hour: first_hour_cost(vehicle.body_type, vehicle.electric),
        additional_hour: ADDITIONAL_HOUR_COST,
        total,
        total_display: total.to_string(),
    })
}

/// Rents a spot for `hours` and records the receipt.
///
/// `payment_method` is a label only ("pix", "Cartão de Crédito", ...); no
/// payment is processed.
pub async fn rent_vehicle(
    state: &AppState,
    session: &Session,
    vehicle_id: &str,
    hours: &str,
    payment_method: Option<&str>,
    now: DateTime<Utc>,
) -> Result<RentalConfirmation, ApiError> {
    let hours = parse_hours(hours)?;
    let payment_method = parse_payment_method(payment_method)?;
    let vehicle = load_owned(state, session, vehicle_id).await?;

    let local_now = now.with_timezone(&state.config().display_offset());
    let plan = plan_purchase(
        &vehicle,
        i64::from(hours),
        Some(payment_method),
        &local_now,
    )?;

    let rented = state
        .db()
        .vehicles()
        .apply_rental(session.user_id(), &plan, now)
        .await?;

    info!(
        id = %rented.id,
        hours = plan.hours,
        cost = %plan.cost,
        payment_method = %payment_method,
        "Rental confirmed"
    );

    Ok(RentalConfirmation {
        vehicle: VehicleView::project(
            &rented,
            now.timestamp_millis(),
            state.config().receipt_visibility(),
        ),
        receipt: plan.receipt,
    })
}

/// The receipt the session user may view for this vehicle.
pub async fn get_receipt(
    state: &AppState,
    session: &Session,
    vehicle_id: &str,
    now: DateTime<Utc>,
) -> Result<Receipt, ApiError> {
    let vehicle = load_owned(state, session, vehicle_id).await?;
    let receipt = receipt_for(
        &vehicle,
        now.timestamp_millis(),
        state.config().receipt_visibility(),
    )?;
    Ok(receipt.clone())
}
