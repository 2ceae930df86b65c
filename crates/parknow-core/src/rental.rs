//! # Rental State Machine
//!
//! A vehicle's rental state is never stored: it is derived from
//! `expiration_time` and the current instant on every read.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌───────────┐   payment confirmed    ┌──────────────────────────┐    │
//! │   │ Available │ ──────────────────────►│ Rented { expires_at }    │    │
//! │   │           │   expiration =         │                          │    │
//! │   │           │   now + hours × 1h     │  edit / delete / rent    │    │
//! │   │           │◄────────────────────── │  rejected (VehicleRented)│    │
//! │   └───────────┘   now ≥ expires_at     └──────────────────────────┘    │
//! │        ▲          (no write, time only)                                 │
//! │        │                                                                │
//! │   registered with no expiration                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All functions take `now` as epoch milliseconds, except
//! [`plan_purchase`] which takes a zoned `DateTime` so the receipt can be
//! formatted in the display timezone.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Duration;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::compute_cost;
use crate::receipt::build_receipt;
use crate::types::{PaymentMethod, Receipt, Vehicle};
use crate::validation::{validate_hours, validate_payment_method};
use crate::{MILLIS_PER_HOUR, NOT_RENTED_MESSAGE};

// =============================================================================
// State Derivation
// =============================================================================

/// Derived rental state of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RentalState {
    Available,
    Rented {
        #[serde(rename = "expiresAt")]
        expires_at: i64,
    },
}

impl RentalState {
    pub fn is_rented(&self) -> bool {
        matches!(self, RentalState::Rented { .. })
    }
}

/// Rented iff `expiration_time > now`.
pub fn rental_state(vehicle: &Vehicle, now: i64) -> RentalState {
    match vehicle.expiration_time {
        Some(expires_at) if expires_at > now => RentalState::Rented { expires_at },
        _ => RentalState::Available,
    }
}

pub fn is_rented(vehicle: &Vehicle, now: i64) -> bool {
    rental_state(vehicle, now).is_rented()
}

/// Time left on the current rental. `None` when Available.
pub fn remaining(vehicle: &Vehicle, now: i64) -> Option<Duration> {
    match rental_state(vehicle, now) {
        RentalState::Rented { expires_at } => {
            Some(Duration::from_millis((expires_at - now).unsigned_abs()))
        }
        RentalState::Available => None,
    }
}

/// Signed milliseconds until expiration. A missing expiration counts as 0,
/// so the result is negative for vehicles that were never rented.
pub fn remaining_ms(vehicle: &Vehicle, now: i64) -> i64 {
    vehicle.expiration_time.unwrap_or(0) - now
}

/// Formats milliseconds as `HH:MM:SS` by floor division.
///
/// Hours are not wrapped at 24 and may take more than two digits.
/// Negative input clamps to zero.
///
/// ```rust
/// use parknow_core::format_remaining;
///
/// assert_eq!(format_remaining(3_661_000), "01:01:01");
/// assert_eq!(format_remaining(-5), "00:00:00");
/// ```
pub fn format_remaining(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// `HH:MM:SS` while rented, the "not rented" message otherwise.
pub fn remaining_display(vehicle: &Vehicle, now: i64) -> String {
    let ms = remaining_ms(vehicle, now);
    if ms > 0 {
        format_remaining(ms)
    } else {
        NOT_RENTED_MESSAGE.to_string()
    }
}

// =============================================================================
// Guards
// =============================================================================

/// Rejects the operation while the vehicle is rented.
///
/// Edit, delete and rent all call this before touching the store.
pub fn ensure_available(vehicle: &Vehicle, now: i64) -> CoreResult<()> {
    match rental_state(vehicle, now) {
        RentalState::Available => Ok(()),
        RentalState::Rented { expires_at } => Err(CoreError::VehicleRented {
            vehicle_id: vehicle.id.clone(),
            expires_at,
        }),
    }
}

/// Rejects the operation unless `user_id` registered the vehicle.
pub fn ensure_owner(vehicle: &Vehicle, user_id: &str) -> CoreResult<()> {
    if vehicle.owner_id == user_id {
        Ok(())
    } else {
        Err(CoreError::NotOwner {
            vehicle_id: vehicle.id.clone(),
        })
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// Validated cost for display before purchase.
pub fn quote(vehicle: &Vehicle, hours: i64) -> CoreResult<Money> {
    let hours = validate_hours(hours)?;
    Ok(compute_cost(
        vehicle.body_type,
        vehicle.electric,
        i64::from(hours),
    ))
}

/// Everything a confirmed rental writes, computed up front.
///
/// The store persists `new_expiration` and `receipt` in one write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RentalPlan {
    pub vehicle_id: String,
    pub hours: u32,
    pub cost: Money,
    /// Epoch milliseconds, strictly after `now`.
    pub new_expiration: i64,
    pub receipt: Receipt,
}

/// Plans the Available → Rented transition.
///
/// ## Checks (in order)
/// 1. `hours` at least 1 → `InvalidHours`; at most MAX_RENTAL_HOURS → `HoursAboveLimit`
/// 2. payment method selected → `PaymentMethodMissing`
/// 3. vehicle Available → `VehicleRented`
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Rent Spot                                                              │
/// │                                                                         │
/// │  User enters hours, sees quote(), picks payment, confirms              │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  plan_purchase(vehicle, hours, method, now) ← THIS FUNCTION            │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  RentalPlan { cost, new_expiration, receipt }                          │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  store: single conditional write (expiration_time + receipt)           │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn plan_purchase<Tz>(
    vehicle: &Vehicle,
    hours: i64,
    payment_method: Option<PaymentMethod>,
    now: &DateTime<Tz>,
) -> CoreResult<RentalPlan>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let hours = validate_hours(hours)?;
    let payment_method = validate_payment_method(payment_method)?;
    let now_ms = now.timestamp_millis();
    ensure_available(vehicle, now_ms)?;

    let cost = compute_cost(vehicle.body_type, vehicle.electric, i64::from(hours));
    let new_expiration = now_ms + i64::from(hours) * MILLIS_PER_HOUR;
    let receipt = build_receipt(vehicle, hours, cost, payment_method, now);

    Ok(RentalPlan {
        vehicle_id: vehicle.id.clone(),
        hours,
        cost,
        new_expiration,
        receipt,
    })
}

// =============================================================================
// Receipt Access
// =============================================================================

/// When the last receipt may be shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptVisibility {
    /// Only while the rental is active.
    #[default]
    WhileRented,
    /// Whenever a receipt exists.
    Always,
}

impl fmt::Display for ReceiptVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiptVisibility::WhileRented => f.write_str("while_rented"),
            ReceiptVisibility::Always => f.write_str("always"),
        }
    }
}

impl FromStr for ReceiptVisibility {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "while_rented" => Ok(ReceiptVisibility::WhileRented),
            "always" => Ok(ReceiptVisibility::Always),
            _ => Err(ValidationError::NotAllowed {
                field: "receipt_visibility".to_string(),
                allowed: vec!["while_rented".to_string(), "always".to_string()],
            }),
        }
    }
}

/// Returns the receipt the user may view.
pub fn receipt_for(
    vehicle: &Vehicle,
    now: i64,
    visibility: ReceiptVisibility,
) -> CoreResult<&Receipt> {
    let unavailable = || CoreError::ReceiptUnavailable {
        vehicle_id: vehicle.id.clone(),
    };

    if visibility == ReceiptVisibility::WhileRented && !is_rented(vehicle, now) {
        return Err(unavailable());
    }

    vehicle.receipt.as_ref().ok_or_else(unavailable)
}

// =============================================================================
// Unit Tests
// =============================================================================
