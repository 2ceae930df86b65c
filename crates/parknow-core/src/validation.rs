//! # Validation Module
//!
//! Input validation for Park Now. Every check here runs before any store call.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI arguments (clap)                                         │
//! │  └── Types and presence of flags                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Blank fields, body type, hours, payment method                    │
//! │  └── Normalization (trim, uppercase plate)                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  └── Conditional writes (rented vehicles are never touched)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use parknow_core::validation::{validate_hours, validate_vehicle_draft};
//! use parknow_core::VehicleDraft;
//!
//! let draft = VehicleDraft {
//!     model: "Onix".into(),
//!     make: "Chevrolet".into(),
//!     plate: "abc1d23".into(),
//!     body_type: "Hatch".into(),
//!     electric: false,
//! };
//! let fields = validate_vehicle_draft(&draft).unwrap();
//! assert_eq!(fields.plate, "ABC1D23");
//!
//! assert!(validate_hours(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{BodyType, PaymentMethod, VehicleDraft, VehicleFields};
use crate::MAX_RENTAL_HOURS;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Vehicle Validators
// =============================================================================

fn required(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(value.to_string())
}

/// Validates a registration or edit form.
///
/// ## Rules
/// - model, make, plate and body type must be non-blank
/// - body type must be one of the selectable values
/// - plate is uppercased
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Register Vehicle                                                       │
/// │                                                                         │
/// │  User fills the form and taps "Cadastrar"                              │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_vehicle_draft(draft) ← THIS FUNCTION                         │
/// │       │                                                                 │
/// │       ├── any field blank? → "Por favor, preencha todos os campos."    │
/// │       │                                                                 │
/// │       ├── body type unknown? → NotAllowed                              │
/// │       │                                                                 │
/// │       └── OK → VehicleFields go to the store                           │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_vehicle_draft(draft: &VehicleDraft) -> ValidationResult<VehicleFields> {
    let model = required("model", &draft.model)?;
    let make = required("make", &draft.make)?;
    let plate = required("plate", &draft.plate)?;
    let body_type: BodyType = required("body_type", &draft.body_type)?.parse()?;

    Ok(VehicleFields {
        model,
        make,
        plate: normalize_plate(&plate),
        body_type,
        electric: draft.electric,
    })
}

/// Trims and uppercases a plate.
pub fn normalize_plate(plate: &str) -> String {
    plate.trim().to_uppercase()
}

/// Normalizes an admin search query.
///
/// Returns `None` for a blank query: the caller must not query the store.
pub fn normalize_plate_query(query: &str) -> Option<String> {
    let plate = normalize_plate(query);
    if plate.is_empty() {
        None
    } else {
        Some(plate)
    }
}

// =============================================================================
// Rental Validators
// =============================================================================

/// Validates the number of hours for a rental.
///
/// ## Rules
/// - Must be at least 1 → `InvalidHours`
/// - Must not exceed [`MAX_RENTAL_HOURS`] (one year) → `HoursAboveLimit`,
///   which has its own user message naming the cap
pub fn validate_hours(hours: i64) -> ValidationResult<u32> {
    if hours < 1 {
        return Err(ValidationError::InvalidHours { hours });
    }
    if hours > i64::from(MAX_RENTAL_HOURS) {
        return Err(ValidationError::HoursAboveLimit {
            hours,
            max: MAX_RENTAL_HOURS,
        });
    }
    // Range checked above.
    Ok(hours as u32)
}

/// Parses the raw hours text typed by the user.
///
/// Anything that is not an integer is reported as `InvalidHours` with
/// `hours = 0`, same as an explicit zero. Counts above
/// [`MAX_RENTAL_HOURS`] fail with `HoursAboveLimit`.
pub fn parse_hours(raw: &str) -> ValidationResult<u32> {
    let hours = raw.trim().parse::<i64>().unwrap_or(0);
    validate_hours(hours)
}

/// Ensures a payment method was selected.
pub fn validate_payment_method(method: Option<PaymentMethod>) -> ValidationResult<PaymentMethod> {
    method.ok_or(ValidationError::PaymentMethodMissing)
}

/// Parses an optional payment method label.
pub fn parse_payment_method(raw: Option<&str>) -> ValidationResult<PaymentMethod> {
    match raw {
        Some(label) => label.parse(),
        None => Err(ValidationError::PaymentMethodMissing),
    }
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates the acting user id. User ids come from the identity provider
/// and are opaque, so only blankness is checked.
pub fn validate_user_id(user_id: &str) -> ValidationResult<String> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(ValidationError::UserRequired);
    }
    Ok(user_id.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================
