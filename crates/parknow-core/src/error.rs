//! # Error Types
//!
//! Domain-specific error types for parknow-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  parknow-core errors (this file)                                       │
//! │  ├── CoreError        - Authorization / lifecycle rule violations      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  parknow-db errors (separate crate)                                    │
//! │  └── DbError          - Store operation failures                       │
//! │                                                                         │
//! │  CLI errors (in app)                                                   │
//! │  └── ApiError         - What the presentation layer sees               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError ← DbError                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation errors never reach the store. Authorization errors are raised
//! before a store call is issued.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Lifecycle and authorization errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The vehicle is currently rented.
    ///
    /// ## When This Occurs
    /// - Edit, delete or a second rental attempted before `expires_at`
    ///
    /// ## User Workflow
    /// ```text
    /// Tap "Editar carro"
    ///      │
    ///      ▼
    /// ensure_available(vehicle, now)
    ///      │
    ///      ▼
    /// VehicleRented { vehicle_id, expires_at }
    ///      │
    ///      ▼
    /// Button stays disabled, record untouched
    /// ```
    #[error("Vehicle {vehicle_id} is rented until {expires_at}, operation not allowed")]
    VehicleRented { vehicle_id: String, expires_at: i64 },

    /// The acting user does not own the vehicle.
    #[error("Vehicle {vehicle_id} does not belong to the current user")]
    NotOwner { vehicle_id: String },

    /// The acting user lacks the admin flag.
    #[error("Administrator access required")]
    AdminRequired,

    /// Receipt cannot be shown (no rental, or rental already expired).
    #[error("No receipt available for vehicle {vehicle_id}")]
    ReceiptUnavailable { vehicle_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns true for errors of the authorization class.
    ///
    /// These are the errors the presentation layer pre-empts by disabling
    /// actions; the core still raises them when called directly.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            CoreError::VehicleRented { .. }
                | CoreError::NotOwner { .. }
                | CoreError::AdminRequired
                | CoreError::ReceiptUnavailable { .. }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any store call. Each variant has a user-facing message in
/// the app's language via [`ValidationError::user_message`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// Hours requested for a rental are not a positive count.
    #[error("Invalid number of hours: {hours} (must be at least 1)")]
    InvalidHours { hours: i64 },

    /// Hours requested exceed the longest rental a single purchase covers.
    #[error("Number of hours {hours} exceeds the maximum of {max}")]
    HoursAboveLimit { hours: i64, max: u32 },

    /// No acting user was given.
    #[error("user id is required")]
    UserRequired,

    /// No payment method was selected.
    #[error("Payment method is required")]
    PaymentMethodMissing,

    /// Value is not in the allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Message shown to the end user.
    pub fn user_message(&self) -> String {
        match self {
            ValidationError::Required { .. } => "Por favor, preencha todos os campos.".to_string(),
            ValidationError::InvalidHours { .. } => {
                "Por favor, insira um número de horas válido.".to_string()
            }
            ValidationError::HoursAboveLimit { max, .. } => {
                format!("O aluguel pode ter no máximo {max} horas.")
            }
            ValidationError::UserRequired => "Por favor, identifique o usuário.".to_string(),
            ValidationError::PaymentMethodMissing => {
                "Por favor, selecione uma forma de pagamento.".to_string()
            }
            ValidationError::NotAllowed { field, allowed } => {
                format!("{field} inválido. Opções: {}", allowed.join(", "))
            }
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
