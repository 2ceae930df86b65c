//! # API Error Type
//!
//! Unified error type for commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Park Now                               │
//! │                                                                         │
//! │  Command Function  →  Result<T, ApiError>                               │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ValidationError ──────────────────────► VALIDATION_ERROR               │
//! │  CoreError::VehicleRented ─────────────► VEHICLE_RENTED                 │
//! │  CoreError::NotOwner ──────────────────► NOT_OWNER                      │
//! │  CoreError::AdminRequired ─────────────► ADMIN_REQUIRED                 │
//! │  CoreError::ReceiptUnavailable ────────► RECEIPT_UNAVAILABLE            │
//! │  DbError::NotFound ────────────────────► NOT_FOUND                      │
//! │  DbError::Conflict ────────────────────► CONFLICT                       │
//! │  DbError (anything else) ──────────────► STORE_ERROR                    │
//! │                                                                         │
//! │  Printed by the CLI as:                                                │
//! │  { "code": "VEHICLE_RENTED", "message": "..." }                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation messages are the user-facing pt-BR texts.

use serde::Serialize;

use crate::config::ConfigError;
use parknow_core::{CoreError, ValidationError};
use parknow_db::DbError;

/// Error returned from every command.
///
/// ## Serialization
/// ```json
/// {
///   "code": "VALIDATION_ERROR",
///   "message": "Por favor, preencha todos os campos."
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Vehicle does not exist
    NotFound,

    /// Input validation failed (no store call was made)
    ValidationError,

    /// Vehicle is rented; edit/delete/rent refused
    VehicleRented,

    /// Vehicle belongs to another user
    NotOwner,

    /// Admin-only capability used without the admin flag
    AdminRequired,

    /// No receipt to show
    ReceiptUnavailable,

    /// A conditional store write lost a race
    Conflict,

    /// Store operation failed
    StoreError,

    /// Startup/configuration failure
    ConfigError,

    /// Internal error
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// True for errors the presentation layer should have pre-empted.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::VehicleRented
                | ErrorCode::NotOwner
                | ErrorCode::AdminRequired
                | ErrorCode::ReceiptUnavailable
        )
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::Conflict { .. } => {
                tracing::warn!("Conditional write rejected: {}", err);
                ApiError::new(ErrorCode::Conflict, err.to_string())
            }
            other => {
                tracing::error!("Store operation failed: {}", other);
                ApiError::new(ErrorCode::StoreError, other.to_string())
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.user_message())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::VehicleRented { .. } => ApiError::new(ErrorCode::VehicleRented, message),
            CoreError::NotOwner { .. } => ApiError::new(ErrorCode::NotOwner, message),
            CoreError::AdminRequired => ApiError::new(ErrorCode::AdminRequired, message),
            CoreError::ReceiptUnavailable { .. } => {
                ApiError::new(ErrorCode::ReceiptUnavailable, message)
            }
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
