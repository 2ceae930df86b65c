//! # parknow-core: Rental Lifecycle Engine for Park Now
//!
//! Pure business logic for vehicle parking rentals. No I/O, no clock reads:
//! every function that depends on time takes `now` as a parameter.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Park Now Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    parknow CLI (apps/cli)                       │   │
//! │  │    register, rent, receipt, watch, search, makes, models       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ parknow-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  pricing  │  │  rental   │  │  receipt  │  │ validation│  │   │
//! │  │   │compute_   │  │ state,    │  │ snapshot  │  │  drafts,  │  │   │
//! │  │   │  cost     │  │ guards    │  │ builder   │  │  hours    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • NO SYSTEM CLOCK           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 parknow-db (Store Layer)                        │   │
//! │  │        SQLite vehicles/admin flags, change feed, live lists     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Vehicle, Receipt, BodyType, PaymentMethod)
//! - [`money`] - Money in integer cents
//! - [`pricing`] - Cost calculator
//! - [`rental`] - Rental state machine, guards and purchase planning
//! - [`receipt`] - Receipt snapshot builder
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use parknow_core::{compute_cost, format_remaining, BodyType};
//!
//! let cost = compute_cost(BodyType::Hatch, true, 3);
//! assert_eq!(cost.to_string(), "R$ 6.50");
//!
//! assert_eq!(format_remaining(3_661_000), "01:01:01");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod receipt;
pub mod rental;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::compute_cost;
pub use receipt::build_receipt;
pub use rental::{
    ensure_available, ensure_owner, format_remaining, is_rented, plan_purchase, quote, receipt_for,
    remaining, remaining_display, remaining_ms, rental_state, RentalPlan, RentalState,
    ReceiptVisibility,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Milliseconds in one rental hour.
pub const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Longest rental accepted in one purchase (one year).
///
/// Keeps `now + hours` far from the limits of the timestamp types.
pub const MAX_RENTAL_HOURS: u32 = 8_760;

/// Display format for receipt timestamps.
pub const RECEIPT_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Shown instead of a countdown when a vehicle is not rented.
pub const NOT_RENTED_MESSAGE: &str = "Este carro não está mais alugado.";
