//! # Domain Types
//!
//! Core domain types used throughout Park Now.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐        ┌──────────────────┐                      │
//! │  │     Vehicle      │ 1    1 │     Receipt      │                      │
//! │  │  ──────────────  │◆──────►│  ──────────────  │                      │
//! │  │  id (UUID)       │ embeds │  field snapshot  │                      │
//! │  │  owner_id        │        │  cost (Money)    │                      │
//! │  │  plate (UPPER)   │        │  timestamps      │                      │
//! │  │  body_type       │        │  payment_method  │                      │
//! │  │  expiration_time │        └──────────────────┘                      │
//! │  └──────────────────┘                                                   │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐      │
//! │  │    BodyType      │  │  PaymentMethod   │  │    AdminFlag     │      │
//! │  │  SubCompact ...  │  │  CreditCard      │  │  user_id         │      │
//! │  │  Pickup, Unknown │  │  DebitCard, Pix  │  │  is_admin        │      │
//! │  └──────────────────┘  └──────────────────┘  └──────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Body Type
// =============================================================================

/// Vehicle body type. Drives the first-hour rate.
///
/// `Unknown` is never accepted as input; it is what a stored record with an
/// unrecognised value decodes to, and it is priced at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BodyType {
    SubCompact,
    Compact,
    Hatch,
    Suv,
    Sedan,
    Pickup,
    #[serde(other)]
    Unknown,
}

impl BodyType {
    /// Body types a user can pick.
    pub const SELECTABLE: [BodyType; 6] = [
        BodyType::SubCompact,
        BodyType::Compact,
        BodyType::Hatch,
        BodyType::Suv,
        BodyType::Sedan,
        BodyType::Pickup,
    ];

    /// Storage key (snake_case).
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyType::SubCompact => "sub_compact",
            BodyType::Compact => "compact",
            BodyType::Hatch => "hatch",
            BodyType::Suv => "suv",
            BodyType::Sedan => "sedan",
            BodyType::Pickup => "pickup",
            BodyType::Unknown => "unknown",
        }
    }

    /// Label shown in the picker and on receipts.
    pub fn label(&self) -> &'static str {
        match self {
            BodyType::SubCompact => "Sub Compacto",
            BodyType::Compact => "Compacto",
            BodyType::Hatch => "Hatch",
            BodyType::Suv => "SUV",
            BodyType::Sedan => "Sedan",
            BodyType::Pickup => "Pickup",
            BodyType::Unknown => "Desconhecido",
        }
    }

    /// Decodes a stored value. Unrecognised values become `Unknown`.
    pub fn from_stored(value: &str) -> Self {
        value.parse().unwrap_or(BodyType::Unknown)
    }
}

impl fmt::Display for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parses storage keys and picker labels, case-insensitively.
impl FromStr for BodyType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect();

        match key.as_str() {
            "subcompact" | "subcompacto" => Ok(BodyType::SubCompact),
            "compact" | "compacto" => Ok(BodyType::Compact),
            "hatch" => Ok(BodyType::Hatch),
            "suv" => Ok(BodyType::Suv),
            "sedan" => Ok(BodyType::Sedan),
            "pickup" => Ok(BodyType::Pickup),
            _ => Err(ValidationError::NotAllowed {
                field: "body_type".to_string(),
                allowed: BodyType::SELECTABLE
                    .iter()
                    .map(|b| b.label().to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// Payment method label stored on the receipt. No settlement semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Pix,
}

impl PaymentMethod {
    /// All selectable methods.
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::CreditCard,
        PaymentMethod::DebitCard,
        PaymentMethod::Pix,
    ];

    /// Label shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "Cartão de Crédito",
            PaymentMethod::DebitCard => "Cartão de Débito",
            PaymentMethod::Pix => "Pix",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect();

        match key.as_str() {
            "" => Err(ValidationError::PaymentMethodMissing),
            "creditcard" | "credit" | "credito" | "crédito" | "cartãodecrédito" => {
                Ok(PaymentMethod::CreditCard)
            }
            "debitcard" | "debit" | "debito" | "débito" | "cartãodedébito" => {
                Ok(PaymentMethod::DebitCard)
            }
            "pix" => Ok(PaymentMethod::Pix),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: PaymentMethod::ALL
                    .iter()
                    .map(|m| m.label().to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Vehicle
// =============================================================================

/// A registered car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// User who registered the vehicle.
    pub owner_id: String,

    pub model: String,
    pub make: String,

    /// Uppercase plate. Not unique.
    pub plate: String,

    pub body_type: BodyType,
    pub electric: bool,

    /// End of the current/last rental, epoch milliseconds.
    pub expiration_time: Option<i64>,

    /// Snapshot of the most recent completed rental.
    pub receipt: Option<Receipt>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Incremented on every write.
    pub sync_version: i64,
}

/// Raw registration/edit form input, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDraft {
    pub model: String,
    pub make: String,
    pub plate: String,
    /// Picker value; blank when nothing was chosen.
    pub body_type: String,
    #[serde(default)]
    pub electric: bool,
}

/// Validated, normalized vehicle fields ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleFields {
    pub model: String,
    pub make: String,
    pub plate: String,
    pub body_type: BodyType,
    pub electric: bool,
}

// =============================================================================
// Receipt
// =============================================================================

/// Immutable snapshot of a confirmed rental.
///
/// Uses the snapshot pattern: vehicle fields are frozen at confirmation time
/// so a later edit does not rewrite the history of the rental.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Back-reference shown as a scannable code.
    pub vehicle_id: String,

    pub model: String,
    pub make: String,
    pub plate: String,
    pub body_type: BodyType,
    pub electric: bool,

    /// Purchased duration.
    pub hours: u32,

    /// Integer cents.
    pub cost: Money,

    /// `cost` as shown to the user, exactly two decimals: `R$ 6.50`.
    pub cost_display: String,

    pub payment_method: PaymentMethod,

    /// Confirmation time, `dd/mm/YYYY HH:MM:SS`.
    pub purchase_timestamp: String,

    /// Rental end, `dd/mm/YYYY HH:MM:SS`.
    pub exit_timestamp: String,

    /// Confirmation time, epoch milliseconds.
    pub purchased_at: i64,

    /// Rental end, epoch milliseconds. Equals the vehicle's expiration_time.
    pub expires_at: i64,
}

// =============================================================================
// Admin Flag
// =============================================================================

/// External record marking a user as privileged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AdminFlag {
    pub user_id: String,
    pub is_admin: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================
