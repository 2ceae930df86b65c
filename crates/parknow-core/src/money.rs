//! # Money Module
//!
//! Provides the `Money` type for rental fees.
//!
//! ## Why Integer Cents?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Rental fees are whole reais, halved for electric vehicles:            │
//! │                                                                         │
//! │    Hatch first hour   R$ 5.00  →  500 cents                            │
//! │    electric (÷ 2)     R$ 2.50  →  250 cents  (exact, no rounding)      │
//! │    + 2 extra hours    R$ 4.00  →  400 cents                            │
//! │    ─────────────────────────────────────────                           │
//! │    total              R$ 6.50  →  650 cents                            │
//! │                                                                         │
//! │  Storing cents makes "fixed to 2 decimals" a property of the type.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use parknow_core::money::Money;
//!
//! let first_hour = Money::from_units(5);
//! let electric = first_hour.half();
//! assert_eq!(electric.cents(), 250);
//! assert_eq!(electric.to_string(), "R$ 2.50");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents of the display currency (BRL).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units (reais).
    ///
    /// ## Example
    /// ```rust
    /// use parknow_core::money::Money;
    ///
    /// assert_eq!(Money::from_units(7).cents(), 700);
    /// ```
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units * 100)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Halves the amount, truncating toward zero.
    ///
    /// Every first-hour rate is a whole number of reais, so halving is exact
    /// for all rates actually charged.
    #[inline]
    pub const fn half(&self) -> Self {
        Money(self.0 / 2)
    }

    /// Formats the amount with exactly two decimals and no symbol ("6.50").
    ///
    /// Receipts and JSON payloads use this form.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.units().abs(), self.cents_part())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the amount the way the app renders totals: `R$ 6.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R$ {}", self.to_decimal_string())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
