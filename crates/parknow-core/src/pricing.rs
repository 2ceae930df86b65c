//! # Cost Calculator
//!
//! `(body type, electric, hours) → Money`
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  amount = first_hour(body_type, electric) + (hours − 1) × 2             │
//! │                                                                         │
//! │  Body type       First hour     Electric                               │
//! │  ─────────────   ──────────     ────────                               │
//! │  Sub Compacto    R$ 2.00        R$ 1.00                                │
//! │  Compacto        R$ 3.00        R$ 1.50                                │
//! │  Hatch           R$ 5.00        R$ 2.50                                │
//! │  SUV             R$ 5.00        R$ 2.50                                │
//! │  Sedan           R$ 5.00        R$ 2.50                                │
//! │  Pickup          R$ 7.00        R$ 3.50                                │
//! │  (unknown)       R$ 0.00        R$ 0.00                                │
//! │                                                                         │
//! │  Each additional hour: R$ 2.00 (never discounted)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::money::Money;
use crate::types::BodyType;

/// Flat rate for every hour after the first.
pub const ADDITIONAL_HOUR_COST: Money = Money::from_units(2);

/// Base first-hour rate for a body type, before the electric discount.
pub fn base_first_hour(body_type: BodyType) -> Money {
    match body_type {
        BodyType::SubCompact => Money::from_units(2),
        BodyType::Compact => Money::from_units(3),
        BodyType::Hatch | BodyType::Suv | BodyType::Sedan => Money::from_units(5),
        BodyType::Pickup => Money::from_units(7),
        BodyType::Unknown => Money::zero(),
    }
}

/// First-hour rate, halved for electric vehicles.
pub fn first_hour_cost(body_type: BodyType, electric: bool) -> Money {
    let base = base_first_hour(body_type);
    if electric {
        base.half()
    } else {
        base
    }
}

/// Computes the total rental cost.
///
/// Total for any `hours`: values below 1 yield the first-hour component
/// only. Callers validate `hours >= 1` first.
///
/// ## Example
/// ```rust
/// use parknow_core::{compute_cost, BodyType};
///
/// assert_eq!(compute_cost(BodyType::Hatch, false, 3).cents(), 900);
/// assert_eq!(compute_cost(BodyType::Pickup, false, 1).cents(), 700);
/// ```
pub fn compute_cost(body_type: BodyType, electric: bool, hours: i64) -> Money {
    let extra_hours = (hours - 1).max(0);
    first_hour_cost(body_type, electric) + ADDITIONAL_HOUR_COST * extra_hours
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_examples() {
        assert_eq!(compute_cost(BodyType::Hatch, false, 3), Money::from_cents(900));
        assert_eq!(compute_cost(BodyType::Hatch, true, 3), Money::from_cents(650));
        assert_eq!(compute_cost(BodyType::Pickup, false, 1), Money::from_cents(700));
        assert_eq!(compute_cost(BodyType::Unknown, false, 1), Money::zero());
    }

    #[test]
    fn test_first_hour_table() {
        let expected = [
            (BodyType::SubCompact, 200),
            (BodyType::Compact, 300),
            (BodyType::Hatch, 500),
            (BodyType::Suv, 500),
            (BodyType::Sedan, 500),
            (BodyType::Pickup, 700),
        ];
        for (body, cents) in expected {
            assert_eq!(compute_cost(body, false, 1).cents(), cents, "{body:?}");
        }
    }

    #[test]
    fn test_monotonic_in_hours() {
        for body in BodyType::SELECTABLE {
            for electric in [false, true] {
                for h in 1..48 {
                    let a = compute_cost(body, electric, h);
                    let b = compute_cost(body, electric, h + 1);
                    assert_eq!(b.cents() - a.cents(), 200);
                }
            }
        }
    }

    #[test]
    fn test_electric_halves_first_hour_only() {
        for body in BodyType::SELECTABLE {
            for h in 1..10 {
                let normal = compute_cost(body, false, h);
                let electric = compute_cost(body, true, h);
                assert_eq!(
                    normal.cents() - electric.cents(),
                    base_first_hour(body).cents() / 2
                );
            }
        }
    }

    #[test]
    fn test_non_positive_hours_yield_first_hour() {
        assert_eq!(compute_cost(BodyType::Sedan, false, 0).cents(), 500);
        assert_eq!(compute_cost(BodyType::Sedan, true, -5).cents(), 250);
    }
}
