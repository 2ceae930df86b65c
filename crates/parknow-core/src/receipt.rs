//! # Receipt Builder
//!
//! Builds the immutable snapshot stored on a vehicle when a rental is
//! confirmed. Only [`crate::rental::plan_purchase`] calls it.

use chrono::{DateTime, Duration, TimeZone};
use std::fmt::Display;

use crate::money::Money;
use crate::types::{PaymentMethod, Receipt, Vehicle};
use crate::{MILLIS_PER_HOUR, RECEIPT_TIMESTAMP_FORMAT};

/// Builds a receipt for `hours` starting at `now`.
///
/// Timestamps are rendered in the timezone carried by `now`, so the caller
/// picks the display offset. The epoch values are timezone independent.
pub fn build_receipt<Tz>(
    vehicle: &Vehicle,
    hours: u32,
    cost: Money,
    payment_method: PaymentMethod,
    now: &DateTime<Tz>,
) -> Receipt
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let exit = now.clone() + Duration::milliseconds(i64::from(hours) * MILLIS_PER_HOUR);

    Receipt {
        vehicle_id: vehicle.id.clone(),
        model: vehicle.model.clone(),
        make: vehicle.make.clone(),
        plate: vehicle.plate.clone(),
        body_type: vehicle.body_type,
        electric: vehicle.electric,
        hours,
        cost,
        cost_display: cost.to_string(),
        payment_method,
        purchase_timestamp: now.format(RECEIPT_TIMESTAMP_FORMAT).to_string(),
        exit_timestamp: exit.format(RECEIPT_TIMESTAMP_FORMAT).to_string(),
        purchased_at: now.timestamp_millis(),
        expires_at: exit.timestamp_millis(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BodyType;
    use chrono::{FixedOffset, Utc};

    fn vehicle() -> Vehicle {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Vehicle {
            id: "6f1c2a9e-0000-4000-8000-000000000001".to_string(),
            owner_id: "user-1".to_string(),
            model: "Onix".to_string(),
            make: "Chevrolet".to_string(),
            plate: "ABC1D23".to_string(),
            body_type: BodyType::Hatch,
            electric: false,
            expiration_time: None,
            receipt: None,
            created_at: created,
            updated_at: created,
            sync_version: 1,
        }
    }

    #[test]
    fn test_build_receipt_copies_fields() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        let receipt = build_receipt(
            &vehicle(),
            3,
            Money::from_cents(900),
            PaymentMethod::Pix,
            &now,
        );

        assert_eq!(receipt.vehicle_id, vehicle().id);
        assert_eq!(receipt.plate, "ABC1D23");
        assert_eq!(receipt.body_type, BodyType::Hatch);
        assert_eq!(receipt.hours, 3);
        assert_eq!(receipt.cost.to_decimal_string(), "9.00");
        assert_eq!(receipt.cost_display, "R$ 9.00");
        assert_eq!(receipt.payment_method, PaymentMethod::Pix);
        assert_eq!(receipt.purchase_timestamp, "05/03/2024 14:30:00");
        assert_eq!(receipt.exit_timestamp, "05/03/2024 17:30:00");
        assert_eq!(receipt.expires_at - receipt.purchased_at, 3 * MILLIS_PER_HOUR);
    }

    #[test]
    fn test_build_receipt_uses_display_offset() {
        let brasilia = FixedOffset::west_opt(3 * 3600).unwrap();
        let now = Utc
            .with_ymd_and_hms(2024, 3, 5, 23, 0, 0)
            .unwrap()
            .with_timezone(&brasilia);
        let receipt = build_receipt(
            &vehicle(),
            2,
            Money::from_cents(700),
            PaymentMethod::CreditCard,
            &now,
        );

        assert_eq!(receipt.purchase_timestamp, "05/03/2024 20:00:00");
        assert_eq!(receipt.exit_timestamp, "05/03/2024 22:00:00");
        assert_eq!(receipt.purchased_at, now.timestamp_millis());
    }

    #[test]
    fn test_receipt_json_shows_two_decimal_cost() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        let receipt = build_receipt(
            &vehicle(),
            3,
            Money::from_cents(650),
            PaymentMethod::Pix,
            &now,
        );

        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["cost"], 650);
        assert_eq!(json["costDisplay"], "R$ 6.50");

        let back: Receipt = serde_json::from_value(json).unwrap();
        assert_eq!(back.cost_display, "R$ 6.50");
    }
}
