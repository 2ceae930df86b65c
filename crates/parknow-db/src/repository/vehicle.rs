//! # Vehicle Repository
//!
//! Store operations for vehicles.
//!
//! ## Conditional Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every write that requires an Available vehicle repeats the check in   │
//! │  its WHERE clause, so a rental committed by another writer between     │
//! │  the caller's read and this write is never overwritten:                │
//! │                                                                         │
//! │    UPDATE vehicles SET ...                                             │
//! │    WHERE id = ? AND owner_id = ?                                       │
//! │      AND (expiration_time IS NULL OR expiration_time <= :now)          │
//! │                                                                         │
//! │  rows_affected() == 0                                                  │
//! │       ├── row missing            → DbError::NotFound                   │
//! │       └── row present            → DbError::Conflict (with reason)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each committed write bumps `sync_version` and publishes a
//! [`VehicleChange`] on the change feed.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use parknow_core::{BodyType, Receipt, RentalPlan, Vehicle, VehicleFields};

use crate::error::{DbError, DbResult};
use crate::feed::{ChangeFeed, ChangeKind, Subscription, SubscriptionKey, VehicleChange};

const ENTITY: &str = "Vehicle";

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, owner_id, model, make, plate, body_type, electric,
        expiration_time, receipt, created_at, updated_at, sync_version
    FROM vehicles
"#;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct VehicleRow {
    id: String,
    owner_id: String,
    model: String,
    make: String,
    plate: String,
    body_type: String,
    electric: bool,
    expiration_time: Option<i64>,
    receipt: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    sync_version: i64,
}

impl TryFrom<VehicleRow> for Vehicle {
    type Error = DbError;

    fn try_from(row: VehicleRow) -> Result<Self, Self::Error> {
        let receipt = match row.receipt.as_deref() {
            Some(json) => Some(serde_json::from_str::<Receipt>(json).map_err(|e| {
                DbError::Decode {
                    entity: ENTITY.to_string(),
                    id: row.id.clone(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        Ok(Vehicle {
            body_type: BodyType::from_stored(&row.body_type),
            id: row.id,
            owner_id: row.owner_id,
            model: row.model,
            make: row.make,
            plate: row.plate,
            electric: row.electric,
            expiration_time: row.expiration_time,
            receipt,
            created_at: row.created_at,
            updated_at: row.updated_at,
            sync_version: row.sync_version,
        })
    }
}

fn into_vehicles(rows: Vec<VehicleRow>) -> DbResult<Vec<Vehicle>> {
    rows.into_iter().map(Vehicle::try_from).collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for vehicle database operations.
#[derive(Debug, Clone)]
pub struct VehicleRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl VehicleRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        VehicleRepository { pool, feed }
    }

    pub(crate) fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Gets a vehicle by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Vehicle>> {
        let row = sqlx::query_as::<_, VehicleRow>(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Vehicle::try_from).transpose()
    }

    /// Lists a user's vehicles, oldest registration first.
    pub async fn list_by_owner(&self, owner_id: &str) -> DbResult<Vec<Vehicle>> {
        let rows = sqlx::query_as::<_, VehicleRow>(&format!(
            "{SELECT_COLUMNS} WHERE owner_id = ?1 ORDER BY created_at, id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(owner_id = %owner_id, count = rows.len(), "Listed vehicles by owner");
        into_vehicles(rows)
    }

    /// Exact plate match across all owners. `plate` must already be
    /// normalized.
    pub async fn find_by_plate(&self, plate: &str) -> DbResult<Vec<Vehicle>> {
        let rows = sqlx::query_as::<_, VehicleRow>(&format!(
            "{SELECT_COLUMNS} WHERE plate = ?1 ORDER BY created_at, id"
        ))
        .bind(plate)
        .fetch_all(&self.pool)
        .await?;

        debug!(plate = %plate, count = rows.len(), "Plate lookup");
        into_vehicles(rows)
    }

    /// Counts all vehicles (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vehicles")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Opens a live query. The current result set is delivered first.
    pub async fn subscribe(&self, key: SubscriptionKey) -> DbResult<Subscription> {
        Subscription::open(self.clone(), key).await
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Registers a vehicle for `owner_id`. The id is generated here.
    pub async fn insert(
        &self,
        owner_id: &str,
        fields: &VehicleFields,
        now: DateTime<Utc>,
    ) -> DbResult<Vehicle> {
        let vehicle = Vehicle {
            id: generate_vehicle_id(),
            owner_id: owner_id.to_string(),
            model: fields.model.clone(),
            make: fields.make.clone(),
            plate: fields.plate.clone(),
            body_type: fields.body_type,
            electric: fields.electric,
            expiration_time: None,
            receipt: None,
            created_at: now,
            updated_at: now,
            sync_version: 1,
        };

        debug!(id = %vehicle.id, plate = %vehicle.plate, "Inserting vehicle");

        sqlx::query(
            r#"
            INSERT INTO vehicles (
                id, owner_id, model, make, plate, body_type, electric,
                expiration_time, receipt, created_at, updated_at, sync_version
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                NULL, NULL, ?8, ?9, ?10
            )
            "#,
        )
        .bind(&vehicle.id)
        .bind(&vehicle.owner_id)
        .bind(&vehicle.model)
        .bind(&vehicle.make)
        .bind(&vehicle.plate)
        .bind(vehicle.body_type.as_str())
        .bind(vehicle.electric)
        .bind(vehicle.created_at)
        .bind(vehicle.updated_at)
        .bind(vehicle.sync_version)
        .execute(&self.pool)
        .await?;

        info!(id = %vehicle.id, owner_id = %owner_id, "Vehicle registered");

        self.feed.publish(VehicleChange {
            kind: ChangeKind::Created,
            vehicle_id: vehicle.id.clone(),
            owner_id: vehicle.owner_id.clone(),
            plates: vec![vehicle.plate.clone()],
        });

        Ok(vehicle)
    }

    /// Replaces the descriptive fields of an Available vehicle.
    ///
    /// `expected_version`, when given, must equal the stored `sync_version`.
    pub async fn update(
        &self,
        id: &str,
        owner_id: &str,
        fields: &VehicleFields,
        now: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> DbResult<Vehicle> {
        debug!(id = %id, "Updating vehicle");

        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        let result = sqlx::query(
            r#"
            UPDATE vehicles SET
                model = ?1,
                make = ?2,
                plate = ?3,
                body_type = ?4,
                electric = ?5,
                updated_at = ?6,
                sync_version = sync_version + 1
            WHERE id = ?7
              AND owner_id = ?8
              AND (expiration_time IS NULL OR expiration_time <= ?9)
              AND (?10 IS NULL OR sync_version = ?10)
            "#,
        )
        .bind(&fields.model)
        .bind(&fields.make)
        .bind(&fields.plate)
        .bind(fields.body_type.as_str())
        .bind(fields.electric)
        .bind(now)
        .bind(id)
        .bind(owner_id)
        .bind(now.timestamp_millis())
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.explain_miss(id, owner_id, now, expected_version).await);
        }

        let updated = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        let mut plates = vec![updated.plate.clone()];
        if existing.plate != updated.plate {
            plates.push(existing.plate);
        }
        self.feed.publish(VehicleChange {
            kind: ChangeKind::Updated,
            vehicle_id: updated.id.clone(),
            owner_id: updated.owner_id.clone(),
            plates,
        });

        Ok(updated)
    }

    /// Deletes an Available vehicle.
    pub async fn delete(&self, id: &str, owner_id: &str, now: DateTime<Utc>) -> DbResult<()> {
        debug!(id = %id, "Deleting vehicle");

        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        let result = sqlx::query(
            r#"
            DELETE FROM vehicles
            WHERE id = ?1
              AND owner_id = ?2
              AND (expiration_time IS NULL OR expiration_time <= ?3)
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.explain_miss(id, owner_id, now, None).await);
        }

        info!(id = %id, "Vehicle deleted");

        self.feed.publish(VehicleChange {
            kind: ChangeKind::Deleted,
            vehicle_id: existing.id,
            owner_id: existing.owner_id,
            plates: vec![existing.plate],
        });

        Ok(())
    }

    /// Persists a rental plan: expiration and receipt in one write.
    ///
    /// ## Race Handling
    /// ```text
    /// Renter A                         Renter B
    ///   plan_purchase (Available)        plan_purchase (Available)
    ///   apply_rental ── 1 row ✓          │
    ///                                    apply_rental ── 0 rows
    ///                                         │
    ///                                         ▼
    ///                                    DbError::Conflict
    /// ```
    pub async fn apply_rental(
        &self,
        owner_id: &str,
        plan: &RentalPlan,
        now: DateTime<Utc>,
    ) -> DbResult<Vehicle> {
        let id = plan.vehicle_id.as_str();
        debug!(id = %id, hours = plan.hours, cost = %plan.cost, "Applying rental");

        let receipt_json = serde_json::to_string(&plan.receipt)
            .map_err(|e| DbError::Internal(format!("Failed to encode receipt: {e}")))?;

        let result = sqlx::query(
            r#"
            UPDATE vehicles SET
                expiration_time = ?1,
                receipt = ?2,
                updated_at = ?3,
                sync_version = sync_version + 1
            WHERE id = ?4
              AND owner_id = ?5
              AND (expiration_time IS NULL OR expiration_time <= ?6)
            "#,
        )
        .bind(plan.new_expiration)
        .bind(receipt_json)
        .bind(now)
        .bind(id)
        .bind(owner_id)
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.explain_miss(id, owner_id, now, None).await);
        }

        let rented = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        info!(
            id = %id,
            expires_at = plan.new_expiration,
            "Vehicle rented"
        );

        self.feed.publish(VehicleChange {
            kind: ChangeKind::Rented,
            vehicle_id: rented.id.clone(),
            owner_id: rented.owner_id.clone(),
            plates: vec![rented.plate.clone()],
        });

        Ok(rented)
    }

    /// Works out why a conditional write matched no row.
    async fn explain_miss(
        &self,
        id: &str,
        owner_id: &str,
        now: DateTime<Utc>,
        expected_version: Option<i64>,
    ) -> DbError {
        let current = match self.get_by_id(id).await {
            Ok(Some(vehicle)) => vehicle,
            Ok(None) => return DbError::not_found(ENTITY, id),
            Err(e) => return e,
        };

        let reason = if current.owner_id != owner_id {
            "vehicle belongs to another user".to_string()
        } else if current
            .expiration_time
            .is_some_and(|exp| exp > now.timestamp_millis())
        {
            "vehicle is rented".to_string()
        } else if let Some(expected) = expected_version.filter(|v| *v != current.sync_version) {
            format!(
                "expected version {expected}, found {}",
                current.sync_version
            )
        } else {
            "write condition not met".to_string()
        };

        DbError::conflict(ENTITY, id, reason)
    }
}

/// Generates a new vehicle id (UUID v4).
pub fn generate_vehicle_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::{Duration, TimeZone};
    use parknow_core::{plan_purchase, PaymentMethod, MILLIS_PER_HOUR};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()
    }

    fn fields(plate: &str) -> VehicleFields {
        VehicleFields {
            model: "Onix".to_string(),
            make: "Chevrolet".to_string(),
            plate: plate.to_string(),
            body_type: BodyType::Hatch,
            electric: false,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_by_owner() {
        let db = db().await;
        let repo = db.vehicles();

        let a = repo.insert("u1", &fields("AAA1111"), t0()).await.unwrap();
        let b = repo
            .insert("u1", &fields("BBB2222"), t0() + Duration::seconds(1))
            .await
            .unwrap();
        repo.insert("u2", &fields("CCC3333"), t0()).await.unwrap();

        let mine = repo.list_by_owner("u1").await.unwrap();
        assert_eq!(mine.iter().map(|v| &v.id).collect::<Vec<_>>(), vec![&a.id, &b.id]);
        assert_eq!(mine[0].sync_version, 1);
        assert_eq!(mine[0].expiration_time, None);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unknown_body_type_decodes() {
        let db = db().await;
        let repo = db.vehicles();
        let v = repo.insert("u1", &fields("AAA1111"), t0()).await.unwrap();

        sqlx::query("UPDATE vehicles SET body_type = 'motorhome' WHERE id = ?1")
            .bind(&v.id)
            .execute(db.pool())
            .await
            .unwrap();

        let stored = repo.get_by_id(&v.id).await.unwrap().unwrap();
        assert_eq!(stored.body_type, BodyType::Unknown);
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let db = db().await;
        let repo = db.vehicles();
        let v = repo.insert("u1", &fields("AAA1111"), t0()).await.unwrap();

        let mut edited = fields("ZZZ9999");
        edited.electric = true;
        let updated = repo
            .update(&v.id, "u1", &edited, t0(), Some(1))
            .await
            .unwrap();

        assert_eq!(updated.plate, "ZZZ9999");
        assert!(updated.electric);
        assert_eq!(updated.sync_version, 2);
    }

    #[tokio::test]
    async fn test_update_version_mismatch() {
        let db = db().await;
        let repo = db.vehicles();
        let v = repo.insert("u1", &fields("AAA1111"), t0()).await.unwrap();

        let err = repo
            .update(&v.id, "u1", &fields("ZZZ9999"), t0(), Some(7))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        assert!(err.to_string().contains("expected version 7"));
    }

    #[tokio::test]
    async fn test_update_wrong_owner() {
        let db = db().await;
        let repo = db.vehicles();
        let v = repo.insert("u1", &fields("AAA1111"), t0()).await.unwrap();

        let err = repo
            .update(&v.id, "u2", &fields("ZZZ9999"), t0(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        let stored = repo.get_by_id(&v.id).await.unwrap().unwrap();
        assert_eq!(stored.plate, "AAA1111");
    }

    #[tokio::test]
    async fn test_missing_vehicle_is_not_found() {
        let db = db().await;
        let repo = db.vehicles();

        let err = repo.delete("nope", "u1", t0()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_apply_rental_persists_plan() {
        let db = db().await;
        let repo = db.vehicles();
        let v = repo.insert("u1", &fields("AAA1111"), t0()).await.unwrap();

        let plan = plan_purchase(&v, 3, Some(PaymentMethod::Pix), &t0()).unwrap();
        let rented = repo.apply_rental("u1", &plan, t0()).await.unwrap();

        assert_eq!(
            rented.expiration_time,
            Some(t0().timestamp_millis() + 3 * MILLIS_PER_HOUR)
        );
        assert_eq!(rented.receipt.as_ref(), Some(&plan.receipt));
        assert_eq!(rented.sync_version, 2);

        let reread = repo.get_by_id(&v.id).await.unwrap().unwrap();
        assert_eq!(reread.receipt, Some(plan.receipt));
    }

    #[tokio::test]
    async fn test_second_rental_conflicts() {
        let db = db().await;
        let repo = db.vehicles();
        let v = repo.insert("u1", &fields("AAA1111"), t0()).await.unwrap();

        // Both plans are made from the same Available snapshot.
        let first = plan_purchase(&v, 1, Some(PaymentMethod::Pix), &t0()).unwrap();
        let second = plan_purchase(&v, 5, Some(PaymentMethod::CreditCard), &t0()).unwrap();

        repo.apply_rental("u1", &first, t0()).await.unwrap();
        let err = repo.apply_rental("u1", &second, t0()).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        assert!(err.to_string().contains("rented"));

        let stored = repo.get_by_id(&v.id).await.unwrap().unwrap();
        assert_eq!(stored.expiration_time, Some(first.new_expiration));
        assert_eq!(stored.receipt, Some(first.receipt));
    }

    #[tokio::test]
    async fn test_rented_vehicle_cannot_be_edited_or_deleted() {
        let db = db().await;
        let repo = db.vehicles();
        let v = repo.insert("u1", &fields("AAA1111"), t0()).await.unwrap();
        let plan = plan_purchase(&v, 1, Some(PaymentMethod::Pix), &t0()).unwrap();
        repo.apply_rental("u1", &plan, t0()).await.unwrap();

        let during = t0() + Duration::minutes(30);
        assert!(matches!(
            repo.update(&v.id, "u1", &fields("ZZZ9999"), during, None).await,
            Err(DbError::Conflict { .. })
        ));
        assert!(matches!(
            repo.delete(&v.id, "u1", during).await,
            Err(DbError::Conflict { .. })
        ));

        // Once the hour has passed the vehicle is Available again.
        let after = t0() + Duration::hours(1);
        repo.update(&v.id, "u1", &fields("ZZZ9999"), after, None)
            .await
            .unwrap();
        repo.delete(&v.id, "u1", after).await.unwrap();
        assert!(repo.get_by_id(&v.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_plate_is_exact() {
        let db = db().await;
        let repo = db.vehicles();
        repo.insert("u1", &fields("ABC1234"), t0()).await.unwrap();
        repo.insert("u2", &fields("ABC1234"), t0()).await.unwrap();
        repo.insert("u2", &fields("ABC12345"), t0()).await.unwrap();

        assert_eq!(repo.find_by_plate("ABC1234").await.unwrap().len(), 2);
        assert!(repo.find_by_plate("abc1234").await.unwrap().is_empty());
        assert!(repo.find_by_plate("ABC").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_owner_subscription_pushes_snapshots() {
        let db = db().await;
        let repo = db.vehicles();
        repo.insert("u1", &fields("AAA1111"), t0()).await.unwrap();

        let mut sub = repo
            .subscribe(SubscriptionKey::Owner("u1".to_string()))
            .await
            .unwrap();
        assert_eq!(sub.next().await.unwrap().len(), 1);

        // Another user's write is not delivered.
        repo.insert("u2", &fields("XXX0000"), t0()).await.unwrap();
        let second = repo.insert("u1", &fields("BBB2222"), t0()).await.unwrap();
        assert_eq!(sub.next().await.unwrap().len(), 2);

        repo.delete(&second.id, "u1", t0()).await.unwrap();
        assert_eq!(sub.next().await.unwrap().len(), 1);

        sub.cancel().await;
    }

    #[tokio::test]
    async fn test_plate_subscription_sees_rename() {
        let db = db().await;
        let repo = db.vehicles();
        let v = repo.insert("u1", &fields("OLD0001"), t0()).await.unwrap();

        let mut sub = repo
            .subscribe(SubscriptionKey::Plate("OLD0001".to_string()))
            .await
            .unwrap();
        assert_eq!(sub.next().await.unwrap().len(), 1);

        repo.update(&v.id, "u1", &fields("NEW0001"), t0(), None)
            .await
            .unwrap();
        assert!(sub.next().await.unwrap().is_empty());

        drop(sub);
    }
}
