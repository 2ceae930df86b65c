//! # Seed Data Generator
//!
//! Populates the database with demo vehicles for development.
//!
//! ## Usage
//! ```bash
//! # Seed vehicles for "demo-user" and make "demo-admin" an administrator
//! cargo run -p parknow-db --bin seed
//!
//! # Custom users and database path
//! cargo run -p parknow-db --bin seed -- --user alice --admin bob --db ./data/parknow.db
//! ```
//!
//! ## Generated Data
//! - One vehicle per body type for the demo user
//! - Every other vehicle electric
//! - The first vehicle rented for 2 hours, so lists show a countdown
//! - An admin flag for the admin user

use chrono::{FixedOffset, Utc};
use std::env;

use parknow_core::{plan_purchase, BodyType, PaymentMethod, VehicleFields};
use parknow_db::{migrations, Database, DbConfig};

/// (make, model, plate, body type), one per selectable body type.
const DEMO_VEHICLES: &[(&str, &str, &str, BodyType)] = &[
    ("Fiat", "Mobi", "FIA1A11", BodyType::SubCompact),
    ("Renault", "Kwid", "REN2B22", BodyType::Compact),
    ("Chevrolet", "Onix", "CHE3C33", BodyType::Hatch),
    ("Jeep", "Compass", "JEE4D44", BodyType::Suv),
    ("Toyota", "Corolla", "TOY5E55", BodyType::Sedan),
    ("Ford", "Ranger", "FOR6F66", BodyType::Pickup),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./parknow_dev.db");
    let mut user_id = String::from("demo-user");
    let mut admin_id = String::from("demo-admin");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--user" | "-u" => {
                if i + 1 < args.len() {
                    user_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--admin" | "-a" => {
                if i + 1 < args.len() {
                    admin_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Park Now Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>     Database file path (default: ./parknow_dev.db)");
                println!("  -u, --user <ID>     Owner of the demo vehicles (default: demo-user)");
                println!("  -a, --admin <ID>    User granted the admin flag (default: demo-admin)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Park Now Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Owner:    {}", user_id);
    println!("Admin:    {}", admin_id);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    if !db.health_check().await {
        return Err("database is not answering queries".into());
    }
    println!("✓ Connected to database");
    let (total, applied) = migrations::migration_status(db.pool()).await?;
    println!("✓ Migrations applied ({}/{})", applied, total);

    let existing = db.vehicles().list_by_owner(&user_id).await?;
    if !existing.is_empty() {
        println!("⚠ {} already has {} vehicles", user_id, existing.len());
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let now = Utc::now();
    let mut seeded = Vec::new();

    for (idx, (make, model, plate, body_type)) in DEMO_VEHICLES.iter().enumerate() {
        let fields = VehicleFields {
            model: model.to_string(),
            make: make.to_string(),
            plate: plate.to_string(),
            body_type: *body_type,
            electric: idx % 2 == 1,
        };

        match db.vehicles().insert(&user_id, &fields, now).await {
            Ok(vehicle) => {
                println!("  + {} {} ({})", vehicle.make, vehicle.model, vehicle.plate);
                seeded.push(vehicle);
            }
            Err(e) => eprintln!("Failed to insert {}: {}", plate, e),
        }
    }

    if let Some(first) = seeded.first() {
        let brasilia = FixedOffset::west_opt(3 * 3600).ok_or("invalid offset")?;
        let plan = plan_purchase(
            first,
            2,
            Some(PaymentMethod::Pix),
            &now.with_timezone(&brasilia),
        )?;
        db.vehicles().apply_rental(&user_id, &plan, now).await?;
        println!(
            "✓ Rented {} for {}h ({})",
            first.plate, plan.hours, plan.cost
        );
    }

    db.admins().set_admin(&admin_id, true, now).await?;
    println!("✓ Granted admin flag to {}", admin_id);

    println!();
    println!("✓ Seed complete! {} vehicles", seeded.len());

    Ok(())
}
