//! # parknow-db: Store Layer for Park Now
//!
//! SQLite-backed storage for vehicles and admin flags, plus the change feed
//! that keeps live vehicle lists current.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Park Now Data Flow                               │
//! │                                                                         │
//! │  CLI command (rent)                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    parknow-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Change Feed │  │   │
//! │  │   │   (pool.rs)   │◄───│  vehicle.rs   │───►│  (feed.rs)   │  │   │
//! │  │   │  SqlitePool   │    │  admin.rs     │    │ Subscription │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (parknow.db)                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use parknow_db::{Database, DbConfig, SubscriptionKey};
//!
//! let db = Database::new(DbConfig::new("parknow.db")).await?;
//! let mut live = db.vehicles().subscribe(SubscriptionKey::Owner("u1".into())).await?;
//! let current = live.next().await;
//! ```

pub mod error;
pub mod feed;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use feed::{ChangeFeed, ChangeKind, Subscription, SubscriptionKey, VehicleChange};
pub use pool::{Database, DbConfig};

pub use repository::admin::AdminRepository;
pub use repository::vehicle::VehicleRepository;
