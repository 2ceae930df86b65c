//! # Repository Module
//!
//! Store access for Park Now.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CLI command                                                            │
//! │       │                                                                 │
//! │       │  db.vehicles().list_by_owner("u1")                             │
//! │       ▼                                                                 │
//! │  VehicleRepository                                                     │
//! │  ├── insert / update / delete      (owner-scoped, conditional)         │
//! │  ├── apply_rental                  (single conditional write)          │
//! │  ├── get_by_id / list_by_owner / find_by_plate                         │
//! │  └── subscribe                     (live query over the change feed)   │
//! │                                                                         │
//! │  AdminRepository                                                       │
//! │  └── get / is_admin / set_admin                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod admin;
pub mod vehicle;
