//! # Commands Module
//!
//! Everything the front end can ask for. Each command takes the shared
//! [`AppState`](crate::state::AppState), the acting
//! [`Session`](crate::state::Session) where ownership matters, and `now`
//! explicitly; it returns a serializable DTO or an
//! [`ApiError`](crate::error::ApiError).
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (exports)
//! ├── vehicle.rs  ◄─── register, list, get, edit, delete, watch
//! ├── rental.rs   ◄─── quote, rent, receipt
//! ├── admin.rs    ◄─── plate search, live plate search, grant admin
//! └── catalog.rs  ◄─── make/model suggestions
//! ```

pub mod admin;
pub mod catalog;
pub mod rental;
pub mod vehicle;
