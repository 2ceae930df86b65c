//! # State Module
//!
//! What every command needs besides its own arguments.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────────────────────┐  ┌──────────────────────────┐    │
//! │  │           AppState               │  │        Session           │    │
//! │  │                                  │  │                          │    │
//! │  │  • Database (pool + change feed) │  │  • user_id (--user)      │    │
//! │  │  • AppConfig (read-only)         │  │  • is_admin (admin_flags)│    │
//! │  │  • VehicleCatalog (optional)     │  │                          │    │
//! │  └──────────────────────────────────┘  └──────────────────────────┘    │
//! │                                                                         │
//! │  AppState is cheap to clone (pool and feed are shared handles).        │
//! │  Session is resolved once per invocation.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod app;
mod session;

pub use app::AppState;
pub use session::Session;
