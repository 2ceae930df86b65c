//! # Application State
//!
//! Shared handles for commands: the store, the loaded configuration and the
//! vehicle catalog client.

use std::sync::Arc;
use tracing::{info, warn};

use parknow_db::{Database, DbConfig};

use crate::catalog::{FipeCatalog, VehicleCatalog};
use crate::config::AppConfig;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    db: Database,
    config: AppConfig,
    catalog: Option<Arc<dyn VehicleCatalog>>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig, catalog: Option<Arc<dyn VehicleCatalog>>) -> Self {
        AppState {
            db,
            config,
            catalog,
        }
    }

    /// Opens the database and builds the catalog client from `config`.
    ///
    /// A catalog client that fails to build is logged and left out; the
    /// catalog commands then return empty suggestions.
    pub async fn connect(config: AppConfig) -> Result<Self, ApiError> {
        let db_path = config.database_path()?;
        info!(?db_path, "Database path determined");

        let db = Database::new(
            DbConfig::new(db_path).max_connections(config.database.max_connections),
        )
        .await?;

        let catalog = if config.catalog.enabled {
            match FipeCatalog::new(
                config.catalog.base_url.clone(),
                std::time::Duration::from_secs(config.catalog.timeout_secs),
            ) {
                Ok(client) => Some(Arc::new(client) as Arc<dyn VehicleCatalog>),
                Err(e) => {
                    warn!("Vehicle catalog unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(AppState::new(db, config, catalog))
    }

    /// In-memory store with default config and no catalog.
    pub async fn in_memory() -> Result<Self, ApiError> {
        let db = Database::new(DbConfig::in_memory()).await?;
        Ok(AppState::new(db, AppConfig::default(), None))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> Option<&Arc<dyn VehicleCatalog>> {
        self.catalog.as_ref()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("db", &self.db)
            .field("config", &self.config)
            .field("catalog", &self.catalog.is_some())
            .finish()
    }
}
