//! # Catalog Commands
//!
//! Make/model suggestions for the registration form. Any catalog failure
//! yields an empty list: the user can always type the make and model by hand.

use tracing::{debug, warn};

use crate::catalog::CatalogEntry;
use crate::state::AppState;

/// Makes matching `partial`. Empty when the catalog is disabled or fails.
pub async fn suggest_makes(state: &AppState, partial: &str) -> Vec<CatalogEntry> {
    let Some(catalog) = state.catalog() else {
        debug!("Catalog disabled, no make suggestions");
        return Vec::new();
    };

    match catalog.makes(partial).await {
        Ok(makes) => makes,
        Err(e) => {
            warn!(partial = %partial, "Make lookup failed: {}", e);
            Vec::new()
        }
    }
}

/// Models for a make code. Empty when the catalog is disabled or fails.
pub async fn suggest_models(state: &AppState, make_code: &str) -> Vec<CatalogEntry> {
    let Some(catalog) = state.catalog() else {
        debug!("Catalog disabled, no model suggestions");
        return Vec::new();
    };

    match catalog.models(make_code).await {
        Ok(models) => models,
        Err(e) => {
            warn!(make_code = %make_code, "Model lookup failed: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{filter_by_name, CatalogError, VehicleCatalog};
    use crate::config::AppConfig;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StaticCatalog;

    #[async_trait]
    impl VehicleCatalog for StaticCatalog {
        async fn makes(&self, partial: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
            let all = vec![
                CatalogEntry {
                    code: "21".to_string(),
                    name: "Fiat".to_string(),
                },
                CatalogEntry {
                    code: "23".to_string(),
                    name: "GM - Chevrolet".to_string(),
                },
            ];
            Ok(filter_by_name(all, partial))
        }

        async fn models(&self, _make_code: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
            Err(CatalogError::Status {
                status: 503,
                url: "http://catalog/carros/marcas/21/modelos".to_string(),
            })
        }
    }

    async fn state_with(catalog: Option<Arc<dyn VehicleCatalog>>) -> AppState {
        let base = AppState::in_memory().await.unwrap();
        AppState::new(base.db().clone(), AppConfig::default(), catalog)
    }

    #[tokio::test]
    async fn test_suggestions_from_catalog() {
        let state = state_with(Some(Arc::new(StaticCatalog))).await;
        let makes = suggest_makes(&state, "chev").await;
        assert_eq!(makes.len(), 1);
        assert_eq!(makes[0].code, "23");
    }

    #[tokio::test]
    async fn test_failure_degrades_to_empty() {
        let state = state_with(Some(Arc::new(StaticCatalog))).await;
        assert!(suggest_models(&state, "21").await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_catalog() {
        let state = state_with(None).await;
        assert!(suggest_makes(&state, "fiat").await.is_empty());
        assert!(suggest_models(&state, "21").await.is_empty());
    }
}
