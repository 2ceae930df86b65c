//! # Vehicle Catalog
//!
//! Make/model suggestions for the registration form, looked up in the FIPE
//! price table API.
//!
//! ```text
//! GET {base_url}/carros/marcas                  → [{ "codigo": "59", "nome": "VW - VolksWagen" }]
//! GET {base_url}/carros/marcas/{code}/modelos   → { "modelos": [{ "codigo": 5940, "nome": "Gol 1.0" }], "anos": [...] }
//! ```
//!
//! Suggestions are a convenience: callers treat every [`CatalogError`] as
//! "no suggestions" (see `commands::catalog`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog returned HTTP {status} for {url}")]
    Status { status: u16, url: String },
}

/// One make or model suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub code: String,
    pub name: String,
}

#[async_trait]
pub trait VehicleCatalog: Send + Sync {
    /// Makes whose name contains `partial` (case-insensitive). Blank returns all.
    async fn makes(&self, partial: &str) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Models of the make identified by `make_code`.
    async fn models(&self, make_code: &str) -> Result<Vec<CatalogEntry>, CatalogError>;
}

/// Keeps entries whose name contains `partial`, ignoring case.
pub fn filter_by_name(entries: Vec<CatalogEntry>, partial: &str) -> Vec<CatalogEntry> {
    let needle = partial.trim().to_lowercase();
    if needle.is_empty() {
        return entries;
    }
    entries
        .into_iter()
        .filter(|entry| entry.name.to_lowercase().contains(&needle))
        .collect()
}

// =============================================================================
// FIPE Client
// =============================================================================

/// FIPE codes are strings for makes and numbers for models.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FipeCode {
    Text(String),
    Number(i64),
}

impl FipeCode {
    fn into_string(self) -> String {
        match self {
            FipeCode::Text(code) => code,
            FipeCode::Number(code) => code.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FipeItem {
    codigo: FipeCode,
    nome: String,
}

impl From<FipeItem> for CatalogEntry {
    fn from(item: FipeItem) -> Self {
        CatalogEntry {
            code: item.codigo.into_string(),
            name: item.nome,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FipeModels {
    modelos: Vec<FipeItem>,
}

pub struct FipeCatalog {
    base_url: String,
    client: reqwest::Client,
}

impl FipeCatalog {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("parknow/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(FipeCatalog {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, CatalogError> {
        debug!(url = %url, "Catalog request");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl VehicleCatalog for FipeCatalog {
    async fn makes(&self, partial: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
        let items: Vec<FipeItem> = self
            .get_json(format!("{}/carros/marcas", self.base_url))
            .await?;
        let entries = items.into_iter().map(CatalogEntry::from).collect();
        Ok(filter_by_name(entries, partial))
    }

    async fn models(&self, make_code: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
        let models: FipeModels = self
            .get_json(format!(
                "{}/carros/marcas/{}/modelos",
                self.base_url,
                make_code.trim()
            ))
            .await?;
        Ok(models.modelos.into_iter().map(CatalogEntry::from).collect())
    }
}
