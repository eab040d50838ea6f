//! App Context

use std::sync::Arc;

use gebeya::storage::{FileStorage, Storage, StorageError};
use thiserror::Error;

use crate::{
    api::{ApiError, HttpStorefrontApi, StorefrontApi},
    catalog::CatalogBrowser,
    checkout::CheckoutService,
    config::AppConfig,
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to build the API client: {0}")]
    Api(#[source] ApiError),

    #[error("failed to open the data directory: {0}")]
    Storage(#[source] StorageError),
}

#[derive(Clone)]
pub struct AppContext {
    pub api: Arc<dyn StorefrontApi>,
    pub storage: Arc<dyn Storage>,
}

impl AppContext {
    /// Build application context from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the API URL is invalid or the data directory
    /// cannot be created.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppInitError> {
        let api = HttpStorefrontApi::new(config.api.http_config()).map_err(AppInitError::Api)?;

        let storage = FileStorage::open(config.storage.data_dir.clone()).map_err(AppInitError::Storage)?;

        Ok(Self::new(Arc::new(api), Arc::new(storage)))
    }

    pub fn new(api: Arc<dyn StorefrontApi>, storage: Arc<dyn Storage>) -> Self {
        Self { api, storage }
    }

    pub fn catalog(&self) -> CatalogBrowser {
        CatalogBrowser::new(self.api.clone())
    }

    pub fn checkout(&self) -> CheckoutService {
        CheckoutService::new(self.api.clone(), self.storage.clone())
    }
}
