//! Storefront client configuration

use clap::Args;

pub use self::{
    api::ApiConfig,
    logging::{LogFormat, LoggingConfig},
    storage::StorageConfig,
};

mod api;
mod logging;
mod storage;

/// Settings shared by every command.
#[derive(Debug, Args)]
pub struct AppConfig {
    /// Storefront API settings.
    #[command(flatten)]
    pub api: ApiConfig,

    /// Local state settings.
    #[command(flatten)]
    pub storage: StorageConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}
