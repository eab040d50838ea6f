//! Storage Config

use std::path::PathBuf;

use clap::Args;

/// Where cart, wishlist and receipt state is kept between runs.
#[derive(Debug, Args)]
pub struct StorageConfig {
    /// Directory holding one JSON file per storage key
    #[arg(long, env = "GEBEYA_DATA_DIR", default_value = ".gebeya")]
    pub data_dir: PathBuf,
}
