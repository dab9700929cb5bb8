//! Layered configuration for the schedule engine.
//!
//! Sources, lowest to highest priority:
//! 1. `config/default.toml`
//! 2. `config/{environment}.toml`
//! 3. `config/local.toml` (not committed)
//! 4. `BULKLINE_*` environment variables (`__` separates nested keys,
//!    e.g. `BULKLINE_DATABASE__URL`)

pub mod environment;
pub mod error;
pub mod loader;
pub mod settings;

pub use environment::Environment;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use settings::{DatabaseConfig, LoggerConfig, Settings, StorageConfig};
