#[cfg(feature = "cli")]
pub mod cli;
pub mod secrets;
pub mod toml_config;

pub use secrets::{ApiKeys, SecretStore};
pub use toml_config::FinderConfig;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, OutputFormat};
