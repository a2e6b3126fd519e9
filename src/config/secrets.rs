use crate::config::toml_config::substitute_env_vars;
use crate::utils::error::{FinderError, Result};
use std::collections::HashMap;
use std::path::Path;

pub const MISTRAL_API_KEY: &str = "MISTRAL_API_KEY";
pub const EBIRD_API_KEY: &str = "EBIRD_API_KEY";

/// API keys from a deployment secrets file, falling back to the environment.
///
/// Top-level string values of the file are read; tables and other values
/// that share the file are ignored:
///
/// ```toml
/// MISTRAL_API_KEY = "..."
/// EBIRD_API_KEY = "..."
/// ```
#[derive(Debug, Clone, Default)]
pub struct SecretStore {
    values: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ApiKeys {
    pub mistral: String,
    pub ebird: String,
}

impl SecretStore {
    /// Environment only.
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FinderError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// A missing file is not an error; the environment is still consulted.
    pub fn load_optional<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            tracing::debug!("Loading secrets from {}", path.as_ref().display());
            Self::from_file(path)
        } else {
            Ok(Self::from_env())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;
        let table: toml::Table = toml::from_str(&processed)?;
        let values = table
            .into_iter()
            .filter_map(|(key, value)| match value {
                toml::Value::String(s) => Some((key, s)),
                _ => None,
            })
            .collect();
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Result<String> {
        if let Some(value) = self.values.get(key).filter(|v| !v.trim().is_empty()) {
            return Ok(value.clone());
        }
        match std::env::var(key) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(FinderError::MissingApiKey {
                key: key.to_string(),
            }),
        }
    }

    /// Both keys must be present before any identification runs.
    pub fn api_keys(&self) -> Result<ApiKeys> {
        Ok(ApiKeys {
            mistral: self.get(MISTRAL_API_KEY)?,
            ebird: self.get(EBIRD_API_KEY)?,
        })
    }
}
