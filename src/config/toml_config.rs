use crate::utils::error::{FinderError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MISTRAL_BASE_URL: &str = "https://api.mistral.ai";
pub const DEFAULT_EBIRD_BASE_URL: &str = "https://api.ebird.org/v2";
pub const DEFAULT_NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Service endpoints and tuning. Every section is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    pub mistral: MistralConfig,
    pub ebird: EbirdConfig,
    pub geocoder: GeocoderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MistralConfig {
    pub base_url: String,
    /// Tried in order until one answers.
    pub models: Vec<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for MistralConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MISTRAL_BASE_URL.to_string(),
            models: vec![
                "mistral-large-latest".to_string(),
                "mistral-medium-latest".to_string(),
                "mistral-small-latest".to_string(),
                "mistral-tiny".to_string(),
            ],
            temperature: 0.2,
            max_tokens: 300,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EbirdConfig {
    pub base_url: String,
    pub radius_km: u32,
    pub max_results: u32,
    pub timeout_seconds: u64,
}

impl Default for EbirdConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EBIRD_BASE_URL.to_string(),
            radius_km: 50,
            max_results: 10_000,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NOMINATIM_BASE_URL.to_string(),
            user_agent: "bird_finder_app".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl FinderConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FinderError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("mistral.base_url", &self.mistral.base_url)?;
        validate_url("ebird.base_url", &self.ebird.base_url)?;
        validate_url("geocoder.base_url", &self.geocoder.base_url)?;

        if self.mistral.models.is_empty() {
            return Err(FinderError::MissingConfigError {
                field: "mistral.models".to_string(),
            });
        }
        for model in &self.mistral.models {
            validate_non_empty_string("mistral.models", model)?;
        }
        validate_range("mistral.temperature", self.mistral.temperature, 0.0, 2.0)?;
        validate_positive_number("mistral.max_tokens", u64::from(self.mistral.max_tokens), 1)?;
        // eBird 的 geo 查詢半徑上限為 50 公里
        validate_range("ebird.radius_km", self.ebird.radius_km, 1, 50)?;
        validate_positive_number("ebird.max_results", u64::from(self.ebird.max_results), 1)?;
        validate_non_empty_string("geocoder.user_agent", &self.geocoder.user_agent)?;

        for (field, timeout) in [
            ("mistral.timeout_seconds", self.mistral.timeout_seconds),
            ("ebird.timeout_seconds", self.ebird.timeout_seconds),
            ("geocoder.timeout_seconds", self.geocoder.timeout_seconds),
        ] {
            validate_positive_number(field, timeout, 1)?;
        }

        Ok(())
    }
}

impl Validate for FinderConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

/// 替換環境變數 (例如 ${EBIRD_BASE_URL})，未設定的變數保持原樣
pub(crate) fn substitute_env_vars(content: &str) -> Result<String> {
    use regex::Regex;
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| FinderError::ConfigError {
        message: format!("invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = FinderConfig::from_toml_str("").unwrap();

        assert_eq!(config, FinderConfig::default());
        assert_eq!(config.mistral.models[0], "mistral-large-latest");
        assert_eq!(config.ebird.radius_km, 50);
        assert_eq!(config.geocoder.user_agent, "bird_finder_app");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
[mistral]
models = ["mistral-small-latest"]
timeout_seconds = 5

[ebird]
radius_km = 25
"#;

        let config = FinderConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.mistral.models, vec!["mistral-small-latest"]);
        assert_eq!(config.mistral.timeout_seconds, 5);
        assert_eq!(config.mistral.base_url, DEFAULT_MISTRAL_BASE_URL);
        assert_eq!(config.ebird.radius_km, 25);
        assert_eq!(config.ebird.max_results, 10_000);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("BIRD_FINDER_TEST_EBIRD_URL", "http://localhost:9999/v2");

        let toml_content = r#"
[ebird]
base_url = "${BIRD_FINDER_TEST_EBIRD_URL}"
"#;

        let config = FinderConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.ebird.base_url, "http://localhost:9999/v2");

        std::env::remove_var("BIRD_FINDER_TEST_EBIRD_URL");
    }

    #[test]
    fn test_unset_env_var_is_left_verbatim() {
        let toml_content = r#"
[geocoder]
base_url = "${BIRD_FINDER_TEST_SURELY_UNSET}"
"#;

        let config = FinderConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.geocoder.base_url, "${BIRD_FINDER_TEST_SURELY_UNSET}");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = FinderConfig::default();
        config.mistral.models.clear();
        assert!(matches!(
            config.validate(),
            Err(FinderError::MissingConfigError { .. })
        ));

        let mut config = FinderConfig::default();
        config.ebird.radius_km = 80;
        assert!(config.validate().is_err());

        let mut config = FinderConfig::default();
        config.mistral.base_url = "invalid-url".to_string();
        assert!(config.validate().is_err());

        let mut config = FinderConfig::default();
        config.geocoder.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = FinderConfig::from_toml_str("[mistral\nmodels = 3").unwrap_err();
        assert!(matches!(err, FinderError::TomlError(_)));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[geocoder]\nuser_agent = \"bird_finder_tests\"\n")
            .unwrap();

        let config = FinderConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.geocoder.user_agent, "bird_finder_tests");
    }
}
