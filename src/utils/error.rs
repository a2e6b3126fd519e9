use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinderError {
    #[error("API key '{key}' not found")]
    MissingApiKey { key: String },

    #[error("Geocoding failed for '{query}': {reason}")]
    GeocodingFailed { query: String, reason: String },

    #[error("Language model request failed: {message}")]
    LlmRequestFailed { message: String },

    #[error("Observation request failed for '{species}': {message}")]
    StatisticsRequestFailed { species: String, message: String },

    #[error("Invalid input for {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Network,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl FinderError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FinderError::MissingApiKey { .. }
            | FinderError::ConfigError { .. }
            | FinderError::InvalidConfigValueError { .. }
            | FinderError::MissingConfigError { .. }
            | FinderError::TomlError(_) => ErrorCategory::Configuration,
            FinderError::GeocodingFailed { .. } | FinderError::InvalidInput { .. } => {
                ErrorCategory::Input
            }
            FinderError::LlmRequestFailed { .. }
            | FinderError::StatisticsRequestFailed { .. }
            | FinderError::ApiError(_) => ErrorCategory::Network,
            FinderError::CsvError(_) | FinderError::SerializationError(_) => ErrorCategory::Data,
            FinderError::IoError(_) => ErrorCategory::System,
        }
    }

    /// 嚴重程度決定 CLI 的退出碼
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單一物種查詢失敗只會降級為 0 筆觀察
            FinderError::StatisticsRequestFailed { .. } => ErrorSeverity::Low,
            FinderError::LlmRequestFailed { .. } | FinderError::ApiError(_) => {
                ErrorSeverity::Medium
            }
            FinderError::GeocodingFailed { .. }
            | FinderError::InvalidInput { .. }
            | FinderError::CsvError(_)
            | FinderError::SerializationError(_) => ErrorSeverity::High,
            FinderError::MissingApiKey { .. }
            | FinderError::ConfigError { .. }
            | FinderError::InvalidConfigValueError { .. }
            | FinderError::MissingConfigError { .. }
            | FinderError::TomlError(_)
            | FinderError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            FinderError::MissingApiKey { key } => format!(
                "Set {} in the secrets file (see --secrets) or export it as an environment variable",
                key
            ),
            FinderError::GeocodingFailed { .. } => {
                "Try a different location format, e.g. \"New York, NY, USA\", or pass coordinates"
                    .to_string()
            }
            FinderError::LlmRequestFailed { .. } => {
                "Try again with a more detailed description".to_string()
            }
            FinderError::StatisticsRequestFailed { .. } => {
                "The species was ranked with zero observations; adjust the location or date window"
                    .to_string()
            }
            FinderError::InvalidInput { field, .. } => format!("Check the value given for {}", field),
            FinderError::ApiError(_) => "Check your network connection and try again".to_string(),
            FinderError::CsvError(_) | FinderError::SerializationError(_) => {
                "The service returned unexpected data; try again in a moment".to_string()
            }
            FinderError::IoError(_) => "Check file paths and permissions".to_string(),
            FinderError::TomlError(_) => "Make sure the file is valid TOML".to_string(),
            FinderError::ConfigError { .. }
            | FinderError::InvalidConfigValueError { .. }
            | FinderError::MissingConfigError { .. } => {
                "Review the configuration file and command-line flags".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            FinderError::MissingApiKey { key } => format!(
                "API key '{}' not found. For local use, put it in secrets.toml or the environment.",
                key
            ),
            FinderError::GeocodingFailed { .. } => {
                "Could not find location. Please try a different format.".to_string()
            }
            FinderError::LlmRequestFailed { message } => {
                format!("Error getting bird suggestions: {}", message)
            }
            FinderError::StatisticsRequestFailed { species, .. } => {
                format!("No observation data could be fetched for {}", species)
            }
            FinderError::InvalidInput { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FinderError>;
