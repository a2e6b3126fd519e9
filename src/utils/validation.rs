use crate::utils::error::{FinderError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(FinderError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(FinderError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(FinderError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(FinderError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FinderError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    // NaN 不會落在任何範圍內
    if !(value >= min && value <= max) {
        return Err(FinderError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("mistral.base_url", "https://api.mistral.ai").is_ok());
        assert!(validate_url("mistral.base_url", "http://127.0.0.1:8080").is_ok());
        assert!(validate_url("mistral.base_url", "").is_err());
        assert!(validate_url("mistral.base_url", "invalid-url").is_err());
        assert!(validate_url("mistral.base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("ebird.radius_km", 50, 1).is_ok());
        assert!(validate_positive_number("ebird.radius_km", 0, 1).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("days_back", 30, 1, 365).is_ok());
        assert!(validate_range("days_back", 0, 1, 365).is_err());
        assert!(validate_range("llm_weight", 0.4, 0.0, 1.0).is_ok());
        assert!(validate_range("llm_weight", 1.5, 0.0, 1.0).is_err());
        assert!(validate_range("llm_weight", f64::NAN, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("description", "small red bird").is_ok());
        assert!(validate_non_empty_string("description", "   ").is_err());
    }
}
