use crate::domain::model::{
    DateWindow, GeoFix, GeoPoint, IdentificationRequest, LocationInput, MAX_DAYS_BACK,
    MAX_YEARS_BACK,
};
use crate::utils::error::{FinderError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{validate_range, Validate};
use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "bird-finder")]
#[command(about = "Identify a bird from a description using a language model and eBird observations")]
#[command(group(
    ArgGroup::new("location")
        .required(true)
        .args(["lat", "place", "device_location", "region"])
))]
pub struct CliConfig {
    /// What did the bird look like? Size, color, beak shape, behavior...
    #[arg(short, long)]
    pub description: String,

    /// Latitude (-90 to 90), used together with --lng
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude (-180 to 180), used together with --lat
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// City/State/Country, e.g. "New York, NY, USA"
    #[arg(long)]
    pub place: Option<String>,

    /// Device geolocation reading as JSON, or @path to a JSON file
    #[arg(long)]
    pub device_location: Option<String>,

    /// eBird region code, e.g. US-NY
    #[arg(long)]
    pub region: Option<String>,

    /// Number of recent days to include in the observation search
    #[arg(long, default_value_t = crate::domain::model::DEFAULT_DAYS_BACK)]
    pub days_back: u32,

    /// Number of years back to include observations from the same month
    #[arg(long, default_value_t = crate::domain::model::DEFAULT_YEARS_BACK)]
    pub years_back: u32,

    /// Weight of the description match in the combined score (0-1)
    #[arg(long, default_value_t = 0.4)]
    pub llm_weight: f64,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Service configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Secrets file holding MISTRAL_API_KEY and EBIRD_API_KEY
    #[arg(long, default_value = "secrets.toml")]
    pub secrets: PathBuf,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

impl CliConfig {
    pub fn log_format(&self) -> LogFormat {
        if self.log_json {
            LogFormat::Json
        } else {
            LogFormat::Compact
        }
    }

    pub fn location(&self) -> Result<LocationInput> {
        if let (Some(latitude), Some(longitude)) = (self.lat, self.lng) {
            return Ok(LocationInput::Coordinates(GeoPoint {
                latitude,
                longitude,
            }));
        }
        if let Some(place) = &self.place {
            return Ok(LocationInput::Place(place.clone()));
        }
        if let Some(raw) = &self.device_location {
            return parse_device_location(raw).map(LocationInput::Device);
        }
        if let Some(region) = &self.region {
            return Ok(LocationInput::Region(region.clone()));
        }
        Err(FinderError::InvalidInput {
            field: "location".to_string(),
            message: "Please specify your location.".to_string(),
        })
    }

    pub fn window(&self) -> DateWindow {
        DateWindow {
            days_back: self.days_back,
            years_back: self.years_back,
        }
    }

    pub fn to_request(&self) -> Result<IdentificationRequest> {
        Ok(IdentificationRequest {
            description: self.description.clone(),
            location: self.location()?,
            window: self.window(),
            llm_weight: self.llm_weight,
        })
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_range("days_back", self.days_back, 1, MAX_DAYS_BACK)?;
        validate_range("years_back", self.years_back, 0, MAX_YEARS_BACK)?;
        validate_range("llm_weight", self.llm_weight, 0.0, 1.0)?;
        Ok(())
    }
}

/// Malformed readings are a location problem, not a crash.
fn parse_device_location(raw: &str) -> Result<GeoFix> {
    let json = match raw.strip_prefix('@') {
        Some(path) => {
            std::fs::read_to_string(path).map_err(|e| FinderError::GeocodingFailed {
                query: "device location".to_string(),
                reason: format!("cannot read geolocation file '{}': {}", path, e),
            })?
        }
        None => raw.to_string(),
    };
    serde_json::from_str(&json).map_err(|e| FinderError::GeocodingFailed {
        query: "device location".to_string(),
        reason: format!("unreadable geolocation data: {}", e),
    })
}
