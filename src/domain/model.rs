use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of candidate species requested from the language model.
pub const MAX_CANDIDATES: usize = 5;

pub const DEFAULT_DAYS_BACK: u32 = 30;
pub const DEFAULT_YEARS_BACK: u32 = 5;
pub const MAX_DAYS_BACK: u32 = 365;
pub const MAX_YEARS_BACK: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BirdCandidate {
    pub common_name: String,
    pub scientific_name: Option<String>,
    /// 1-based position in the language model's answer.
    pub llm_rank: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionSet {
    pub candidates: Vec<BirdCandidate>,
    pub model_used: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Latitude {:.4}, Longitude {:.4}",
            self.latitude, self.longitude
        )
    }
}

/// Where observations are searched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Region {
    Point(GeoPoint),
    /// eBird region code, e.g. `US-NY`.
    Code { code: String },
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Point(point) => write!(f, "{}", point),
            Region::Code { code } => write!(f, "{}", code),
        }
    }
}

/// A coordinate reading handed over by the device (browser geolocation payload).
/// Either field may be absent when the device could not produce a fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// The mutually exclusive ways a user can say where the bird was seen.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    Coordinates(GeoPoint),
    Place(String),
    Device(GeoFix),
    Region(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// Recent days to include.
    pub days_back: u32,
    /// Previous years whose same calendar month is included.
    pub years_back: u32,
}

impl Default for DateWindow {
    fn default() -> Self {
        Self {
            days_back: DEFAULT_DAYS_BACK,
            years_back: DEFAULT_YEARS_BACK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSignal {
    pub species_code: String,
    pub count: u64,
    pub window_days: u32,
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub candidate: BirdCandidate,
    pub probability: f64,
    pub observation_count: u64,
    pub species_code: Option<String>,
    /// Blend of description match and observation probability, in percent.
    pub combined_score: f64,
}

impl RankedResult {
    pub fn ebird_url(&self) -> Option<String> {
        self.species_code
            .as_deref()
            .map(|code| format!("https://ebird.org/species/{}", code))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentificationRequest {
    pub description: String,
    pub location: LocationInput,
    pub window: DateWindow,
    pub llm_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentificationReport {
    pub results: Vec<RankedResult>,
    pub model_used: String,
    pub region: Region,
    pub window: DateWindow,
    pub llm_weight: f64,
    /// True when every candidate had zero observations; probabilities are uniform.
    pub no_observations: bool,
}
