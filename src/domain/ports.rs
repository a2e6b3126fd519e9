use crate::domain::model::{
    BirdCandidate, DateWindow, GeoPoint, ObservationSignal, Region, SuggestionSet,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Language model that turns a free-text description into candidate species.
#[async_trait]
pub trait SpeciesSuggester: Send + Sync {
    async fn suggest(
        &self,
        description: &str,
        location_context: &str,
        date_context: &str,
    ) -> Result<SuggestionSet>;
}

/// Observation database queried once per candidate.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    /// Species identifier used for the species page link, if the name is known.
    async fn species_code(&self, candidate: &BirdCandidate) -> Result<Option<String>>;

    async fn observation_signal(
        &self,
        candidate: &BirdCandidate,
        region: &Region,
        window: &DateWindow,
    ) -> Result<ObservationSignal>;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<GeoPoint>;
}
