// Adapters layer: concrete implementations of the domain ports over HTTP.

pub mod ebird;
pub mod mistral;
pub mod nominatim;

pub use ebird::EbirdObservationSource;
pub use mistral::MistralSuggester;
pub use nominatim::NominatimGeocoder;

use crate::config::{ApiKeys, FinderConfig};
use crate::core::identify::IdentificationEngine;
use crate::utils::error::Result;

pub type HttpEngine = IdentificationEngine<MistralSuggester, EbirdObservationSource, NominatimGeocoder>;

/// Wire the HTTP adapters into an engine.
pub fn build_engine(config: &FinderConfig, keys: ApiKeys) -> Result<HttpEngine> {
    let suggester = MistralSuggester::new(keys.mistral, config.mistral.clone())?;
    let observations = EbirdObservationSource::new(keys.ebird, config.ebird.clone())?;
    let geocoder = NominatimGeocoder::new(&config.geocoder)?;
    Ok(IdentificationEngine::new(suggester, observations, geocoder))
}
