pub mod identify;
pub mod ranking;

pub use crate::domain::model::{
    BirdCandidate, IdentificationReport, IdentificationRequest, ObservationSignal, RankedResult,
};
pub use crate::domain::ports::{Geocoder, ObservationSource, SpeciesSuggester};
pub use crate::utils::error::Result;
