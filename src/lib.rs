pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, OutputFormat};

pub use adapters::{build_engine, EbirdObservationSource, MistralSuggester, NominatimGeocoder};
pub use config::{FinderConfig, SecretStore};
pub use core::{identify::IdentificationEngine, ranking::rank_candidates};
pub use utils::error::{FinderError, Result};
