use crate::core::ranking::rank_candidates;
use crate::domain::model::{
    BirdCandidate, DateWindow, GeoPoint, IdentificationReport, IdentificationRequest,
    LocationInput, ObservationSignal, Region, MAX_CANDIDATES, MAX_DAYS_BACK, MAX_YEARS_BACK,
};
use crate::domain::ports::{Geocoder, ObservationSource, SpeciesSuggester};
use crate::utils::error::{FinderError, Result};
use crate::utils::validation::validate_range;
use chrono::{Local, NaiveDate};

/// Runs one identification: suggest, look up observations, rank.
pub struct IdentificationEngine<S, O, G>
where
    S: SpeciesSuggester,
    O: ObservationSource,
    G: Geocoder,
{
    suggester: S,
    observations: O,
    geocoder: G,
}

impl<S, O, G> IdentificationEngine<S, O, G>
where
    S: SpeciesSuggester,
    O: ObservationSource,
    G: Geocoder,
{
    pub fn new(suggester: S, observations: O, geocoder: G) -> Self {
        Self {
            suggester,
            observations,
            geocoder,
        }
    }

    pub async fn run(&self, request: &IdentificationRequest) -> Result<IdentificationReport> {
        self.run_on(request, Local::now().date_naive()).await
    }

    /// Same as [`run`](Self::run) with an explicit "today" for the date context.
    pub async fn run_on(
        &self,
        request: &IdentificationRequest,
        today: NaiveDate,
    ) -> Result<IdentificationReport> {
        if request.description.trim().is_empty() {
            return Err(FinderError::InvalidInput {
                field: "description".to_string(),
                message: "Please provide a description of the bird you saw.".to_string(),
            });
        }
        validate_range("llm_weight", request.llm_weight, 0.0, 1.0)?;
        validate_range("days_back", request.window.days_back, 1, MAX_DAYS_BACK)?;
        validate_range("years_back", request.window.years_back, 0, MAX_YEARS_BACK)?;

        tracing::info!("📍 Resolving location");
        let region = self.resolve_location(&request.location).await?;
        tracing::debug!("Resolved location to {}", region);

        tracing::info!("🤖 Asking the language model for candidate species");
        let date_context = today.format("%B %Y").to_string();
        let suggestions = self
            .suggester
            .suggest(&request.description, &region.to_string(), &date_context)
            .await?;

        let candidates: Vec<_> = suggestions
            .candidates
            .into_iter()
            .filter(|c| !c.common_name.trim().is_empty())
            .take(MAX_CANDIDATES)
            .collect();
        if candidates.is_empty() {
            return Err(FinderError::LlmRequestFailed {
                message: "No valid bird suggestions generated. Please try a more detailed description."
                    .to_string(),
            });
        }
        tracing::info!(
            model = %suggestions.model_used,
            candidates = candidates.len(),
            "Language model suggested species"
        );

        tracing::info!("📊 Analyzing observation data");
        let mut signals: Vec<Option<ObservationSignal>> = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            match self
                .observations
                .observation_signal(candidate, &region, &request.window)
                .await
            {
                Ok(signal) => {
                    tracing::debug!(
                        species = %candidate.common_name,
                        species_code = %signal.species_code,
                        count = signal.count,
                        "Observations found"
                    );
                    signals.push(Some(signal));
                }
                Err(e) => {
                    tracing::warn!(
                        species = %candidate.common_name,
                        error = %e,
                        "⚠️ Observation lookup failed, counting as zero"
                    );
                    signals.push(self.degraded_signal(candidate, &region, &request.window).await);
                }
            }
        }

        let results = rank_candidates(&candidates, &signals, request.llm_weight);
        let no_observations = results.iter().all(|r| r.observation_count == 0);
        if no_observations {
            tracing::warn!("No observations found for any candidate, using uniform probabilities");
        }

        Ok(IdentificationReport {
            results,
            model_used: suggestions.model_used,
            region,
            window: request.window,
            llm_weight: request.llm_weight,
            no_observations,
        })
    }

    /// Zero-count signal that still carries the species code when the name is known.
    async fn degraded_signal(
        &self,
        candidate: &BirdCandidate,
        region: &Region,
        window: &DateWindow,
    ) -> Option<ObservationSignal> {
        match self.observations.species_code(candidate).await {
            Ok(Some(species_code)) => Some(ObservationSignal {
                species_code,
                count: 0,
                window_days: window.days_back,
                region: region.clone(),
            }),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("No species code for {}: {}", candidate.common_name, e);
                None
            }
        }
    }

    async fn resolve_location(&self, location: &LocationInput) -> Result<Region> {
        match location {
            LocationInput::Coordinates(point) => checked_point(*point, "coordinates"),
            LocationInput::Place(query) => {
                let query = query.trim();
                if query.is_empty() {
                    return Err(FinderError::GeocodingFailed {
                        query: String::new(),
                        reason: "empty location".to_string(),
                    });
                }
                let point = self.geocoder.geocode(query).await?;
                tracing::info!(
                    "Found location: {:.4}, {:.4}",
                    point.latitude,
                    point.longitude
                );
                checked_point(point, query)
            }
            LocationInput::Device(fix) => match (fix.latitude, fix.longitude) {
                (Some(latitude), Some(longitude)) => checked_point(
                    GeoPoint {
                        latitude,
                        longitude,
                    },
                    "device location",
                ),
                _ => Err(FinderError::GeocodingFailed {
                    query: "device location".to_string(),
                    reason: "location data incomplete".to_string(),
                }),
            },
            LocationInput::Region(code) => {
                let code = code.trim();
                if code.is_empty() {
                    return Err(FinderError::GeocodingFailed {
                        query: String::new(),
                        reason: "empty region code".to_string(),
                    });
                }
                Ok(Region::Code {
                    code: code.to_uppercase(),
                })
            }
        }
    }
}

fn checked_point(point: GeoPoint, source: &str) -> Result<Region> {
    if point.is_valid() {
        Ok(Region::Point(point))
    } else {
        Err(FinderError::GeocodingFailed {
            query: source.to_string(),
            reason: format!(
                "coordinates out of range: lat={}, lng={}",
                point.latitude, point.longitude
            ),
        })
    }
}
