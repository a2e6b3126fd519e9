use crate::config::toml_config::EbirdConfig;
use crate::domain::model::{BirdCandidate, DateWindow, ObservationSignal, Region};
use crate::domain::ports::ObservationSource;
use crate::utils::error::{FinderError, Result};
use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;

/// eBird only accepts `back` values between 1 and 30.
const MAX_BACK_DAYS: u32 = 30;

const COMMON_NAME_FIELDS: [&str; 4] = ["comName", "COMMON_NAME", "common_name", "Common Name"];
const SCIENTIFIC_NAME_FIELDS: [&str; 4] =
    ["sciName", "SCIENTIFIC_NAME", "scientific_name", "Scientific Name"];
const SPECIES_CODE_FIELDS: [&str; 4] = ["speciesCode", "SPECIES_CODE", "species_code", "Species Code"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonEntry {
    pub common_name: String,
    pub scientific_name: String,
    pub species_code: String,
}

#[derive(Debug, Deserialize)]
struct ObservationRecord {
    #[serde(rename = "obsDt", default)]
    obs_dt: Option<String>,
}

pub struct EbirdObservationSource {
    client: Client,
    api_key: String,
    config: EbirdConfig,
    taxonomy: OnceCell<Vec<TaxonEntry>>,
    reference_date: Option<NaiveDate>,
}

impl EbirdObservationSource {
    pub fn new(api_key: String, config: EbirdConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            api_key,
            config,
            taxonomy: OnceCell::new(),
            reference_date: None,
        })
    }

    /// Fix "today" for the observation window instead of using the local clock.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Local::now().date_naive())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Taxonomy is fetched once per client; a failed load is retried on the next call.
    pub async fn taxonomy(&self) -> Result<&[TaxonEntry]> {
        let entries = self
            .taxonomy
            .get_or_try_init(|| self.fetch_taxonomy())
            .await?;
        Ok(entries.as_slice())
    }

    async fn fetch_taxonomy(&self) -> Result<Vec<TaxonEntry>> {
        tracing::debug!("Loading eBird taxonomy");
        let response = self
            .client
            .get(self.url("ref/taxonomy/ebird"))
            .header("X-eBirdApiToken", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FinderError::StatisticsRequestFailed {
                species: "taxonomy".to_string(),
                message: status_message(status),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(FinderError::StatisticsRequestFailed {
                species: "taxonomy".to_string(),
                message: "eBird API returned empty response".to_string(),
            });
        }

        let entries = parse_taxonomy(&body)?;
        tracing::info!("Loaded {} taxonomy entries", entries.len());
        Ok(entries)
    }

    async fn fetch_observations(
        &self,
        species_code: &str,
        region: &Region,
        window: &DateWindow,
    ) -> Result<Vec<ObservationRecord>> {
        let back = window.days_back.clamp(1, MAX_BACK_DAYS).to_string();
        let max_results = self.config.max_results.to_string();

        let request = match region {
            Region::Point(point) => self
                .client
                .get(self.url(&format!("data/obs/geo/recent/{}", species_code)))
                .query(&[
                    ("lat", point.latitude.to_string()),
                    ("lng", point.longitude.to_string()),
                    ("dist", self.config.radius_km.to_string()),
                    ("back", back),
                    ("maxResults", max_results),
                ]),
            Region::Code { code } => self
                .client
                .get(self.url(&format!("data/obs/{}/recent/{}", code, species_code)))
                .query(&[("back", back), ("maxResults", max_results)]),
        };

        let response = request
            .header("X-eBirdApiToken", &self.api_key)
            .send()
            .await
            .map_err(|e| FinderError::StatisticsRequestFailed {
                species: species_code.to_string(),
                message: if e.is_timeout() {
                    "eBird API request timed out".to_string()
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        // 404 表示該地區沒有此物種的紀錄
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(FinderError::StatisticsRequestFailed {
                species: species_code.to_string(),
                message: status_message(status),
            });
        }

        response
            .json::<Vec<ObservationRecord>>()
            .await
            .map_err(|e| FinderError::StatisticsRequestFailed {
                species: species_code.to_string(),
                message: format!("unreadable observation data: {}", e),
            })
    }
}

#[async_trait]
impl ObservationSource for EbirdObservationSource {
    async fn species_code(&self, candidate: &BirdCandidate) -> Result<Option<String>> {
        if candidate.common_name.trim().is_empty() {
            return Ok(None);
        }
        let taxonomy = self.taxonomy().await?;
        Ok(find_species_code(
            taxonomy,
            &candidate.common_name,
            candidate.scientific_name.as_deref().unwrap_or(""),
        ))
    }

    async fn observation_signal(
        &self,
        candidate: &BirdCandidate,
        region: &Region,
        window: &DateWindow,
    ) -> Result<ObservationSignal> {
        let species_code = self.species_code(candidate).await?.ok_or_else(|| {
            FinderError::StatisticsRequestFailed {
                species: candidate.common_name.clone(),
                message: "no matching eBird species code".to_string(),
            }
        })?;

        let observations = self.fetch_observations(&species_code, region, window).await?;
        let today = self.today();
        let count = observations
            .iter()
            .filter_map(|obs| obs.obs_dt.as_deref())
            .filter(|date| in_window(date, today, window))
            .count() as u64;

        tracing::debug!(
            "{}: {} of {} observations inside the window",
            species_code,
            count,
            observations.len()
        );

        Ok(ObservationSignal {
            species_code,
            count,
            window_days: window.days_back,
            region: region.clone(),
        })
    }
}

fn status_message(status: StatusCode) -> String {
    match status {
        StatusCode::UNAUTHORIZED => "Invalid eBird API key".to_string(),
        StatusCode::TOO_MANY_REQUESTS => "eBird API rate limit exceeded".to_string(),
        other => format!("eBird API error (HTTP {})", other.as_u16()),
    }
}

/// Accepts the CSV export eBird serves by default, or a JSON array.
pub fn parse_taxonomy(body: &str) -> Result<Vec<TaxonEntry>> {
    if let Some(entries) = parse_taxonomy_csv(body)? {
        return Ok(entries);
    }

    let rows: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(body)
        .map_err(|e| FinderError::StatisticsRequestFailed {
            species: "taxonomy".to_string(),
            message: format!("could not parse eBird taxonomy response: {}", e),
        })?;
    let entries: Vec<TaxonEntry> = rows
        .iter()
        .filter_map(|row| {
            let field = |names: &[&str]| {
                names
                    .iter()
                    .filter_map(|name| row.get(*name))
                    .find_map(|v| v.as_str().filter(|s| !s.is_empty()))
                    .map(str::to_string)
            };
            Some(TaxonEntry {
                species_code: field(&SPECIES_CODE_FIELDS[..])?,
                common_name: field(&COMMON_NAME_FIELDS[..]).unwrap_or_default(),
                scientific_name: field(&SCIENTIFIC_NAME_FIELDS[..]).unwrap_or_default(),
            })
        })
        .collect();

    if entries.is_empty() {
        return Err(FinderError::StatisticsRequestFailed {
            species: "taxonomy".to_string(),
            message: "eBird taxonomy response contained no species".to_string(),
        });
    }
    Ok(entries)
}

/// `None` when the body does not look like the taxonomy CSV.
fn parse_taxonomy_csv(body: &str) -> Result<Option<Vec<TaxonEntry>>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers = reader.headers()?.clone();
    let column = |names: &[&str]| headers.iter().position(|h| names.contains(&h.trim()));

    let Some(code_col) = column(&SPECIES_CODE_FIELDS[..]) else {
        return Ok(None);
    };
    let common_col = column(&COMMON_NAME_FIELDS[..]);
    let scientific_col = column(&SCIENTIFIC_NAME_FIELDS[..]);

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record?;
        let get = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };
        let species_code = get(Some(code_col));
        if species_code.is_empty() {
            continue;
        }
        entries.push(TaxonEntry {
            species_code,
            common_name: get(common_col),
            scientific_name: get(scientific_col),
        });
    }

    Ok(if entries.is_empty() { None } else { Some(entries) })
}

/// Exact common name, exact scientific name, then the most specific partial
/// common-name match, then a partial scientific-name match.
pub fn find_species_code(
    taxonomy: &[TaxonEntry],
    common_name: &str,
    scientific_name: &str,
) -> Option<String> {
    let common = common_name.trim().to_lowercase();
    let scientific = scientific_name.trim().to_lowercase();
    if common.is_empty() {
        return None;
    }

    if let Some(entry) = taxonomy
        .iter()
        .find(|e| e.common_name.to_lowercase() == common)
    {
        return Some(entry.species_code.clone());
    }

    if !scientific.is_empty() {
        if let Some(entry) = taxonomy
            .iter()
            .find(|e| e.scientific_name.to_lowercase() == scientific)
        {
            return Some(entry.species_code.clone());
        }
    }

    // 最長的名稱優先，同長度時取分類表中較前者
    let mut best_partial: Option<(&TaxonEntry, usize)> = None;
    for entry in taxonomy {
        let name = entry.common_name.to_lowercase();
        if name.is_empty() || !(name.contains(&common) || common.contains(&name)) {
            continue;
        }
        let len = name.chars().count();
        if best_partial.map_or(true, |(_, best)| len > best) {
            best_partial = Some((entry, len));
        }
    }
    if let Some((entry, _)) = best_partial {
        return Some(entry.species_code.clone());
    }

    if !scientific.is_empty() {
        if let Some(entry) = taxonomy.iter().find(|e| {
            let name = e.scientific_name.to_lowercase();
            !name.is_empty() && (name.contains(&scientific) || scientific.contains(&name))
        }) {
            return Some(entry.species_code.clone());
        }
    }

    None
}

/// Within `days_back` days of `today`, or in the same month 1..=`years_back` years ago.
pub fn in_window(obs_dt: &str, today: NaiveDate, window: &DateWindow) -> bool {
    let Some(date_part) = obs_dt.split_whitespace().next() else {
        return false;
    };
    let Ok(obs_date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") else {
        return false;
    };

    let days_diff = (today - obs_date).num_days();
    if days_diff <= i64::from(window.days_back) {
        return true;
    }
    if window.years_back > 0 && obs_date.month() == today.month() {
        let years_diff = today.year() - obs_date.year();
        return years_diff >= 1 && years_diff <= window.years_back as i32;
    }
    false
}
