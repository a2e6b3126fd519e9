use bird_finder::config::toml_config::{EbirdConfig, GeocoderConfig, MistralConfig};
use bird_finder::config::ApiKeys;
use bird_finder::domain::model::{DateWindow, GeoPoint, IdentificationRequest, LocationInput};
use bird_finder::{build_engine, FinderConfig, FinderError};
use chrono::{Duration, Local};
use httpmock::prelude::*;

const TAXONOMY_CSV: &str = "SCIENTIFIC_NAME,COMMON_NAME,SPECIES_CODE,CATEGORY\n\
    Thryothorus ludovicianus,Carolina Wren,carwre,species\n\
    Troglodytes aedon,House Wren,houwre,species\n\
    Troglodytes hiemalis,Winter Wren,winwre3,species\n\
    Thryomanes bewickii,Bewick's Wren,bewwre,species\n\
    Cistothorus palustris,Marsh Wren,marwre,species\n";

const LLM_ANSWER: &str = "1. Carolina Wren | Thryothorus ludovicianus\n\
    2. House Wren | Troglodytes aedon\n\
    3. Winter Wren | Troglodytes hiemalis\n\
    4. Bewick's Wren | Thryomanes bewickii\n\
    5. Marsh Wren | Cistothorus palustris";

fn config_for(server: &MockServer) -> FinderConfig {
    FinderConfig {
        mistral: MistralConfig {
            base_url: server.base_url(),
            models: vec!["mistral-large-latest".to_string()],
            ..MistralConfig::default()
        },
        ebird: EbirdConfig {
            base_url: server.url("/v2"),
            ..EbirdConfig::default()
        },
        geocoder: GeocoderConfig {
            base_url: server.url("/nominatim"),
            ..GeocoderConfig::default()
        },
    }
}

fn keys() -> ApiKeys {
    ApiKeys {
        mistral: "mistral-key".to_string(),
        ebird: "ebird-key".to_string(),
    }
}

/// Observation dates a few days ago, so they fall in the default window.
fn recent_observations(n: usize) -> serde_json::Value {
    let date = (Local::now().date_naive() - Duration::days(2))
        .format("%Y-%m-%d 08:00")
        .to_string();
    serde_json::Value::Array(
        (0..n)
            .map(|_| serde_json::json!({"obsDt": date, "howMany": 1}))
            .collect(),
    )
}

fn mock_llm_and_taxonomy(server: &MockServer) {
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("Authorization", "Bearer mistral-key");
        then.status(200).json_body(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": LLM_ANSWER}}]
        }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/v2/ref/taxonomy/ebird")
            .header("X-eBirdApiToken", "ebird-key");
        then.status(200).body(TAXONOMY_CSV);
    });
}

fn request(location: LocationInput) -> IdentificationRequest {
    IdentificationRequest {
        description: "small brown bird, loud song, cocked tail".to_string(),
        location,
        window: DateWindow::default(),
        llm_weight: 0.4,
    }
}

#[tokio::test]
async fn test_end_to_end_with_place_lookup() {
    let server = MockServer::start();
    mock_llm_and_taxonomy(&server);

    let geocode = server.mock(|when, then| {
        when.method(GET)
            .path("/nominatim/search")
            .query_param("q", "Raleigh, NC, USA");
        then.status(200)
            .json_body(serde_json::json!([{"lat": "35.7796", "lon": "-78.6382"}]));
    });

    // 40 / 30 / 20 / 10 / 0
    let counts = [("carwre", 10), ("houwre", 40), ("winwre3", 0), ("bewwre", 20), ("marwre", 30)];
    let obs_mocks: Vec<_> = counts
        .iter()
        .map(|(code, n)| {
            server.mock(|when, then| {
                when.method(GET)
                    .path(format!("/v2/data/obs/geo/recent/{}", code))
                    .query_param("lat", "35.7796")
                    .query_param("lng", "-78.6382");
                then.status(200).json_body(recent_observations(*n));
            })
        })
        .collect();

    let engine = build_engine(&config_for(&server), keys()).unwrap();
    let report = engine
        .run(&request(LocationInput::Place("Raleigh, NC, USA".to_string())))
        .await
        .unwrap();

    geocode.assert();
    for mock in &obs_mocks {
        mock.assert();
    }

    let ranked: Vec<(&str, f64)> = report
        .results
        .iter()
        .map(|r| (r.candidate.common_name.as_str(), r.probability))
        .collect();
    let expected = [
        ("House Wren", 0.4),
        ("Marsh Wren", 0.3),
        ("Bewicks Wren", 0.2),
        ("Carolina Wren", 0.1),
        ("Winter Wren", 0.0),
    ];
    assert_eq!(ranked.len(), expected.len());
    for ((name, p), (expected_name, expected_p)) in ranked.iter().zip(expected) {
        assert_eq!(*name, expected_name);
        assert!((p - expected_p).abs() < 1e-9);
    }
    assert_eq!(report.model_used, "mistral-large-latest");
    assert!(!report.no_observations);
    assert_eq!(
        report.results[0].ebird_url().as_deref(),
        Some("https://ebird.org/species/houwre")
    );
}

#[tokio::test]
async fn test_statistics_failures_degrade_to_uniform() {
    let server = MockServer::start();
    mock_llm_and_taxonomy(&server);

    // every observation request fails
    server.mock(|when, then| {
        when.method(GET).path_contains("/v2/data/obs/");
        then.status(500);
    });

    let engine = build_engine(&config_for(&server), keys()).unwrap();
    let report = engine
        .run(&request(LocationInput::Coordinates(GeoPoint {
            latitude: 35.7796,
            longitude: -78.6382,
        })))
        .await
        .unwrap();

    assert!(report.no_observations);
    assert_eq!(report.results.len(), 5);
    for (i, result) in report.results.iter().enumerate() {
        assert!((result.probability - 0.2).abs() < 1e-9);
        assert_eq!(result.candidate.llm_rank as usize, i + 1);
        // 觀測資料失敗時仍保留物種連結
        assert!(result.ebird_url().is_some(), "no link for {}", result.candidate.common_name);
    }
    assert_eq!(
        report.results[0].ebird_url().as_deref(),
        Some("https://ebird.org/species/carwre")
    );
}

#[tokio::test]
async fn test_region_code_uses_region_endpoint() {
    let server = MockServer::start();
    mock_llm_and_taxonomy(&server);

    let carolina = server.mock(|when, then| {
        when.method(GET).path("/v2/data/obs/US-NC/recent/carwre");
        then.status(200).json_body(recent_observations(3));
    });
    // the other four species have no records in the region
    for code in ["houwre", "winwre3", "bewwre", "marwre"] {
        server.mock(|when, then| {
            when.method(GET)
                .path(format!("/v2/data/obs/US-NC/recent/{}", code));
            then.status(404);
        });
    }

    let engine = build_engine(&config_for(&server), keys()).unwrap();
    let report = engine
        .run(&request(LocationInput::Region("US-NC".to_string())))
        .await
        .unwrap();

    carolina.assert();
    assert_eq!(report.results[0].candidate.common_name, "Carolina Wren");
    assert!((report.results[0].probability - 1.0).abs() < 1e-9);
    assert_eq!(report.results[0].observation_count, 3);
    let rest: Vec<u8> = report.results[1..].iter().map(|r| r.candidate.llm_rank).collect();
    assert_eq!(rest, vec![2, 3, 4, 5]);
}

#[tokio::test]
async fn test_unknown_place_is_geocoding_failure() {
    let server = MockServer::start();
    let llm = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200);
    });
    server.mock(|when, then| {
        when.method(GET).path("/nominatim/search");
        then.status(200).json_body(serde_json::json!([]));
    });

    let engine = build_engine(&config_for(&server), keys()).unwrap();
    let err = engine
        .run(&request(LocationInput::Place("Nowhere Special".to_string())))
        .await
        .unwrap_err();

    assert!(matches!(err, FinderError::GeocodingFailed { .. }));
    llm.assert_hits(0);
}

#[tokio::test]
async fn test_llm_outage_is_surfaced() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(503);
    });

    let engine = build_engine(&config_for(&server), keys()).unwrap();
    let err = engine
        .run(&request(LocationInput::Region("US-NY".to_string())))
        .await
        .unwrap_err();

    assert!(matches!(err, FinderError::LlmRequestFailed { .. }));
}
