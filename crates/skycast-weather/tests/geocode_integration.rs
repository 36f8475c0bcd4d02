//! Integration tests for Geocoder using wiremock.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use skycast_core::{EndpointConfig, RequestCoordinator, RequestKind, RequestStatus, SearchConfig};
use skycast_weather::{Fetched, Geocoder, HttpContext, RetryConfig, SearchOptions};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn geocoder(server: &MockServer) -> (Geocoder, Arc<RequestCoordinator>) {
    let coordinator = Arc::new(RequestCoordinator::new());
    let http = HttpContext::with_client(
        reqwest::Client::new(),
        coordinator.clone(),
        RetryConfig::none(),
    );
    let geocoder = Geocoder::new(
        http,
        &EndpointConfig::all(&server.uri()),
        SearchConfig::default(),
    );
    (geocoder, coordinator)
}

fn candidate(name: &str, admin1: &str, country: &str, code: &str, lat: f64, lon: f64, population: u64) -> Value {
    json!({
        "name": name,
        "admin1": admin1,
        "country": country,
        "country_code": code,
        "latitude": lat,
        "longitude": lon,
        "population": population
    })
}

#[tokio::test]
async fn test_search_with_country_hint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("name", "santiago"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                candidate("Santiago de Compostela", "Galicia", "Spain", "ES", 42.88, -8.54, 95_000),
                candidate("Santiago", "Santiago Metropolitan", "Chile", "CL", -33.45, -70.65, 4_837_295),
                candidate("Santiago", "Santiago", "Dominican Republic", "DO", 19.45, -70.69, 1_200_000),
                candidate("Santiago", "Los Lagos", "Chile", "CL", -41.0, -73.0, 1_500),
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (geocoder, _) = geocoder(&mock_server);
    let results = geocoder.search_city("santiago chile", SearchOptions::default()).await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.country_code == "CL"));
    assert_eq!(results[0].admin1.as_deref(), Some("Santiago Metropolitan"));
    assert_eq!(results[1].admin1.as_deref(), Some("Los Lagos"));
}

#[tokio::test]
async fn test_hinted_spellings_share_one_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("name", "santiago"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [candidate("Santiago", "Santiago Metropolitan", "Chile", "CL", -33.45, -70.65, 4_837_295)]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (geocoder, _) = geocoder(&mock_server);
    let first = geocoder.search_city("santiago chile", SearchOptions::default()).await;
    let second = geocoder.search_city("Santiago, Chile", SearchOptions::default()).await;

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
    assert_eq!(geocoder.cache().len(), 1);
}

#[tokio::test]
async fn test_country_inside_city_name_is_searched_whole() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("name", "Cidade do México"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [candidate("Cidade do México", "Ciudad de México", "Mexico", "MX", 19.43, -99.13, 12_294_193)]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (geocoder, _) = geocoder(&mock_server);
    let results = geocoder.search_city("Cidade do México", SearchOptions::default()).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "Cidade do México");
    assert_eq!(results[0].country_code, "MX");
}

#[tokio::test]
async fn test_short_query_makes_no_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (geocoder, coordinator) = geocoder(&mock_server);
    assert!(geocoder.search_city("  sp ", SearchOptions::default()).await.is_empty());
    assert!(coordinator.slot(RequestKind::LocationSearch).is_none());
}

#[tokio::test]
async fn test_repeated_search_is_served_from_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [candidate("Urupema", "Santa Catarina", "Brazil", "BR", -27.95, -49.87, 2_500)]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (geocoder, _) = geocoder(&mock_server);
    let first = geocoder.search_city("Urupema", SearchOptions::default()).await;
    // Folded key: case and accents do not matter
    let second = geocoder.search_city("URUPÊMA", SearchOptions::default()).await;

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_forced_search_bypasses_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [candidate("Urupema", "Santa Catarina", "Brazil", "BR", -27.95, -49.87, 2_500)]
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let (geocoder, _) = geocoder(&mock_server);
    geocoder.search_city("Urupema", SearchOptions::default()).await;
    let forced = geocoder
        .search_city("Urupema", SearchOptions { force: true, count: None })
        .await;

    assert_eq!(forced.len(), 1);
}

#[tokio::test]
async fn test_server_error_returns_empty_and_records_slot() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let (geocoder, coordinator) = geocoder(&mock_server);
    let results = geocoder.search_city("Lisbon", SearchOptions::default()).await;

    assert!(results.is_empty());
    assert!(geocoder.cache().is_empty());
    let slot = coordinator.slot(RequestKind::LocationSearch).unwrap();
    assert_eq!(slot.status, RequestStatus::Error);
    assert!(!slot.in_flight);
    assert!(slot.error.is_some());
}

#[tokio::test]
async fn test_superseded_search_is_discarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("name", "Lisbon"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "results": [candidate("Lisbon", "Lisbon", "Portugal", "PT", 38.72, -9.13, 517_802)]
                }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("name", "Porto"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [candidate("Porto", "Porto", "Portugal", "PT", 41.15, -8.61, 249_633)]
        })))
        .mount(&mock_server)
        .await;

    let (geocoder, coordinator) = geocoder(&mock_server);
    let (lisbon, porto) = tokio::join!(
        geocoder.search_city("Lisbon", SearchOptions::default()),
        geocoder.search_city("Porto", SearchOptions::default()),
    );

    assert!(lisbon.is_empty());
    assert_eq!(porto.len(), 1);
    assert_eq!(porto[0].name, "Porto");
    // Only the live search was cached
    assert_eq!(geocoder.cache().len(), 1);

    let slot = coordinator.slot(RequestKind::LocationSearch).unwrap();
    assert_eq!(slot.seq, 2);
    assert_eq!(slot.status, RequestStatus::Success);
}

#[tokio::test]
async fn test_reverse_geocode() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "address": {
                "town": "Urupema",
                "state": "Santa Catarina",
                "country": "Brasil",
                "country_code": "br"
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (geocoder, _) = geocoder(&mock_server);
    let place = geocoder
        .reverse_geocode(-27.95, -49.87)
        .await
        .into_current()
        .flatten()
        .unwrap();

    assert_eq!(place.name, "Urupema");
    assert_eq!(place.region.as_deref(), Some("Santa Catarina"));
    assert_eq!(place.country, "BR");
    assert_eq!(place.lat, -27.95);
}

#[tokio::test]
async fn test_reverse_geocode_failure_is_current_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let (geocoder, _) = geocoder(&mock_server);
    assert_eq!(geocoder.reverse_geocode(0.0, 0.0).await, Fetched::Current(None));
}
