//! Composition root: one coordinator, one HTTP client, all the services.

use std::sync::Arc;

use chrono::Local;
use skycast_core::{Config, NetworkError, RequestCoordinator, RequestKind};

use crate::geocode::Geocoder;
use crate::http::{Fetched, HttpContext};
use crate::location::{LocationManager, SetLocationOptions};
use crate::normalize::{NormalizedAirPayload, NormalizedClimatePayload, NormalizedWeatherPayload};
use crate::provider::WeatherProvider;
use crate::store::KeyValueStore;
use crate::types::Place;

/// Everything needed to render one place.
#[derive(Debug, Clone, Default)]
pub struct WeatherReport {
    pub weather: NormalizedWeatherPayload,
    pub air: NormalizedAirPayload,
}

pub struct WeatherServices {
    coordinator: Arc<RequestCoordinator>,
    provider: WeatherProvider,
    locations: LocationManager,
}

impl WeatherServices {
    pub fn from_config(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<Self, NetworkError> {
        let coordinator = Arc::new(RequestCoordinator::new());
        let http = HttpContext::new(&config.network, coordinator)?;
        Ok(Self::with_http(http, config, store))
    }

    /// Build on an existing transport (custom client or retry policy).
    pub fn with_http(http: HttpContext, config: &Config, store: Arc<dyn KeyValueStore>) -> Self {
        let coordinator = http.coordinator().clone();
        let geocoder = Arc::new(Geocoder::new(
            http.clone(),
            &config.endpoints,
            config.search.clone(),
        ));
        let provider = WeatherProvider::new(http, config.endpoints.clone(), config.weather.clone());
        let locations =
            LocationManager::new(store, geocoder, Place::from(&config.default_location));

        Self {
            coordinator,
            provider,
            locations,
        }
    }

    pub fn coordinator(&self) -> &Arc<RequestCoordinator> {
        &self.coordinator
    }

    pub fn provider(&self) -> &WeatherProvider {
        &self.provider
    }

    pub fn locations(&self) -> &LocationManager {
        &self.locations
    }

    /// Forecast and air quality for the current place, fetched together.
    ///
    /// `Stale` when either request was superseded before it finished.
    pub async fn refresh_current(&self) -> Fetched<WeatherReport> {
        let place = self.locations.current();
        let (weather, air) = tokio::join!(
            self.provider.fetch_weather(&place),
            self.provider.fetch_air_quality(&place)
        );
        match (weather, air) {
            (Fetched::Current(weather), Fetched::Current(air)) => {
                Fetched::Current(WeatherReport { weather, air })
            }
            _ => Fetched::Stale,
        }
    }

    pub async fn climate_for_current(&self) -> Fetched<NormalizedClimatePayload> {
        let place = self.locations.current();
        self.provider
            .fetch_climate(&place, Local::now().date_naive())
            .await
    }

    /// Locate the caller by IP and make that the current place.
    ///
    /// `Current(None)` leaves the current place untouched.
    pub async fn detect_location(&self) -> Fetched<Option<Place>> {
        match self.provider.locate_by_ip().await {
            Fetched::Current(Some(found)) => {
                let place = self.locations.set_location(
                    found.lat,
                    found.lon,
                    &found.name,
                    &found.country,
                    SetLocationOptions {
                        region: found.region.clone(),
                    },
                );
                Fetched::Current(Some(place))
            }
            other => other,
        }
    }

    /// Abort every in-flight fetch, e.g. on shutdown.
    pub fn cancel_all(&self, reason: &str) {
        for kind in RequestKind::ALL {
            if self.coordinator.slot(kind).is_some_and(|slot| slot.in_flight) {
                self.coordinator.cancel_request(kind, reason);
            }
        }
    }
}
