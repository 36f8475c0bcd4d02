//! Forecast, air-quality, climate-archive and IP-locate sources.

use chrono::{Months, NaiveDate};
use serde::Deserialize;
use serde_json::{json, Value};
use skycast_core::{EndpointConfig, RequestKind, WeatherConfig};
use tracing::instrument;

use crate::http::{endpoint, Fetched, HttpContext};
use crate::normalize::{
    normalize_air_payload, normalize_climate_payload, normalize_weather_payload,
    NormalizedAirPayload, NormalizedClimatePayload, NormalizedWeatherPayload,
};
use crate::types::Place;

const CURRENT_METRICS: &str = "temperature_2m,apparent_temperature,relative_humidity_2m,\
precipitation,weather_code,wind_speed_10m,is_day";
const HOURLY_METRICS: &str =
    "temperature_2m,apparent_temperature,precipitation_probability,precipitation,weather_code,wind_speed_10m";
const DAILY_METRICS: &str = "weather_code,temperature_2m_max,temperature_2m_min,\
precipitation_probability_max,precipitation_sum,sunrise,sunset";
const CLIMATE_METRICS: &str = "temperature_2m,precipitation,relative_humidity_2m,wind_speed_10m";
const AIR_METRICS: &str = "us_aqi,pm2_5";

/// `years` of history ending today. Feb 29 clamps to Feb 28.
pub fn climate_date_range(today: NaiveDate, years: u32) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MIN);
    (start, today)
}

#[derive(Debug, Deserialize)]
struct IpLocation {
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    region: Option<String>,
    country_code: Option<String>,
    country_name: Option<String>,
}

impl IpLocation {
    fn into_place(self) -> Option<Place> {
        let (lat, lon) = (self.latitude?, self.longitude?);
        let country = self
            .country_code
            .map(|code| code.to_ascii_uppercase())
            .or(self.country_name)
            .unwrap_or_default();
        let name = self
            .city
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| format!("{lat:.4}, {lon:.4}"));
        let place = Place::new(lat, lon, name, country);
        Some(match self.region {
            Some(region) => place.with_region(region),
            None => place,
        })
    }
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    http: HttpContext,
    endpoints: EndpointConfig,
    settings: WeatherConfig,
}

impl WeatherProvider {
    pub fn new(http: HttpContext, endpoints: EndpointConfig, settings: WeatherConfig) -> Self {
        Self {
            http,
            endpoints,
            settings,
        }
    }

    fn coordinates(place: &Place) -> [(&'static str, String); 2] {
        [
            ("latitude", place.lat.to_string()),
            ("longitude", place.lon.to_string()),
        ]
    }

    /// Current conditions plus hourly and daily forecast.
    ///
    /// Upstream failure yields an empty payload, never an error.
    #[instrument(skip(self), fields(place = %place.name), level = "info")]
    pub async fn fetch_weather(&self, place: &Place) -> Fetched<NormalizedWeatherPayload> {
        let mut query = Self::coordinates(place).to_vec();
        query.extend([
            ("current", CURRENT_METRICS.to_string()),
            ("hourly", HOURLY_METRICS.to_string()),
            ("daily", DAILY_METRICS.to_string()),
            ("timezone", "auto".to_string()),
            ("forecast_days", self.settings.forecast_days.to_string()),
            (
                "temperature_unit",
                self.settings.temperature_unit.as_query().to_string(),
            ),
        ]);

        self.get(RequestKind::Weather, &self.endpoints.forecast_url, "v1/forecast", &query, place)
            .await
            .map(|body| normalize_weather_payload(&body))
    }

    #[instrument(skip(self), fields(place = %place.name), level = "info")]
    pub async fn fetch_air_quality(&self, place: &Place) -> Fetched<NormalizedAirPayload> {
        let mut query = Self::coordinates(place).to_vec();
        query.push(("current", AIR_METRICS.to_string()));

        self.get(
            RequestKind::AirQuality,
            &self.endpoints.air_quality_url,
            "v1/air-quality",
            &query,
            place,
        )
        .await
        .map(|body| normalize_air_payload(&body))
    }

    /// Hourly history over [`climate_date_range`] ending `today`.
    #[instrument(skip(self), fields(place = %place.name), level = "info")]
    pub async fn fetch_climate(
        &self,
        place: &Place,
        today: NaiveDate,
    ) -> Fetched<NormalizedClimatePayload> {
        let (start, end) = climate_date_range(today, self.settings.climate_years);
        let mut query = Self::coordinates(place).to_vec();
        query.extend([
            ("start_date", start.format("%Y-%m-%d").to_string()),
            ("end_date", end.format("%Y-%m-%d").to_string()),
            ("hourly", CLIMATE_METRICS.to_string()),
            ("timezone", "auto".to_string()),
            (
                "temperature_unit",
                self.settings.temperature_unit.as_query().to_string(),
            ),
        ]);

        self.get(RequestKind::Climate, &self.endpoints.archive_url, "v1/archive", &query, place)
            .await
            .map(|body| normalize_climate_payload(&body))
    }

    /// Approximate place of the caller's network origin.
    #[instrument(skip(self), level = "info")]
    pub async fn locate_by_ip(&self) -> Fetched<Option<Place>> {
        let Some(url) = endpoint(&self.endpoints.ip_location_url, "json/", &[]) else {
            return Fetched::Current(None);
        };

        self.http
            .get_json(RequestKind::IpLocation, url, None)
            .await
            .map(|body| {
                let place = body
                    .and_then(|b| serde_json::from_value::<IpLocation>(b).ok())
                    .and_then(IpLocation::into_place);
                match &place {
                    Some(p) => tracing::info!("IP location: {}", p.label()),
                    None => tracing::warn!("IP location unavailable"),
                }
                place
            })
    }

    async fn get(
        &self,
        kind: RequestKind,
        base: &str,
        path: &str,
        query: &[(&str, String)],
        place: &Place,
    ) -> Fetched<Value> {
        let Some(url) = endpoint(base, path, query) else {
            return Fetched::Current(Value::Null);
        };
        let meta = json!({ "name": place.name, "lat": place.lat, "lon": place.lon });

        self.http
            .get_json(kind, url, Some(meta))
            .await
            .map(|body| body.unwrap_or(Value::Null))
    }
}
