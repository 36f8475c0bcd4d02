//! Weather data layer for Skycast
//!
//! Place search and identity, recent/favorite bookkeeping, and Open-Meteo
//! forecast, air-quality and climate data normalized into fixed shapes.

pub mod cache;
pub mod country;
pub mod fold;
pub mod geocode;
pub mod http;
pub mod identity;
pub mod location;
pub mod normalize;
pub mod provider;
pub mod retry;
pub mod services;
pub mod store;
pub mod types;

pub use types::*;
pub use cache::SearchCache;
pub use geocode::{Geocoder, SearchOptions};
pub use http::{Fetched, HttpContext};
pub use identity::{is_same_location, PROXIMITY_DEGREES};
pub use location::{LocationManager, LocationState, SetLocationOptions};
pub use normalize::{
    normalize_air_payload, normalize_climate_payload, normalize_weather_payload, AirQuality,
    NormalizedAirPayload, NormalizedClimatePayload, NormalizedWeatherPayload, SeriesBlock,
};
pub use provider::{climate_date_range, WeatherProvider};
pub use retry::RetryConfig;
pub use services::{WeatherReport, WeatherServices};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
