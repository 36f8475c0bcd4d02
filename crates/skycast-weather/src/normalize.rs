//! Reshaping raw forecast, climate and air-quality JSON into fixed schemas.
//!
//! All functions are total: malformed input yields empty structures, never
//! an error. Inside one time-series block every column has the same length;
//! short columns are padded with `null` so `time[i]` and `metric[i]` stay
//! aligned.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::WeatherCondition;

/// Used when upstream omits the timezone.
pub const DEFAULT_TIMEZONE: &str = "GMT";

/// Parallel arrays keyed by metric name, all of one length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SeriesBlock {
    columns: BTreeMap<String, Vec<Value>>,
}

impl SeriesBlock {
    /// Align every column of a raw block to the longest one.
    ///
    /// Non-array values become empty columns (then padded) rather than
    /// disappearing, so consumers can rely on the key set.
    pub fn from_raw(raw: Option<&Value>) -> Self {
        let Some(Value::Object(map)) = raw else {
            return Self::default();
        };

        let mut columns: BTreeMap<String, Vec<Value>> = map
            .iter()
            .map(|(key, value)| {
                let column = match value {
                    Value::Array(items) => items.clone(),
                    _ => Vec::new(),
                };
                (key.clone(), column)
            })
            .collect();

        let max_len = columns.values().map(Vec::len).max().unwrap_or(0);
        for column in columns.values_mut() {
            column.resize(max_len, Value::Null);
        }

        Self { columns }
    }

    /// Shared length of every column.
    pub fn len(&self) -> usize {
        self.columns.values().next().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// The `time` index column.
    pub fn time(&self) -> Option<&[Value]> {
        self.column("time")
    }

    pub fn f64_at(&self, name: &str, index: usize) -> Option<f64> {
        self.columns.get(name)?.get(index)?.as_f64()
    }

    pub fn str_at(&self, name: &str, index: usize) -> Option<&str> {
        self.columns.get(name)?.get(index)?.as_str()
    }
}

/// Forecast or climate-archive response in internal form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedWeatherPayload {
    pub timezone: String,
    pub elevation: f64,
    pub current: Map<String, Value>,
    pub current_units: BTreeMap<String, String>,
    pub hourly: SeriesBlock,
    pub hourly_units: BTreeMap<String, String>,
    pub daily: SeriesBlock,
    pub daily_units: BTreeMap<String, String>,
}

/// Climate archive responses share the forecast layout.
pub type NormalizedClimatePayload = NormalizedWeatherPayload;

impl Default for NormalizedWeatherPayload {
    fn default() -> Self {
        normalize_weather_payload(&Value::Null)
    }
}

impl NormalizedWeatherPayload {
    pub fn current_f64(&self, name: &str) -> Option<f64> {
        self.current.get(name)?.as_f64()
    }

    pub fn current_condition(&self) -> Option<WeatherCondition> {
        self.current
            .get("weather_code")
            .or_else(|| self.current.get("weathercode"))?
            .as_i64()
            .map(WeatherCondition::from_wmo_code)
    }
}

fn units(raw: Option<&Value>) -> BTreeMap<String, String> {
    let Some(Value::Object(map)) = raw else {
        return BTreeMap::new();
    };
    map.iter()
        .filter_map(|(key, value)| value.as_str().map(|unit| (key.clone(), unit.to_string())))
        .collect()
}

fn series_payload(raw: &Value) -> NormalizedWeatherPayload {
    let timezone = raw
        .get("timezone")
        .and_then(Value::as_str)
        .filter(|tz| !tz.trim().is_empty())
        .unwrap_or(DEFAULT_TIMEZONE)
        .to_string();

    let current = raw
        .get("current")
        .or_else(|| raw.get("current_weather"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    NormalizedWeatherPayload {
        timezone,
        elevation: raw.get("elevation").and_then(Value::as_f64).unwrap_or(0.0),
        current,
        current_units: units(raw.get("current_units")),
        hourly: SeriesBlock::from_raw(raw.get("hourly")),
        hourly_units: units(raw.get("hourly_units")),
        daily: SeriesBlock::from_raw(raw.get("daily")),
        daily_units: units(raw.get("daily_units")),
    }
}

pub fn normalize_weather_payload(raw: &Value) -> NormalizedWeatherPayload {
    series_payload(raw)
}

pub fn normalize_climate_payload(raw: &Value) -> NormalizedClimatePayload {
    series_payload(raw)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AirQuality {
    pub us_aqi: Option<f64>,
    pub pm2_5: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NormalizedAirPayload {
    pub current: AirQuality,
}

/// Accepts `{current: {us_aqi, pm2_5}}` or the flat `{us_aqi, pm2_5}`.
pub fn normalize_air_payload(raw: &Value) -> NormalizedAirPayload {
    let nested = raw.get("current").filter(|c| c.is_object());
    let metric = |name: &str| {
        nested
            .and_then(|c| c.get(name))
            .and_then(Value::as_f64)
            .or_else(|| raw.get(name).and_then(Value::as_f64))
    };

    NormalizedAirPayload {
        current: AirQuality {
            us_aqi: metric("us_aqi"),
            pm2_5: metric("pm2_5"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ragged_hourly_columns_are_padded_with_null() {
        let raw = json!({
            "timezone": "America/Sao_Paulo",
            "hourly": {
                "time": ["2026-01-01T00:00"],
                "temperature_2m": [21.5, 21.0],
                "precipitation": [0.0, 0.1, 0.4]
            }
        });

        let payload = normalize_weather_payload(&raw);
        assert_eq!(payload.hourly.len(), 3);
        for key in ["time", "temperature_2m", "precipitation"] {
            assert_eq!(payload.hourly.column(key).unwrap().len(), 3, "{key}");
        }
        assert_eq!(payload.hourly.time().unwrap()[0], json!("2026-01-01T00:00"));
        assert_eq!(payload.hourly.time().unwrap()[1], Value::Null);
        assert_eq!(payload.hourly.time().unwrap()[2], Value::Null);
        assert_eq!(payload.hourly.f64_at("temperature_2m", 1), Some(21.0));
        assert_eq!(payload.hourly.column("temperature_2m").unwrap()[2], Value::Null);
        assert_eq!(payload.hourly.f64_at("precipitation", 2), Some(0.4));
    }

    #[test]
    fn daily_block_is_aligned_independently() {
        let raw = json!({
            "hourly": { "time": ["a", "b", "c", "d"] },
            "daily": {
                "time": ["2026-01-01", "2026-01-02"],
                "temperature_2m_max": [30.1]
            }
        });

        let payload = normalize_weather_payload(&raw);
        assert_eq!(payload.hourly.len(), 4);
        assert_eq!(payload.daily.len(), 2);
        assert_eq!(payload.daily.column("temperature_2m_max").unwrap()[1], Value::Null);
    }

    #[test]
    fn existing_nulls_are_kept_in_place() {
        let raw = json!({
            "hourly": {
                "time": ["a", "b", "c"],
                "temperature_2m": [null, 20.0, null]
            }
        });
        let payload = normalize_weather_payload(&raw);
        assert_eq!(
            payload.hourly.column("temperature_2m").unwrap(),
            &[Value::Null, json!(20.0), Value::Null]
        );
    }

    #[test]
    fn non_array_column_is_kept_as_nulls() {
        let raw = json!({
            "hourly": {
                "time": ["a", "b"],
                "uv_index": "unavailable"
            }
        });
        let payload = normalize_weather_payload(&raw);
        assert_eq!(
            payload.hourly.column("uv_index").unwrap(),
            &[Value::Null, Value::Null]
        );
    }

    #[test]
    fn missing_fields_default() {
        let payload = normalize_weather_payload(&json!({}));
        assert_eq!(payload.timezone, DEFAULT_TIMEZONE);
        assert_eq!(payload.elevation, 0.0);
        assert!(payload.current.is_empty());
        assert!(payload.hourly.is_empty());
        assert!(payload.daily.is_empty());
        assert!(payload.hourly_units.is_empty());
    }

    #[test]
    fn non_object_input_defaults() {
        for raw in [Value::Null, json!([1, 2, 3]), json!("oops"), json!(42)] {
            let payload = normalize_weather_payload(&raw);
            assert_eq!(payload, NormalizedWeatherPayload::default());
        }
    }

    #[test]
    fn current_and_units_are_carried() {
        let raw = json!({
            "elevation": 760.0,
            "current": { "temperature_2m": 24.3, "weather_code": 61 },
            "current_units": { "temperature_2m": "°C", "weather_code": "wmo code" },
            "hourly_units": { "temperature_2m": "°C", "bogus": 3 }
        });
        let payload = normalize_weather_payload(&raw);
        assert_eq!(payload.elevation, 760.0);
        assert_eq!(payload.current_f64("temperature_2m"), Some(24.3));
        assert_eq!(payload.current_condition(), Some(WeatherCondition::Rain));
        assert_eq!(payload.current_units["temperature_2m"], "°C");
        assert_eq!(payload.hourly_units.len(), 1);
    }

    #[test]
    fn climate_payload_aligns_hourly_history() {
        let raw = json!({
            "timezone": "",
            "hourly": {
                "time": ["2020-01-01T00:00", "2020-01-01T01:00"],
                "temperature_2m": [18.2]
            }
        });
        let payload = normalize_climate_payload(&raw);
        assert_eq!(payload.timezone, DEFAULT_TIMEZONE);
        assert_eq!(payload.hourly.len(), 2);
        assert_eq!(payload.hourly.f64_at("temperature_2m", 1), None);
    }

    #[test]
    fn air_payload_nested_shape() {
        let payload = normalize_air_payload(&json!({ "current": { "us_aqi": 42, "pm2_5": 11.3 } }));
        assert_eq!(payload.current.us_aqi, Some(42.0));
        assert_eq!(payload.current.pm2_5, Some(11.3));
    }

    #[test]
    fn air_payload_flat_shape() {
        let payload = normalize_air_payload(&json!({ "us_aqi": 55, "pm2_5": 16.1 }));
        assert_eq!(payload.current.us_aqi, Some(55.0));
        assert_eq!(payload.current.pm2_5, Some(16.1));
    }

    #[test]
    fn air_payload_serializes_nested() {
        let payload = normalize_air_payload(&json!({ "us_aqi": 55 }));
        assert_eq!(
            serde_json::to_value(payload).unwrap(),
            json!({ "current": { "us_aqi": 55.0, "pm2_5": null } })
        );
    }

    #[test]
    fn air_payload_malformed_is_empty() {
        assert_eq!(normalize_air_payload(&Value::Null), NormalizedAirPayload::default());
        assert_eq!(
            normalize_air_payload(&json!({ "current": "n/a", "us_aqi": "high" })),
            NormalizedAirPayload::default()
        );
    }
}
