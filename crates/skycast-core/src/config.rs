use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory (also holds saved locations)
    pub config_dir: PathBuf,

    /// Upstream service base URLs
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// City search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Weather settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// HTTP retry/timeout settings
    #[serde(default)]
    pub network: NetworkConfig,

    /// Place used when nothing has been saved yet
    #[serde(default)]
    pub default_location: DefaultLocationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub forecast_url: String,
    pub air_quality_url: String,
    pub archive_url: String,
    pub geocoding_url: String,
    pub reverse_geocoding_url: String,
    pub ip_location_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            forecast_url: "https://api.open-meteo.com".to_string(),
            air_quality_url: "https://air-quality-api.open-meteo.com".to_string(),
            archive_url: "https://archive-api.open-meteo.com".to_string(),
            geocoding_url: "https://geocoding-api.open-meteo.com".to_string(),
            reverse_geocoding_url: "https://nominatim.openstreetmap.org".to_string(),
            ip_location_url: "https://ipapi.co".to_string(),
        }
    }
}

impl EndpointConfig {
    /// Point every endpoint at one base URL (mock servers, local proxies).
    pub fn all(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        Self {
            forecast_url: base.clone(),
            air_quality_url: base.clone(),
            archive_url: base.clone(),
            geocoding_url: base.clone(),
            reverse_geocoding_url: base.clone(),
            ip_location_url: base,
        }
    }

    fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("endpoints.forecast_url", &self.forecast_url),
            ("endpoints.air_quality_url", &self.air_quality_url),
            ("endpoints.archive_url", &self.archive_url),
            ("endpoints.geocoding_url", &self.geocoding_url),
            ("endpoints.reverse_geocoding_url", &self.reverse_geocoding_url),
            ("endpoints.ip_location_url", &self.ip_location_url),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Queries shorter than this never reach the network
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,

    /// Number of candidates requested when the caller doesn't say
    #[serde(default = "default_result_count")]
    pub default_count: usize,

    /// Language for upstream place names
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_min_query_chars() -> usize {
    3
}

fn default_result_count() -> usize {
    5
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_chars: default_min_query_chars(),
            default_count: default_result_count(),
            language: default_language(),
        }
    }
}

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Value of the upstream `temperature_unit` query parameter.
    pub fn as_query(self) -> &'static str {
        match self {
            Self::Celsius => "celsius",
            Self::Fahrenheit => "fahrenheit",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub temperature_unit: TemperatureUnit,

    /// Refresh interval in minutes
    pub refresh_minutes: u32,

    /// Days of daily forecast to request
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,

    /// Years of hourly history used for climate comparisons
    #[serde(default = "default_climate_years")]
    pub climate_years: u32,
}

fn default_forecast_days() -> u32 {
    7
}

fn default_climate_years() -> u32 {
    6
}

impl WeatherConfig {
    /// Period between automatic refreshes; `None` when disabled (0 minutes).
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_minutes > 0)
            .then(|| Duration::from_secs(u64::from(self.refresh_minutes) * 60))
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            temperature_unit: TemperatureUnit::Celsius,
            refresh_minutes: 15,
            forecast_days: default_forecast_days(),
            climate_years: default_climate_years(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_retries: 2,
            initial_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultLocationConfig {
    pub name: String,
    pub country: String,
    pub region: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for DefaultLocationConfig {
    fn default() -> Self {
        Self {
            name: "São Paulo".to_string(),
            country: "BR".to_string(),
            region: Some("São Paulo".to_string()),
            latitude: -23.5475,
            longitude: -46.63611,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skycast");

        Self {
            config_dir,
            endpoints: EndpointConfig::default(),
            search: SearchConfig::default(),
            weather: WeatherConfig::default(),
            network: NetworkConfig::default(),
            default_location: DefaultLocationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        Ok(Self::from_toml_str(&contents)?)
    }

    /// Parse a config file body; missing sections take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors; warnings
    /// are logged and returned alongside the config.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        for (field, url) in self.endpoints.fields() {
            self.validate_url(url, field, &mut result);
        }

        if self.search.min_query_chars == 0 {
            result.add_warning(
                "search.min_query_chars",
                "Every keystroke will hit the geocoding service",
            );
        }
        if self.search.default_count == 0 {
            result.add_error("search.default_count", "Result count must be greater than 0");
        } else if self.search.default_count > 100 {
            result.add_error(
                "search.default_count",
                "Geocoding service returns at most 100 results",
            );
        }

        if self.weather.refresh_minutes == 0 {
            result.add_warning(
                "weather.refresh_minutes",
                "Weather refresh disabled (0 minutes)",
            );
        } else if self.weather.refresh_minutes > 1440 {
            result.add_warning(
                "weather.refresh_minutes",
                "Weather refresh interval is more than 24 hours",
            );
        }

        if !(1..=16).contains(&self.weather.forecast_days) {
            result.add_error("weather.forecast_days", "Forecast days must be within 1..=16");
        }
        if self.weather.climate_years == 0 {
            result.add_error("weather.climate_years", "Climate history needs at least one year");
        }

        if self.network.timeout_secs == 0 {
            result.add_error("network.timeout_secs", "Timeout must be greater than 0");
        }
        if self.network.initial_delay_ms > self.network.max_delay_ms {
            result.add_warning(
                "network.initial_delay_ms",
                "Initial retry delay exceeds the maximum delay",
            );
        }

        let home = &self.default_location;
        if home.name.trim().is_empty() {
            result.add_error("default_location.name", "Default location needs a name");
        }
        if !(-90.0..=90.0).contains(&home.latitude) {
            result.add_error("default_location.latitude", "Latitude must be within -90..=90");
        }
        if !(-180.0..=180.0).contains(&home.longitude) {
            result.add_error(
                "default_location.longitude",
                "Longitude must be within -180..=180",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Directory where saved locations live
    pub fn state_dir(&self) -> PathBuf {
        self.config_dir.join("state")
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}
