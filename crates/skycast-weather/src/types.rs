use serde::{Deserialize, Serialize};

/// A place the user can pick. Identity is semantic, see [`crate::identity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    /// ISO code or full country name; both forms occur in saved state.
    #[serde(default)]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl Place {
    pub fn new(lat: f64, lon: f64, name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            lat,
            lon,
            name: name.into(),
            country: country.into(),
            region: None,
            is_default: false,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        let region = region.into();
        self.region = (!region.trim().is_empty()).then_some(region);
        self
    }

    /// "Urupema, Santa Catarina, BR"
    pub fn label(&self) -> String {
        let mut parts = vec![self.name.as_str()];
        if let Some(region) = self.region.as_deref().filter(|r| *r != self.name) {
            parts.push(region);
        }
        if !self.country.is_empty() {
            parts.push(&self.country);
        }
        parts.join(", ")
    }

    /// Both coordinates are usable numbers.
    pub fn has_coordinates(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Raw record from the geocoding search service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeocodingCandidate {
    #[serde(default)]
    pub name: String,
    /// First-level administrative region (state, province)
    #[serde(default)]
    pub admin1: Option<String>,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub population: Option<u64>,
}

/// Candidate after dedupe, ranking and renaming; what the search UI lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPlaceResult {
    pub name: String,
    pub country_code: String,
    pub country: String,
    pub admin1: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub population: Option<u64>,
}

impl From<GeocodingCandidate> for RankedPlaceResult {
    fn from(c: GeocodingCandidate) -> Self {
        Self {
            name: c.name,
            country_code: c.country_code.to_ascii_uppercase(),
            country: c.country,
            admin1: c.admin1.filter(|r| !r.trim().is_empty()),
            lat: c.latitude,
            lon: c.longitude,
            population: c.population,
        }
    }
}

impl RankedPlaceResult {
    /// Turn a picked result into a place; the code is preferred as country.
    pub fn to_place(&self) -> Place {
        let country = if self.country_code.is_empty() {
            self.country.clone()
        } else {
            self.country_code.clone()
        };
        let place = Place::new(self.lat, self.lon, self.name.clone(), country);
        match &self.admin1 {
            Some(region) => place.with_region(region.clone()),
            None => place,
        }
    }
}

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i64) -> Self {
        match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 | 66 | 67 => Self::Sleet, // Freezing drizzle/rain
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Clear,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}
