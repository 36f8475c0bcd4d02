//! City search and reverse geocoding.
//!
//! Search goes to the Open-Meteo geocoding API and turns its noisy
//! candidate list into a short, deduplicated, population-ordered list.
//! Reverse geocoding uses Nominatim (OpenStreetMap); both are free and need
//! no API key.

use std::cmp::Reverse;
use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Value};
use skycast_core::{EndpointConfig, RequestKind, SearchConfig};
use tracing::instrument;

use crate::cache::SearchCache;
use crate::country::{country_code, parse_country_hint, strip_country_suffix, CountryHint};
use crate::fold::fold_key;
use crate::http::{endpoint, Fetched, HttpContext};
use crate::types::{GeocodingCandidate, Place, RankedPlaceResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    /// Skip the session cache and always ask upstream.
    pub force: bool,
    /// Maximum results; the configured default when `None`.
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state_district: Option<String>,
    state: Option<String>,
    county: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
}

pub struct Geocoder {
    http: HttpContext,
    search_url: String,
    reverse_url: String,
    settings: SearchConfig,
    cache: SearchCache,
}

impl Geocoder {
    pub fn new(http: HttpContext, endpoints: &EndpointConfig, settings: SearchConfig) -> Self {
        Self {
            http,
            search_url: endpoints.geocoding_url.clone(),
            reverse_url: endpoints.reverse_geocoding_url.clone(),
            settings,
            cache: SearchCache::new(),
        }
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    /// Ranked place candidates for free text such as `"santiago chile"`.
    ///
    /// Never fails: short queries, upstream errors and superseded searches
    /// all come back as an empty list.
    #[instrument(skip(self), level = "info")]
    pub async fn search_city(&self, query: &str, opts: SearchOptions) -> Vec<RankedPlaceResult> {
        let query = query.trim();
        if query.chars().count() < self.settings.min_query_chars {
            return Vec::new();
        }

        let count = opts.count.unwrap_or(self.settings.default_count).max(1);
        let hint = parse_country_hint(query, self.settings.min_query_chars);
        let upstream_query = hint.as_ref().map_or(query, |h| h.base_query.as_str());
        if let Some(hint) = &hint {
            tracing::debug!(
                "Country hint {} parsed from '{}', searching '{}'",
                hint.country.code,
                query,
                upstream_query
            );
        }

        let key = SearchCache::key(upstream_query, hint.as_ref().map(|h| h.country.code), count);
        if !opts.force {
            if let Some(hit) = self.cache.get(&key) {
                tracing::debug!("Search cache hit for '{}'", query);
                return hit;
            }
        }

        let Some(url) = endpoint(
            &self.search_url,
            "v1/search",
            &[
                ("name", upstream_query.to_string()),
                ("count", count.to_string()),
                ("language", self.settings.language.clone()),
                ("format", "json".to_string()),
            ],
        ) else {
            return Vec::new();
        };

        let meta = json!({ "query": query, "count": count });
        let body = match self
            .http
            .get_json(RequestKind::LocationSearch, url, Some(meta))
            .await
        {
            Fetched::Current(Some(body)) => body,
            Fetched::Current(None) | Fetched::Stale => return Vec::new(),
        };

        let results = rank_results(parse_candidates(&body), hint.as_ref(), count);
        tracing::info!("Search '{}' returned {} places", query, results.len());
        self.cache.insert(key, results.clone());
        results
    }

    /// Name the place at the given coordinates.
    ///
    /// `Current(None)` when upstream fails or knows no place there.
    #[instrument(skip(self), level = "info")]
    pub async fn reverse_geocode(&self, lat: f64, lon: f64) -> Fetched<Option<Place>> {
        let Some(url) = endpoint(
            &self.reverse_url,
            "reverse",
            &[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("format", "json".to_string()),
                ("addressdetails", "1".to_string()),
                ("zoom", "10".to_string()),
            ],
        ) else {
            return Fetched::Current(None);
        };

        self.http
            .get_json(RequestKind::ReverseGeocode, url, None)
            .await
            .map(|body| {
                let place = body.and_then(|b| place_from_nominatim(&b, lat, lon));
                if let Some(place) = &place {
                    tracing::info!("Reverse geocoded to: {}", place.label());
                }
                place
            })
    }
}

fn place_from_nominatim(body: &Value, lat: f64, lon: f64) -> Option<Place> {
    let response: NominatimResponse = match serde_json::from_value(body.clone()) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!("Reverse geocode parse error: {}", e);
            return None;
        }
    };
    let addr = response.address?;

    // Capture state/country before the place chain consumes them
    let state = addr.state.clone();
    let country = addr
        .country_code
        .map(|code| code.to_ascii_uppercase())
        .or(addr.country.clone())
        .unwrap_or_default();

    let name = addr
        .city
        .or(addr.town)
        .or(addr.village)
        .or(addr.municipality)
        .or(addr.state_district)
        .or(addr.county)
        .or(addr.state)
        .or(addr.country)?;

    let place = Place::new(lat, lon, name.clone(), country);
    Some(match state.filter(|s| !s.is_empty() && *s != name) {
        Some(region) => place.with_region(region),
        None => place,
    })
}

/// Candidates from a search response; malformed entries are skipped.
pub fn parse_candidates(body: &Value) -> Vec<GeocodingCandidate> {
    let Some(results) = body.get("results").and_then(Value::as_array) else {
        return Vec::new();
    };
    results
        .iter()
        .filter_map(|raw| serde_json::from_value::<GeocodingCandidate>(raw.clone()).ok())
        .filter(|c| {
            !c.name.trim().is_empty() && c.latitude.is_finite() && c.longitude.is_finite()
        })
        .collect()
}

/// Keep only hint-matching candidates (and shorten their names unless the
/// country is part of the queried name) when at least one matches;
/// otherwise leave the list untouched.
pub fn apply_country_hint(
    candidates: Vec<GeocodingCandidate>,
    hint: &CountryHint,
) -> Vec<GeocodingCandidate> {
    let matching: Vec<GeocodingCandidate> = candidates
        .iter()
        .filter(|c| hint.matches(&c.country, &c.country_code))
        .cloned()
        .collect();

    if matching.is_empty() {
        tracing::debug!(
            "No candidates in {}, keeping unfiltered results",
            hint.country.code
        );
        return candidates;
    }

    matching
        .into_iter()
        .map(|mut c| {
            if hint.name_embedded {
                return c;
            }
            if let Some(short) = strip_country_suffix(&c.name, hint.country) {
                c.name = short;
            }
            c
        })
        .collect()
}

fn identity_key(c: &GeocodingCandidate) -> (String, String, String) {
    let country = if !c.country_code.trim().is_empty() {
        c.country_code.trim().to_ascii_uppercase()
    } else {
        country_code(&c.country).unwrap_or_else(|| fold_key(&c.country))
    };
    (
        fold_key(&c.name),
        c.admin1.as_deref().map(fold_key).unwrap_or_default(),
        country,
    )
}

/// Collapse upstream duplicates sharing name, region and country.
///
/// Coordinates are ignored (duplicates drift); the most populous entry
/// survives in the slot of the first occurrence.
pub fn dedupe_candidates(candidates: Vec<GeocodingCandidate>) -> Vec<GeocodingCandidate> {
    let mut slots: HashMap<(String, String, String), usize> = HashMap::new();
    let mut kept: Vec<GeocodingCandidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match slots.get(&identity_key(&candidate)) {
            Some(&index) => {
                if candidate.population > kept[index].population {
                    kept[index] = candidate;
                }
            }
            None => {
                slots.insert(identity_key(&candidate), kept.len());
                kept.push(candidate);
            }
        }
    }

    kept
}

/// Most populous first; unknown population last; ties keep upstream order.
pub fn rank_candidates(mut candidates: Vec<GeocodingCandidate>) -> Vec<GeocodingCandidate> {
    candidates.sort_by_key(|c| Reverse(c.population));
    candidates
}

/// Hint filter → dedupe → rank → truncate.
pub fn rank_results(
    candidates: Vec<GeocodingCandidate>,
    hint: Option<&CountryHint>,
    count: usize,
) -> Vec<RankedPlaceResult> {
    let candidates = match hint {
        Some(hint) => apply_country_hint(candidates, hint),
        None => candidates,
    };

    rank_candidates(dedupe_candidates(candidates))
        .into_iter()
        .take(count)
        .map(RankedPlaceResult::from)
        .collect()
}
