//! Current, recent and favorite places.
//!
//! `LocationManager` is the only owner of [`LocationState`]. Every mutation
//! is persisted through the [`KeyValueStore`] and a change of the current
//! place is pushed to the single subscriber.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use skycast_core::DefaultLocationConfig;
use tokio::sync::mpsc;

use crate::fold::fold_key;
use crate::geocode::{Geocoder, SearchOptions};
use crate::identity::{is_near, is_same_location};
use crate::store::KeyValueStore;
use crate::types::{Place, RankedPlaceResult};

pub const CURRENT_KEY: &str = "current_location";
pub const RECENTS_KEY: &str = "recent_locations";
pub const FAVORITES_KEY: &str = "favorite_locations";
pub const MAX_RECENTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationState {
    pub current: Place,
    /// Most recent first, at most [`MAX_RECENTS`], no two the same place.
    pub recents: Vec<Place>,
    /// No two the same place.
    pub favorites: Vec<Place>,
}

#[derive(Debug, Clone, Default)]
pub struct SetLocationOptions {
    /// Administrative region supplied with the pick (e.g. from a search
    /// result). It decides which stored homonym is the canonical record.
    pub region: Option<String>,
}

impl From<&DefaultLocationConfig> for Place {
    fn from(config: &DefaultLocationConfig) -> Self {
        let place = Place::new(
            config.latitude,
            config.longitude,
            config.name.clone(),
            config.country.clone(),
        );
        let mut place = match &config.region {
            Some(region) => place.with_region(region.clone()),
            None => place,
        };
        place.is_default = true;
        place
    }
}

/// Drop later entries that are the same place as an earlier one.
fn dedupe_places(places: Vec<Place>) -> Vec<Place> {
    let mut kept: Vec<Place> = Vec::with_capacity(places.len());
    for place in places {
        if !kept.iter().any(|k| is_same_location(k, &place)) {
            kept.push(place);
        }
    }
    kept
}

/// Put `place` at the front, removing every entry that is the same place.
pub fn insert_recent(recents: &mut Vec<Place>, place: Place) {
    recents.retain(|p| !is_same_location(p, &place));
    recents.insert(0, place);
    recents.truncate(MAX_RECENTS);
}

/// Decide which record a freshly picked place should be stored as.
///
/// A matching recent wins (its coordinates and region are the stable ones);
/// when the pick carries a region, only a recent in that region counts as a
/// match. Anything within the proximity box of the default place becomes
/// the default place itself.
pub fn resolve_canonical(
    candidate: &Place,
    recents: &[Place],
    region_hint: Option<&str>,
    default_place: &Place,
) -> Place {
    let mut same = recents.iter().filter(|p| is_same_location(p, candidate));
    let region_hint = region_hint.map(fold_key).filter(|r| !r.is_empty());

    let stored = match region_hint {
        Some(region) => {
            same.find(|p| p.region.as_deref().map(fold_key).as_deref() == Some(region.as_str()))
        }
        None => same.next(),
    };

    let mut resolved = match stored {
        Some(stored) => {
            let mut snapped = stored.clone();
            if snapped.region.is_none() {
                snapped.region = candidate.region.clone();
            }
            snapped
        }
        None => candidate.clone(),
    };

    if is_near(&resolved, default_place) {
        return default_place.clone();
    }
    resolved.is_default = false;
    resolved
}

pub struct LocationManager {
    store: Arc<dyn KeyValueStore>,
    geocoder: Arc<Geocoder>,
    default_place: Place,
    state: RwLock<LocationState>,
    subscriber: Mutex<Option<mpsc::UnboundedSender<Place>>>,
}

impl LocationManager {
    /// Load saved state, falling back to `default_place` for anything missing.
    pub fn new(store: Arc<dyn KeyValueStore>, geocoder: Arc<Geocoder>, default_place: Place) -> Self {
        let mut default_place = default_place;
        default_place.is_default = true;

        let state = Self::load_state(store.as_ref(), &default_place);
        tracing::info!(
            "Location state loaded: current {}, {} recents, {} favorites",
            state.current.label(),
            state.recents.len(),
            state.favorites.len()
        );

        Self {
            store,
            geocoder,
            default_place,
            state: RwLock::new(state),
            subscriber: Mutex::new(None),
        }
    }

    fn load_value<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
        let value = match store.load(key) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to load {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Ignoring malformed {}: {}", key, e);
                None
            }
        }
    }

    fn load_state(store: &dyn KeyValueStore, default_place: &Place) -> LocationState {
        let current = Self::load_value::<Place>(store, CURRENT_KEY)
            .filter(Place::has_coordinates)
            .map(|place| {
                if is_near(&place, default_place) {
                    default_place.clone()
                } else {
                    place
                }
            })
            .unwrap_or_else(|| default_place.clone());

        let mut recents =
            dedupe_places(Self::load_value::<Vec<Place>>(store, RECENTS_KEY).unwrap_or_default());
        recents.truncate(MAX_RECENTS);
        let favorites =
            dedupe_places(Self::load_value::<Vec<Place>>(store, FAVORITES_KEY).unwrap_or_default());

        LocationState {
            current,
            recents,
            favorites,
        }
    }

    fn persist(&self, state: &LocationState) {
        let entries = [
            (CURRENT_KEY, serde_json::to_value(&state.current)),
            (RECENTS_KEY, serde_json::to_value(&state.recents)),
            (FAVORITES_KEY, serde_json::to_value(&state.favorites)),
        ];
        for (key, value) in entries {
            let result = value
                .map_err(|e| e.to_string())
                .and_then(|v| self.store.save(key, &v).map_err(|e| e.to_string()));
            if let Err(e) = result {
                tracing::warn!("Failed to persist {}: {}", key, e);
            }
        }
    }

    fn notify(&self, place: &Place) {
        let mut subscriber = self.subscriber.lock();
        if let Some(tx) = subscriber.as_ref() {
            if tx.send(place.clone()).is_err() {
                tracing::debug!("Location subscriber dropped");
                *subscriber = None;
            }
        }
    }

    /// Receive every new current place. Replaces any earlier subscriber.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Place> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.subscriber.lock() = Some(tx);
        rx
    }

    pub fn current(&self) -> Place {
        self.state.read().current.clone()
    }

    pub fn recents(&self) -> Vec<Place> {
        self.state.read().recents.clone()
    }

    pub fn favorites(&self) -> Vec<Place> {
        self.state.read().favorites.clone()
    }

    pub fn state(&self) -> LocationState {
        self.state.read().clone()
    }

    pub fn default_place(&self) -> &Place {
        &self.default_place
    }

    pub fn geocoder(&self) -> &Geocoder {
        &self.geocoder
    }

    pub async fn search_city(&self, query: &str, opts: SearchOptions) -> Vec<RankedPlaceResult> {
        self.geocoder.search_city(query, opts).await
    }

    /// Make a place current, record it in recents, persist, notify.
    pub fn set_location(
        &self,
        lat: f64,
        lon: f64,
        name: &str,
        country: &str,
        opts: SetLocationOptions,
    ) -> Place {
        let mut candidate = Place::new(lat, lon, name, country);
        if let Some(region) = &opts.region {
            candidate = candidate.with_region(region.clone());
        }

        let snapshot = {
            let mut state = self.state.write();
            let resolved = resolve_canonical(
                &candidate,
                &state.recents,
                opts.region.as_deref(),
                &self.default_place,
            );
            insert_recent(&mut state.recents, resolved.clone());
            state.current = resolved;
            state.clone()
        };

        tracing::info!("Location set to {}", snapshot.current.label());
        self.persist(&snapshot);
        self.notify(&snapshot.current);
        snapshot.current
    }

    pub fn set_location_from_result(&self, result: &RankedPlaceResult) -> Place {
        let place = result.to_place();
        self.set_location(
            place.lat,
            place.lon,
            &place.name,
            &place.country,
            SetLocationOptions {
                region: place.region,
            },
        )
    }

    /// Add or remove the current place from favorites; returns whether it
    /// is a favorite afterwards.
    pub fn toggle_favorite(&self) -> bool {
        let (snapshot, now_favorite) = {
            let mut state = self.state.write();
            let current = state.current.clone();
            let before = state.favorites.len();
            state.favorites.retain(|p| !is_same_location(p, &current));
            let now_favorite = state.favorites.len() == before;
            if now_favorite {
                state.favorites.push(current);
            }
            (state.clone(), now_favorite)
        };

        tracing::info!(
            "{} {} favorites",
            snapshot.current.label(),
            if now_favorite { "added to" } else { "removed from" }
        );
        self.persist(&snapshot);
        now_favorite
    }

    pub fn is_favorite(&self, place: &Place) -> bool {
        self.state
            .read()
            .favorites
            .iter()
            .any(|p| is_same_location(p, place))
    }
}
