//! In-memory model for tests and offline use.
//!
//! Persisting or deleting a feature queues the [`FeatureEvent`] a real
//! backend would broadcast; drain it with [`MemoryModel::take_events`] and
//! feed it to the controller as a push event.

use super::{BoxFuture, Geolocation, Model, ModelError, ModelResult};
use crate::geo::{Area, Feature, FeatureCollection, FeatureId, GeoFeature, Geometry, Properties};
use crate::push::FeatureEvent;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Grid cells per side generated for an area.
pub const DEFAULT_GRID_DIVISIONS: usize = 4;

#[derive(Default)]
struct State {
    authenticated: bool,
    bbox: Option<Area>,
    place: Option<String>,
    drafts: HashMap<FeatureId, Feature>,
    features: BTreeMap<FeatureId, Feature>,
    outbox: Vec<FeatureEvent>,
    map_saves: usize,
    offline: bool,
    geocoder: HashMap<String, Vec<Geolocation>>,
}

/// In-memory [`Model`] implementation.
pub struct MemoryModel {
    id: String,
    grid_divisions: usize,
    state: RwLock<State>,
}

impl MemoryModel {
    /// Create an empty, unauthenticated model.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            grid_divisions: DEFAULT_GRID_DIVISIONS,
            state: RwLock::new(State::default()),
        }
    }

    pub fn with_grid_divisions(mut self, divisions: usize) -> Self {
        self.grid_divisions = divisions.max(1);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.write().authenticated = authenticated;
    }

    pub fn set_place(&self, place: impl Into<String>) {
        self.write().place = Some(place.into());
    }

    /// Register geocoding results for a place name.
    pub fn add_geolocations(&self, place: impl Into<String>, hits: Vec<Geolocation>) {
        self.write().geocoder.insert(place.into(), hits);
    }

    /// Make every async call fail with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.write().offline = offline;
    }

    /// Store a persisted feature directly, without broadcasting.
    pub fn seed_feature(&self, geojson: GeoFeature) -> Feature {
        let map_id = self.id.clone();
        self.seed_owned_feature(map_id, geojson)
    }

    /// Like [`seed_feature`](Self::seed_feature), for a feature owned by
    /// another map.
    pub fn seed_owned_feature(&self, map_id: impl Into<String>, geojson: GeoFeature) -> Feature {
        let id = geojson
            .id()
            .unwrap_or_else(|| FeatureId::new(Uuid::new_v4().to_string()));
        let feature = Feature::new(id.clone(), map_id, geojson);
        self.write().features.insert(id, feature.clone());
        feature
    }

    /// Drain the events a backend would have broadcast.
    pub fn take_events(&self) -> Vec<FeatureEvent> {
        std::mem::take(&mut self.write().outbox)
    }

    /// Number of times the map itself was saved.
    pub fn map_saves(&self) -> usize {
        self.read().map_saves
    }

    pub fn persisted(&self, id: &FeatureId) -> Option<Feature> {
        self.read().features.get(id).cloned()
    }

    /// Check connectivity and authentication for a write.
    fn guard_write(state: &State) -> ModelResult<()> {
        if state.offline {
            return Err(ModelError::Network("backend unreachable".to_string()));
        }
        if !state.authenticated {
            return Err(ModelError::Unauthenticated);
        }
        Ok(())
    }

    fn guard_read(state: &State) -> ModelResult<()> {
        if state.offline {
            return Err(ModelError::Network("backend unreachable".to_string()));
        }
        Ok(())
    }

    fn build_grid(&self, area: &Area) -> FeatureCollection {
        let bounds = area.bounds();
        let sw = bounds.south_west();
        let ne = bounds.north_east();
        let n = self.grid_divisions;
        let step_lat = (ne.lat - sw.lat) / n as f64;
        let step_lng = (ne.lng - sw.lng) / n as f64;

        let mut cells = Vec::with_capacity(n * n);
        for row in 0..n {
            for col in 0..n {
                let lat0 = ne.lat - step_lat * (row + 1) as f64;
                let lat1 = ne.lat - step_lat * row as f64;
                let lng0 = sw.lng + step_lng * col as f64;
                let lng1 = sw.lng + step_lng * (col + 1) as f64;
                let ring = vec![[lng0, lat0], [lng1, lat0], [lng1, lat1], [lng0, lat1], [lng0, lat0]];

                let mut properties = Properties::new();
                properties.insert("label".to_string(), json!(cell_label(row, col)));
                properties.insert("color".to_string(), json!("#555555"));
                properties.insert("weight".to_string(), json!(1));
                properties.insert("fillOpacity".to_string(), json!(0));
                cells.push(GeoFeature::new(Some(Geometry::Polygon(vec![ring])), properties));
            }
        }
        FeatureCollection::new(cells)
    }
}

/// Spreadsheet-style cell name: column letter, 1-based row.
fn cell_label(row: usize, col: usize) -> String {
    let letter = (b'A' + (col % 26) as u8) as char;
    format!("{}{}", letter, row + 1)
}

impl Model for MemoryModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn authenticated(&self) -> bool {
        self.read().authenticated
    }

    fn bbox(&self) -> Option<Area> {
        self.read().bbox
    }

    fn set_bbox(&self, area: Area) {
        self.write().bbox = Some(area);
    }

    fn place(&self) -> Option<String> {
        self.read().place.clone()
    }

    fn grid(&self) -> BoxFuture<'_, ModelResult<Option<FeatureCollection>>> {
        Box::pin(async move {
            let state = self.read();
            Self::guard_read(&state)?;
            Ok(state
                .bbox
                .filter(|area| !area.is_empty())
                .map(|area| self.build_grid(&area)))
        })
    }

    fn features(&self) -> BoxFuture<'_, ModelResult<Option<FeatureCollection>>> {
        Box::pin(async move {
            let state = self.read();
            Self::guard_read(&state)?;
            let features = state.features.values().map(|f| f.geojson().clone()).collect();
            Ok(Some(FeatureCollection::new(features)))
        })
    }

    fn get_feature(&self, id: &FeatureId) -> BoxFuture<'_, ModelResult<Option<Feature>>> {
        let id = id.clone();
        Box::pin(async move {
            let state = self.read();
            Self::guard_read(&state)?;
            Ok(state.features.get(&id).cloned())
        })
    }

    fn add_feature(&self, geojson: GeoFeature) -> BoxFuture<'_, ModelResult<Feature>> {
        Box::pin(async move {
            let mut state = self.write();
            Self::guard_write(&state)?;
            let id = FeatureId::new(Uuid::new_v4().to_string());
            let feature = Feature::new(id.clone(), self.id.clone(), geojson);
            state.drafts.insert(id, feature.clone());
            Ok(feature)
        })
    }

    fn save(&self) -> BoxFuture<'_, ModelResult<()>> {
        Box::pin(async move {
            let mut state = self.write();
            Self::guard_write(&state)?;
            state.map_saves += 1;
            Ok(())
        })
    }

    fn save_feature(&self, feature: &Feature) -> BoxFuture<'_, ModelResult<()>> {
        let feature = feature.clone();
        Box::pin(async move {
            let mut state = self.write();
            Self::guard_write(&state)?;
            let id = feature.id().clone();
            let was_draft = state.drafts.remove(&id).is_some();
            let known = state.features.contains_key(&id);
            if !was_draft && !known {
                return Err(ModelError::NotFound(id));
            }

            let geojson = feature.geojson().clone();
            state.features.insert(id, feature);
            let event = if known {
                FeatureEvent::Updated(geojson)
            } else {
                FeatureEvent::Created(geojson)
            };
            state.outbox.push(event);
            Ok(())
        })
    }

    fn remove_feature(&self, id: &FeatureId) -> BoxFuture<'_, ModelResult<()>> {
        let id = id.clone();
        Box::pin(async move {
            let mut state = self.write();
            Self::guard_write(&state)?;
            if state.features.remove(&id).is_some() {
                let mut properties = Properties::new();
                properties.insert("id".to_string(), Value::String(id.as_str().to_string()));
                state.outbox.push(FeatureEvent::Deleted(GeoFeature::new(None, properties)));
            }
            Ok(())
        })
    }

    fn geolocations_for(&self, place: &str) -> BoxFuture<'_, ModelResult<Vec<Geolocation>>> {
        let place = place.to_string();
        Box::pin(async move {
            let state = self.read();
            Self::guard_read(&state)?;
            Ok(state.geocoder.get(&place).cloned().unwrap_or_default())
        })
    }
}
