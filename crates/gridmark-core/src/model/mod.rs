//! The remote data model the controller reads from and persists through.

mod memory;

pub use memory::{DEFAULT_GRID_DIVISIONS, MemoryModel};

use crate::geo::{Area, Feature, FeatureCollection, FeatureId, GeoFeature, LatLng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Model errors.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Feature not found: {0}")]
    NotFound(FeatureId),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Model error: {0}")]
    Other(String),
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Boxed future for async model calls. Not `Send`: the controller runs on a
/// single event loop.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// One geocoding hit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// `[south, north, west, east]`, as strings or numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundingbox: Option<Vec<Value>>,
}

impl Geolocation {
    /// The two corners of the bounding box, when it has four numeric entries.
    pub fn corners(&self) -> Option<(LatLng, LatLng)> {
        let bbox = self.boundingbox.as_ref()?;
        if bbox.len() != 4 {
            return None;
        }
        let mut values = [0.0; 4];
        for (slot, value) in values.iter_mut().zip(bbox) {
            *slot = match value {
                Value::String(s) => s.trim().parse().ok()?,
                Value::Number(n) => n.as_f64()?,
                _ => return None,
            };
        }
        let [south, north, west, east] = values;
        Some((LatLng::new(south, west), LatLng::new(north, east)))
    }
}

/// Backend data model for one map.
///
/// Feature persistence is asynchronous; the authoritative result of every
/// save or delete is broadcast on the push channel, not returned here.
pub trait Model: Send + Sync {
    /// Map id, also the push channel room.
    fn id(&self) -> &str;

    fn authenticated(&self) -> bool;

    /// The area of interest, if one has been defined.
    fn bbox(&self) -> Option<Area>;

    /// Set a new area. The backend regenerates the grid.
    fn set_bbox(&self, area: Area);

    /// Named place used for initial centering.
    fn place(&self) -> Option<String>;

    /// The reference grid for the current area.
    fn grid(&self) -> BoxFuture<'_, ModelResult<Option<FeatureCollection>>>;

    /// All persisted features.
    fn features(&self) -> BoxFuture<'_, ModelResult<Option<FeatureCollection>>>;

    fn get_feature(&self, id: &FeatureId) -> BoxFuture<'_, ModelResult<Option<Feature>>>;

    /// Create a feature from drawn GeoJSON. It is not persisted until saved.
    fn add_feature(&self, geojson: GeoFeature) -> BoxFuture<'_, ModelResult<Feature>>;

    /// Persist the map itself (area, metadata).
    fn save(&self) -> BoxFuture<'_, ModelResult<()>>;

    fn save_feature(&self, feature: &Feature) -> BoxFuture<'_, ModelResult<()>>;

    fn remove_feature(&self, id: &FeatureId) -> BoxFuture<'_, ModelResult<()>>;

    /// Geocode a place name.
    fn geolocations_for(&self, place: &str) -> BoxFuture<'_, ModelResult<Vec<Geolocation>>>;
}
