//! The feature layer and its reconciliation with push events.
//!
//! Entries are keyed by feature id. Only push events (and the initial load)
//! insert or remove entries; local draw and edit operations update
//! entries that already exist and leave insertion to the authoritative
//! `created` event. This keeps the layer convergent no matter how local
//! persist calls and push events interleave.

use crate::geo::{FeatureCollection, FeatureId, GeoFeature, Geometry, Properties};
use crate::push::FeatureEvent;
use crate::style::{MarkerOptions, MarkerStyle, resolve_marker};
use std::collections::HashMap;

/// A feature as held by the layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerEntry {
    pub id: FeatureId,
    pub feature: GeoFeature,
    /// Marker for point features, `None` for other geometries.
    pub marker: Option<MarkerStyle>,
    /// Permanent tooltip text (the feature label).
    pub tooltip: Option<String>,
}

impl LayerEntry {
    fn build(id: FeatureId, mut feature: GeoFeature, markers: Option<&MarkerOptions>) -> Self {
        let marker = match &feature.geometry {
            Some(geometry) if geometry.is_point() => {
                Some(resolve_marker(&mut feature.properties, markers))
            }
            _ => None,
        };
        let tooltip = feature.label().map(str::to_string);
        Self {
            id,
            feature,
            marker,
            tooltip,
        }
    }
}

/// Result of applying a push event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// A new entry was added.
    Inserted(FeatureId),
    /// An existing entry was replaced.
    Replaced(FeatureId),
    Removed(FeatureId),
    /// The event changed nothing.
    Ignored,
}

/// Features currently shown on the map, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct FeatureLayer {
    entries: HashMap<FeatureId, LayerEntry>,
    order: Vec<FeatureId>,
}

impl FeatureLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &FeatureId) -> Option<&LayerEntry> {
        self.entries.get(id)
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> &[FeatureId] {
        &self.order
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &LayerEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Replace the layer contents with an initial snapshot.
    pub fn load(&mut self, collection: FeatureCollection, markers: Option<&MarkerOptions>) {
        self.clear();
        for feature in collection.features {
            self.upsert(feature, markers);
        }
    }

    /// Apply an authoritative push event.
    pub fn apply(&mut self, event: FeatureEvent, markers: Option<&MarkerOptions>) -> Reconciled {
        match event {
            FeatureEvent::Created(feature) | FeatureEvent::Updated(feature) => {
                self.upsert(feature, markers)
            }
            FeatureEvent::Deleted(feature) => match feature.id() {
                Some(id) => self.remove(&id),
                None => {
                    log::warn!("Ignoring deleted event without properties.id");
                    Reconciled::Ignored
                }
            },
        }
    }

    /// Overwrite the geometry of an existing entry.
    ///
    /// Returns false when the id is not in the layer; no entry is created.
    pub fn set_geometry(&mut self, id: &FeatureId, geometry: Geometry) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.feature.geometry = Some(geometry);
                true
            }
            None => false,
        }
    }

    /// Overwrite properties (and optionally geometry) of an existing entry,
    /// re-resolving its presentation.
    pub fn restyle(
        &mut self,
        id: &FeatureId,
        properties: Properties,
        geometry: Option<Geometry>,
        markers: Option<&MarkerOptions>,
    ) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        let geometry = geometry.or_else(|| entry.feature.geometry.take());
        *entry = LayerEntry::build(id.clone(), GeoFeature::new(geometry, properties), markers);
        true
    }

    fn upsert(&mut self, feature: GeoFeature, markers: Option<&MarkerOptions>) -> Reconciled {
        let Some(id) = feature.id() else {
            log::warn!("Ignoring feature without properties.id");
            return Reconciled::Ignored;
        };
        let entry = LayerEntry::build(id.clone(), feature, markers);
        if self.entries.insert(id.clone(), entry).is_some() {
            Reconciled::Replaced(id)
        } else {
            self.order.push(id.clone());
            Reconciled::Inserted(id)
        }
    }

    fn remove(&mut self, id: &FeatureId) -> Reconciled {
        if self.entries.remove(id).is_none() {
            return Reconciled::Ignored;
        }
        self.order.retain(|other| other != id);
        Reconciled::Removed(id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn feature(id: &str, geometry: Geometry) -> GeoFeature {
        let mut properties = Properties::new();
        properties.insert("id".to_string(), json!(id));
        GeoFeature::new(Some(geometry), properties)
    }

    fn point(id: &str) -> GeoFeature {
        feature(id, Geometry::Point([13.4, 52.5]))
    }

    fn tombstone(id: &str) -> FeatureEvent {
        let mut properties = Properties::new();
        properties.insert("id".to_string(), json!(id));
        FeatureEvent::Deleted(GeoFeature::new(None, properties))
    }

    #[test]
    fn test_created_is_idempotent() {
        let mut layer = FeatureLayer::new();
        assert_eq!(
            layer.apply(FeatureEvent::Created(point("a")), None),
            Reconciled::Inserted(FeatureId::new("a"))
        );
        assert_eq!(
            layer.apply(FeatureEvent::Created(point("a")), None),
            Reconciled::Replaced(FeatureId::new("a"))
        );
        assert_eq!(layer.count(), 1);
        assert_eq!(layer.ids(), &[FeatureId::new("a")]);
    }

    #[test]
    fn test_deleted_unknown_id_is_noop() {
        let mut layer = FeatureLayer::new();
        layer.apply(FeatureEvent::Created(point("a")), None);
        assert_eq!(layer.apply(tombstone("zzz"), None), Reconciled::Ignored);
        assert_eq!(layer.count(), 1);
    }

    #[test]
    fn test_updated_replaces_geometry_and_properties() {
        let mut layer = FeatureLayer::new();
        layer.apply(FeatureEvent::Created(point("a")), None);

        let mut moved = feature("a", Geometry::Point([10.0, 50.0]));
        moved.properties.insert("label".to_string(), json!("Stage"));
        layer.apply(FeatureEvent::Updated(moved), None);

        let entry = layer.get(&FeatureId::new("a")).unwrap();
        assert_eq!(entry.feature.geometry, Some(Geometry::Point([10.0, 50.0])));
        assert_eq!(entry.tooltip.as_deref(), Some("Stage"));
    }

    #[test]
    fn test_final_state_follows_last_event_per_id() {
        let mut layer = FeatureLayer::new();
        let events = vec![
            FeatureEvent::Created(point("a")),
            FeatureEvent::Created(point("b")),
            tombstone("a"),
            FeatureEvent::Updated(point("c")),
            FeatureEvent::Created(point("d")),
            tombstone("d"),
            FeatureEvent::Created(point("a")),
            tombstone("b"),
            FeatureEvent::Updated(point("b")),
            tombstone("e"),
        ];
        for event in events {
            layer.apply(event, None);
        }

        let ids: BTreeSet<_> = layer.ids().iter().map(FeatureId::as_str).collect();
        assert_eq!(ids, BTreeSet::from(["a", "b", "c"]));
    }

    #[test]
    fn test_local_edits_never_insert() {
        let mut layer = FeatureLayer::new();
        assert!(!layer.set_geometry(&FeatureId::new("x"), Geometry::Point([0.0, 0.0])));
        assert!(!layer.restyle(&FeatureId::new("x"), Properties::new(), None, None));
        assert_eq!(layer.count(), 0);
    }

    #[test]
    fn test_point_gets_default_marker() {
        let mut layer = FeatureLayer::new();
        layer.apply(FeatureEvent::Created(point("a")), Some(&MarkerOptions::default()));
        let entry = layer.get(&FeatureId::new("a")).unwrap();
        assert!(matches!(entry.marker, Some(MarkerStyle::Icon { .. })));
        assert_eq!(entry.feature.properties["icon"], json!("marker"));

        let polygon = feature("p", Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]]]));
        layer.apply(FeatureEvent::Created(polygon), Some(&MarkerOptions::default()));
        assert_eq!(layer.get(&FeatureId::new("p")).unwrap().marker, None);
    }

    #[test]
    fn test_restyle_keeps_geometry_when_none_given() {
        let mut layer = FeatureLayer::new();
        layer.apply(FeatureEvent::Created(point("a")), None);

        let mut properties = Properties::new();
        properties.insert("id".to_string(), json!("a"));
        properties.insert("label".to_string(), json!("Camp"));
        assert!(layer.restyle(&FeatureId::new("a"), properties, None, None));

        let entry = layer.get(&FeatureId::new("a")).unwrap();
        assert_eq!(entry.feature.geometry, Some(Geometry::Point([13.4, 52.5])));
        assert_eq!(entry.tooltip.as_deref(), Some("Camp"));
    }
}
