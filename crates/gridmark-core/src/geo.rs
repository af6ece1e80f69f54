//! Geographic primitives and the GeoJSON subset exchanged with the backend.
//!
//! Positions follow GeoJSON ordering (`[lng, lat]`). Bounds are kept as a
//! `kurbo::Rect` with `x` = longitude and `y` = latitude.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// A GeoJSON position, `[lng, lat]`.
pub type Position = [f64; 2];

/// Free-form GeoJSON property map.
pub type Properties = Map<String, Value>;

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build from a GeoJSON-ordered position.
    pub fn from_position(position: Position) -> Self {
        Self::new(position[1], position[0])
    }

    pub fn to_position(self) -> Position {
        [self.lng, self.lat]
    }

    fn to_point(self) -> Point {
        Point::new(self.lng, self.lat)
    }
}

/// An axis-aligned lat/lng rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds(Rect);

impl Bounds {
    /// Bounds spanning two opposite corners, in any order.
    pub fn from_corners(a: LatLng, b: LatLng) -> Self {
        Self(Rect::from_points(a.to_point(), b.to_point()))
    }

    /// Smallest bounds containing every position, `None` for an empty input.
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Option<Self> {
        let mut iter = positions.into_iter();
        let first = LatLng::from_position(*iter.next()?).to_point();
        let rect = iter.fold(Rect::from_points(first, first), |rect, p| {
            rect.union_pt(LatLng::from_position(*p).to_point())
        });
        Some(Self(rect))
    }

    pub fn union(self, other: Bounds) -> Self {
        Self(self.0.union(other.0))
    }

    pub fn south_west(&self) -> LatLng {
        LatLng::new(self.0.y0, self.0.x0)
    }

    pub fn north_east(&self) -> LatLng {
        LatLng::new(self.0.y1, self.0.x1)
    }

    pub fn south_east(&self) -> LatLng {
        LatLng::new(self.0.y0, self.0.x1)
    }

    pub fn north_west(&self) -> LatLng {
        LatLng::new(self.0.y1, self.0.x0)
    }

    pub fn center(&self) -> LatLng {
        let c = self.0.center();
        LatLng::new(c.y, c.x)
    }

    /// True when the bounds have no extent along either axis.
    pub fn is_degenerate(&self) -> bool {
        self.0.width() <= 0.0 || self.0.height() <= 0.0
    }
}

/// The area of interest, stored as `[lng_se, lat_se, lng_nw, lat_nw]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Area([f64; 4]);

impl Area {
    pub fn from_coords(coords: [f64; 4]) -> Self {
        Self(coords)
    }

    /// Encode bounds as their south-east and north-west corners.
    pub fn from_bounds(bounds: &Bounds) -> Self {
        let se = bounds.south_east().to_position();
        let nw = bounds.north_west().to_position();
        Self([se[0], se[1], nw[0], nw[1]])
    }

    pub fn coords(&self) -> [f64; 4] {
        self.0
    }

    /// The two stored corners.
    pub fn corners(&self) -> (LatLng, LatLng) {
        (
            LatLng::from_position([self.0[0], self.0[1]]),
            LatLng::from_position([self.0[2], self.0[3]]),
        )
    }

    pub fn bounds(&self) -> Bounds {
        let (a, b) = self.corners();
        Bounds::from_corners(a, b)
    }

    /// An area without extent or with non-finite coordinates counts as empty.
    pub fn is_empty(&self) -> bool {
        self.0.iter().any(|c| !c.is_finite()) || self.bounds().is_degenerate()
    }
}

/// Reasons a drawn rectangle is rejected as an area.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("Invalid geometry type: expected Polygon, got {0}")]
    NotAPolygon(&'static str),
    #[error("Polygon has no exterior ring")]
    MissingRing,
    #[error("Polygon ring is not closed")]
    OpenRing,
    #[error("Rectangle must have 4 distinct vertices, got {0}")]
    VertexCount(usize),
    #[error("Rectangle has no extent")]
    Degenerate,
}

/// GeoJSON geometry subset used by features and the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    Polygon(Vec<Vec<Position>>),
    MultiLineString(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    pub fn is_point(&self) -> bool {
        matches!(self, Geometry::Point(_))
    }

    /// All positions of the geometry, rings flattened.
    pub fn positions(&self) -> Vec<Position> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::LineString(line) => line.clone(),
            Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => {
                rings.iter().flatten().copied().collect()
            }
            Geometry::MultiPolygon(polygons) => {
                polygons.iter().flatten().flatten().copied().collect()
            }
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_positions(self.positions().iter())
    }

    /// Validate a drawn area rectangle and return its bounds.
    ///
    /// The exterior ring must be closed, carry exactly four distinct
    /// vertices and span a non-zero extent on both axes.
    pub fn rectangle_bounds(&self) -> Result<Bounds, GeometryError> {
        let Geometry::Polygon(rings) = self else {
            return Err(GeometryError::NotAPolygon(self.kind()));
        };
        let ring = rings.first().ok_or(GeometryError::MissingRing)?;
        if ring.len() < 2 || ring.first() != ring.last() {
            return Err(GeometryError::OpenRing);
        }

        let mut distinct: Vec<Position> = Vec::with_capacity(4);
        for p in &ring[..ring.len() - 1] {
            if !distinct.contains(p) {
                distinct.push(*p);
            }
        }
        if distinct.len() != 4 {
            return Err(GeometryError::VertexCount(distinct.len()));
        }

        let bounds = Bounds::from_positions(distinct.iter()).ok_or(GeometryError::MissingRing)?;
        if bounds.is_degenerate() {
            return Err(GeometryError::Degenerate);
        }
        Ok(bounds)
    }
}

/// Identifier assigned to a feature by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(String);

impl FeatureId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read an id from a JSON property, accepting strings and numbers.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureTag {
    #[default]
    Feature,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum CollectionTag {
    #[default]
    FeatureCollection,
}

/// A GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFeature {
    #[serde(rename = "type", default)]
    tag: FeatureTag,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Properties,
}

impl GeoFeature {
    pub fn new(geometry: Option<Geometry>, properties: Properties) -> Self {
        Self {
            tag: FeatureTag::Feature,
            geometry,
            properties,
        }
    }

    /// A feature with a geometry and no properties, as produced by drawing.
    pub fn from_geometry(geometry: Geometry) -> Self {
        Self::new(Some(geometry), Properties::new())
    }

    /// The `properties.id` of the feature.
    pub fn id(&self) -> Option<FeatureId> {
        self.properties.get("id").and_then(FeatureId::from_value)
    }

    pub fn label(&self) -> Option<&str> {
        self.properties.get("label").and_then(Value::as_str)
    }
}

/// A GeoJSON feature collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default)]
    tag: CollectionTag,
    #[serde(default)]
    pub features: Vec<GeoFeature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<GeoFeature>) -> Self {
        Self {
            tag: CollectionTag::FeatureCollection,
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref().and_then(Geometry::bounds))
            .reduce(Bounds::union)
    }
}

/// A persisted feature as handed out by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    id: FeatureId,
    map_id: String,
    geojson: GeoFeature,
}

impl Feature {
    pub fn new(id: FeatureId, map_id: impl Into<String>, geojson: GeoFeature) -> Self {
        let mut feature = Self {
            id,
            map_id: map_id.into(),
            geojson,
        };
        feature.stamp_identity();
        feature
    }

    pub fn id(&self) -> &FeatureId {
        &self.id
    }

    /// Id of the map (area) owning this feature.
    pub fn map_id(&self) -> &str {
        &self.map_id
    }

    pub fn geojson(&self) -> &GeoFeature {
        &self.geojson
    }

    /// Replace the GeoJSON representation; id and map id are kept.
    pub fn set_geojson(&mut self, geojson: GeoFeature) {
        self.geojson = geojson;
        self.stamp_identity();
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geojson.geometry = Some(geometry);
    }

    fn stamp_identity(&mut self) {
        let props = &mut self.geojson.properties;
        props.insert("id".to_string(), Value::String(self.id.0.clone()));
        props.insert("map_id".to_string(), Value::String(self.map_id.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square() -> Geometry {
        Geometry::Polygon(vec![vec![
            [13.0, 52.0],
            [13.5, 52.0],
            [13.5, 52.5],
            [13.0, 52.5],
            [13.0, 52.0],
        ]])
    }

    #[test]
    fn test_geometry_json_shape() {
        let json = serde_json::to_value(Geometry::Point([13.4, 52.5])).unwrap();
        assert_eq!(json, json!({"type": "Point", "coordinates": [13.4, 52.5]}));
    }

    #[test]
    fn test_rectangle_bounds_accepts_closed_quad() {
        let bounds = square().rectangle_bounds().unwrap();
        assert_eq!(bounds.south_east(), LatLng::new(52.0, 13.5));
        assert_eq!(bounds.north_west(), LatLng::new(52.5, 13.0));
    }

    #[test]
    fn test_rectangle_bounds_rejects_bad_shapes() {
        let triangle = Geometry::Polygon(vec![vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 0.0],
        ]]);
        assert_eq!(triangle.rectangle_bounds(), Err(GeometryError::VertexCount(3)));

        let pentagon = Geometry::Polygon(vec![vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.5, 0.5],
            [1.0, 1.0],
            [0.0, 1.0],
            [0.0, 0.0],
        ]]);
        assert_eq!(pentagon.rectangle_bounds(), Err(GeometryError::VertexCount(5)));

        let open = Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]]);
        assert_eq!(open.rectangle_bounds(), Err(GeometryError::OpenRing));

        let point = Geometry::Point([0.0, 0.0]);
        assert_eq!(point.rectangle_bounds(), Err(GeometryError::NotAPolygon("Point")));
    }

    #[test]
    fn test_rectangle_bounds_rejects_collinear_quad() {
        let flat = Geometry::Polygon(vec![vec![
            [13.0, 52.0],
            [13.1, 52.0],
            [13.2, 52.0],
            [13.3, 52.0],
            [13.0, 52.0],
        ]]);
        assert_eq!(flat.rectangle_bounds(), Err(GeometryError::Degenerate));
    }

    #[test]
    fn test_area_from_bounds_uses_opposite_corners() {
        let area = Area::from_bounds(&square().rectangle_bounds().unwrap());
        assert_eq!(area.coords(), [13.5, 52.0, 13.0, 52.5]);
        assert!(!area.is_empty());
        assert!(Area::from_coords([0.0, 0.0, 0.0, 0.0]).is_empty());
    }

    #[test]
    fn test_feature_id_from_number_and_string() {
        let f: GeoFeature = serde_json::from_value(json!({
            "type": "Feature",
            "geometry": null,
            "properties": {"id": 42}
        }))
        .unwrap();
        assert_eq!(f.id(), Some(FeatureId::new("42")));

        let deleted: GeoFeature = serde_json::from_value(json!({"properties": {"id": "abc"}})).unwrap();
        assert_eq!(deleted.id(), Some(FeatureId::new("abc")));
    }

    #[test]
    fn test_feature_keeps_identity_on_geojson_replace() {
        let mut feature = Feature::new(FeatureId::new("f1"), "m1", GeoFeature::from_geometry(square()));
        feature.set_geojson(GeoFeature::from_geometry(Geometry::Point([1.0, 2.0])));
        assert_eq!(feature.geojson().id(), Some(FeatureId::new("f1")));
        assert_eq!(feature.geojson().properties["map_id"], json!("m1"));
    }

    #[test]
    fn test_collection_bounds() {
        let collection = FeatureCollection::new(vec![
            GeoFeature::from_geometry(Geometry::Point([1.0, 1.0])),
            GeoFeature::from_geometry(Geometry::Point([3.0, 4.0])),
        ]);
        let bounds = collection.bounds().unwrap();
        assert_eq!(bounds.south_west(), LatLng::new(1.0, 1.0));
        assert_eq!(bounds.north_east(), LatLng::new(4.0, 3.0));
        assert!(FeatureCollection::default().bounds().is_none());
    }
}
