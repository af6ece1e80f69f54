//! Feature style handling: the persisted-property whitelist and marker
//! resolution for point features.

use crate::geo::Properties;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Style properties that may be persisted from a style editor payload.
pub const PERSISTED_STYLE_KEYS: &[&str] = &[
    "color",
    "weight",
    "opacity",
    "dashArray",
    "fill",
    "fillColor",
    "fillOpacity",
    "fillPattern",
    "stroke",
    "lineCap",
    "lineJoin",
    "radius",
    "icon",
    "iconColor",
    "iconSize",
    "label",
];

/// Keep only persistable style properties of a style editor payload.
///
/// Identity keys (`id`, `map_id`) and widget internals are dropped; the
/// caller merges identity back in.
pub fn filter_properties(options: &Properties) -> Properties {
    options
        .iter()
        .filter(|(key, value)| PERSISTED_STYLE_KEYS.contains(&key.as_str()) && !value.is_null())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Marker catalogue used to give new point features a default icon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerOptions {
    /// Icon names per category; `default` supplies the fallback icon.
    pub markers: HashMap<String, Vec<String>>,
    pub color_ramp: Vec<String>,
    /// Named icon sizes; `medium` is used for new markers.
    pub size: HashMap<String, Value>,
}

impl Default for MarkerOptions {
    fn default() -> Self {
        Self {
            markers: HashMap::from([(
                "default".to_string(),
                vec!["marker".to_string(), "circle".to_string(), "flag".to_string()],
            )]),
            color_ramp: vec![
                "#1a1a1a".to_string(),
                "#e04f3d".to_string(),
                "#2a7ab0".to_string(),
                "#3c9a5f".to_string(),
            ],
            size: HashMap::from([
                ("small".to_string(), Value::from(20)),
                ("medium".to_string(), Value::from(30)),
                ("large".to_string(), Value::from(40)),
            ]),
        }
    }
}

impl MarkerOptions {
    fn defaults(&self) -> Option<(&str, &str, &Value)> {
        let icon = self.markers.get("default")?.first()?;
        let color = self.color_ramp.first()?;
        let size = self.size.get("medium")?;
        Some((icon, color, size))
    }
}

/// How a point feature is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerStyle {
    Icon {
        icon: String,
        color: String,
        size: Value,
    },
    /// Widget default marker.
    Plain,
}

/// Resolve the marker for a point feature, filling in default icon
/// properties when the feature has none.
pub fn resolve_marker(properties: &mut Properties, options: Option<&MarkerOptions>) -> MarkerStyle {
    let Some((default_icon, default_color, default_size)) = options.and_then(MarkerOptions::defaults)
    else {
        log::warn!("Marker options not configured, using plain marker");
        return MarkerStyle::Plain;
    };

    if !properties.contains_key("icon") {
        properties.insert("icon".to_string(), Value::from(default_icon));
        properties.insert("iconColor".to_string(), Value::from(default_color));
        properties.insert("iconSize".to_string(), default_size.clone());
    }

    let Some(icon) = properties.get("icon").and_then(Value::as_str) else {
        log::warn!("Point feature has a non-text icon, using plain marker");
        return MarkerStyle::Plain;
    };

    MarkerStyle::Icon {
        icon: icon.to_string(),
        color: properties
            .get("iconColor")
            .and_then(Value::as_str)
            .unwrap_or(default_color)
            .to_string(),
        size: properties
            .get("iconSize")
            .cloned()
            .unwrap_or_else(|| default_size.clone()),
    }
}
