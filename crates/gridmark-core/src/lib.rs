//! Gridmark Core Library
//!
//! Interaction state machine and realtime reconciliation for the Gridmark
//! map editor: area and grid handling, the feature layer, the editing
//! session and the controller tying them to a map widget.

pub mod affordance;
pub mod config;
pub mod controller;
pub mod events;
pub mod geo;
pub mod grid;
pub mod i18n;
pub mod layer;
pub mod mode;
pub mod model;
pub mod pipeline;
pub mod push;
pub mod session;
pub mod style;
pub mod surface;

#[cfg(test)]
pub(crate) mod testing;

pub use affordance::{Affordances, AreaAction, AreaTool, ViewState};
pub use config::{ConfigError, ControllerConfig, Region};
pub use controller::{Controller, ControllerError, ControllerResult};
pub use events::{EventKind, ViewEvent};
pub use geo::{Area, Bounds, Feature, FeatureCollection, FeatureId, GeoFeature, Geometry, LatLng};
pub use layer::{FeatureLayer, LayerEntry, Reconciled};
pub use mode::Mode;
pub use model::{MemoryModel, Model, ModelError, ModelResult};
pub use pipeline::{DrawnLayer, MapEvent, Modifiers};
pub use push::{ClientMessage, ConnectionState, FeatureEvent, PushChannel, PushEvent, ServerMessage};
#[cfg(not(target_arch = "wasm32"))]
pub use push::NativePushChannel;
pub use surface::{StyleEditor, Surface};
