//! Widget notifications and the table routing them to controller handlers.

use crate::affordance::AreaAction;
use crate::geo::{FeatureId, Geometry, Properties};
use serde::{Deserialize, Serialize};

/// Modifier keys held during a click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl (or cmd) turns a click into a delete.
    pub fn deletes(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A shape handed over by the drawing widget.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnLayer {
    /// Id of the feature the shape belongs to; `None` for fresh drawings and
    /// the area rectangle.
    pub id: Option<FeatureId>,
    pub geometry: Geometry,
}

impl DrawnLayer {
    pub fn new(geometry: Geometry) -> Self {
        Self { id: None, geometry }
    }

    pub fn of_feature(id: FeatureId, geometry: Geometry) -> Self {
        Self { id: Some(id), geometry }
    }
}

/// Everything the map widget reports to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// Click on empty map space.
    MapClick,
    FeatureClick { id: FeatureId, modifiers: Modifiers },
    /// The delete action of a feature's context UI.
    FeatureTriggered { id: FeatureId },
    DrawingStart,
    DrawingCancel,
    /// A vertex drag finished.
    VertexDragEnd { layer: DrawnLayer },
    /// A whole-shape drag finished.
    DragEnd { layer: DrawnLayer },
    DrawingCommit { layer: DrawnLayer },
    /// The style editor changed a feature.
    StyleChanged {
        id: FeatureId,
        options: Properties,
        geometry: Option<Geometry>,
    },
    /// A button on the area rectangle was pressed.
    AreaButton(AreaAction),
}

/// Controller operations events are routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    LeaveEditing,
    DiscardDrawing,
    AreaRectangle,
    FeatureCommit,
    FeatureEdit,
    FeatureClick,
    RemoveFeature,
    StyleChange,
    AreaButton,
}

impl MapEvent {
    /// Handlers for this event, in call order.
    ///
    /// Vertex drags and commits feed both the area path and the feature
    /// path; each handler checks the mode itself.
    pub fn handlers(&self) -> &'static [Handler] {
        match self {
            MapEvent::MapClick | MapEvent::DrawingStart => &[Handler::LeaveEditing],
            MapEvent::DrawingCancel => &[Handler::DiscardDrawing],
            MapEvent::FeatureClick { .. } => &[Handler::FeatureClick],
            MapEvent::FeatureTriggered { .. } => &[Handler::RemoveFeature],
            MapEvent::VertexDragEnd { .. } => &[Handler::AreaRectangle, Handler::FeatureEdit],
            MapEvent::DragEnd { .. } => &[Handler::FeatureEdit],
            MapEvent::DrawingCommit { .. } => &[Handler::AreaRectangle, Handler::FeatureCommit],
            MapEvent::StyleChanged { .. } => &[Handler::StyleChange],
            MapEvent::AreaButton(_) => &[Handler::AreaButton],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MapEvent::MapClick => "click",
            MapEvent::FeatureClick { .. } => "feature:click",
            MapEvent::FeatureTriggered { .. } => "feature:triggered",
            MapEvent::DrawingStart => "drawing:start",
            MapEvent::DrawingCancel => "drawing:cancel",
            MapEvent::VertexDragEnd { .. } => "vertex:dragend",
            MapEvent::DragEnd { .. } => "dragend",
            MapEvent::DrawingCommit { .. } => "drawing:commit",
            MapEvent::StyleChanged { .. } => "styleeditor:changed",
            MapEvent::AreaButton(_) => "area:button",
        }
    }
}
