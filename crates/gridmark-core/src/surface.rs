//! Interfaces of the drawing widget the controller drives.
//!
//! Implementations wrap a concrete map widget. The controller never reads
//! widget state back except through the values these methods return.

use crate::affordance::AreaAction;
use crate::geo::{Bounds, FeatureCollection, FeatureId, LatLng};
use crate::layer::LayerEntry;

/// Handle of a draft area rectangle created by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DraftHandle(pub u64);

/// A labelled button attached to the draft area rectangle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaButton {
    pub action: AreaAction,
    pub label: String,
    pub primary: bool,
}

/// The map canvas and its drawing tools.
pub trait Surface {
    /// Show or hide the feature drawing controls.
    fn set_edit_controls(&mut self, visible: bool);

    /// Stop any active drawing tool.
    fn stop_drawing(&mut self);

    /// Remove everything from the drawing layer.
    fn clear_drawing(&mut self);

    /// Remove the shape currently being drawn.
    fn discard_drawn_shape(&mut self);

    /// Create an editable, empty area rectangle carrying `buttons`.
    fn create_area_rectangle(&mut self, buttons: &[AreaButton]) -> DraftHandle;

    /// Start drawing into a draft rectangle.
    fn start_area_drawing(&mut self, draft: DraftHandle);

    /// Disable editing of a draft rectangle and drop it.
    fn disable_area_rectangle(&mut self, draft: DraftHandle);

    /// Toggle the edit affordance (vertex handles, dragging) of a feature.
    fn set_feature_editable(&mut self, id: &FeatureId, editable: bool);

    /// Render a new or changed feature entry.
    fn feature_upserted(&mut self, entry: &LayerEntry);

    fn feature_removed(&mut self, id: &FeatureId);

    /// Render the grid, replacing the previous one.
    fn grid_replaced(&mut self, grid: &FeatureCollection);

    /// Bind the introduction popup content and open it at `open_at`, or
    /// close it when `None`.
    fn set_intro_popup(&mut self, content: &str, open_at: Option<LatLng>);

    fn fit_bounds(&mut self, bounds: Bounds);

    fn set_view(&mut self, center: LatLng, zoom: u8);
}

/// The style editor control.
pub trait StyleEditor {
    fn enable(&mut self);

    fn disable(&mut self);

    fn is_enabled(&self) -> bool;

    /// Show the editor panel for the current target.
    fn show(&mut self);

    fn hide(&mut self);

    /// Point the editor at a feature and open it.
    fn init_change_style(&mut self, target: &LayerEntry);
}
