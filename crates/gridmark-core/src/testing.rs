//! Recording doubles for the widget traits.

use crate::affordance::AreaAction;
use crate::geo::{Bounds, FeatureCollection, FeatureId, GeoFeature, Geometry, LatLng, Properties};
use crate::layer::LayerEntry;
use crate::push::{PushChannel, PushEvent, PushResult};
use crate::surface::{AreaButton, DraftHandle, StyleEditor, Surface};
use serde_json::json;

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    EditControls(bool),
    StopDrawing,
    ClearDrawing,
    DiscardDrawn,
    CreateRectangle(Vec<(AreaAction, String)>),
    StartAreaDrawing(u64),
    DisableRectangle(u64),
    Editable(String, bool),
    Upserted(String),
    Removed(String),
    Grid(usize),
    Popup(String, Option<LatLng>),
    FitBounds(Bounds),
    SetView(LatLng, u8),
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<SurfaceCall>,
    next_draft: u64,
}

impl RecordingSurface {
    pub fn count(&self, pred: impl Fn(&SurfaceCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn last_popup(&self) -> Option<&SurfaceCall> {
        self.calls.iter().rev().find(|c| matches!(c, SurfaceCall::Popup(..)))
    }
}

impl Surface for RecordingSurface {
    fn set_edit_controls(&mut self, visible: bool) {
        self.calls.push(SurfaceCall::EditControls(visible));
    }

    fn stop_drawing(&mut self) {
        self.calls.push(SurfaceCall::StopDrawing);
    }

    fn clear_drawing(&mut self) {
        self.calls.push(SurfaceCall::ClearDrawing);
    }

    fn discard_drawn_shape(&mut self) {
        self.calls.push(SurfaceCall::DiscardDrawn);
    }

    fn create_area_rectangle(&mut self, buttons: &[AreaButton]) -> DraftHandle {
        self.next_draft += 1;
        self.calls.push(SurfaceCall::CreateRectangle(
            buttons.iter().map(|b| (b.action, b.label.clone())).collect(),
        ));
        DraftHandle(self.next_draft)
    }

    fn start_area_drawing(&mut self, draft: DraftHandle) {
        self.calls.push(SurfaceCall::StartAreaDrawing(draft.0));
    }

    fn disable_area_rectangle(&mut self, draft: DraftHandle) {
        self.calls.push(SurfaceCall::DisableRectangle(draft.0));
    }

    fn set_feature_editable(&mut self, id: &FeatureId, editable: bool) {
        self.calls.push(SurfaceCall::Editable(id.to_string(), editable));
    }

    fn feature_upserted(&mut self, entry: &LayerEntry) {
        self.calls.push(SurfaceCall::Upserted(entry.id.to_string()));
    }

    fn feature_removed(&mut self, id: &FeatureId) {
        self.calls.push(SurfaceCall::Removed(id.to_string()));
    }

    fn grid_replaced(&mut self, grid: &FeatureCollection) {
        self.calls.push(SurfaceCall::Grid(grid.len()));
    }

    fn set_intro_popup(&mut self, content: &str, open_at: Option<LatLng>) {
        self.calls.push(SurfaceCall::Popup(content.to_string(), open_at));
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.calls.push(SurfaceCall::FitBounds(bounds));
    }

    fn set_view(&mut self, center: LatLng, zoom: u8) {
        self.calls.push(SurfaceCall::SetView(center, zoom));
    }
}

#[derive(Debug, Default)]
pub struct RecordingEditor {
    pub enabled: bool,
    pub visible: bool,
    pub shows: usize,
    pub hides: usize,
    pub inits: Vec<FeatureId>,
}

impl StyleEditor for RecordingEditor {
    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn show(&mut self) {
        self.shows += 1;
        self.visible = true;
    }

    fn hide(&mut self) {
        self.hides += 1;
        self.visible = false;
    }

    fn init_change_style(&mut self, target: &LayerEntry) {
        self.inits.push(target.id.clone());
        self.visible = true;
    }
}

/// Route `log` output to the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A point feature with the given id.
pub fn point_feature(id: &str) -> GeoFeature {
    let mut properties = Properties::new();
    properties.insert("id".to_string(), json!(id));
    GeoFeature::new(Some(Geometry::Point([13.4, 52.5])), properties)
}

/// A layer entry for a point feature.
pub fn entry(id: &str) -> LayerEntry {
    LayerEntry {
        id: FeatureId::new(id),
        feature: point_feature(id),
        marker: None,
        tooltip: None,
    }
}

/// Push channel fed by hand.
#[derive(Debug, Default)]
pub struct QueuedPush {
    pub rooms: Vec<String>,
    pub queue: Vec<PushEvent>,
}

impl PushChannel for QueuedPush {
    fn join(&mut self, room: &str) -> PushResult<()> {
        self.rooms.push(room.to_string());
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<PushEvent> {
        std::mem::take(&mut self.queue)
    }
}
