//! The map editing controller.
//!
//! Owns the grid and feature layers, the editing session and the mode, and
//! drives the surface from them. Widget notifications come in through
//! [`Controller::handle`], push events through [`Controller::apply_push`] or
//! [`Controller::pump`]. After every state change the affordances are derived
//! from scratch and applied to the surface.

use crate::affordance::{self, Affordances, AreaAction, AreaTool, ViewState};
use crate::config::ControllerConfig;
use crate::events::{EventBus, EventKind, ViewEvent};
use crate::geo::{Area, Bounds, FeatureId, GeoFeature, Geometry, LatLng, Properties};
use crate::grid::GridLayer;
use crate::i18n::{Catalog, Translate};
use crate::layer::{FeatureLayer, Reconciled};
use crate::mode::{Mode, ModeMachine};
use crate::model::{Model, ModelError};
use crate::pipeline::{DrawnLayer, Handler, MapEvent, Modifiers};
use crate::push::{FeatureEvent, PushChannel, PushError, PushEvent};
use crate::session::EditingSession;
use crate::style::filter_properties;
use crate::surface::{AreaButton, DraftHandle, StyleEditor, Surface};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Controller errors.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Push(#[from] PushError),
}

/// Result type for controller operations.
pub type ControllerResult<T> = Result<T, ControllerError>;

/// The area rectangle currently offered on the surface.
#[derive(Debug, Clone, Copy)]
struct Draft {
    handle: DraftHandle,
    tool: AreaTool,
}

pub struct Controller<M: Model, S: Surface, E: StyleEditor> {
    model: Arc<M>,
    surface: S,
    editor: E,
    config: ControllerConfig,
    translator: Box<dyn Translate>,
    mode: ModeMachine,
    grid: GridLayer,
    features: FeatureLayer,
    session: EditingSession,
    draft: Option<Draft>,
    /// Feature committed locally whose `created` event has not arrived yet.
    pending_focus: Option<FeatureId>,
    events: EventBus,
    ready: bool,
}

impl<M: Model, S: Surface, E: StyleEditor> Controller<M, S, E> {
    /// Create a controller. `initial_mode` is overridden to area definition
    /// while the model has no area.
    pub fn new(
        model: Arc<M>,
        surface: S,
        editor: E,
        config: ControllerConfig,
        initial_mode: Option<Mode>,
    ) -> Self {
        let has_area = model.bbox().is_some_and(|area| !area.is_empty());
        let translator = Box::new(Catalog::builtin(&config.language, &config.fallback_language));
        Self {
            model,
            surface,
            editor,
            config,
            translator,
            mode: ModeMachine::new(initial_mode, has_area),
            grid: GridLayer::new(),
            features: FeatureLayer::new(),
            session: EditingSession::new(),
            draft: None,
            pending_focus: None,
            events: EventBus::new(),
            ready: false,
        }
    }

    /// Replace the label catalog.
    pub fn with_translator(mut self, translator: impl Translate + 'static) -> Self {
        self.translator = Box::new(translator);
        self
    }

    pub fn model(&self) -> &Arc<M> {
        &self.model
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn grid(&self) -> &GridLayer {
        &self.grid
    }

    pub fn features(&self) -> &FeatureLayer {
        &self.features
    }

    pub fn session(&self) -> &EditingSession {
        &self.session
    }

    /// Subscribe to one kind of notification.
    pub fn on(&mut self, kind: EventKind, listener: impl FnMut(&ViewEvent) + 'static) {
        self.events.on(kind, listener);
    }

    pub fn on_any(&mut self, listener: impl FnMut(&ViewEvent) + 'static) {
        self.events.on_any(listener);
    }

    fn has_area(&self) -> bool {
        self.model.bbox().is_some_and(|area| !area.is_empty())
    }

    /// Whether features can be drawn, edited and styled right now.
    fn can_edit(&self) -> bool {
        self.model.authenticated() && self.mode().allows_features()
    }

    // ------------------------------------------------------------------
    // Mode
    // ------------------------------------------------------------------

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    /// Request a mode. Fires `modeChanged` and refreshes the UI only when
    /// the effective mode changes.
    pub fn set_mode(&mut self, requested: Mode) {
        let has_area = self.has_area();
        let Some(mode) = self.mode.set(requested, has_area) else {
            return;
        };
        log::info!("Mode changed to {:?}", mode);
        self.surface.stop_drawing();
        self.events.fire(ViewEvent::ModeChanged(mode));
        self.refresh_ui();
    }

    // ------------------------------------------------------------------
    // Bootstrap
    // ------------------------------------------------------------------

    /// Bring the controller up: center the map, join the push room and load
    /// grid and features.
    pub async fn init(
        &mut self,
        push: &mut dyn PushChannel,
        center: Option<LatLng>,
    ) -> ControllerResult<()> {
        self.ready = true;
        self.refresh_ui();
        self.center(center).await?;

        push.join(self.model.id())?;
        log::info!("Joined push room {}", self.model.id());

        self.load_grid().await?;
        if self.grid.is_empty() {
            self.set_mode(Mode::AreaDefinition);
        }
        self.load_features().await?;
        self.refresh_ui();
        Ok(())
    }

    /// Center the map on explicit coordinates, the area, the model's named
    /// place or the default region, in that order of preference.
    pub async fn center(&mut self, center: Option<LatLng>) -> ControllerResult<()> {
        if let Some(center) = center {
            self.surface.set_view(center, self.config.center_zoom);
            return Ok(());
        }

        if let Some(area) = self.model.bbox().filter(|area| !area.is_empty()) {
            self.surface.fit_bounds(area.bounds());
            return Ok(());
        }

        if let Some(place) = self.model.place() {
            let model = Arc::clone(&self.model);
            let hits = model.geolocations_for(&place).await?;
            if let Some((a, b)) = hits.first().and_then(|hit| hit.corners()) {
                self.surface.fit_bounds(Bounds::from_corners(a, b));
                return Ok(());
            }
            log::warn!("No geolocation for {}, using default region", place);
        }

        self.surface.fit_bounds(self.config.default_region.bounds());
        Ok(())
    }

    async fn load_grid(&mut self) -> ControllerResult<Option<Bounds>> {
        let model = Arc::clone(&self.model);
        let result = self.grid.refresh(model.as_ref()).await;
        self.surface.grid_replaced(self.grid.collection());
        Ok(result?)
    }

    async fn load_features(&mut self) -> ControllerResult<()> {
        let model = Arc::clone(&self.model);
        let collection = model.features().await?.unwrap_or_default();
        self.features.load(collection, self.config.markers.as_ref());
        for entry in self.features.iter() {
            self.surface.feature_upserted(entry);
        }
        log::info!("Loaded {} features", self.features.count());
        Ok(())
    }

    /// Resynchronise the grid after the area changed.
    ///
    /// On a failed fetch the grid stays cleared and the error is returned.
    pub async fn on_bbox_changed(&mut self) -> ControllerResult<()> {
        if let Some(bounds) = self.load_grid().await? {
            self.surface.fit_bounds(bounds);
        }
        self.refresh_ui();
        Ok(())
    }

    /// Re-derive the UI after the model's authentication changed.
    pub fn notify_authenticated(&mut self) {
        let authenticated = self.model.authenticated();
        self.events.fire(ViewEvent::Authenticated(authenticated));
        self.refresh_ui();
    }

    // ------------------------------------------------------------------
    // Affordances
    // ------------------------------------------------------------------

    pub fn view_state(&self) -> ViewState {
        ViewState {
            authenticated: self.model.authenticated(),
            mode: self.mode(),
            has_area: self.has_area(),
            grid_count: self.grid.count(),
            feature_count: self.features.count(),
            has_draft: self.draft.is_some(),
        }
    }

    pub fn affordances(&self) -> Affordances {
        affordance::derive(&self.view_state())
    }

    /// Derive the affordances and apply them to the surface.
    pub fn refresh_ui(&mut self) {
        if !self.ready {
            return;
        }
        let affordances = self.affordances();
        self.apply(affordances);
    }

    fn apply(&mut self, affordances: Affordances) {
        self.surface.set_edit_controls(affordances.edit_controls);

        if affordances.style_editor {
            if !self.editor.is_enabled() {
                self.editor.enable();
            }
        } else {
            self.session.leave(&mut self.surface, &mut self.editor);
            if self.editor.is_enabled() {
                self.editor.disable();
            }
        }

        match affordances.area_tool {
            AreaTool::Hidden => {}
            AreaTool::DiscardDraft => self.discard_draft(),
            tool @ AreaTool::Buttons { .. } => {
                if self.draft.is_none_or(|draft| draft.tool != tool) {
                    self.discard_draft();
                    let buttons: Vec<AreaButton> = tool
                        .actions()
                        .into_iter()
                        .map(|action| AreaButton {
                            action,
                            label: self.translator.translate(action.label_key()),
                            primary: action.is_primary(),
                        })
                        .collect();
                    let handle = self.surface.create_area_rectangle(&buttons);
                    self.draft = Some(Draft { handle, tool });
                }
            }
        }

        self.show_popup(affordances.intro_popup);
    }

    fn discard_draft(&mut self) {
        if let Some(draft) = self.draft.take() {
            self.surface.disable_area_rectangle(draft.handle);
        }
    }

    /// Open the introduction popup over the grid, or close it.
    pub fn update_popup(&mut self) {
        if !self.ready {
            return;
        }
        let open = self.affordances().intro_popup;
        self.show_popup(open);
    }

    fn show_popup(&mut self, open: bool) {
        let content = self.translator.translate("introduction");
        let open_at = if open {
            self.grid.bounds().map(|bounds| bounds.center())
        } else {
            None
        };
        self.surface.set_intro_popup(&content, open_at);
    }

    // ------------------------------------------------------------------
    // Push events
    // ------------------------------------------------------------------

    /// Apply an authoritative feature event to the layer.
    pub fn apply_push(&mut self, event: FeatureEvent) -> Reconciled {
        log::debug!("push {} {:?}", event.name(), event.id());
        let result = self.features.apply(event, self.config.markers.as_ref());
        match &result {
            Reconciled::Inserted(id) | Reconciled::Replaced(id) => {
                if let Some(entry) = self.features.get(id) {
                    self.surface.feature_upserted(entry);
                }
                if self.pending_focus.as_ref() == Some(id) {
                    self.pending_focus = None;
                    if self.can_edit() {
                        self.enter_editing(id);
                    }
                } else if self.session.is_editing(id) {
                    self.surface.set_feature_editable(id, true);
                }
            }
            Reconciled::Removed(id) => {
                self.surface.feature_removed(id);
                self.session.forget(id, &mut self.editor);
                if self.pending_focus.as_ref() == Some(id) {
                    self.pending_focus = None;
                }
            }
            Reconciled::Ignored => {}
        }
        self.update_popup();
        result
    }

    /// Drain a push channel. Returns the number of feature events applied.
    pub fn pump(&mut self, push: &mut dyn PushChannel) -> usize {
        let mut applied = 0;
        for event in push.poll_events() {
            match event {
                PushEvent::Feature(event) => {
                    self.apply_push(event);
                    applied += 1;
                }
                PushEvent::Connected => log::info!("Push channel connected"),
                PushEvent::Disconnected => log::warn!("Push channel disconnected"),
                PushEvent::Joined { room, peer_count } => {
                    log::info!("Joined room {} with {} peers", room, peer_count)
                }
                PushEvent::PeerJoined { peer_id } => log::debug!("Peer joined: {}", peer_id),
                PushEvent::PeerLeft { peer_id } => log::debug!("Peer left: {}", peer_id),
                PushEvent::Error { message } => log::error!("Push channel error: {}", message),
            }
        }
        applied
    }

    // ------------------------------------------------------------------
    // Widget events
    // ------------------------------------------------------------------

    /// Route a widget notification to its handlers.
    pub async fn handle(&mut self, event: MapEvent) -> ControllerResult<()> {
        log::debug!("handle {}", event.name());
        for handler in event.handlers() {
            match (handler, &event) {
                (Handler::LeaveEditing, _) => {
                    self.session.leave(&mut self.surface, &mut self.editor);
                }
                (Handler::DiscardDrawing, _) => self.surface.discard_drawn_shape(),
                (
                    Handler::AreaRectangle,
                    MapEvent::VertexDragEnd { layer } | MapEvent::DrawingCommit { layer },
                ) => self.on_area_rectangle(layer).await?,
                (Handler::FeatureCommit, MapEvent::DrawingCommit { layer }) => {
                    self.on_feature_commit(layer).await?
                }
                (
                    Handler::FeatureEdit,
                    MapEvent::VertexDragEnd { layer } | MapEvent::DragEnd { layer },
                ) => self.on_feature_edit(layer).await?,
                (Handler::FeatureClick, MapEvent::FeatureClick { id, modifiers }) => {
                    self.on_feature_click(id, *modifiers).await?
                }
                (Handler::RemoveFeature, MapEvent::FeatureTriggered { id }) => {
                    self.remove_feature(id).await?
                }
                (
                    Handler::StyleChange,
                    MapEvent::StyleChanged {
                        id,
                        options,
                        geometry,
                    },
                ) => self.on_style_changed(id, options, geometry.as_ref()).await?,
                (Handler::AreaButton, MapEvent::AreaButton(action)) => {
                    self.on_area_button(*action).await?
                }
                (handler, event) => {
                    log::warn!("No {:?} handler for {}", handler, event.name());
                }
            }
        }
        Ok(())
    }

    fn enter_editing(&mut self, id: &FeatureId) -> bool {
        let Some(entry) = self.features.get(id) else {
            return false;
        };
        self.session.enter(entry, &mut self.surface, &mut self.editor);
        true
    }

    async fn on_area_rectangle(&mut self, layer: &DrawnLayer) -> ControllerResult<()> {
        if self.mode() != Mode::AreaDefinition || layer.id.is_some() {
            return Ok(());
        }
        let bounds = match layer.geometry.rectangle_bounds() {
            Ok(bounds) => bounds,
            Err(e) => {
                log::warn!("Ignoring area rectangle: {}", e);
                return Ok(());
            }
        };

        let area = Area::from_bounds(&bounds);
        log::info!("Area set to {:?}", area.coords());
        self.model.set_bbox(area);
        self.discard_draft();
        self.events.fire(ViewEvent::BboxChanged);
        self.on_bbox_changed().await
    }

    async fn on_feature_commit(&mut self, layer: &DrawnLayer) -> ControllerResult<()> {
        if !self.mode().allows_features() || layer.id.is_some() {
            return Ok(());
        }
        let model = Arc::clone(&self.model);
        let feature = model
            .add_feature(GeoFeature::from_geometry(layer.geometry.clone()))
            .await?;
        model.save_feature(&feature).await?;
        self.surface.clear_drawing();

        let id = feature.id().clone();
        if !self.enter_editing(&id) {
            self.pending_focus = Some(id.clone());
        }
        self.events.fire(ViewEvent::FeatureAdded(id));
        self.update_popup();
        Ok(())
    }

    async fn on_feature_edit(&mut self, layer: &DrawnLayer) -> ControllerResult<()> {
        let Some(id) = &layer.id else {
            return Ok(());
        };
        if !self.mode().allows_features() {
            return Ok(());
        }
        let model = Arc::clone(&self.model);
        let Some(mut feature) = model.get_feature(id).await? else {
            log::debug!("Edited feature {} no longer exists", id);
            return Ok(());
        };

        feature.set_geometry(layer.geometry.clone());
        self.features.set_geometry(id, layer.geometry.clone());
        model.save_feature(&feature).await?;
        self.events.fire(ViewEvent::FeatureEdited(id.clone()));
        Ok(())
    }

    async fn on_feature_click(&mut self, id: &FeatureId, modifiers: Modifiers) -> ControllerResult<()> {
        if modifiers.deletes() {
            return self.remove_feature(id).await;
        }
        if self.can_edit() {
            self.enter_editing(id);
        }
        Ok(())
    }

    /// Close the editor for `id` and ask the model to delete it. The entry
    /// leaves the layer with the `deleted` event.
    async fn remove_feature(&mut self, id: &FeatureId) -> ControllerResult<()> {
        if self.session.is_editing(id) {
            self.session.leave(&mut self.surface, &mut self.editor);
        } else {
            self.editor.hide();
            self.surface.set_feature_editable(id, false);
        }
        let model = Arc::clone(&self.model);
        model.remove_feature(id).await?;
        Ok(())
    }

    async fn on_style_changed(
        &mut self,
        id: &FeatureId,
        options: &Properties,
        geometry: Option<&Geometry>,
    ) -> ControllerResult<()> {
        let model = Arc::clone(&self.model);
        let Some(mut feature) = model.get_feature(id).await? else {
            log::debug!("Styled feature {} no longer exists", id);
            return Ok(());
        };

        let mut properties = filter_properties(options);
        properties.insert("id".to_string(), Value::String(id.as_str().to_string()));
        properties.insert("map_id".to_string(), Value::String(feature.map_id().to_string()));
        let geometry = geometry
            .cloned()
            .or_else(|| feature.geojson().geometry.clone());

        feature.set_geojson(GeoFeature::new(geometry.clone(), properties.clone()));
        self.features
            .restyle(id, properties, geometry, self.config.markers.as_ref());
        if let Some(entry) = self.features.get(id) {
            self.surface.feature_upserted(entry);
        }

        model.save_feature(&feature).await?;
        if self.can_edit() {
            self.enter_editing(id);
        }
        self.events.fire(ViewEvent::StyleChanged(id.clone()));
        Ok(())
    }

    async fn on_area_button(&mut self, action: AreaAction) -> ControllerResult<()> {
        if self.mode() != Mode::AreaDefinition {
            return Ok(());
        }
        match action {
            AreaAction::Draw | AreaAction::Redraw => {
                self.surface.clear_drawing();
                match self.draft {
                    Some(draft) => self.surface.start_area_drawing(draft.handle),
                    None => log::warn!("No area rectangle to draw into"),
                }
            }
            AreaAction::Continue => {
                let model = Arc::clone(&self.model);
                model.save().await?;
                self.discard_draft();
                self.surface.clear_drawing();
                self.set_mode(Mode::Neutral);
            }
        }
        Ok(())
    }
}
