//! The single-slot editing session.
//!
//! At most one feature is current. Switching to another feature always
//! leaves the current one first, so two features are never editable at the
//! same time.

use crate::geo::FeatureId;
use crate::layer::LayerEntry;
use crate::surface::{StyleEditor, Surface};

/// What `enter` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entered {
    /// The feature was already current; its editor was re-shown.
    Resumed,
    /// The feature became current. Holds the feature that was left, if any.
    Switched { left: Option<FeatureId> },
}

/// Tracks which feature is being edited.
#[derive(Debug, Clone, Default)]
pub struct EditingSession {
    current: Option<FeatureId>,
}

impl EditingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&FeatureId> {
        self.current.as_ref()
    }

    pub fn is_editing(&self, id: &FeatureId) -> bool {
        self.current.as_ref() == Some(id)
    }

    /// Make `entry` the feature being edited.
    pub fn enter(
        &mut self,
        entry: &LayerEntry,
        surface: &mut impl Surface,
        editor: &mut impl StyleEditor,
    ) -> Entered {
        if self.is_editing(&entry.id) {
            surface.set_feature_editable(&entry.id, true);
            editor.show();
            return Entered::Resumed;
        }

        log::debug!("enter editing {}", entry.id);
        let left = self.leave(surface, editor);
        surface.set_feature_editable(&entry.id, true);
        editor.init_change_style(entry);
        self.current = Some(entry.id.clone());
        Entered::Switched { left }
    }

    /// Stop editing. Returns the feature that was current.
    pub fn leave(&mut self, surface: &mut impl Surface, editor: &mut impl StyleEditor) -> Option<FeatureId> {
        let id = self.current.take()?;
        surface.set_feature_editable(&id, false);
        editor.hide();
        Some(id)
    }

    /// Drop `id` from the slot after it disappeared from the layer.
    pub fn forget(&mut self, id: &FeatureId, editor: &mut impl StyleEditor) -> bool {
        if !self.is_editing(id) {
            return false;
        }
        self.current = None;
        editor.hide();
        true
    }
}
