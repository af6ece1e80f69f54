//! Pure derivation of UI affordances from controller state.
//!
//! Nothing here touches the widget. The controller derives an
//! [`Affordances`] value after every state change and applies it to the
//! surface in a separate step.

use crate::mode::Mode;

/// The inputs affordances depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    pub authenticated: bool,
    pub mode: Mode,
    pub has_area: bool,
    pub grid_count: usize,
    pub feature_count: usize,
    pub has_draft: bool,
}

/// Buttons attached to the area rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AreaAction {
    Draw,
    Redraw,
    Continue,
}

impl AreaAction {
    /// Translation key of the button label.
    pub fn label_key(self) -> &'static str {
        match self {
            AreaAction::Draw => "Draw",
            AreaAction::Redraw => "Redraw",
            AreaAction::Continue => "Continue",
        }
    }

    /// Whether the button is rendered as the primary call to action.
    pub fn is_primary(self) -> bool {
        self == AreaAction::Continue
    }
}

/// What to do with the area rectangle tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaTool {
    /// Nothing to show.
    Hidden,
    /// Disable and drop the current draft rectangle.
    DiscardDraft,
    /// Offer a fresh draft rectangle with these buttons.
    Buttons {
        primary: AreaAction,
        can_continue: bool,
    },
}

impl AreaTool {
    /// Buttons in display order.
    pub fn actions(&self) -> Vec<AreaAction> {
        match *self {
            AreaTool::Buttons { primary, can_continue } => {
                let mut actions = vec![primary];
                if can_continue {
                    actions.push(AreaAction::Continue);
                }
                actions
            }
            _ => Vec::new(),
        }
    }
}

/// Everything the surface should present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    /// Feature drawing controls.
    pub edit_controls: bool,
    pub style_editor: bool,
    pub area_tool: AreaTool,
    /// The introduction popup over the grid.
    pub intro_popup: bool,
}

/// Derive affordances from state.
pub fn derive(state: &ViewState) -> Affordances {
    let editing = state.authenticated && state.mode.allows_features();

    // An anonymous user loses an existing draft but is offered a fresh one.
    let offer = state.mode == Mode::AreaDefinition && (state.authenticated || !state.has_draft);
    let area_tool = if offer {
        AreaTool::Buttons {
            primary: if state.has_area { AreaAction::Redraw } else { AreaAction::Draw },
            can_continue: state.grid_count > 0,
        }
    } else if state.has_draft {
        AreaTool::DiscardDraft
    } else {
        AreaTool::Hidden
    };

    Affordances {
        edit_controls: editing,
        style_editor: editing,
        area_tool,
        intro_popup: editing && state.grid_count > 0 && state.feature_count == 0,
    }
}
