//! Editor mode and the rule tying it to the area of interest.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which set of affordances the editor presents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Unset. Behaves like feature editing once an area exists.
    #[default]
    Neutral,
    /// The operator is (re)defining the area rectangle.
    AreaDefinition,
    /// Features can be drawn, edited and styled.
    FeatureEditing,
}

impl Mode {
    /// Feature interaction is allowed in every mode but area definition.
    pub fn allows_features(self) -> bool {
        self != Mode::AreaDefinition
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Neutral => "",
            Mode::AreaDefinition => "area-definition",
            Mode::FeatureEditing => "feature-editing",
        };
        f.write_str(name)
    }
}

/// Holds the current mode and applies the empty-area override.
#[derive(Debug, Clone, Default)]
pub struct ModeMachine {
    mode: Mode,
}

impl ModeMachine {
    /// Start in `initial` (or neutral), forced to area definition when no
    /// usable area exists.
    pub fn new(initial: Option<Mode>, has_area: bool) -> Self {
        Self {
            mode: Self::resolve(initial.unwrap_or_default(), has_area),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The mode that `requested` resolves to given the area state.
    pub fn resolve(requested: Mode, has_area: bool) -> Mode {
        if has_area {
            requested
        } else {
            Mode::AreaDefinition
        }
    }

    /// Request a mode. Returns the new mode if it actually changed.
    pub fn set(&mut self, requested: Mode, has_area: bool) -> Option<Mode> {
        if requested == self.mode {
            return None;
        }
        let resolved = Self::resolve(requested, has_area);
        if resolved == self.mode {
            return None;
        }
        self.mode = resolved;
        Some(resolved)
    }
}
