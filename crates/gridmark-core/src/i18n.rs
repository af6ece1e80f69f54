//! String lookup for user-facing labels.

use std::collections::HashMap;

/// Translate a key into display text.
pub trait Translate {
    fn translate(&self, key: &str) -> String;
}

/// Returns keys unchanged. Used when no catalog is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Translate for Identity {
    fn translate(&self, key: &str) -> String {
        key.to_string()
    }
}

const EN: &[(&str, &str)] = &[
    ("Draw", "Draw"),
    ("Redraw", "Redraw"),
    ("Continue", "Continue"),
    (
        "introduction",
        "Draw markers, lines and areas on the grid to plan your action. \
         Click a feature to change its style, ctrl-click to delete it.",
    ),
];

const DE: &[(&str, &str)] = &[
    ("Draw", "Zeichnen"),
    ("Redraw", "Neu zeichnen"),
    ("Continue", "Weiter"),
    (
        "introduction",
        "Zeichne Marker, Linien und Flächen auf das Raster, um deine Aktion zu planen. \
         Klicke auf ein Objekt, um es zu gestalten, Strg-Klick löscht es.",
    ),
];

/// Built-in translation catalog with language fallback.
#[derive(Debug, Clone)]
pub struct Catalog {
    language: String,
    fallback: String,
    resources: HashMap<String, HashMap<String, String>>,
}

impl Catalog {
    /// Catalog with the bundled `en` and `de` resources.
    pub fn builtin(language: &str, fallback: &str) -> Self {
        let mut catalog = Self {
            language: language.to_string(),
            fallback: fallback.to_string(),
            resources: HashMap::new(),
        };
        catalog.add_resources("en", EN.iter().copied());
        catalog.add_resources("de", DE.iter().copied());
        catalog
    }

    /// Add or override entries of a language.
    pub fn add_resources<'a>(&mut self, language: &str, entries: impl IntoIterator<Item = (&'a str, &'a str)>) {
        let table = self.resources.entry(language.to_string()).or_default();
        for (key, value) in entries {
            table.insert(key.to_string(), value.to_string());
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn lookup(&self, language: &str, key: &str) -> Option<&str> {
        self.resources.get(language)?.get(key).map(String::as_str)
    }
}

impl Translate for Catalog {
    fn translate(&self, key: &str) -> String {
        self.lookup(&self.language, key)
            .or_else(|| self.lookup(&self.fallback, key))
            .unwrap_or(key)
            .to_string()
    }
}
