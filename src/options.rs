//! Construction options for the editor widget.
//!
//! Serializes to the camelCase object the editor's `create` call expects.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LANGUAGE: &str = "markdown";
pub const DEFAULT_FONT_FAMILY: &str = "Noto Sans JP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineNumbers {
    On,
    Off,
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollbarVisibility {
    Auto,
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minimap {
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scrollbar {
    pub vertical: ScrollbarVisibility,
}

/// The fixed option set used for the note surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorOptions {
    pub automatic_layout: bool,
    pub language: String,
    pub glyph_margin: bool,
    pub line_numbers: LineNumbers,
    pub minimap: Minimap,
    pub read_only: bool,
    pub font_family: String,
    pub folding: bool,
    pub line_decorations_width: u32,
    pub line_numbers_min_chars: u32,
    pub scrollbar: Scrollbar,
}

impl EditorOptions {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_font_family(mut self, font_family: impl Into<String>) -> Self {
        self.font_family = font_family.into();
        self
    }

    /// The options object as JSON, ready to hand to the editor.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            automatic_layout: true,
            language: DEFAULT_LANGUAGE.to_string(),
            glyph_margin: false,
            line_numbers: LineNumbers::Off,
            minimap: Minimap { enabled: false },
            read_only: true,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            folding: false,
            line_decorations_width: 0,
            line_numbers_min_chars: 0,
            scrollbar: Scrollbar {
                vertical: ScrollbarVisibility::Visible,
            },
        }
    }
}

/// Partial update sent through `updateOptions` after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsUpdate {
    pub read_only: bool,
}
