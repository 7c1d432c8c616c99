//! Typed field-widget attributes.
//!
//! Widgets receive loosely-typed attribute blobs from view definitions. These
//! types parse them once, keep only the recognized keys, and fall back to
//! fixed defaults when a key is absent or unusable.

use serde_json::{Map, Value};

/// Colour attributes of the `change_color` widget.
///
/// Parsed from the widget's `attrs` JSON, e.g.
/// `{"color": "#f37c21", "header-color": "#f37c21"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorAttrs {
    pub color: String,
    pub header_color: Option<String>,
}

impl ColorAttrs {
    pub const DEFAULT_COLOR: &'static str = "black";

    pub fn from_attrs(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        let parsed: Map<String, Value> = match serde_json::from_str(raw) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!("Ignoring unparsable colour attrs {:?}: {}", raw, e);
                return Self::default();
            }
        };

        let color = parsed
            .get("color")
            .and_then(css_color)
            .unwrap_or_else(|| Self::DEFAULT_COLOR.to_string());
        let header_color = parsed.get("header-color").map(|value| {
            css_color(value).unwrap_or_else(|| Self::DEFAULT_COLOR.to_string())
        });

        Self {
            color,
            header_color,
        }
    }

    /// Colour for the list header cell, if the header is themed at all.
    pub fn header_color(&self) -> Option<&str> {
        self.header_color.as_deref()
    }
}

impl Default for ColorAttrs {
    fn default() -> Self {
        Self {
            color: Self::DEFAULT_COLOR.to_string(),
            header_color: None,
        }
    }
}

/// Accept a string usable as a CSS colour value.
fn css_color(value: &Value) -> Option<String> {
    let text = value.as_str()?.trim();
    let allowed = |c: char| c.is_ascii_alphanumeric() || "#(),.% ".contains(c);
    if text.is_empty() || !text.chars().all(allowed) {
        return None;
    }
    Some(text.to_string())
}

/// Visual variant of a fake button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ButtonType {
    #[default]
    Primary,
    Secondary,
}

impl ButtonType {
    /// Unknown or missing values map to `Primary`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("secondary") => ButtonType::Secondary,
            _ => ButtonType::Primary,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            ButtonType::Primary => "btn-primary",
            ButtonType::Secondary => "btn-secondary",
        }
    }
}

/// Attributes of a boolean field rendered as a button that toggles its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeButtonAttrs {
    pub text: String,
    pub button_type: ButtonType,
}

impl FakeButtonAttrs {
    /// Build from the field's `options` map and `button_type` attribute.
    pub fn from_parts(options: &Map<String, Value>, button_type: Option<&str>) -> Self {
        Self {
            text: options
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            button_type: ButtonType::parse(button_type),
        }
    }

    /// A click flips the bound boolean so the server-side onchange runs.
    pub fn toggled(current: bool) -> bool {
        !current
    }
}

/// Control-panel visibility derived from an action context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlPanelContext {
    pub hide_right_cp: bool,
}

impl ControlPanelContext {
    pub fn from_context(context: &Map<String, Value>) -> Self {
        Self {
            hide_right_cp: context.get("hide_right_cp").is_some_and(truthy),
        }
    }

    /// Whether the search view and the right-hand panel are shown.
    pub fn right_panels_visible(&self) -> bool {
        !self.hide_right_cp
    }
}

/// Creation flags for relational (many2one) fields.
///
/// Creating records from the dropdown is always disabled; opening the linked
/// record still follows `no_open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoCreateFlags {
    pub can_create: bool,
    pub can_quick_create: bool,
    pub can_open: bool,
}

impl NoCreateFlags {
    pub fn from_options(options: &Map<String, Value>) -> Self {
        Self {
            can_create: false,
            can_quick_create: false,
            can_open: !options.get("no_open").is_some_and(truthy),
        }
    }
}

/// Loose truthiness for context and option values.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
