//! Data types exchanged between the dashboard and the stage
//!
//! Everything that crosses the window boundary is serialized as an [`Envelope`]
//! holding either a [`StageMessage`] (dashboard → stage) or a [`ControlEvent`]
//! (stage → dashboard).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Wire protocol version carried by every envelope
pub const PROTOCOL_VERSION: u16 = 1;

/// Font size bounds (px)
pub const FONT_SIZE_MIN: u32 = 24;
pub const FONT_SIZE_MAX: u32 = 72;

/// Scroll speed bounds (px/s)
pub const SPEED_MIN: f64 = 20.0;
pub const SPEED_MAX: f64 = 200.0;

/// Line height bounds and slider step
pub const LINE_HEIGHT_MIN: f64 = 1.0;
pub const LINE_HEIGHT_MAX: f64 = 3.0;
pub const LINE_HEIGHT_STEP: f64 = 0.1;

/// Fixed font size used by the dashboard preview
pub const PREVIEW_FONT_SIZE: u32 = 18;

const WELCOME_TEXT: &str = "Welcome to Stage Prompter!\n\n\
Load your script with the controls on the dashboard.\n\n\
Supported formats:\n\
• .txt files\n\
• .docx files\n\n\
Open the stage to show the prompter on another screen.";

const STAGE_WAITING_TEXT: &str = "Waiting for the dashboard…";

// ============================================================================
// PRESENTATION STATE
// ============================================================================

/// Everything the stage needs to render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationState {
    pub text: String,
    /// Font size in px (24–72)
    pub font_size: u32,
    /// Text color (CSS color)
    pub color: String,
    /// Background color (CSS color)
    pub bg_color: String,
    /// Scroll speed in px/s (20–200)
    pub speed: f64,
    pub is_playing: bool,
    pub is_mirrored: bool,
    /// Line height multiplier (1.0–3.0, step 0.1)
    pub line_height: f64,
    /// Scroll position in px
    pub position: f64,
}

impl PresentationState {
    /// State the dashboard starts with
    pub fn welcome() -> Self {
        Self {
            text: WELCOME_TEXT.to_string(),
            font_size: 32,
            color: "#e5e7eb".to_string(),
            bg_color: "#000000".to_string(),
            speed: 60.0,
            is_playing: false,
            is_mirrored: false,
            line_height: 1.5,
            position: 0.0,
        }
    }

    /// State the stage shows until the first update arrives
    pub fn stage_initial() -> Self {
        Self {
            text: STAGE_WAITING_TEXT.to_string(),
            font_size: 48,
            line_height: 1.4,
            ..Self::welcome()
        }
    }

    /// Pure merge: fields present in `update` replace ours, the rest are kept
    pub fn merged(&self, update: &StateUpdate) -> Self {
        Self {
            text: update.text.clone().unwrap_or_else(|| self.text.clone()),
            font_size: update.font_size.unwrap_or(self.font_size),
            color: update.color.clone().unwrap_or_else(|| self.color.clone()),
            bg_color: update.bg_color.clone().unwrap_or_else(|| self.bg_color.clone()),
            speed: update.speed.unwrap_or(self.speed),
            is_playing: update.is_playing.unwrap_or(self.is_playing),
            is_mirrored: update.is_mirrored.unwrap_or(self.is_mirrored),
            line_height: update.line_height.unwrap_or(self.line_height),
            position: update.position.unwrap_or(self.position),
        }
    }

    /// Full update carrying every field except `position`
    ///
    /// The stage owns its scroll offset between updates, so routine
    /// synchronization never moves it.
    pub fn to_update(&self) -> StateUpdate {
        StateUpdate {
            text: Some(self.text.clone()),
            font_size: Some(self.font_size),
            color: Some(self.color.clone()),
            bg_color: Some(self.bg_color.clone()),
            speed: Some(self.speed),
            is_playing: Some(self.is_playing),
            is_mirrored: Some(self.is_mirrored),
            line_height: Some(self.line_height),
            position: None,
        }
    }

    pub fn stats(&self) -> TextStats {
        TextStats::from_text(&self.text)
    }
}

impl Default for PresentationState {
    fn default() -> Self {
        Self::welcome()
    }
}

/// Clamp a font size into the supported range
pub fn clamp_font_size(size: u32) -> u32 {
    size.clamp(FONT_SIZE_MIN, FONT_SIZE_MAX)
}

/// Clamp a scroll speed into the supported range
pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        return SPEED_MIN;
    }
    speed.clamp(SPEED_MIN, SPEED_MAX)
}

/// Clamp a line height and snap it to the slider step
pub fn snap_line_height(line_height: f64) -> f64 {
    if line_height.is_nan() {
        return LINE_HEIGHT_MIN;
    }
    let clamped = line_height.clamp(LINE_HEIGHT_MIN, LINE_HEIGHT_MAX);
    (clamped / LINE_HEIGHT_STEP).round() * LINE_HEIGHT_STEP
}

// ============================================================================
// PARTIAL UPDATES
// ============================================================================

/// Partial [`PresentationState`]; absent fields mean "leave as is"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_playing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_mirrored: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,
}

impl StateUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_position(mut self, position: f64) -> Self {
        self.position = Some(position);
        self
    }
}

// ============================================================================
// MESSAGES
// ============================================================================

/// Commands sent from the stage to the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlEvent {
    /// Flip play/pause
    TogglePlay,
    /// Scroll back to the top and pause
    #[serde(rename = "resetPosition")]
    Reset,
    /// Change the speed by `delta` px/s
    AdjustSpeed { delta: f64 },
    /// Stage-side scroll offset, so the dashboard can display it
    ///
    /// `seq` is the last dashboard frame the stage had applied when it measured
    /// the offset; reports older than the dashboard's latest reset or seek are stale.
    ReportPosition { position: f64, seq: u64 },
}

/// Messages sent from the dashboard to the stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StageMessage {
    /// Merge these fields into the stage replica
    State { update: StateUpdate },
    /// Snap to the top, cancel any pending frame and pause
    Reset,
}

/// Versioned, sequenced wire frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub version: u16,
    pub seq: u64,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(seq: u64, payload: T) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            seq,
            payload,
        }
    }
}

// ============================================================================
// TEXT STATS
// ============================================================================

/// Character and word counts shown next to the preview
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextStats {
    pub characters: usize,
    pub words: usize,
}

impl TextStats {
    pub fn from_text(text: &str) -> Self {
        Self {
            characters: text.chars().count(),
            words: text.split_whitespace().count(),
        }
    }
}

// ============================================================================
// CSS COLORS
// ============================================================================

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
        .expect("hex color pattern")
});

static FUNCTIONAL_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?i)(?:rgba?|hsla?)\(\s*[-+.\d]+(?:deg|rad|turn|%)?(?:\s*[,/\s]\s*[-+.\d]+(?:deg|rad|turn|%)?){2,3}\s*\)$",
    )
    .expect("functional color pattern")
});

const NAMED_COLORS: &[&str] = &[
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
    "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
    "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan", "darkblue",
    "darkcyan", "darkgoldenrod", "darkgray", "darkgreen", "darkgrey", "darkkhaki",
    "darkmagenta", "darkolivegreen", "darkorange", "darkorchid", "darkred", "darksalmon",
    "darkseagreen", "darkslateblue", "darkslategray", "darkslategrey", "darkturquoise",
    "darkviolet", "deeppink", "deepskyblue", "dimgray", "dimgrey", "dodgerblue", "firebrick",
    "floralwhite", "forestgreen", "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod",
    "gray", "green", "greenyellow", "grey", "honeydew", "hotpink", "indianred", "indigo",
    "ivory", "khaki", "lavender", "lavenderblush", "lawngreen", "lemonchiffon", "lightblue",
    "lightcoral", "lightcyan", "lightgoldenrodyellow", "lightgray", "lightgreen", "lightgrey",
    "lightpink", "lightsalmon", "lightseagreen", "lightskyblue", "lightslategray",
    "lightslategrey", "lightsteelblue", "lightyellow", "lime", "limegreen", "linen", "magenta",
    "maroon", "mediumaquamarine", "mediumblue", "mediumorchid", "mediumpurple",
    "mediumseagreen", "mediumslateblue", "mediumspringgreen", "mediumturquoise",
    "mediumvioletred", "midnightblue", "mintcream", "mistyrose", "moccasin", "navajowhite",
    "navy", "oldlace", "olive", "olivedrab", "orange", "orangered", "orchid", "palegoldenrod",
    "palegreen", "paleturquoise", "palevioletred", "papayawhip", "peachpuff", "peru", "pink",
    "plum", "powderblue", "purple", "rebeccapurple", "red", "rosybrown", "royalblue",
    "saddlebrown", "salmon", "sandybrown", "seagreen", "seashell", "sienna", "silver",
    "skyblue", "slateblue", "slategray", "slategrey", "snow", "springgreen", "steelblue", "tan",
    "teal", "thistle", "tomato", "turquoise", "violet", "wheat", "white", "whitesmoke",
    "yellow", "yellowgreen", "transparent", "currentcolor",
];

/// Check whether `value` is a CSS color the stage can render
pub fn is_valid_css_color(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    if HEX_COLOR.is_match(value) || FUNCTIONAL_COLOR.is_match(value) {
        return true;
    }
    let lower = value.to_ascii_lowercase();
    NAMED_COLORS.contains(&lower.as_str())
}
