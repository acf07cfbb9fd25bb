//! Pin record types.
//!
//! [`RawPin`] is the untyped record an input adapter produces: every field is
//! the text found in the source. [`PinRecord`] is the canonical, resolved form
//! the rest of the engine works with.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the symbol body a pin is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Left edge, pin points right into the body.
    #[default]
    Left,
    /// Right edge.
    Right,
    /// Top edge.
    Top,
    /// Bottom edge.
    Bottom,
}

impl Side {
    /// All sides in layout order.
    pub const ALL: [Self; 4] = [Self::Left, Self::Right, Self::Top, Self::Bottom];

    /// Stable index used for per-side arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Top => 2,
            Self::Bottom => 3,
        }
    }

    /// Canonical keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }

    /// Pin angle (degrees) for a pin on this side.
    ///
    /// The angle is the direction from the connection point towards the body.
    #[must_use]
    pub const fn angle(self) -> u16 {
        match self {
            Self::Left => 0,
            Self::Bottom => 90,
            Self::Right => 180,
            Self::Top => 270,
        }
    }

    /// Side implied by a pin angle. Angles are normalised to `0..360`.
    #[must_use]
    pub const fn from_angle(angle: i64) -> Option<Self> {
        match angle.rem_euclid(360) {
            0 => Some(Self::Left),
            90 => Some(Self::Bottom),
            180 => Some(Self::Right),
            270 => Some(Self::Top),
            _ => None,
        }
    }
}

/// Electrical type of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinType {
    /// Input.
    Input,
    /// Output.
    Output,
    /// Bidirectional (input/output).
    Bidirectional,
    /// Tri-state output.
    TriState,
    /// Passive (resistor, capacitor terminal).
    Passive,
    /// Unspecified.
    #[default]
    Unspecified,
    /// Power input (VCC, GND).
    PowerIn,
    /// Power output (regulator output).
    PowerOut,
    /// Open collector output.
    OpenCollector,
    /// Open emitter output.
    OpenEmitter,
    /// Not connected.
    NoConnect,
    /// Free (no ERC checks).
    Free,
}

impl PinType {
    /// Keyword used in the symbol-library format.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Bidirectional => "bidirectional",
            Self::TriState => "tri_state",
            Self::Passive => "passive",
            Self::Unspecified => "unspecified",
            Self::PowerIn => "power_in",
            Self::PowerOut => "power_out",
            Self::OpenCollector => "open_collector",
            Self::OpenEmitter => "open_emitter",
            Self::NoConnect => "no_connect",
            Self::Free => "free",
        }
    }

    /// Whether identically-named pins of this type may be bundled.
    #[must_use]
    pub const fn is_bundle_eligible(self) -> bool {
        matches!(self, Self::PowerIn | Self::PowerOut | Self::NoConnect)
    }
}

/// Graphic style of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinStyle {
    /// Plain line.
    #[default]
    Line,
    /// Inversion bubble.
    Inverted,
    /// Clock wedge.
    Clock,
    /// Bubble plus clock wedge.
    InvertedClock,
    /// Active-low input bar.
    InputLow,
    /// Active-low clock.
    ClockLow,
    /// Active-low output bar.
    OutputLow,
    /// Falling-edge clock.
    EdgeClockHigh,
    /// Non-logic (analog) marker.
    NonLogic,
}

impl PinStyle {
    /// Keyword used in the symbol-library format.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Inverted => "inverted",
            Self::Clock => "clock",
            Self::InvertedClock => "inverted_clock",
            Self::InputLow => "input_low",
            Self::ClockLow => "clock_low",
            Self::OutputLow => "output_low",
            Self::EdgeClockHigh => "edge_clock_high",
            Self::NonLogic => "non_logic",
        }
    }
}

macro_rules! keyword_display {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.keyword())
            }
        })*
    };
}

keyword_display!(Side, PinType, PinStyle);

/// A pin as read from an input source, before any interpretation.
///
/// Empty strings mean "not given"; the arrange stage fills in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPin {
    /// Pin number; may start with `*` spacer markers.
    pub number: String,
    /// Pin name, possibly holding alternates separated by a delimiter.
    pub name: String,
    /// Unit identifier.
    #[serde(default)]
    pub unit: String,
    /// Side token.
    #[serde(default)]
    pub side: String,
    /// Electrical type token.
    #[serde(default)]
    pub pin_type: String,
    /// Graphic style token.
    #[serde(default)]
    pub style: String,
    /// Hidden flag token (yes/no/true/false/1/0).
    #[serde(default)]
    pub hidden: String,
}

impl RawPin {
    /// Creates a raw pin with only a number and a name.
    #[must_use]
    pub fn new(number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A canonical pin record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinRecord {
    /// Pin number (numeric or alphanumeric). A run of leading `*` marks a spacer.
    pub number: String,
    /// Primary pin name.
    pub name: String,
    /// Alternate function names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternates: Vec<String>,
    /// Unit identifier; empty for the unlabeled unit.
    #[serde(default)]
    pub unit: String,
    /// Body side.
    #[serde(default)]
    pub side: Side,
    /// Electrical type.
    #[serde(default)]
    pub pin_type: PinType,
    /// Graphic style.
    #[serde(default)]
    pub style: PinStyle,
    /// Whether the pin is hidden.
    #[serde(default)]
    pub hidden: bool,
}

impl PinRecord {
    /// Creates a visible pin on the left side of the unlabeled unit.
    #[must_use]
    pub fn new(number: impl Into<String>, name: impl Into<String>, pin_type: PinType) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
            alternates: Vec::new(),
            unit: String::new(),
            side: Side::Left,
            pin_type,
            style: PinStyle::Line,
            hidden: false,
        }
    }

    /// Sets the side.
    #[must_use]
    pub const fn on(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    /// Sets the unit.
    #[must_use]
    pub fn in_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Sets the style.
    #[must_use]
    pub const fn styled(mut self, style: PinStyle) -> Self {
        self.style = style;
        self
    }

    /// Number of leading `*` spacer markers.
    #[must_use]
    pub fn spacer_count(&self) -> usize {
        self.number.chars().take_while(|&c| c == '*').count()
    }

    /// Whether this record is purely a spacer (only `*` characters).
    #[must_use]
    pub fn is_spacer(&self) -> bool {
        !self.number.is_empty() && self.number.chars().all(|c| c == '*')
    }

    /// Pin number with any spacer markers removed.
    #[must_use]
    pub fn bare_number(&self) -> &str {
        self.number.trim_start_matches('*')
    }
}
