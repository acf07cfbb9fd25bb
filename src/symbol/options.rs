//! Layout options threaded through the arrange, layout and writer stages.
//!
//! One immutable [`LayoutOptions`] value carries every knob. It deserialises
//! from the `layout` block of the configuration file and is then overridden
//! by command-line flags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::pin::{PinStyle, PinType, Side};

/// Pin ordering policy applied per unit and side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Keep input order.
    #[default]
    Row,
    /// Natural order of pin numbers.
    Num,
    /// Natural order of pin names.
    Name,
}

/// Suffix appended to the displayed name of a bundled pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Annotation {
    /// No suffix.
    None,
    /// `[n]` where n is the number of merged pins.
    #[default]
    Count,
    /// `[n:0]`.
    Range,
}

/// Body fill of the unit rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStyle {
    /// Unfilled.
    NoFill,
    /// Filled with the outline (foreground) colour.
    Foreground,
    /// Filled with the body background colour.
    #[default]
    Background,
}

impl FillStyle {
    /// Fill keyword in the symbol-library format.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::NoFill => "none",
            Self::Foreground => "outline",
            Self::Background => "background",
        }
    }
}

macro_rules! option_enum_text {
    (@first $first:literal $(, $rest:literal)*) => { $first };
    ($ty:ty { $($variant:ident => [$($text:literal),+]),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($($text)|+ => Ok(Self::$variant),)+
                    other => Err(format!(
                        "invalid value '{other}'; expected one of: {}",
                        [$(option_enum_text!(@first $($text),+)),+].join(", ")
                    )),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => f.write_str(option_enum_text!(@first $($text),+)),)+
                }
            }
        }
    };
}

option_enum_text!(SortMode {
    Row => ["row"],
    Num => ["num", "number"],
    Name => ["name"],
});

option_enum_text!(Annotation {
    None => ["none"],
    Count => ["count"],
    Range => ["range"],
});

option_enum_text!(FillStyle {
    NoFill => ["no_fill", "none", "no-fill"],
    Foreground => ["foreground", "fg", "outline"],
    Background => ["background", "bg"],
});

/// Options controlling how parts are arranged, laid out and written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutOptions {
    /// Pin ordering policy.
    pub sort: SortMode,
    /// Invert the per-side order after sorting.
    pub reverse: bool,
    /// Side for pins that do not name one.
    pub default_side: Side,
    /// Electrical type for pins that do not name one.
    pub default_type: PinType,
    /// Graphic style for pins that do not name one.
    pub default_style: PinStyle,
    /// Merge identically-named power and no-connect pins.
    pub bundle: bool,
    /// Suffix style for bundled pin names.
    pub annotation: Annotation,
    /// Position of each pin group along its side, 0.0 (start) to 1.0 (end).
    pub push: f64,
    /// Tuck left/right columns under the top/bottom rows.
    pub scrunch: bool,
    /// Walk the perimeter counter-clockwise.
    pub ccw: bool,
    /// Anchor the centroid of the pins at the origin instead of pin 1.
    pub center: bool,
    /// Outline width of the unit rectangle.
    pub box_line_width: f64,
    /// Body fill.
    pub fill: FillStyle,
    /// Delimiter separating alternate names in a pin name.
    pub alt_delimiter: Option<char>,
    /// Accept approximate mnemonic matches.
    pub fuzzy: bool,
}

/// Default body outline width (mm).
pub const DEFAULT_BOX_LINE_WIDTH: f64 = 0.254;

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            sort: SortMode::Row,
            reverse: false,
            default_side: Side::Left,
            default_type: PinType::Unspecified,
            default_style: PinStyle::Line,
            bundle: false,
            annotation: Annotation::Count,
            push: 0.5,
            scrunch: false,
            ccw: false,
            center: false,
            box_line_width: DEFAULT_BOX_LINE_WIDTH,
            fill: FillStyle::Background,
            alt_delimiter: None,
            fuzzy: false,
        }
    }
}
