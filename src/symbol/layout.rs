//! Geometry layout: body size, pin coordinates and property anchors.
//!
//! All dimensions are in millimetres on a 1.27 mm (50 mil) grid, with the
//! Y axis pointing up as in the symbol-library format.
//!
//! # Algorithm
//!
//! For each unit the four side lists are measured as if they were vertical
//! columns: width is the longest pin label plus the name offset, height is
//! the slot count times the pin pitch. The top and bottom measurements are
//! then transposed, and the body is sized so that:
//!
//! - left/right label columns fit beside the top/bottom pin rows, or
//! - with `scrunch` and three or more occupied sides, the left/right
//!   columns tuck under the top/bottom rows.
//!
//! Pins on each side are spaced at the pin pitch and the group is offset
//! along the side by `push` times the unused length. Finally the whole part
//! is translated so pin 1 (or the pin centroid with `center`) sits at the
//! origin. The computation is a pure function of its inputs.

use super::arrange::{ArrangedPart, ArrangedPin, ArrangedUnit, Slot};
use super::options::LayoutOptions;
use super::pin::Side;

/// Drawing grid (mm).
pub const GRID: f64 = 1.27;
/// Text size for pin names, numbers and properties (mm).
pub const FONT_SIZE: f64 = 1.27;
/// Distance between adjacent pins on a side (mm).
pub const PIN_PITCH: f64 = 2.0 * GRID;
/// Shortest pin stub (mm).
pub const MIN_PIN_LENGTH: f64 = 4.0 * GRID;
/// Gap between the body edge and the start of a pin name (mm).
pub const PIN_NAME_OFFSET: f64 = 0.85;
/// Clearance between a body corner and the nearest pin (mm).
pub const SIDE_CLEARANCE: f64 = GRID;
/// Minimum gap between opposing left/right labels (mm).
pub const LR_SEPARATION: f64 = 2.0 * GRID;
/// Minimum gap between opposing top/bottom labels (mm).
pub const TB_SEPARATION: f64 = 2.0 * GRID;

/// How [`gridify`] rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// To the nearest grid line.
    Nearest,
    /// Towards positive infinity.
    Up,
    /// Towards negative infinity.
    Down,
}

/// Snaps `value` to a multiple of [`GRID`].
#[must_use]
pub fn gridify(value: f64, rounding: Rounding) -> f64 {
    let steps = value / GRID;
    let steps = match rounding {
        Rounding::Nearest => steps.round(),
        Rounding::Up => (steps - 1e-9).ceil(),
        Rounding::Down => (steps + 1e-9).floor(),
    };
    steps * GRID
}

/// Approximate rendered width of `text` at [`FONT_SIZE`].
#[must_use]
pub fn text_width(text: &str) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let chars = text.chars().count() as f64;
    chars * FONT_SIZE * 0.9
}

/// A point in symbol coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X (mm).
    pub x: f64,
    /// Y (mm), up positive.
    pub y: f64,
}

impl Point {
    /// Creates a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn shifted(self, dx: f64, dy: f64) -> Self {
        Self::new(
            gridify(self.x + dx, Rounding::Nearest),
            gridify(self.y + dy, Rounding::Nearest),
        )
    }
}

/// An axis-aligned rectangle; `start` is the lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Lower-left corner.
    pub start: Point,
    /// Upper-right corner.
    pub end: Point,
}

impl Rect {
    /// Width of the rectangle.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.end.x - self.start.x
    }

    /// Height of the rectangle.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.end.y - self.start.y
    }

    fn union(&self, other: &Self) -> Self {
        Self {
            start: Point::new(self.start.x.min(other.start.x), self.start.y.min(other.start.y)),
            end: Point::new(self.end.x.max(other.end.x), self.end.y.max(other.end.y)),
        }
    }
}

/// A pin with its connection point.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPin {
    /// The arranged pin.
    pub pin: ArrangedPin,
    /// Side of the body.
    pub side: Side,
    /// Connection point (outer end of the stub).
    pub at: Point,
    /// Direction from the connection point towards the body, in degrees.
    pub angle: u16,
    /// Stub length.
    pub length: f64,
}

/// Geometry of one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitGeometry {
    /// Unit identifier.
    pub id: String,
    /// Body rectangle.
    pub body: Rect,
    /// Placed pins, side by side in placement order.
    pub pins: Vec<PlacedPin>,
}

/// Geometry of a whole part.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolGeometry {
    /// Per-unit geometry, in unit order.
    pub units: Vec<UnitGeometry>,
    /// Stub length shared by every pin of the part.
    pub pin_length: f64,
    /// Union of every unit body.
    pub bounds: Rect,
}

impl SymbolGeometry {
    /// Anchor of the `row`-th property text line.
    ///
    /// Property text is stacked upwards from the top-left corner of the union
    /// of all unit bodies, so no unit can overlap it.
    #[must_use]
    pub fn property_anchor(&self, row: usize) -> Point {
        #[allow(clippy::cast_precision_loss)]
        let row = row as f64;
        Point::new(
            self.bounds.start.x,
            self.bounds.end.y + (0.5 + 2.0 * row) * GRID,
        )
    }
}

/// Longest rendered label of a pin, considering alternate names.
fn label_width(pin: &ArrangedPin) -> f64 {
    pin.alternates
        .iter()
        .map(|a| text_width(a))
        .fold(text_width(&pin.label), f64::max)
}

/// Stub length long enough for the longest pin number of the part.
fn pin_length(part: &ArrangedPart) -> f64 {
    let longest = part
        .units
        .iter()
        .flat_map(|u| u.pins())
        .flat_map(|p| p.numbers.iter())
        .map(|n| text_width(&format!("{n}  ")))
        .fold(0.0, f64::max);
    gridify(longest.max(MIN_PIN_LENGTH), Rounding::Up)
}

#[derive(Debug, Clone, Copy, Default)]
struct Extent {
    width: f64,
    height: f64,
}

fn side_extent(slots: &[Slot]) -> Extent {
    let width = slots
        .iter()
        .filter_map(Slot::pin)
        .map(|p| label_width(p) + PIN_NAME_OFFSET)
        .fold(0.0, f64::max);
    #[allow(clippy::cast_precision_loss)]
    let height = slots.len() as f64 * PIN_PITCH;
    Extent { width, height }
}

/// Offset of a group of `count` slots within a span of length `span`.
fn push_offset(push: f64, span: f64, count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let used = count as f64 * PIN_PITCH;
    gridify(push * (span - used), Rounding::Nearest)
}

fn layout_unit(unit: &ArrangedUnit, length: f64, opts: &LayoutOptions) -> UnitGeometry {
    let ext = |side: Side| side_extent(unit.side(side));
    let (left, right) = (ext(Side::Left), ext(Side::Right));
    // Top and bottom columns are measured upright, then transposed.
    let top = ext(Side::Top);
    let bottom = ext(Side::Bottom);
    let (top, bottom) = (
        Extent { width: top.height, height: top.width },
        Extent { width: bottom.height, height: bottom.width },
    );

    let lr_height = gridify(left.height.max(right.height), Rounding::Up);
    let lr_width = gridify(left.width.max(right.width).max(SIDE_CLEARANCE), Rounding::Up);
    let tb_height = gridify(top.height.max(bottom.height).max(SIDE_CLEARANCE), Rounding::Up);
    let tb_width = gridify(top.width.max(bottom.width), Rounding::Up);

    let occupied = unit.sides.iter().filter(|s| !s.is_empty()).count();
    let scrunch = opts.scrunch && occupied >= 3;

    let (width, height) = if scrunch {
        (
            (tb_width + 2.0 * SIDE_CLEARANCE).max(LR_SEPARATION).max(2.0 * lr_width),
            2.0 * tb_height + lr_height + 2.0 * SIDE_CLEARANCE,
        )
    } else {
        (
            2.0 * lr_width.max(SIDE_CLEARANCE) + tb_width.max(LR_SEPARATION),
            2.0 * tb_height.max(SIDE_CLEARANCE) + lr_height.max(TB_SEPARATION),
        )
    };

    let x0 = gridify(-width / 2.0, Rounding::Nearest);
    let y0 = gridify(-height / 2.0, Rounding::Nearest);
    let x1 = gridify(width / 2.0, Rounding::Nearest);
    let y1 = gridify(height / 2.0, Rounding::Nearest);
    let body = Rect {
        start: Point::new(x0, y0),
        end: Point::new(x1, y1),
    };

    // Vertical band holding the left/right columns.
    let lr_bottom = y0 + tb_height + if scrunch { SIDE_CLEARANCE } else { 0.0 };
    let lr_top = lr_bottom + lr_height;
    // Horizontal band holding the top/bottom rows.
    let (tb_left, tb_span) = if scrunch {
        (x0, x1 - x0)
    } else {
        (x0 + lr_width, tb_width)
    };

    let half = PIN_PITCH / 2.0;
    let mut pins = Vec::new();

    for side in Side::ALL {
        let slots = unit.side(side);
        if slots.is_empty() {
            continue;
        }
        let count = slots.len();
        let (start, dx, dy) = match side {
            Side::Left => {
                let off = push_offset(opts.push, lr_height, count);
                (Point::new(x0 - length, lr_top - off - half), 0.0, -PIN_PITCH)
            }
            Side::Right => {
                let off = push_offset(opts.push, lr_height, count);
                if opts.ccw {
                    (Point::new(x1 + length, lr_bottom + off + half), 0.0, PIN_PITCH)
                } else {
                    (Point::new(x1 + length, lr_top - off - half), 0.0, -PIN_PITCH)
                }
            }
            Side::Top => {
                let off = push_offset(opts.push, tb_span, count);
                if opts.ccw {
                    (Point::new(tb_left + tb_span - off - half, y1 + length), -PIN_PITCH, 0.0)
                } else {
                    (Point::new(tb_left + off + half, y1 + length), PIN_PITCH, 0.0)
                }
            }
            Side::Bottom => {
                let off = push_offset(opts.push, tb_span, count);
                (Point::new(tb_left + off + half, y0 - length), PIN_PITCH, 0.0)
            }
        };

        let mut at = Point::new(
            gridify(start.x, Rounding::Nearest),
            gridify(start.y, Rounding::Nearest),
        );
        for slot in slots {
            if let Slot::Pin(pin) = slot {
                tracing::trace!(unit = %unit.id, pin = %pin.label, x = at.x, y = at.y, side = %side, "Placed pin");
                pins.push(PlacedPin {
                    pin: pin.clone(),
                    side,
                    at,
                    angle: side.angle(),
                    length,
                });
            }
            at = at.shifted(dx, dy);
        }
    }

    UnitGeometry {
        id: unit.id.clone(),
        body,
        pins,
    }
}

/// Point the part is translated to put at the origin.
fn anchor(units: &[UnitGeometry], center: bool) -> Point {
    let all = || units.iter().flat_map(|u| u.pins.iter());

    if center {
        let (sx, sy, n) = all().fold((0.0, 0.0, 0usize), |(sx, sy, n), p| {
            (sx + p.at.x, sy + p.at.y, n + 1)
        });
        if n == 0 {
            return Point::default();
        }
        #[allow(clippy::cast_precision_loss)]
        let n = n as f64;
        return Point::new(
            gridify(sx / n, Rounding::Nearest),
            gridify(sy / n, Rounding::Nearest),
        );
    }

    all()
        .find(|p| p.pin.numbers.iter().any(|n| n == "1"))
        .or_else(|| all().next())
        .map_or_else(Point::default, |p| p.at)
}

/// Computes the geometry of every unit of `part`.
#[must_use]
pub fn layout_part(part: &ArrangedPart, opts: &LayoutOptions) -> SymbolGeometry {
    let length = pin_length(part);
    let mut units: Vec<UnitGeometry> = part
        .units
        .iter()
        .map(|u| layout_unit(u, length, opts))
        .collect();

    let origin = anchor(&units, opts.center);
    let (dx, dy) = (-origin.x, -origin.y);
    for unit in &mut units {
        unit.body.start = unit.body.start.shifted(dx, dy);
        unit.body.end = unit.body.end.shifted(dx, dy);
        for pin in &mut unit.pins {
            pin.at = pin.at.shifted(dx, dy);
        }
    }

    let bounds = units
        .iter()
        .map(|u| u.body)
        .reduce(|a, b| a.union(&b))
        .unwrap_or_default();

    tracing::debug!(
        part = %part.name,
        units = units.len(),
        pin_length = length,
        width = bounds.width(),
        height = bounds.height(),
        "Laid out part"
    );

    SymbolGeometry {
        units,
        pin_length: length,
        bounds,
    }
}
