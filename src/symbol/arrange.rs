//! Pin grouping, ordering, gap insertion and bundling.
//!
//! This is the stage between raw adapter output and geometry:
//!
//! 1. [`build_part`] trims and resolves [`RawPin`] records into canonical
//!    [`PinRecord`]s, collecting a [`Diagnostic`] for every record that had to
//!    be repaired or dropped.
//! 2. [`arrange_part`] partitions a [`Part`] by unit and side, expands spacer
//!    markers into gap slots, applies the sort policy and merges bundles.
//!
//! The result is one [`ArrangedUnit`] per unit holding four ordered slot
//! lists, ready for [`super::layout`].

use std::collections::HashSet;

use super::error::{Diagnostic, SymbolError, SymbolResult};
use super::mnemonic::{resolve, resolve_flag, Mnemonic};
use super::natural::natural_cmp;
use super::options::{Annotation, LayoutOptions, SortMode};
use super::part::{Part, RawPart};
use super::pin::{PinRecord, PinStyle, PinType, RawPin, Side};

/// A pin as placed on one side of a unit.
///
/// A bundled pin carries several physical numbers; they are kept in natural
/// order and the first one is the visible pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrangedPin {
    /// Physical pin numbers (more than one when bundled).
    pub numbers: Vec<String>,
    /// Name as entered, without a bundle suffix.
    pub name: String,
    /// Displayed name, including any bundle suffix.
    pub label: String,
    /// Alternate function names.
    pub alternates: Vec<String>,
    /// Electrical type.
    pub pin_type: PinType,
    /// Graphic style.
    pub style: PinStyle,
    /// Hidden flag.
    pub hidden: bool,
    /// Position of the (first) source record within its unit.
    pub order: usize,
}

impl ArrangedPin {
    fn from_record(pin: &PinRecord, number: &str, order: usize) -> Self {
        Self {
            numbers: vec![number.to_string()],
            name: pin.name.clone(),
            label: pin.name.clone(),
            alternates: pin.alternates.clone(),
            pin_type: pin.pin_type,
            style: pin.style,
            hidden: pin.hidden,
            order,
        }
    }

    /// Whether several physical pins were merged into this one.
    #[must_use]
    pub fn is_bundle(&self) -> bool {
        self.numbers.len() > 1
    }
}

/// One position along a side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// An empty position left by a spacer.
    Gap,
    /// A placed pin.
    Pin(ArrangedPin),
}

impl Slot {
    /// The pin in this slot, if any.
    #[must_use]
    pub const fn pin(&self) -> Option<&ArrangedPin> {
        match self {
            Self::Gap => None,
            Self::Pin(pin) => Some(pin),
        }
    }
}

/// A unit with its pins split per side, in placement order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrangedUnit {
    /// Unit identifier.
    pub id: String,
    /// Slots per side, indexed by [`Side::index`].
    pub sides: [Vec<Slot>; 4],
}

impl ArrangedUnit {
    /// Slots on one side.
    #[must_use]
    pub fn side(&self, side: Side) -> &[Slot] {
        &self.sides[side.index()]
    }

    /// All placed pins of the unit, in no particular order.
    pub fn pins(&self) -> impl Iterator<Item = &ArrangedPin> {
        self.sides.iter().flatten().filter_map(Slot::pin)
    }
}

/// A part ready for geometry layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrangedPart {
    /// Part name.
    pub name: String,
    /// Units in natural order of their identifiers.
    pub units: Vec<ArrangedUnit>,
    /// Problems found while arranging.
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolves raw pin records into canonical ones.
///
/// Records with an unresolvable side, type or style are dropped; an
/// unreadable hidden flag is repaired to `false`. Either way a diagnostic is
/// returned and the remaining records are still processed.
#[must_use]
pub fn repair_pins(
    raw: &[RawPin],
    part: &str,
    opts: &LayoutOptions,
) -> (Vec<PinRecord>, Vec<Diagnostic>) {
    let mut pins = Vec::with_capacity(raw.len());
    let mut diagnostics = Vec::new();

    for (row, rec) in raw.iter().enumerate() {
        match repair_pin(rec, row, part, opts, &mut diagnostics) {
            Ok(Some(pin)) => pins.push(pin),
            Ok(None) => {}
            Err(e) => {
                diagnostics.push(Diagnostic::at(part, row, format!("{e}; pin dropped")));
            }
        }
    }

    for diag in &diagnostics {
        tracing::warn!("{diag}");
    }
    (pins, diagnostics)
}

fn repair_pin(
    rec: &RawPin,
    row: usize,
    part: &str,
    opts: &LayoutOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> SymbolResult<Option<PinRecord>> {
    let number = rec.number.trim();
    let name = rec.name.trim();

    if number.is_empty() && name.is_empty() {
        diagnostics.push(Diagnostic::at(
            part,
            row,
            "pin has neither number nor name; dropped",
        ));
        return Ok(None);
    }

    let side = token_or(&rec.side, opts.default_side, opts.fuzzy)?;
    let pin_type = token_or(&rec.pin_type, opts.default_type, opts.fuzzy)?;
    let style = token_or(&rec.style, opts.default_style, opts.fuzzy)?;
    let hidden = resolve_flag(&rec.hidden).unwrap_or_else(|e| {
        diagnostics.push(Diagnostic::at(part, row, format!("{e}; pin left visible")));
        false
    });

    let (name, alternates) = split_alternates(name, opts.alt_delimiter);

    Ok(Some(PinRecord {
        number: number.to_string(),
        name,
        alternates,
        unit: rec.unit.trim().to_string(),
        side,
        pin_type,
        style,
        hidden,
    }))
}

fn token_or<T: Mnemonic>(token: &str, default: T, fuzzy: bool) -> SymbolResult<T> {
    if token.trim().is_empty() {
        Ok(default)
    } else {
        resolve(token, fuzzy)
    }
}

/// Splits `name` on `delimiter` into a primary name and alternates.
#[must_use]
pub fn split_alternates(name: &str, delimiter: Option<char>) -> (String, Vec<String>) {
    let Some(delim) = delimiter else {
        return (name.to_string(), Vec::new());
    };
    let mut parts = name.split(delim).map(str::trim);
    let primary = parts.next().unwrap_or_default().to_string();
    let alternates = parts.filter(|s| !s.is_empty()).map(String::from).collect();
    (primary, alternates)
}

/// Builds a [`Part`] from adapter output.
///
/// # Errors
///
/// Returns [`SymbolError::MissingPartName`] if the raw part has no name.
pub fn build_part(raw: &RawPart, opts: &LayoutOptions) -> SymbolResult<(Part, Vec<Diagnostic>)> {
    let name = raw.name.trim();
    if name.is_empty() {
        return Err(SymbolError::MissingPartName);
    }

    let mut part = Part::new(name);
    for (key, value) in &raw.properties {
        part.set_property(key.trim(), value.trim());
    }

    let (pins, diagnostics) = repair_pins(&raw.pins, name, opts);
    for pin in pins {
        part.add_pin(pin);
    }
    tracing::debug!(part = name, pins = part.pin_count(), units = part.units.len(), "Built part");
    Ok((part, diagnostics))
}

/// Groups, orders and bundles the pins of `part`.
///
/// # Errors
///
/// Returns [`SymbolError::NoPins`] if the part has no pin records, and
/// [`SymbolError::EmptyUnit`] if any unit is left with nothing to place.
pub fn arrange_part(part: &Part, opts: &LayoutOptions) -> SymbolResult<ArrangedPart> {
    if part.pin_count() == 0 {
        return Err(SymbolError::NoPins {
            part: part.name.clone(),
        });
    }

    let mut diagnostics = Vec::new();
    let mut units = Vec::with_capacity(part.units.len());

    for unit in part.units.values() {
        let mut sides: [Vec<Slot>; 4] = Default::default();
        let mut seen: HashSet<&str> = HashSet::new();

        for (order, pin) in unit.pins.iter().enumerate() {
            let gaps = pin.spacer_count();
            if gaps > 0 {
                if opts.sort == SortMode::Row {
                    sides[pin.side.index()].extend((0..gaps).map(|_| Slot::Gap));
                } else {
                    diagnostics.push(Diagnostic::at(
                        &part.name,
                        order,
                        format!("spacer ignored under '{}' ordering", opts.sort),
                    ));
                }
                if pin.is_spacer() {
                    continue;
                }
            }

            let number = pin.bare_number();
            if !number.is_empty() && !seen.insert(number) {
                diagnostics.push(Diagnostic::at(
                    &part.name,
                    order,
                    format!("duplicate pin number '{number}' in unit '{}'; dropped", unit.id),
                ));
                continue;
            }

            tracing::trace!(part = %part.name, unit = %unit.id, number, name = %pin.name, side = %pin.side, "Grouped pin");
            sides[pin.side.index()].push(Slot::Pin(ArrangedPin::from_record(pin, number, order)));
        }

        for slots in &mut sides {
            sort_slots(slots, opts.sort);
            if opts.reverse {
                slots.reverse();
            }
            if opts.bundle {
                *slots = bundle_slots(std::mem::take(slots), opts.annotation);
            }
        }

        let arranged = ArrangedUnit {
            id: unit.id.clone(),
            sides,
        };
        if arranged.pins().next().is_none() {
            return Err(SymbolError::EmptyUnit {
                part: part.name.clone(),
                unit: unit.id.clone(),
            });
        }
        units.push(arranged);
    }

    for diag in &diagnostics {
        tracing::warn!("{diag}");
    }
    tracing::debug!(part = %part.name, units = units.len(), "Arranged part");

    Ok(ArrangedPart {
        name: part.name.clone(),
        units,
        diagnostics,
    })
}

fn sort_slots(slots: &mut [Slot], mode: SortMode) {
    // Gaps only exist under row ordering, so the sorted modes see pins only.
    let key = |slot: &Slot| -> String {
        match (slot, mode) {
            (Slot::Pin(p), SortMode::Num) => p.numbers[0].clone(),
            (Slot::Pin(p), SortMode::Name) => p.name.clone(),
            _ => String::new(),
        }
    };
    match mode {
        SortMode::Row => {}
        SortMode::Num | SortMode::Name => {
            slots.sort_by(|a, b| natural_cmp(&key(a), &key(b)));
        }
    }
}

/// Merges bundle-eligible pins with identical name, type, style and
/// visibility.
///
/// The merged pin takes the position of the first member.
fn bundle_slots(slots: Vec<Slot>, annotation: Annotation) -> Vec<Slot> {
    let mut out: Vec<Slot> = Vec::with_capacity(slots.len());

    for slot in slots {
        let Slot::Pin(pin) = slot else {
            out.push(Slot::Gap);
            continue;
        };
        let head = if pin.pin_type.is_bundle_eligible() && !pin.name.is_empty() {
            out.iter().position(|s| {
                s.pin().is_some_and(|p| {
                    p.pin_type == pin.pin_type
                        && p.style == pin.style
                        && p.hidden == pin.hidden
                        && p.name == pin.name
                })
            })
        } else {
            None
        };
        match head {
            Some(i) => {
                if let Slot::Pin(head) = &mut out[i] {
                    head.numbers.extend(pin.numbers);
                }
            }
            None => out.push(Slot::Pin(pin)),
        }
    }

    for slot in &mut out {
        if let Slot::Pin(pin) = slot {
            if pin.is_bundle() {
                pin.numbers.sort_by(|a, b| natural_cmp(a, b));
                pin.label = bundle_label(&pin.name, pin.numbers.len(), annotation);
            }
        }
    }
    out
}

/// Displayed name of a bundle of `count` pins.
#[must_use]
pub fn bundle_label(name: &str, count: usize, annotation: Annotation) -> String {
    match annotation {
        Annotation::None => name.to_string(),
        Annotation::Count => format!("{name}[{count}]"),
        Annotation::Range => format!("{name}[{count}:0]"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(number: &str, name: &str, pin_type: &str) -> RawPin {
        RawPin {
            pin_type: pin_type.to_string(),
            ..RawPin::new(number, name)
        }
    }

    fn part_from(pins: Vec<RawPin>, opts: &LayoutOptions) -> Part {
        let source = RawPart {
            pins,
            ..RawPart::new("TEST")
        };
        build_part(&source, opts).unwrap().0
    }

    fn labels(slots: &[Slot]) -> Vec<String> {
        slots
            .iter()
            .map(|s| match s {
                Slot::Gap => "_".to_string(),
                Slot::Pin(p) => p.label.clone(),
            })
            .collect()
    }

    #[test]
    fn repair_fills_defaults_and_trims() {
        let opts = LayoutOptions::default();
        let (pins, diags) = repair_pins(&[RawPin::new(" 1 ", " CLK ")], "U1", &opts);
        assert!(diags.is_empty());
        assert_eq!(pins[0].number, "1");
        assert_eq!(pins[0].name, "CLK");
        assert_eq!(pins[0].side, Side::Left);
        assert_eq!(pins[0].pin_type, PinType::Unspecified);
        assert_eq!(pins[0].style, PinStyle::Line);
    }

    #[test]
    fn repair_drops_bad_mnemonic_and_continues() {
        let opts = LayoutOptions::default();
        let pins = [raw("1", "A", "sideways"), raw("2", "B", "in")];
        let (pins, diags) = repair_pins(&pins, "U1", &opts);
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].name, "B");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].row, 0);
    }

    #[test]
    fn repair_drops_blank_records_but_keeps_spacers() {
        let opts = LayoutOptions::default();
        let pins = [RawPin::new("", ""), RawPin::new("*", "")];
        let (pins, diags) = repair_pins(&pins, "U1", &opts);
        assert_eq!(pins.len(), 1);
        assert!(pins[0].is_spacer());
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn repair_splits_alternates() {
        let opts = LayoutOptions {
            alt_delimiter: Some('/'),
            ..LayoutOptions::default()
        };
        let (pins, _) = repair_pins(&[RawPin::new("5", "PA0/ADC0/TIM2_CH1")], "U1", &opts);
        assert_eq!(pins[0].name, "PA0");
        assert_eq!(pins[0].alternates, vec!["ADC0", "TIM2_CH1"]);
    }

    #[test]
    fn bad_hidden_flag_is_repaired() {
        let opts = LayoutOptions::default();
        let pin = RawPin {
            hidden: "sometimes".to_string(),
            ..RawPin::new("1", "A")
        };
        let (pins, diags) = repair_pins(&[pin], "U1", &opts);
        assert!(!pins[0].hidden);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn gap_expansion_under_row_sort() {
        let opts = LayoutOptions::default();
        let part = part_from(
            vec![
                RawPin::new("1", "A"),
                RawPin::new("**", ""),
                RawPin::new("2", "B"),
                RawPin::new("3", "C"),
            ],
            &opts,
        );
        let arranged = arrange_part(&part, &opts).unwrap();
        assert_eq!(
            labels(arranged.units[0].side(Side::Left)),
            vec!["A", "_", "_", "B", "C"]
        );
    }

    #[test]
    fn prefixed_spacer_keeps_its_pin() {
        let opts = LayoutOptions::default();
        let part = part_from(vec![RawPin::new("1", "A"), RawPin::new("*2", "B")], &opts);
        let arranged = arrange_part(&part, &opts).unwrap();
        let left = arranged.units[0].side(Side::Left);
        assert_eq!(labels(left), vec!["A", "_", "B"]);
        assert_eq!(left[2].pin().unwrap().numbers, vec!["2"]);
    }

    #[test]
    fn spacers_ignored_under_sorted_modes() {
        let opts = LayoutOptions {
            sort: SortMode::Num,
            ..LayoutOptions::default()
        };
        let part = part_from(
            vec![RawPin::new("2", "B"), RawPin::new("*", ""), RawPin::new("1", "A")],
            &opts,
        );
        let arranged = arrange_part(&part, &opts).unwrap();
        assert_eq!(labels(arranged.units[0].side(Side::Left)), vec!["A", "B"]);
        assert_eq!(arranged.diagnostics.len(), 1);
    }

    #[test]
    fn num_sort_is_natural_and_reversible() {
        let mut opts = LayoutOptions {
            sort: SortMode::Num,
            ..LayoutOptions::default()
        };
        let pins: Vec<RawPin> = ["A10", "9", "A1", "10", "A2"]
            .iter()
            .map(|n| RawPin::new(*n, format!("P{n}")))
            .collect();
        let part = part_from(pins, &opts);

        let arranged = arrange_part(&part, &opts).unwrap();
        assert_eq!(
            labels(arranged.units[0].side(Side::Left)),
            vec!["P9", "P10", "PA1", "PA2", "PA10"]
        );

        opts.reverse = true;
        let arranged = arrange_part(&part, &opts).unwrap();
        assert_eq!(
            labels(arranged.units[0].side(Side::Left)),
            vec!["PA10", "PA2", "PA1", "P10", "P9"]
        );
    }

    #[test]
    fn duplicate_numbers_are_dropped() {
        let opts = LayoutOptions::default();
        let part = part_from(vec![RawPin::new("1", "A"), RawPin::new("1", "B")], &opts);
        let arranged = arrange_part(&part, &opts).unwrap();
        assert_eq!(labels(arranged.units[0].side(Side::Left)), vec!["A"]);
        assert_eq!(arranged.diagnostics.len(), 1);
    }

    #[test]
    fn bundling_merges_power_pins() {
        let opts = LayoutOptions {
            bundle: true,
            ..LayoutOptions::default()
        };
        let part = part_from(
            vec![
                raw("23", "A5", "input"),
                raw("90", "B1", "output"),
                raw("29", "VCC", "power_in"),
                raw("16", "VCC", "power_in"),
            ],
            &opts,
        );
        let arranged = arrange_part(&part, &opts).unwrap();
        let left = arranged.units[0].side(Side::Left);
        assert_eq!(labels(left), vec!["A5", "B1", "VCC[2]"]);
        assert_eq!(left[2].pin().unwrap().numbers, vec!["16", "29"]);
    }

    #[test]
    fn bundling_respects_type_and_style() {
        let opts = LayoutOptions {
            bundle: true,
            annotation: Annotation::Range,
            ..LayoutOptions::default()
        };
        let part = part_from(
            vec![
                raw("1", "GND", "power_in"),
                raw("2", "GND", "passive"),
                raw("3", "GND", "power_in"),
                raw("4", "IO", "bidirectional"),
                raw("5", "IO", "bidirectional"),
            ],
            &opts,
        );
        let arranged = arrange_part(&part, &opts).unwrap();
        assert_eq!(
            labels(arranged.units[0].side(Side::Left)),
            vec!["GND[2:0]", "GND", "IO", "IO"]
        );
    }

    #[test]
    fn bundling_keeps_hidden_pins_apart() {
        let opts = LayoutOptions {
            bundle: true,
            ..LayoutOptions::default()
        };
        let mut hidden = raw("3", "GND", "power_in");
        hidden.hidden = "yes".to_string();
        let part = part_from(
            vec![raw("1", "GND", "power_in"), raw("2", "GND", "power_in"), hidden],
            &opts,
        );
        let arranged = arrange_part(&part, &opts).unwrap();
        let left = arranged.units[0].side(Side::Left);
        assert_eq!(labels(left), vec!["GND[2]", "GND"]);
        assert!(!left[0].pin().unwrap().hidden);
        assert!(left[1].pin().unwrap().hidden);
    }

    #[test]
    fn unit_of_only_spacers_is_an_error() {
        let opts = LayoutOptions::default();
        let mut spacer = RawPin::new("*", "");
        spacer.unit = "B".to_string();
        let part = part_from(vec![RawPin::new("1", "A"), spacer], &opts);
        let err = arrange_part(&part, &opts).unwrap_err();
        assert!(matches!(err, SymbolError::EmptyUnit { ref unit, .. } if unit == "B"));
    }

    #[test]
    fn part_without_pins_is_an_error() {
        let opts = LayoutOptions::default();
        let part = Part::new("EMPTY");
        assert!(matches!(
            arrange_part(&part, &opts),
            Err(SymbolError::NoPins { .. })
        ));
    }

    #[test]
    fn missing_name_is_rejected() {
        let opts = LayoutOptions::default();
        assert!(matches!(
            build_part(&RawPart::new("  "), &opts),
            Err(SymbolError::MissingPartName)
        ));
    }
}
