//! Symbol-library reader: the inverse of [`super::writer`].
//!
//! Reconstructs [`Part`]s and [`PinRecord`]s from library text. Two kinds of
//! information do not survive a write/read cycle and are restored by
//! convention instead:
//!
//! - bundled pins (several numbers stacked at one position) come back as one
//!   record per number, sharing the name without its `[n]` or `[n:0]`
//!   suffix, ordered by number;
//! - spacer slots are not represented in the file at all.
//!
//! Fields missing from the text take their defaults.

use std::collections::HashMap;
use std::path::Path;

use super::error::{SymbolError, SymbolResult};
use super::natural::natural_cmp;
use super::part::{Library, Part};
use super::pin::{PinRecord, PinStyle, PinType, Side};
use super::sexpr::{format_number, Sexpr};
use super::writer::SymbolDocument;

/// Removes the `[n]` or `[n:0]` annotation of a bundle of `count` pins.
///
/// Any other bracketed suffix is part of the pin's own name.
fn strip_bundle_suffix(name: &str, count: usize) -> &str {
    [format!("[{count}]"), format!("[{count}:0]")]
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix.as_str()))
        .unwrap_or(name)
}

/// Parses library text into a [`Library`].
///
/// # Errors
///
/// Returns [`SymbolError::MalformedDocument`] on unbalanced text, a missing
/// root list, a symbol without a name, a property without key or value, or
/// a derived symbol whose parent is not in the library.
pub fn parse_library(text: &str) -> SymbolResult<Library> {
    let doc = SymbolDocument::parse(text)?;
    let mut library = Library::new();
    let mut derived: Vec<(&Sexpr, String)> = Vec::new();

    for symbol in doc.symbols.values() {
        match symbol.child("extends").and_then(|e| e.arg(0)) {
            Some(parent) => {
                derived.push((symbol, parent.to_string()));
                // Reserve the slot so file order is kept.
                let name = symbol_name(symbol)?;
                library.insert(Part::new(name));
            }
            None => {
                library.insert(parse_symbol(symbol)?);
            }
        }
    }

    resolve_derived(&mut library, &derived)?;
    tracing::debug!(parts = library.len(), "Parsed symbol library");
    Ok(library)
}

/// Reads and parses a symbol-library file.
///
/// # Errors
///
/// Returns [`SymbolError::FileRead`] if the file cannot be read, otherwise
/// the errors of [`parse_library`].
pub fn load_library(path: &Path) -> SymbolResult<Library> {
    let text = std::fs::read_to_string(path).map_err(|e| SymbolError::file_read(path, e))?;
    parse_library(&text)
}

fn resolve_derived(library: &mut Library, derived: &[(&Sexpr, String)]) -> SymbolResult<()> {
    let mut pending: Vec<&(&Sexpr, String)> = derived.iter().collect();
    while !pending.is_empty() {
        let waiting: Vec<&str> = pending.iter().filter_map(|(s, _)| s.arg(0)).collect();
        let mut deferred = Vec::new();
        for entry in &pending {
            let (symbol, parent) = *entry;
            let name = symbol_name(symbol)?;
            // A parent that is itself derived must be resolved first.
            if waiting.contains(&parent.as_str()) {
                deferred.push(*entry);
                continue;
            }
            let Some(base) = library.get(parent).cloned() else {
                return Err(SymbolError::malformed(
                    0,
                    format!("symbol '{name}' extends unknown symbol '{parent}'"),
                ));
            };
            let mut part = base;
            part.name = name.to_string();
            part.value.clear();
            apply_properties(&mut part, symbol)?;
            library.insert(part);
        }
        if deferred.len() == pending.len() {
            return Err(SymbolError::malformed(0, "circular 'extends' chain"));
        }
        pending = deferred;
    }
    Ok(())
}

fn symbol_name(symbol: &Sexpr) -> SymbolResult<&str> {
    symbol
        .arg(0)
        .ok_or_else(|| SymbolError::malformed(0, "symbol without a name"))
}

fn apply_properties(part: &mut Part, symbol: &Sexpr) -> SymbolResult<()> {
    for prop in symbol.children_named("property") {
        let (Some(key), Some(value)) = (prop.arg(0), prop.arg(1)) else {
            return Err(SymbolError::malformed(
                0,
                format!("property without key or value in symbol '{}'", part.name),
            ));
        };
        part.set_property(key, value);
    }
    Ok(())
}

/// Parses one top-level `symbol` list.
///
/// # Errors
///
/// Returns [`SymbolError::MalformedDocument`] if the symbol has no name or a
/// property is incomplete.
pub fn parse_symbol(symbol: &Sexpr) -> SymbolResult<Part> {
    let name = symbol_name(symbol)?;
    let mut part = Part::new(name);
    apply_properties(&mut part, symbol)?;

    // (unit number, unit_name, pins) per graphical sub-symbol.
    let mut subs: Vec<(u32, Option<String>, Vec<RawPlaced>)> = Vec::new();
    for sub in symbol.children_named("symbol") {
        let Some((unit, style)) = sub.arg(0).and_then(unit_and_style) else {
            tracing::warn!(part = name, "Sub-symbol with unrecognised name; skipped");
            continue;
        };
        if style > 1 {
            tracing::debug!(part = name, unit, style, "Skipping alternate body style");
            continue;
        }
        let unit_name = sub.child("unit_name").and_then(|u| u.arg(0)).map(String::from);
        let pins = sub.children_named("pin").map(read_pin).collect();
        subs.push((unit, unit_name, pins));
    }

    let mut numbers: Vec<u32> = subs.iter().map(|s| s.0).filter(|&u| u > 0).collect();
    numbers.sort_unstable();
    numbers.dedup();
    let single = numbers.len() <= 1;

    for (unit, unit_name, pins) in subs {
        let id = match unit_name {
            Some(n) => n,
            None if unit == 0 || single => String::new(),
            None => unit.to_string(),
        };
        // Register the unit even if it has no pins of its own.
        part.unit_mut(&id);
        for mut pin in unbundle(pins) {
            pin.unit.clone_from(&id);
            part.add_pin(pin);
        }
    }

    tracing::trace!(part = name, pins = part.pin_count(), "Parsed symbol");
    Ok(part)
}

/// Splits `NAME_u_s` into unit and body style numbers.
fn unit_and_style(name: &str) -> Option<(u32, u32)> {
    let mut it = name.rsplitn(3, '_');
    let style = it.next()?.parse().ok()?;
    let unit = it.next()?.parse().ok()?;
    it.next()?;
    Some((unit, style))
}

/// A pin as found in the file, before bundles are split.
#[derive(Debug)]
struct RawPlaced {
    key: (String, String, i64),
    record: PinRecord,
}

fn is_hidden(node: Option<&Sexpr>) -> bool {
    let Some(node) = node else {
        return false;
    };
    node.has_flag("hide")
        || node
            .child("hide")
            .is_some_and(|h| h.arg(0).map_or(true, |v| v == "yes"))
}

fn read_pin(pin: &Sexpr) -> RawPlaced {
    let pin_type = pin
        .arg(0)
        .and_then(|t| t.parse::<PinType>().ok())
        .unwrap_or_default();
    let style = pin
        .arg(1)
        .and_then(|s| s.parse::<PinStyle>().ok())
        .unwrap_or_default();

    let at = pin.child("at");
    let x = at.and_then(|a| a.num_arg(0)).unwrap_or_default();
    let y = at.and_then(|a| a.num_arg(1)).unwrap_or_default();
    #[allow(clippy::cast_possible_truncation)]
    let angle = at.and_then(|a| a.num_arg(2)).unwrap_or_default().round() as i64;
    let side = Side::from_angle(angle).unwrap_or_default();

    let name_node = pin.child("name");
    let number_node = pin.child("number");
    let name = name_node.and_then(|n| n.arg(0)).unwrap_or_default();
    let name = if name == "~" { "" } else { name };
    let number = number_node.and_then(|n| n.arg(0)).unwrap_or_default();

    let hidden = is_hidden(Some(pin))
        || (is_hidden(name_node.and_then(|n| n.child("effects")))
            && is_hidden(number_node.and_then(|n| n.child("effects"))));

    let alternates = pin
        .children_named("alternate")
        .filter_map(|a| a.arg(0))
        .map(String::from)
        .collect();

    RawPlaced {
        key: (format_number(x), format_number(y), angle.rem_euclid(360)),
        record: PinRecord {
            number: number.to_string(),
            name: name.to_string(),
            alternates,
            unit: String::new(),
            side,
            pin_type,
            style,
            hidden,
        },
    }
}

/// Splits stacked pins back into one record per number.
///
/// Pins at the same position with the same name, type and style form a
/// bundle. A bundle takes the place of its first member, loses the name
/// suffix matching its size, lists its numbers in natural order and is hidden only if every
/// member was.
fn unbundle(pins: Vec<RawPlaced>) -> Vec<PinRecord> {
    type Key = ((String, String, i64), String, PinType, PinStyle);
    let mut groups: Vec<Vec<PinRecord>> = Vec::new();
    let mut index: HashMap<Key, usize> = HashMap::new();

    for RawPlaced { key, record } in pins {
        let k = (key, record.name.clone(), record.pin_type, record.style);
        if let Some(&i) = index.get(&k) {
            groups[i].push(record);
        } else {
            index.insert(k, groups.len());
            groups.push(vec![record]);
        }
    }

    let mut out = Vec::new();
    for mut group in groups {
        if group.len() == 1 {
            out.append(&mut group);
            continue;
        }
        let hidden = group.iter().all(|p| p.hidden);
        let count = group.len();
        group.sort_by(|a, b| natural_cmp(&a.number, &b.number));
        for mut pin in group {
            pin.name = strip_bundle_suffix(&pin.name, count).to_string();
            pin.hidden = hidden;
            out.push(pin);
        }
    }
    out
}
