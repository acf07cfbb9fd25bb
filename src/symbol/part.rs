//! Parts, units and libraries.
//!
//! All collections are [`IndexMap`]s: the order parts and properties were
//! inserted in is the order they are written in, and round-trip comparisons
//! depend on it. Units are the exception: they are kept in natural order of
//! their identifiers so `ADC_2` precedes `ADC_12` regardless of input order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::natural::natural_cmp;
use super::pin::{PinRecord, RawPin};

/// Default reference designator prefix.
pub const DEFAULT_REFERENCE: &str = "U";

/// Property names of the standard symbol fields.
pub mod field {
    /// Reference designator prefix.
    pub const REFERENCE: &str = "Reference";
    /// Value (defaults to the part name).
    pub const VALUE: &str = "Value";
    /// Footprint.
    pub const FOOTPRINT: &str = "Footprint";
    /// Datasheet.
    pub const DATASHEET: &str = "Datasheet";
    /// Description.
    pub const DESCRIPTION: &str = "Description";
}

/// A part as produced by an input adapter: a name, named properties and
/// untyped pin records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPart {
    /// Part name.
    pub name: String,
    /// Properties keyed by symbol field name ([`field`] or any extra name).
    #[serde(default)]
    pub properties: IndexMap<String, String>,
    /// Pins in source order.
    #[serde(default)]
    pub pins: Vec<RawPin>,
}

impl RawPart {
    /// Creates a raw part with no properties or pins.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// One selectable sub-symbol of a part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unit identifier; empty for the unlabeled unit.
    pub id: String,
    /// Pins in input order.
    pub pins: Vec<PinRecord>,
}

impl Unit {
    /// Creates an empty unit.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pins: Vec::new(),
        }
    }
}

/// A schematic part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// Part (symbol) name.
    pub name: String,
    /// Reference designator prefix.
    pub reference: String,
    /// Explicit value; empty when it is the part name.
    #[serde(default)]
    pub value: String,
    /// Footprint library identifier.
    #[serde(default)]
    pub footprint: String,
    /// Datasheet URL.
    #[serde(default)]
    pub datasheet: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Additional named properties, in insertion order.
    #[serde(default)]
    pub properties: IndexMap<String, String>,
    /// Units keyed by identifier.
    #[serde(default)]
    pub units: IndexMap<String, Unit>,
}

impl Part {
    /// Creates a part with no pins and default properties.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: DEFAULT_REFERENCE.to_string(),
            value: String::new(),
            footprint: String::new(),
            datasheet: String::new(),
            description: String::new(),
            properties: IndexMap::new(),
            units: IndexMap::new(),
        }
    }

    /// Sets a property by symbol field name.
    ///
    /// The standard fields map onto their dedicated members; a `Value` equal
    /// to the part name is implicit and not stored. Other keys keep the order
    /// they were first set in.
    pub fn set_property(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match key {
            field::REFERENCE => self.reference = value,
            field::FOOTPRINT => self.footprint = value,
            field::DATASHEET => self.datasheet = value,
            field::DESCRIPTION => self.description = value,
            field::VALUE if value == self.name => self.value.clear(),
            field::VALUE => self.value = value,
            _ => {
                self.properties.insert(key.to_string(), value);
            }
        }
    }

    /// Displayed value: the explicit value or the part name.
    #[must_use]
    pub fn value(&self) -> &str {
        if self.value.is_empty() {
            &self.name
        } else {
            &self.value
        }
    }

    /// Appends a pin to the unit named by `pin.unit`, creating the unit if needed.
    pub fn add_pin(&mut self, pin: PinRecord) {
        self.unit_mut(&pin.unit.clone()).pins.push(pin);
    }

    /// Returns the unit with the given id, inserting it in natural order if absent.
    pub fn unit_mut(&mut self, id: &str) -> &mut Unit {
        let idx = if let Some(idx) = self.units.get_index_of(id) {
            idx
        } else {
            let pos = self
                .units
                .keys()
                .position(|k| natural_cmp(k, id).is_gt())
                .unwrap_or(self.units.len());
            self.units.shift_insert(pos, id.to_string(), Unit::new(id));
            pos
        };
        &mut self.units[idx]
    }

    /// Iterates over every pin of every unit.
    pub fn pins(&self) -> impl Iterator<Item = &PinRecord> {
        self.units.values().flat_map(|u| u.pins.iter())
    }

    /// Total number of pin records.
    #[must_use]
    pub fn pin_count(&self) -> usize {
        self.units.values().map(|u| u.pins.len()).sum()
    }
}

/// Outcome of merging one library into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Parts that were new to the target.
    pub added: Vec<String>,
    /// Existing parts replaced by incoming ones.
    pub replaced: Vec<String>,
    /// Incoming parts dropped because the target already had them.
    pub skipped: Vec<String>,
}

/// An ordered collection of parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    /// Parts keyed by name, in insertion order.
    pub parts: IndexMap<String, Part>,
}

impl Library {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a part, replacing any part of the same name in place.
    pub fn insert(&mut self, part: Part) -> Option<Part> {
        self.parts.insert(part.name.clone(), part)
    }

    /// Looks up a part by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Part> {
        self.parts.get(name)
    }

    /// Number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns true if the library has no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Merges `incoming` into this library.
    ///
    /// New parts are appended. A name collision replaces the existing part at
    /// its current position when `overwrite` is set; otherwise the existing
    /// part is left untouched and the incoming one is reported as skipped.
    pub fn merge(&mut self, incoming: Self, overwrite: bool) -> MergeReport {
        let mut report = MergeReport::default();
        for (name, part) in incoming.parts {
            if let Some(existing) = self.parts.get_mut(&name) {
                if overwrite {
                    *existing = part;
                    report.replaced.push(name);
                } else {
                    tracing::warn!(part = %name, "Part already exists; skipping");
                    report.skipped.push(name);
                }
            } else {
                self.parts.insert(name.clone(), part);
                report.added.push(name);
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::pin::PinType;

    fn part_with_pin(name: &str, pin_name: &str) -> Part {
        let mut part = Part::new(name);
        part.add_pin(PinRecord::new("1", pin_name, PinType::Input));
        part
    }

    #[test]
    fn units_are_kept_in_natural_order() {
        let mut part = Part::new("MCU");
        for unit in ["ADC_12", "ADC_2", "", "GPIO"] {
            part.add_pin(PinRecord::new("1", "X", PinType::Input).in_unit(unit));
        }
        let ids: Vec<&str> = part.units.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["", "ADC_2", "ADC_12", "GPIO"]);
    }

    #[test]
    fn pins_stay_in_input_order_within_unit() {
        let mut part = Part::new("U");
        part.add_pin(PinRecord::new("3", "C", PinType::Input));
        part.add_pin(PinRecord::new("1", "A", PinType::Input));
        let numbers: Vec<&str> = part.pins().map(|p| p.number.as_str()).collect();
        assert_eq!(numbers, vec!["3", "1"]);
        assert_eq!(part.pin_count(), 2);
    }

    #[test]
    fn standard_properties_map_to_fields() {
        let mut part = Part::new("LM358");
        part.set_property(field::REFERENCE, "IC");
        part.set_property(field::VALUE, "LM358");
        part.set_property(field::FOOTPRINT, "Package_SO:SOIC-8");
        part.set_property("ki_keywords", "opamp");
        assert_eq!(part.reference, "IC");
        assert_eq!(part.footprint, "Package_SO:SOIC-8");
        assert_eq!(part.value(), "LM358");
        assert!(part.value.is_empty());

        part.set_property(field::VALUE, "LM358A");
        assert_eq!(part.value(), "LM358A");
        let extras: Vec<&str> = part.properties.keys().map(String::as_str).collect();
        assert_eq!(extras, vec!["ki_keywords"]);
    }

    #[test]
    fn extra_properties_keep_their_order_around_value() {
        let mut part = Part::new("R");
        part.set_property("ki_keywords", "resistor");
        part.set_property(field::VALUE, "10k");
        part.set_property("Tolerance", "1%");
        let keys: Vec<&str> = part.properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["ki_keywords", "Tolerance"]);
        assert_eq!(part.value(), "10k");
    }

    #[test]
    fn merge_without_overwrite_keeps_existing() {
        let mut lib = Library::new();
        lib.insert(part_with_pin("X", "OLD"));
        lib.insert(part_with_pin("Y", "Y"));

        let mut incoming = Library::new();
        incoming.insert(part_with_pin("X", "NEW"));
        incoming.insert(part_with_pin("Z", "Z"));

        let report = lib.merge(incoming, false);
        assert_eq!(report.added, vec!["Z"]);
        assert_eq!(report.skipped, vec!["X"]);
        assert!(report.replaced.is_empty());
        assert_eq!(lib.get("X").unwrap().pins().next().unwrap().name, "OLD");
        let names: Vec<&str> = lib.parts.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn merge_with_overwrite_replaces_in_place() {
        let mut lib = Library::new();
        lib.insert(part_with_pin("X", "OLD"));
        lib.insert(part_with_pin("Y", "Y"));

        let mut incoming = Library::new();
        incoming.insert(part_with_pin("X", "NEW"));

        let report = lib.merge(incoming, true);
        assert_eq!(report.replaced, vec!["X"]);
        assert_eq!(lib.parts.get_index(0).unwrap().0, "X");
        assert_eq!(lib.get("X").unwrap().pins().next().unwrap().name, "NEW");
    }
}
