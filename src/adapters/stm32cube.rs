//! STM32CubeMX pin-list export.
//!
//! ```text
//! "Position","Name","Type","Signal","Label"
//! "1","VBAT","Power","",""
//! "3","PC14-OSC32_IN","I/O","RCC_OSC32_IN",""
//! ```
//!
//! Each file describes one part, named after the file. Pins are split into a
//! `power` unit, a `config` unit (clock, reset, debug and boot pins), one unit
//! per GPIO port (`PA`, `PB`, ...) and an `other` unit for the rest.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::PinSource;
use crate::symbol::error::{SymbolError, SymbolResult};
use crate::symbol::natural::natural_cmp;
use crate::symbol::part::RawPart;
use crate::symbol::pin::{PinType, RawPin};

/// Name fragments that put a pin in the `power` unit.
const POWER_NAMES: [&str; 6] = ["VDD", "VSS", "VCAP", "VBAT", "VREF", "V12PHYHS"];

/// Name fragments that put a pin in the `config` unit.
const CONFIG_NAMES: [&str; 6] = ["RCC_OSC", "NRST", "PDR", "SWCLK", "SWDIO", "BOOT"];

/// Reads STM32CubeMX pin exports.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stm32Cube;

impl Stm32Cube {
    /// Registry name.
    pub const NAME: &'static str = "stm32cube";
}

fn port_pin() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"P([A-Z])(\d+)").ok()).as_ref()
}

/// Port letter and pin index of a GPIO name such as `PC13-ANTI_TAMP`.
fn parse_port(name: &str) -> Option<(char, u32)> {
    let caps = port_pin()?.captures(name)?;
    let port = caps.get(1)?.as_str().chars().next()?;
    let index = caps.get(2)?.as_str().parse().ok()?;
    Some((port, index))
}

fn pin_type(cube_type: &str) -> PinType {
    match cube_type.trim() {
        "Power" => PinType::PowerIn,
        "Input" | "Reset" | "Boot" => PinType::Input,
        "Output" => PinType::Output,
        _ => PinType::Bidirectional,
    }
}

fn unit_for(name: &str) -> String {
    if POWER_NAMES.iter().any(|p| name.contains(p)) {
        "power".to_string()
    } else if CONFIG_NAMES.iter().any(|p| name.contains(p)) {
        "config".to_string()
    } else if let Some((port, _)) = parse_port(name) {
        format!("P{port}")
    } else {
        "other".to_string()
    }
}

/// GPIO ports are ordered by pin index, everything else by name.
fn unit_order(a: &RawPin, b: &RawPin) -> Ordering {
    match (parse_port(&a.name), parse_port(&b.name)) {
        (Some((_, x)), Some((_, y))) if a.unit.starts_with('P') => x.cmp(&y),
        _ => natural_cmp(&a.name, &b.name),
    }
}

impl PinSource for Stm32Cube {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read(&self, raw: &str, source: &str) -> SymbolResult<Vec<RawPart>> {
        let part_name = Path::new(source)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(raw.as_bytes());

        let headers = reader.headers()?.clone();
        let column = |label: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(label));
        let (Some(pos), Some(name), Some(kind)) =
            (column("Position"), column("Name"), column("Type"))
        else {
            return Err(SymbolError::invalid_table(
                part_name,
                "expected Position, Name and Type columns",
            ));
        };
        let signal = column("Signal");
        let label = column("Label");

        let mut pins = Vec::new();
        for record in reader.records() {
            let record = record?;
            let get = |i: Option<usize>| i.and_then(|i| record.get(i)).unwrap_or_default();

            let mut pin_name = get(Some(name)).to_string();
            let alias = if get(label).is_empty() { get(signal) } else { get(label) };
            if !alias.is_empty() {
                pin_name.push('/');
                pin_name.push_str(alias);
            }
            let pin_name = pin_name.replace(' ', "_");

            let mut pin = RawPin::new(get(Some(pos)), pin_name);
            pin.pin_type = pin_type(get(Some(kind))).keyword().to_string();
            pin.unit = unit_for(&pin.name);
            pins.push(pin);
        }

        // Stable: pins in one unit keep their relative order on ties.
        pins.sort_by(|a, b| a.unit.cmp(&b.unit).then_with(|| unit_order(a, b)));

        let mut part = RawPart::new(part_name);
        part.pins = pins;
        tracing::debug!(
            part = %part.name,
            pins = part.pins.len(),
            "Read STM32CubeMX pin list"
        );
        Ok(vec![part])
    }
}
