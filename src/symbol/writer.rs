//! Symbol-library writer.
//!
//! Turns parts into `kicad_symbol_lib` documents. Each part goes through
//! [`arrange_part`] and [`layout_part`]; the resulting geometry is then
//! serialised as one top-level `symbol` with one sub-symbol per unit.
//!
//! # Merge mode
//!
//! Merging works on the document tree: the existing library is parsed into a
//! [`SymbolDocument`], incoming symbols are appended or replace existing ones
//! in place, and every symbol that is not touched is written back unchanged.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use super::arrange::arrange_part;
use super::error::{Diagnostic, SymbolError, SymbolResult};
use super::layout::{layout_part, PlacedPin, SymbolGeometry, UnitGeometry, FONT_SIZE};
use super::options::LayoutOptions;
use super::part::{field, Library, Part};
use super::sexpr::{parse, Sexpr};

/// File format version written in new documents.
pub const FORMAT_VERSION: &str = "20241209";
/// Generator tag written in new documents.
pub const GENERATOR: &str = "kipart";

/// Root list keyword of a symbol library.
const ROOT: &str = "kicad_symbol_lib";

/// A symbol library as a header plus named top-level symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolDocument {
    /// Non-symbol items after the root keyword (version, generator, ...).
    pub header: Vec<Sexpr>,
    /// Top-level symbols keyed by name, in file order.
    pub symbols: IndexMap<String, Sexpr>,
}

impl Default for SymbolDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolDocument {
    /// Creates an empty document with this crate's version and generator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            header: vec![
                Sexpr::node("version", vec![Sexpr::symbol(FORMAT_VERSION)]),
                Sexpr::node("generator", vec![Sexpr::string(GENERATOR)]),
                Sexpr::node(
                    "generator_version",
                    vec![Sexpr::string(env!("CARGO_PKG_VERSION"))],
                ),
            ],
            symbols: IndexMap::new(),
        }
    }

    /// Parses library text into a document.
    ///
    /// # Errors
    ///
    /// Returns [`SymbolError::MalformedDocument`] if the text is not a
    /// balanced `kicad_symbol_lib` list or a symbol has no name.
    pub fn parse(text: &str) -> SymbolResult<Self> {
        let root = parse(text)?;
        if !root.is(ROOT) {
            return Err(SymbolError::malformed(
                0,
                format!("expected a '{ROOT}' document"),
            ));
        }

        let mut doc = Self {
            header: Vec::new(),
            symbols: IndexMap::new(),
        };
        for item in root.as_list().unwrap_or_default().iter().skip(1) {
            if item.is("symbol") {
                let name = item
                    .arg(0)
                    .ok_or_else(|| SymbolError::malformed(0, "symbol without a name"))?;
                doc.symbols.insert(name.to_string(), item.clone());
            } else {
                doc.header.push(item.clone());
            }
        }
        Ok(doc)
    }

    /// Serialises the document.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut items = Vec::with_capacity(1 + self.header.len() + self.symbols.len());
        items.push(Sexpr::symbol(ROOT));
        items.extend(self.header.iter().cloned());
        items.extend(self.symbols.values().cloned());
        let mut text = Sexpr::List(items).to_string();
        text.push('\n');
        text
    }
}

/// How the output relates to an existing library.
#[derive(Debug, Clone, Copy)]
pub enum WriteMode<'a> {
    /// Start a fresh document.
    Overwrite,
    /// Merge into an existing document's text.
    Merge {
        /// Existing library text.
        existing: &'a str,
        /// Replace existing symbols with incoming ones of the same name.
        replace: bool,
    },
}

/// Result of writing a library.
#[derive(Debug, Default)]
pub struct WriteOutcome {
    /// The complete document text.
    pub text: String,
    /// Parts written into the document (new or replacing).
    pub written: Vec<String>,
    /// Subset of `written` that replaced an existing symbol.
    pub replaced: Vec<String>,
    /// Incoming parts left out because the document already had them.
    pub skipped: Vec<String>,
    /// Parts that could not be laid out, with the reason.
    pub rejected: Vec<(String, SymbolError)>,
    /// Non-fatal problems found while arranging pins.
    pub diagnostics: Vec<Diagnostic>,
}

/// Writes `library` as symbol-library text.
///
/// Parts that fail to lay out are rejected individually and reported in
/// [`WriteOutcome::rejected`]; the rest are still written.
///
/// # Errors
///
/// Returns [`SymbolError::MalformedDocument`] if merging into text that
/// cannot be parsed.
pub fn write_library(
    library: &Library,
    mode: WriteMode<'_>,
    opts: &LayoutOptions,
) -> SymbolResult<WriteOutcome> {
    let (mut doc, replace) = match mode {
        WriteMode::Overwrite => (SymbolDocument::new(), true),
        WriteMode::Merge { existing, replace } => (SymbolDocument::parse(existing)?, replace),
    };

    let mut outcome = WriteOutcome::default();
    for part in library.parts.values() {
        let exists = doc.symbols.contains_key(&part.name);
        if exists && !replace {
            tracing::warn!(part = %part.name, "Symbol already in library; skipping");
            outcome.skipped.push(part.name.clone());
            continue;
        }

        match render_symbol(part, opts) {
            Ok((symbol, diagnostics)) => {
                outcome.diagnostics.extend(diagnostics);
                if exists {
                    outcome.replaced.push(part.name.clone());
                }
                // Insert keeps the position of a replaced symbol.
                doc.symbols.insert(part.name.clone(), symbol);
                outcome.written.push(part.name.clone());
            }
            Err(e) => {
                tracing::warn!(part = %part.name, error = %e, "Part rejected");
                outcome.rejected.push((part.name.clone(), e));
            }
        }
    }

    tracing::debug!(
        written = outcome.written.len(),
        skipped = outcome.skipped.len(),
        rejected = outcome.rejected.len(),
        "Wrote symbol library"
    );
    outcome.text = doc.to_text();
    Ok(outcome)
}

/// Arranges, lays out and serialises one part.
///
/// # Errors
///
/// Returns [`SymbolError::NoPins`] or [`SymbolError::EmptyUnit`] when the
/// part has nothing to place.
pub fn render_symbol(part: &Part, opts: &LayoutOptions) -> SymbolResult<(Sexpr, Vec<Diagnostic>)> {
    let arranged = arrange_part(part, opts)?;
    let geometry = layout_part(&arranged, opts);
    Ok((symbol_sexpr(part, &geometry, opts), arranged.diagnostics))
}

fn yes_no(flag: bool) -> Sexpr {
    Sexpr::symbol(if flag { "yes" } else { "no" })
}

fn font() -> Sexpr {
    Sexpr::node(
        "font",
        vec![Sexpr::node(
            "size",
            vec![Sexpr::number(FONT_SIZE), Sexpr::number(FONT_SIZE)],
        )],
    )
}

fn property(key: &str, value: &str, geometry: &SymbolGeometry, row: usize, visible: bool) -> Sexpr {
    let at = geometry.property_anchor(row);
    Sexpr::node(
        "property",
        vec![
            Sexpr::string(key),
            Sexpr::string(value),
            Sexpr::node(
                "at",
                vec![Sexpr::number(at.x), Sexpr::number(at.y), Sexpr::number(0.0)],
            ),
            Sexpr::node(
                "effects",
                vec![
                    font(),
                    Sexpr::node("justify", vec![Sexpr::symbol("left")]),
                    Sexpr::node("hide", vec![yes_no(!visible)]),
                ],
            ),
        ],
    )
}

fn symbol_sexpr(part: &Part, geometry: &SymbolGeometry, opts: &LayoutOptions) -> Sexpr {
    let mut symbol = Sexpr::node(
        "symbol",
        vec![
            Sexpr::string(&part.name),
            Sexpr::node("exclude_from_sim", vec![yes_no(false)]),
            Sexpr::node("in_bom", vec![yes_no(true)]),
            Sexpr::node("on_board", vec![yes_no(true)]),
        ],
    );

    symbol.push(property(field::VALUE, part.value(), geometry, 0, true));
    symbol.push(property(field::REFERENCE, &part.reference, geometry, 1, true));
    let hidden = [
        (field::FOOTPRINT, part.footprint.as_str()),
        (field::DATASHEET, part.datasheet.as_str()),
        (field::DESCRIPTION, part.description.as_str()),
    ]
    .into_iter()
    .chain(part.properties.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    for (row, (key, value)) in hidden.enumerate() {
        symbol.push(property(key, value, geometry, row + 2, false));
    }

    // Every unit of a multi-unit part is named, the unlabeled one as "", so
    // reading the file back recovers the same identifiers.
    let named = geometry.units.len() > 1;
    for (index, unit) in geometry.units.iter().enumerate() {
        symbol.push(unit_sexpr(&part.name, index + 1, unit, named, opts));
    }

    symbol.push(Sexpr::node("embedded_fonts", vec![yes_no(false)]));
    symbol
}

fn unit_sexpr(
    part: &str,
    number: usize,
    unit: &UnitGeometry,
    named: bool,
    opts: &LayoutOptions,
) -> Sexpr {
    let mut sub = Sexpr::node("symbol", vec![Sexpr::string(format!("{part}_{number}_1"))]);
    if named || !unit.id.is_empty() {
        sub.push(Sexpr::node("unit_name", vec![Sexpr::string(&unit.id)]));
    }

    sub.push(Sexpr::node(
        "rectangle",
        vec![
            Sexpr::node(
                "start",
                vec![Sexpr::number(unit.body.start.x), Sexpr::number(unit.body.start.y)],
            ),
            Sexpr::node(
                "end",
                vec![Sexpr::number(unit.body.end.x), Sexpr::number(unit.body.end.y)],
            ),
            Sexpr::node(
                "stroke",
                vec![
                    Sexpr::node("width", vec![Sexpr::number(opts.box_line_width)]),
                    Sexpr::node("type", vec![Sexpr::symbol("default")]),
                ],
            ),
            Sexpr::node(
                "fill",
                vec![Sexpr::node("type", vec![Sexpr::symbol(opts.fill.keyword())])],
            ),
        ],
    ));

    // Pins go out in source order so the file mirrors the input table.
    let mut placed: Vec<&PlacedPin> = unit.pins.iter().collect();
    placed.sort_by_key(|p| p.pin.order);
    for pin in placed {
        for (i, number) in pin.pin.numbers.iter().enumerate() {
            sub.push(pin_sexpr(pin, number, i > 0 || pin.pin.hidden));
        }
    }
    sub
}

fn pin_sexpr(placed: &PlacedPin, number: &str, hidden: bool) -> Sexpr {
    let pin = &placed.pin;
    let mut items = vec![
        Sexpr::symbol(pin.pin_type.keyword()),
        Sexpr::symbol(pin.style.keyword()),
        Sexpr::node(
            "at",
            vec![
                Sexpr::number(placed.at.x),
                Sexpr::number(placed.at.y),
                Sexpr::symbol(placed.angle.to_string()),
            ],
        ),
        Sexpr::node("length", vec![Sexpr::number(placed.length)]),
    ];
    if hidden {
        items.push(Sexpr::node("hide", vec![yes_no(true)]));
    }
    let name = if pin.label.is_empty() { "~" } else { pin.label.as_str() };
    items.push(Sexpr::node(
        "name",
        vec![Sexpr::string(name), Sexpr::node("effects", vec![font()])],
    ));
    items.push(Sexpr::node(
        "number",
        vec![Sexpr::string(number), Sexpr::node("effects", vec![font()])],
    ));
    for alt in &pin.alternates {
        items.push(Sexpr::node(
            "alternate",
            vec![
                Sexpr::string(alt),
                Sexpr::symbol(pin.pin_type.keyword()),
                Sexpr::symbol(pin.style.keyword()),
            ],
        ));
    }
    Sexpr::node("pin", items)
}

/// What to do when the output file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputPolicy {
    /// Replace the file, or with `merge`, replace colliding symbols.
    pub overwrite: bool,
    /// Merge into the existing file instead of replacing it.
    pub merge: bool,
}

/// Writes `library` to `path` according to `policy`.
///
/// # Errors
///
/// Returns [`SymbolError::OutputExists`] if the file exists and neither
/// overwriting nor merging is enabled, [`SymbolError::FileRead`] or
/// [`SymbolError::FileWrite`] on I/O failure, and
/// [`SymbolError::MalformedDocument`] if the file to merge into is not a
/// symbol library.
pub fn save_library(
    path: &Path,
    library: &Library,
    opts: &LayoutOptions,
    policy: OutputPolicy,
) -> SymbolResult<WriteOutcome> {
    let existing = if path.exists() {
        if policy.merge {
            Some(fs::read_to_string(path).map_err(|e| SymbolError::file_read(path, e))?)
        } else if policy.overwrite {
            None
        } else {
            return Err(SymbolError::OutputExists {
                path: path.to_path_buf(),
            });
        }
    } else {
        None
    };

    let mode = existing.as_deref().map_or(WriteMode::Overwrite, |text| WriteMode::Merge {
        existing: text,
        replace: policy.overwrite,
    });
    let outcome = write_library(library, mode, opts)?;
    write_atomic(path, outcome.text.as_bytes())?;
    tracing::info!(path = %path.display(), parts = outcome.written.len(), "Saved symbol library");
    Ok(outcome)
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "kipart".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Writes `bytes` to a sibling temporary file and renames it over `path`.
///
/// # Errors
///
/// Returns [`SymbolError::FileWrite`] if either step fails; the temporary
/// file is removed on failure.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> SymbolResult<()> {
    let tmp = temp_path(path);
    let result = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, path));
    result.map_err(|e| {
        let _ = fs::remove_file(&tmp);
        SymbolError::file_write(path, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::options::FillStyle;
    use crate::symbol::pin::{PinRecord, PinType, Side};

    fn sample_part(name: &str) -> Part {
        let mut part = Part::new(name);
        part.footprint = "Package_SO:SOIC-8".to_string();
        part.add_pin(PinRecord::new("1", "IN", PinType::Input));
        part.add_pin(PinRecord::new("2", "OUT", PinType::Output).on(Side::Right));
        part
    }

    fn library(parts: &[Part]) -> Library {
        let mut lib = Library::new();
        for p in parts {
            lib.insert(p.clone());
        }
        lib
    }

    #[test]
    fn new_document_has_header() {
        let outcome = write_library(
            &library(&[sample_part("AMP")]),
            WriteMode::Overwrite,
            &LayoutOptions::default(),
        )
        .unwrap();
        assert!(outcome.text.starts_with("(kicad_symbol_lib"));
        assert!(outcome.text.contains("(version 20241209)"));
        assert!(outcome.text.contains("(generator \"kipart\")"));
        assert!(outcome.text.contains("(symbol \"AMP_1_1\""));
        assert!(outcome.text.contains("(embedded_fonts no)"));
        assert_eq!(outcome.written, vec!["AMP"]);
    }

    #[test]
    fn pins_carry_type_style_and_angle() {
        let outcome = write_library(
            &library(&[sample_part("AMP")]),
            WriteMode::Overwrite,
            &LayoutOptions::default(),
        )
        .unwrap();
        let doc = SymbolDocument::parse(&outcome.text).unwrap();
        let unit = doc.symbols["AMP"].child("symbol").unwrap();
        let pins: Vec<&Sexpr> = unit.children_named("pin").collect();
        assert_eq!(pins.len(), 2);
        assert_eq!(pins[0].arg(0), Some("input"));
        assert_eq!(pins[0].child("at").unwrap().arg(2), Some("0"));
        assert_eq!(pins[1].arg(0), Some("output"));
        assert_eq!(pins[1].child("at").unwrap().arg(2), Some("180"));
    }

    #[test]
    fn fill_and_stroke_follow_options() {
        let opts = LayoutOptions {
            fill: FillStyle::NoFill,
            box_line_width: 0.5,
            ..LayoutOptions::default()
        };
        let outcome = write_library(&library(&[sample_part("AMP")]), WriteMode::Overwrite, &opts)
            .unwrap();
        assert!(outcome.text.contains("(fill (type none))"));
        assert!(outcome.text.contains("(stroke (width 0.5) (type default))"));
    }

    #[test]
    fn merge_keeps_existing_and_skips_duplicates() {
        let opts = LayoutOptions::default();
        let first = write_library(
            &library(&[sample_part("A"), sample_part("B")]),
            WriteMode::Overwrite,
            &opts,
        )
        .unwrap();

        let mut changed = sample_part("A");
        changed.footprint = "Other:FP".to_string();
        let merged = write_library(
            &library(&[changed, sample_part("C")]),
            WriteMode::Merge {
                existing: &first.text,
                replace: false,
            },
            &opts,
        )
        .unwrap();

        assert_eq!(merged.skipped, vec!["A"]);
        assert_eq!(merged.written, vec!["C"]);
        assert!(merged.text.contains("Package_SO:SOIC-8"));
        assert!(!merged.text.contains("Other:FP"));
        let doc = SymbolDocument::parse(&merged.text).unwrap();
        let names: Vec<&str> = doc.symbols.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn merge_with_replace_keeps_position() {
        let opts = LayoutOptions::default();
        let first = write_library(
            &library(&[sample_part("A"), sample_part("B")]),
            WriteMode::Overwrite,
            &opts,
        )
        .unwrap();
        let mut changed = sample_part("A");
        changed.footprint = "Other:FP".to_string();
        let merged = write_library(
            &library(&[changed]),
            WriteMode::Merge {
                existing: &first.text,
                replace: true,
            },
            &opts,
        )
        .unwrap();
        assert_eq!(merged.replaced, vec!["A"]);
        let doc = SymbolDocument::parse(&merged.text).unwrap();
        assert_eq!(doc.symbols.get_index(0).unwrap().0, "A");
        assert!(merged.text.contains("Other:FP"));
    }

    #[test]
    fn merge_into_garbage_fails() {
        let result = write_library(
            &library(&[sample_part("A")]),
            WriteMode::Merge {
                existing: "(kicad_symbol_lib (symbol",
                replace: false,
            },
            &LayoutOptions::default(),
        );
        assert!(matches!(result, Err(SymbolError::MalformedDocument { .. })));
    }

    #[test]
    fn empty_part_is_rejected_but_others_written() {
        let outcome = write_library(
            &library(&[Part::new("EMPTY"), sample_part("OK")]),
            WriteMode::Overwrite,
            &LayoutOptions::default(),
        )
        .unwrap();
        assert_eq!(outcome.written, vec!["OK"]);
        assert_eq!(outcome.rejected.len(), 1);
        assert!(matches!(outcome.rejected[0].1, SymbolError::NoPins { .. }));
    }

    #[test]
    fn empty_pin_name_is_written_as_tilde() {
        let mut part = Part::new("R");
        part.add_pin(PinRecord::new("1", "", PinType::Passive));
        let outcome =
            write_library(&library(&[part]), WriteMode::Overwrite, &LayoutOptions::default())
                .unwrap();
        assert!(outcome.text.contains("(name \"~\""));
    }
}
