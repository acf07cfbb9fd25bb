//! Tabular pin-list form.
//!
//! A table file holds one or more parts separated by blank rows. Each part is
//! laid out as:
//!
//! ```text
//! LM358
//! reference:,U
//! footprint:,Package_SO:SOIC-8
//! pin,name,type,side,unit,style,hidden
//! 1,OUTA,output,right,A,,
//! 2,-INA,input,left,A,,
//! ```
//!
//! The header row must name the `pin` and `name` columns; `unit`, `side`,
//! `type`, `style` and `hidden` are optional and may appear in any order.
//! Values are kept as text: interpreting them is the job of
//! [`crate::symbol::arrange`].

use std::borrow::Cow;
use std::path::Path;

use crate::symbol::error::{SymbolError, SymbolResult};
use crate::symbol::part::{field, Library, Part, RawPart};
use crate::symbol::pin::{PinRecord, RawPin};
use crate::symbol::writer::write_atomic;

/// Column labels written by [`write_table`].
pub const HEADER: [&str; 7] = ["pin", "name", "type", "side", "unit", "style", "hidden"];

/// Alternate-name delimiter used when exporting if none is configured.
pub const DEFAULT_ALT_DELIMITER: char = '/';

/// Parts read from a table, plus the parts that had to be rejected.
#[derive(Debug, Default)]
pub struct TableRead {
    /// Parts in file order.
    pub parts: Vec<RawPart>,
    /// One error per rejected part.
    pub rejected: Vec<SymbolError>,
}

/// Maps a property label to its symbol field name.
///
/// Labels are case-insensitive; unknown labels are kept verbatim.
#[must_use]
pub fn property_field(label: &str) -> &str {
    match label.trim().to_lowercase().as_str() {
        "reference" | "ref" => field::REFERENCE,
        "value" | "val" => field::VALUE,
        "footprint" | "fp" => field::FOOTPRINT,
        "datasheet" => field::DATASHEET,
        "description" | "desc" => field::DESCRIPTION,
        "keywords" | "ki_keywords" => "ki_keywords",
        "locked" | "ki_locked" => "ki_locked",
        "fp_filters" | "filters" | "ki_fp_filters" => "ki_fp_filters",
        _ => label.trim(),
    }
}

fn property_label(key: &str) -> &str {
    match key {
        "ki_keywords" => "keywords",
        "ki_locked" => "locked",
        "ki_fp_filters" => "fp_filters",
        _ => key,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Pin,
    Name,
    Unit,
    Side,
    Type,
    Style,
    Hidden,
}

impl Column {
    fn from_label(label: &str) -> Option<Self> {
        Some(match label {
            "pin" | "number" | "num" => Self::Pin,
            "name" => Self::Name,
            "unit" => Self::Unit,
            "side" => Self::Side,
            "type" => Self::Type,
            "style" => Self::Style,
            "hidden" => Self::Hidden,
            _ => return None,
        })
    }
}

/// Decodes file bytes as UTF-8, falling back to Windows-1252.
#[must_use]
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let text = std::str::from_utf8(bytes).map_or_else(
        |_| {
            tracing::debug!("Input is not UTF-8; decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded
        },
        Cow::Borrowed,
    );
    match text {
        Cow::Borrowed(s) => Cow::Borrowed(s.trim_start_matches('\u{feff}')),
        Cow::Owned(s) => Cow::Owned(s.trim_start_matches('\u{feff}').to_string()),
    }
}

/// A table row with the line it started on.
type Row = (u64, Vec<String>);

fn is_blank(cells: &[String]) -> bool {
    cells.iter().all(|c| c.trim().is_empty())
}

/// Splits table text into per-part row blocks.
///
/// The CSV reader skips empty lines, so a block boundary is detected from the
/// line numbers of consecutive records as well as from rows of empty cells.
fn split_blocks(text: &str) -> SymbolResult<Vec<Vec<Row>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut blocks: Vec<Vec<Row>> = Vec::new();
    let mut current: Vec<Row> = Vec::new();
    let mut next_line = 1;

    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(next_line, csv::Position::line);
        let cells: Vec<String> = record.iter().map(String::from).collect();
        let spanned: u64 = cells.iter().map(|c| c.matches('\n').count() as u64).sum();

        if (line > next_line || is_blank(&cells)) && !current.is_empty() {
            blocks.push(std::mem::take(&mut current));
        }
        if !is_blank(&cells) {
            current.push((line, cells));
        }
        next_line = line + spanned + 1;
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    Ok(blocks)
}

fn cell(row: &[String], index: Option<usize>) -> String {
    index
        .and_then(|i| row.get(i))
        .map_or_else(String::new, |c| c.trim().to_string())
}

/// Interprets the rows of one part.
fn parse_block(rows: &[Row]) -> SymbolResult<RawPart> {
    let mut rows = rows.iter();
    let Some((line, first)) = rows.next() else {
        return Err(SymbolError::invalid_table("", "empty block"));
    };
    let name = first.first().map(|c| c.trim()).unwrap_or_default();
    if name.is_empty() {
        return Err(SymbolError::invalid_table(
            format!("<line {line}>"),
            "first row must hold the part name",
        ));
    }
    let mut part = RawPart::new(name);

    let header = loop {
        let Some((_, row)) = rows.next() else {
            return Err(SymbolError::invalid_table(name, "missing pin column header row"));
        };
        let label = row.first().map(|c| c.trim()).unwrap_or_default();
        match label.strip_suffix(':') {
            Some(label) => {
                let value = row.get(1).map(|v| v.trim()).unwrap_or_default();
                part.properties
                    .insert(property_field(label).to_string(), value.to_string());
            }
            None => break row,
        }
    };

    let mut columns: [Option<usize>; 7] = [None; 7];
    for (i, label) in header.iter().enumerate() {
        let label = label.trim().to_lowercase();
        if label.is_empty() {
            continue;
        }
        let Some(column) = Column::from_label(&label) else {
            return Err(SymbolError::invalid_table(
                name,
                format!("unrecognised column '{label}' in header"),
            ));
        };
        columns[column as usize] = Some(i);
    }
    for (column, label) in [(Column::Pin, "pin"), (Column::Name, "name")] {
        if columns[column as usize].is_none() {
            return Err(SymbolError::invalid_table(
                name,
                format!("required column '{label}' not found in header"),
            ));
        }
    }

    let col = |c: Column| columns[c as usize];
    for (_, row) in rows {
        part.pins.push(RawPin {
            number: cell(row, col(Column::Pin)),
            name: cell(row, col(Column::Name)),
            unit: cell(row, col(Column::Unit)),
            side: cell(row, col(Column::Side)),
            pin_type: cell(row, col(Column::Type)),
            style: cell(row, col(Column::Style)),
            hidden: cell(row, col(Column::Hidden)),
        });
    }

    tracing::trace!(part = name, pins = part.pins.len(), "Read table block");
    Ok(part)
}

/// Reads every part from table text.
///
/// A part whose rows cannot be interpreted is rejected on its own; the rest
/// of the text is still read.
///
/// # Errors
///
/// Returns [`SymbolError::Csv`] if the text is not valid CSV.
pub fn read_table(text: &str) -> SymbolResult<TableRead> {
    let mut read = TableRead::default();
    for block in split_blocks(text)? {
        match parse_block(&block) {
            Ok(part) => read.parts.push(part),
            Err(e) => {
                tracing::warn!("{e}; part skipped");
                read.rejected.push(e);
            }
        }
    }
    tracing::debug!(
        parts = read.parts.len(),
        rejected = read.rejected.len(),
        "Read pin table"
    );
    Ok(read)
}

/// Reads a table file.
///
/// # Errors
///
/// Returns [`SymbolError::FileRead`] if the file cannot be read, or
/// [`SymbolError::Csv`] if its content is not valid CSV.
pub fn read_table_file(path: &Path) -> SymbolResult<TableRead> {
    let bytes = std::fs::read(path).map_err(|e| SymbolError::file_read(path, e))?;
    read_table(&decode_text(&bytes))
}

fn pin_row(pin: &PinRecord, delimiter: char) -> [String; 7] {
    let mut name = pin.name.clone();
    for alt in &pin.alternates {
        name.push(delimiter);
        name.push_str(alt);
    }
    [
        pin.number.clone(),
        name,
        pin.pin_type.keyword().to_string(),
        pin.side.keyword().to_string(),
        pin.unit.clone(),
        pin.style.keyword().to_string(),
        if pin.hidden { "yes" } else { "no" }.to_string(),
    ]
}

fn write_part(part: &Part, delimiter: char) -> SymbolResult<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    wtr.write_record([part.name.as_str()])?;
    wtr.write_record(["reference:", part.reference.as_str()])?;
    if !part.value.is_empty() {
        wtr.write_record(["value:", part.value.as_str()])?;
    }
    wtr.write_record(["footprint:", part.footprint.as_str()])?;
    wtr.write_record(["datasheet:", part.datasheet.as_str()])?;
    wtr.write_record(["description:", part.description.as_str()])?;
    for (key, value) in &part.properties {
        let label = format!("{}:", property_label(key));
        wtr.write_record([label.as_str(), value.as_str()])?;
    }

    wtr.write_record(HEADER)?;
    for pin in part.pins() {
        wtr.write_record(pin_row(pin, delimiter))?;
    }

    wtr.into_inner()
        .map_err(|e| SymbolError::Csv(csv::Error::from(e.into_error())))
}

/// Writes a library in table form, one block per part in library order.
///
/// # Errors
///
/// Returns [`SymbolError::Csv`] if encoding fails.
pub fn write_table(library: &Library, alt_delimiter: Option<char>) -> SymbolResult<String> {
    let delimiter = alt_delimiter.unwrap_or(DEFAULT_ALT_DELIMITER);
    let mut out = Vec::new();
    for (i, part) in library.parts.values().enumerate() {
        if i > 0 {
            out.push(b'\n');
        }
        out.extend(write_part(part, delimiter)?);
    }
    // Every cell came from a `str`, so the bytes are UTF-8.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Writes a library to a table file.
///
/// # Errors
///
/// Returns [`SymbolError::OutputExists`] if the file exists and `overwrite`
/// is not set, or [`SymbolError::FileWrite`] if it cannot be written.
pub fn save_table(
    path: &Path,
    library: &Library,
    alt_delimiter: Option<char>,
    overwrite: bool,
) -> SymbolResult<()> {
    if path.exists() && !overwrite {
        return Err(SymbolError::OutputExists {
            path: path.to_path_buf(),
        });
    }
    let text = write_table(library, alt_delimiter)?;
    write_atomic(path, text.as_bytes())?;
    tracing::info!(path = %path.display(), parts = library.len(), "Saved pin table");
    Ok(())
}
