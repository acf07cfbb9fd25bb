//! Schematic symbol generation and parsing.
//!
//! The pipeline from pin data to library text runs through these stages:
//!
//! 1. [`arrange::build_part`] resolves the untyped [`RawPart`] produced by an
//!    input adapter into a [`Part`], repairing what it can and reporting the
//!    rest as [`Diagnostic`]s.
//! 2. [`arrange::arrange_part`] sorts, reverses and bundles pins into per-unit,
//!    per-side slot lists.
//! 3. [`layout::layout_part`] places bodies and pins on the 50 mil grid.
//! 4. [`writer::write_library`] serialises the result as symbol-library text,
//!    either replacing a file or merging into an existing one.
//!
//! [`reader::parse_library`] is the inverse of the last step.

pub mod arrange;
pub mod error;
pub mod layout;
pub mod mnemonic;
pub mod natural;
pub mod options;
pub mod part;
pub mod pin;
pub mod reader;
pub mod sexpr;
pub mod writer;

pub use arrange::{arrange_part, build_part, ArrangedPart};
pub use error::{Diagnostic, SymbolError, SymbolResult};
pub use layout::{layout_part, SymbolGeometry};
pub use options::{Annotation, FillStyle, LayoutOptions, SortMode};
pub use part::{Library, MergeReport, Part, RawPart, Unit};
pub use pin::{PinRecord, PinStyle, PinType, RawPin, Side};
pub use reader::{load_library, parse_library};
pub use writer::{save_library, write_library, OutputPolicy, SymbolDocument, WriteMode, WriteOutcome};
