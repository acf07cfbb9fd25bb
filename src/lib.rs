//! kipart: schematic symbol generation from pin tables.
//!
//! Reads pin lists (a CSV table or a vendor export), arranges the pins of
//! each part around one rectangular body per unit, and writes the result as
//! a KiCad symbol library. Libraries can be read back and exported as tables
//! again.
//!
//! # Modules
//!
//! - [`symbol`]: Pin model, arrangement, layout and the symbol-library codec
//! - [`table`]: Tabular pin-list form, both directions
//! - [`adapters`]: Input adapters producing raw parts
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Configuration error types

pub mod adapters;
pub mod config;
pub mod error;
pub mod symbol;
pub mod table;
