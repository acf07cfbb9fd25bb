//! The tabular form itself, read through [`crate::table`].

use super::PinSource;
use crate::symbol::error::SymbolResult;
use crate::symbol::part::RawPart;
use crate::table;

/// Reads the native CSV pin table.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericTable;

impl GenericTable {
    /// Registry name.
    pub const NAME: &'static str = "generic";
}

impl PinSource for GenericTable {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read(&self, raw: &str, source: &str) -> SymbolResult<Vec<RawPart>> {
        let read = table::read_table(raw)?;
        if !read.rejected.is_empty() {
            tracing::warn!(
                source,
                rejected = read.rejected.len(),
                "Some parts could not be read"
            );
        }
        Ok(read.parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_good_parts() {
        let text = "A\npin,name\n1,X\n\nB\npin,bogus\n1,Y\n";
        let parts = GenericTable.read(text, "lib.csv").unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name, "A");
    }
}
