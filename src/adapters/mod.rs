//! Input adapters.
//!
//! An adapter turns the text of one input file into [`RawPart`]s. Adapters do
//! not interpret pin attributes beyond mapping their source's vocabulary onto
//! the tokens [`crate::symbol::mnemonic`] understands; defaults, repairs and
//! validation happen later in [`crate::symbol::arrange`].

mod generic;
mod stm32cube;

pub use generic::GenericTable;
pub use stm32cube::Stm32Cube;

use crate::symbol::error::{SymbolError, SymbolResult};
use crate::symbol::part::RawPart;

/// Names of the registered adapters.
pub const ADAPTER_NAMES: [&str; 2] = [GenericTable::NAME, Stm32Cube::NAME];

/// A source of pin data.
pub trait PinSource {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Reads every part from `raw`.
    ///
    /// `source` identifies where the text came from (usually a file path);
    /// adapters that name parts after their file use it.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be read at all. Problems confined
    /// to one part are logged and that part is left out.
    fn read(&self, raw: &str, source: &str) -> SymbolResult<Vec<RawPart>>;
}

/// Looks up an adapter by name (case-insensitive).
///
/// # Errors
///
/// Returns [`SymbolError::UnknownAdapter`] if no adapter has that name.
pub fn adapter_for(name: &str) -> SymbolResult<Box<dyn PinSource>> {
    match name.trim().to_lowercase().as_str() {
        GenericTable::NAME => Ok(Box::new(GenericTable)),
        Stm32Cube::NAME => Ok(Box::new(Stm32Cube)),
        _ => Err(SymbolError::UnknownAdapter {
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup() {
        for name in ADAPTER_NAMES {
            assert_eq!(adapter_for(name).unwrap().name(), name);
        }
        assert_eq!(adapter_for("STM32Cube").unwrap().name(), "stm32cube");
    }

    #[test]
    fn unknown_adapter() {
        assert!(matches!(
            adapter_for("xilinx7"),
            Err(SymbolError::UnknownAdapter { name }) if name == "xilinx7"
        ));
    }
}
