//! Digit-run-aware string ordering.
//!
//! Numeric runs compare by value and a digit sorts before a letter. This
//! gives `9, 10, A1, A2, A10, B1` and `ADC_2` before `ADC_12`.

use std::cmp::Ordering;

/// Compares two identifiers in natural order.
///
/// Ties between differently-written equal values fall back to plain string
/// order so the result is total.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natord::compare(a, b).then_with(|| a.cmp(b))
}
