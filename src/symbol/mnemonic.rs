//! Mnemonic resolution for pin types, styles and sides.
//!
//! Spreadsheet authors write pin attributes in many ways (`in`, `inp`,
//! `INPUT`, `pwr`, `gnd`...). Each closed enum carries a static synonym table
//! and [`resolve`] maps a free-text token onto it.
//!
//! # Matching
//!
//! Tokens are trimmed and lowercased, then looked up exactly. In fuzzy mode a
//! token that has no exact entry is scored against every synonym with a
//! normalised edit-distance similarity; the best match is accepted only when
//! it clears [`FUZZY_THRESHOLD`] and no synonym of a *different* value scores
//! the same.

use super::error::{SymbolError, SymbolResult};
use super::pin::{PinStyle, PinType, Side};

/// Minimum similarity (`1 - distance / longest`) for a fuzzy match.
pub const FUZZY_THRESHOLD: f64 = 0.6;

/// A closed enumeration with a synonym table.
pub trait Mnemonic: Copy + PartialEq + Sized + 'static {
    /// Human-readable category used in error messages.
    const CATEGORY: &'static str;

    /// Synonym table: every accepted lowercase spelling and its value.
    fn table() -> &'static [(&'static str, Self)];
}

impl Mnemonic for PinType {
    const CATEGORY: &'static str = "pin type";

    fn table() -> &'static [(&'static str, Self)] {
        use PinType::*;
        &[
            ("input", Input),
            ("inp", Input),
            ("in", Input),
            ("i", Input),
            ("clk", Input),
            ("output", Output),
            ("outp", Output),
            ("out", Output),
            ("o", Output),
            ("bidirectional", Bidirectional),
            ("bidir", Bidirectional),
            ("bi", Bidirectional),
            ("inout", Bidirectional),
            ("io", Bidirectional),
            ("iop", Bidirectional),
            ("tri_state", TriState),
            ("tri-state", TriState),
            ("tristate", TriState),
            ("tri", TriState),
            ("passive", Passive),
            ("pass", Passive),
            ("free", Free),
            ("unspecified", Unspecified),
            ("un", Unspecified),
            ("analog", Unspecified),
            ("power_in", PowerIn),
            ("power-in", PowerIn),
            ("pwr_in", PowerIn),
            ("pwrin", PowerIn),
            ("power", PowerIn),
            ("pwr", PowerIn),
            ("ground", PowerIn),
            ("gnd", PowerIn),
            ("power_out", PowerOut),
            ("power-out", PowerOut),
            ("pwr_out", PowerOut),
            ("pwrout", PowerOut),
            ("pwr_o", PowerOut),
            ("open_collector", OpenCollector),
            ("open-collector", OpenCollector),
            ("opencollector", OpenCollector),
            ("open_coll", OpenCollector),
            ("opencoll", OpenCollector),
            ("oc", OpenCollector),
            ("open_emitter", OpenEmitter),
            ("open-emitter", OpenEmitter),
            ("openemitter", OpenEmitter),
            ("open_emit", OpenEmitter),
            ("openemit", OpenEmitter),
            ("oe", OpenEmitter),
            ("no_connect", NoConnect),
            ("no-connect", NoConnect),
            ("noconnect", NoConnect),
            ("no_conn", NoConnect),
            ("noconn", NoConnect),
            ("nc", NoConnect),
        ]
    }
}

impl Mnemonic for PinStyle {
    const CATEGORY: &'static str = "pin style";

    fn table() -> &'static [(&'static str, Self)] {
        use PinStyle::*;
        &[
            ("line", Line),
            ("inverted", Inverted),
            ("inv", Inverted),
            ("~", Inverted),
            ("#", Inverted),
            ("clock", Clock),
            ("clk", Clock),
            ("rising_clk", Clock),
            ("inverted_clock", InvertedClock),
            ("inv_clk", InvertedClock),
            ("clk_b", InvertedClock),
            ("clk_n", InvertedClock),
            ("~clk", InvertedClock),
            ("#clk", InvertedClock),
            ("input_low", InputLow),
            ("inp_low", InputLow),
            ("in_lw", InputLow),
            ("in_b", InputLow),
            ("in_n", InputLow),
            ("~in", InputLow),
            ("#in", InputLow),
            ("clock_low", ClockLow),
            ("clk_low", ClockLow),
            ("clk_lw", ClockLow),
            ("output_low", OutputLow),
            ("outp_low", OutputLow),
            ("out_lw", OutputLow),
            ("out_b", OutputLow),
            ("out_n", OutputLow),
            ("~out", OutputLow),
            ("#out", OutputLow),
            ("edge_clock_high", EdgeClockHigh),
            ("edge_clock", EdgeClockHigh),
            ("falling_clk", EdgeClockHigh),
            ("non_logic", NonLogic),
            ("nl", NonLogic),
            ("analog", NonLogic),
        ]
    }
}

impl Mnemonic for Side {
    const CATEGORY: &'static str = "pin side";

    fn table() -> &'static [(&'static str, Self)] {
        &[
            ("left", Side::Left),
            ("l", Side::Left),
            ("right", Side::Right),
            ("r", Side::Right),
            ("top", Side::Top),
            ("t", Side::Top),
            ("up", Side::Top),
            ("bottom", Side::Bottom),
            ("b", Side::Bottom),
            ("bot", Side::Bottom),
            ("down", Side::Bottom),
        ]
    }
}

/// Resolves a token against the synonym table of `T`.
///
/// # Errors
///
/// Returns [`SymbolError::UnrecognizedMnemonic`] when no entry matches, or
/// when a fuzzy match is tied between different values.
pub fn resolve<T: Mnemonic>(token: &str, fuzzy: bool) -> SymbolResult<T> {
    let key = token.trim().to_lowercase();

    if let Some(&(_, value)) = T::table().iter().find(|(syn, _)| *syn == key) {
        return Ok(value);
    }

    if !fuzzy || key.is_empty() {
        return Err(SymbolError::unrecognized(T::CATEGORY, token.trim()));
    }

    let mut best = 0.0_f64;
    let mut candidates: Vec<(&'static str, T)> = Vec::new();
    for &(syn, value) in T::table() {
        let score = similarity(&key, syn);
        if score > best + 1e-9 {
            best = score;
            candidates.clear();
            candidates.push((syn, value));
        } else if (score - best).abs() < 1e-9 && !candidates.iter().any(|c| c.1 == value) {
            candidates.push((syn, value));
        }
    }

    if best + 1e-9 < FUZZY_THRESHOLD {
        return Err(SymbolError::unrecognized(T::CATEGORY, token.trim()));
    }

    match candidates.as_slice() {
        [(syn, value)] => {
            tracing::debug!(token, matched = *syn, category = T::CATEGORY, "Fuzzy mnemonic match");
            Ok(*value)
        }
        _ => {
            let names: Vec<&str> = candidates.iter().map(|c| c.0).collect();
            Err(SymbolError::UnrecognizedMnemonic {
                category: T::CATEGORY,
                token: token.trim().to_string(),
                reason: format!(" (ambiguous between {})", names.join(", ")),
            })
        }
    }
}

/// Resolves a hidden-flag token.
///
/// # Errors
///
/// Returns [`SymbolError::UnrecognizedMnemonic`] for anything other than the
/// usual yes/no spellings.
pub fn resolve_flag(token: &str) -> SymbolResult<bool> {
    match token.trim().to_lowercase().as_str() {
        "" | "no" | "n" | "false" | "f" | "0" | "show" | "visible" => Ok(false),
        "yes" | "y" | "true" | "t" | "1" | "hide" | "hidden" => Ok(true),
        _ => Err(SymbolError::unrecognized("hidden flag", token.trim())),
    }
}

/// Normalised similarity in `0.0..=1.0` based on Levenshtein distance.
fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let score = 1.0 - levenshtein(a, b) as f64 / longest as f64;
    score
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        cur[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

macro_rules! mnemonic_from_str {
    ($($ty:ty),*) => {
        $(impl std::str::FromStr for $ty {
            type Err = SymbolError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                resolve(s, false)
            }
        })*
    };
}

mnemonic_from_str!(PinType, PinStyle, Side);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonyms_resolve_exactly() {
        assert_eq!(resolve::<PinType>("in", false).unwrap(), PinType::Input);
        assert_eq!(resolve::<PinType>(" INP ", false).unwrap(), PinType::Input);
        assert_eq!(resolve::<PinType>("clk", false).unwrap(), PinType::Input);
        assert_eq!(resolve::<PinType>("gnd", false).unwrap(), PinType::PowerIn);
        assert_eq!(resolve::<PinType>("oe", false).unwrap(), PinType::OpenEmitter);
        assert_eq!(resolve::<PinStyle>("clk_low", false).unwrap(), PinStyle::ClockLow);
        assert_eq!(resolve::<PinStyle>("~", false).unwrap(), PinStyle::Inverted);
        assert_eq!(resolve::<Side>("R", false).unwrap(), Side::Right);
    }

    #[test]
    fn every_canonical_keyword_resolves_to_itself() {
        for &(_, ty) in PinType::table() {
            assert_eq!(resolve::<PinType>(ty.keyword(), false).unwrap(), ty);
        }
        for &(_, style) in PinStyle::table() {
            assert_eq!(resolve::<PinStyle>(style.keyword(), false).unwrap(), style);
        }
        for side in Side::ALL {
            assert_eq!(resolve::<Side>(side.keyword(), false).unwrap(), side);
        }
    }

    #[test]
    fn unknown_token_without_fuzzy_fails() {
        let err = resolve::<PinType>("inptu", false).unwrap_err();
        assert!(matches!(
            err,
            SymbolError::UnrecognizedMnemonic { category: "pin type", .. }
        ));
    }

    #[test]
    fn fuzzy_accepts_close_unambiguous_match() {
        assert_eq!(resolve::<PinType>("inptu", true).unwrap(), PinType::Input);
        assert_eq!(resolve::<PinType>("bidirectonal", true).unwrap(), PinType::Bidirectional);
        assert_eq!(resolve::<Side>("rigth", true).unwrap(), Side::Right);
    }

    #[test]
    fn fuzzy_rejects_distant_token() {
        assert!(resolve::<PinType>("xyzzy", true).is_err());
    }

    #[test]
    fn fuzzy_reports_ties() {
        // One edit from both "oc" (open collector) and "oe" (open emitter).
        let err = resolve::<PinType>("oce", true).unwrap_err();
        match err {
            SymbolError::UnrecognizedMnemonic { reason, .. } => {
                assert!(reason.contains("ambiguous"), "{reason}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn hidden_flags() {
        assert!(resolve_flag("Y").unwrap());
        assert!(resolve_flag("1").unwrap());
        assert!(!resolve_flag("").unwrap());
        assert!(!resolve_flag("no").unwrap());
        assert!(resolve_flag("maybe").is_err());
    }

    #[test]
    fn from_str_is_exact() {
        assert_eq!("power_out".parse::<PinType>().unwrap(), PinType::PowerOut);
        assert!("powr_out".parse::<PinType>().is_err());
    }

    #[test]
    fn levenshtein_distance() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }
}
