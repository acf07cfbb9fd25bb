//! S-expression tree, parser and pretty printer for the symbol-library format.
//!
//! Atoms keep the distinction between bare symbols (`pin`, `input`, `1.27`)
//! and quoted strings (`"VCC"`), so a parsed document can be written back
//! without changing which atoms are quoted.

use std::fmt;

use thiserror::Error;

use super::error::SymbolError;

/// An S-expression value.
#[derive(Debug, Clone, PartialEq)]
pub enum Sexpr {
    /// Unquoted atom.
    Symbol(String),
    /// Quoted string.
    String(String),
    /// Parenthesised list.
    List(Vec<Sexpr>),
}

impl Sexpr {
    /// Creates a symbol atom.
    pub fn symbol(s: impl Into<String>) -> Self {
        Self::Symbol(s.into())
    }

    /// Creates a quoted string atom.
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Creates a symbol atom holding a formatted number.
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::Symbol(format_number(value))
    }

    /// Creates a list whose head is the symbol `head`.
    #[must_use]
    pub fn node(head: &str, rest: Vec<Self>) -> Self {
        let mut items = Vec::with_capacity(rest.len() + 1);
        items.push(Self::symbol(head));
        items.extend(rest);
        Self::List(items)
    }

    /// The atom text if this is a symbol or string.
    #[must_use]
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Self::Symbol(s) | Self::String(s) => Some(s),
            Self::List(_) => None,
        }
    }

    /// The list items if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// The head symbol of a list, e.g. `pin` for `(pin input line ...)`.
    #[must_use]
    pub fn head(&self) -> Option<&str> {
        match self.as_list()?.first()? {
            Self::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this is a list headed by `name`.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.head() == Some(name)
    }

    /// The `index`-th item after the head, as an atom.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.as_list()?.get(index + 1)?.as_atom()
    }

    /// The `index`-th item after the head, parsed as a number.
    #[must_use]
    pub fn num_arg(&self, index: usize) -> Option<f64> {
        self.arg(index)?.parse().ok()
    }

    /// Child lists (items after the head that are lists).
    pub fn children(&self) -> impl Iterator<Item = &Self> {
        self.as_list()
            .unwrap_or_default()
            .iter()
            .skip(1)
            .filter(|c| c.as_list().is_some())
    }

    /// First child list headed by `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children().find(|c| c.is(name))
    }

    /// Every child list headed by `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children().filter(move |c| c.is(name))
    }

    /// Whether a bare symbol `flag` appears among the items after the head.
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.as_list()
            .unwrap_or_default()
            .iter()
            .skip(1)
            .any(|c| matches!(c, Self::Symbol(s) if s == flag))
    }

    /// Appends an item to a list; no-op on atoms.
    pub fn push(&mut self, item: Self) {
        if let Self::List(items) = self {
            items.push(item);
        }
    }
}

/// Errors from [`parse`], with the byte offset where they were detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input ended where more was expected.
    #[error("unexpected end of input")]
    UnexpectedEof {
        /// Byte offset.
        offset: usize,
    },
    /// A `)` with no matching `(`.
    #[error("unbalanced ')'")]
    UnexpectedClose {
        /// Byte offset.
        offset: usize,
    },
    /// A list was never closed.
    #[error("unclosed list")]
    UnclosedList {
        /// Byte offset of the opening parenthesis.
        offset: usize,
    },
    /// A string was never closed.
    #[error("unterminated string")]
    UnterminatedString {
        /// Byte offset of the opening quote.
        offset: usize,
    },
    /// Extra content after the top-level expression.
    #[error("trailing content after document")]
    TrailingContent {
        /// Byte offset.
        offset: usize,
    },
}

impl ParseError {
    /// Byte offset of the problem.
    #[must_use]
    pub const fn offset(&self) -> usize {
        match self {
            Self::UnexpectedEof { offset }
            | Self::UnexpectedClose { offset }
            | Self::UnclosedList { offset }
            | Self::UnterminatedString { offset }
            | Self::TrailingContent { offset } => *offset,
        }
    }
}

impl From<ParseError> for SymbolError {
    fn from(e: ParseError) -> Self {
        Self::malformed(e.offset(), e.to_string())
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            pos: 0,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn advance(&mut self) -> Option<char> {
        let (i, c) = self.chars.next()?;
        self.pos = i + c.len_utf8();
        Some(c)
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.input.len(), |&(i, _)| i)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else if c == ';' {
                while let Some(c) = self.advance() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn parse_expr(&mut self) -> Result<Sexpr, ParseError> {
        self.skip_whitespace();
        let offset = self.offset();
        match self.peek() {
            None => Err(ParseError::UnexpectedEof { offset }),
            Some('(') => self.parse_list(),
            Some(')') => Err(ParseError::UnexpectedClose { offset }),
            Some('"') => self.parse_string(),
            Some(_) => Ok(self.parse_symbol()),
        }
    }

    fn parse_list(&mut self) -> Result<Sexpr, ParseError> {
        let open = self.offset();
        self.advance();
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(ParseError::UnclosedList { offset: open }),
                Some(')') => {
                    self.advance();
                    return Ok(Sexpr::List(items));
                }
                Some(_) => items.push(self.parse_expr()?),
            }
        }
    }

    fn parse_string(&mut self) -> Result<Sexpr, ParseError> {
        let open = self.offset();
        self.advance();
        let mut out = String::new();
        loop {
            match self.advance() {
                None => return Err(ParseError::UnterminatedString { offset: open }),
                Some('"') => return Ok(Sexpr::String(out)),
                Some('\\') => match self.advance() {
                    None => return Err(ParseError::UnterminatedString { offset: open }),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_symbol(&mut self) -> Sexpr {
        let start = self.offset();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '(' || c == ')' || c == '"' {
                break;
            }
            self.advance();
        }
        Sexpr::Symbol(self.input[start..self.pos].to_string())
    }
}

/// Parses a single top-level expression.
///
/// # Errors
///
/// Returns a [`ParseError`] on unbalanced lists, unterminated strings,
/// empty input or trailing content.
pub fn parse(input: &str) -> Result<Sexpr, ParseError> {
    tracing::trace!(bytes = input.len(), "Parsing S-expression");
    let mut parser = Parser::new(input);
    let expr = parser.parse_expr()?;
    parser.skip_whitespace();
    if parser.peek().is_some() {
        let offset = parser.offset();
        return Err(ParseError::TrailingContent { offset });
    }
    Ok(expr)
}

/// Formats a coordinate or dimension: at most four decimals, no trailing zeros.
#[must_use]
pub fn format_number(value: f64) -> String {
    let s = format!("{value:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "-0" | "" => "0".to_string(),
        _ => s.to_string(),
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Lists that are always written on one line.
fn is_inline(items: &[Sexpr]) -> bool {
    if items.iter().all(|i| i.as_list().is_none()) {
        return true;
    }
    matches!(
        items.first(),
        Some(Sexpr::Symbol(head)) if matches!(
            head.as_str(),
            "effects" | "font" | "stroke" | "fill" | "name" | "number"
        )
    )
}

fn write_expr(out: &mut String, expr: &Sexpr, depth: usize) {
    match expr {
        Sexpr::Symbol(s) => out.push_str(s),
        Sexpr::String(s) => {
            out.push('"');
            out.push_str(&escape(s));
            out.push('"');
        }
        Sexpr::List(items) => {
            out.push('(');
            if is_inline(items) {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    write_expr(out, item, depth + 1);
                }
                out.push(')');
                return;
            }
            // Leading atoms stay on the opening line; lists go one per line.
            let mut iter = items.iter().peekable();
            let mut first = true;
            while let Some(item) = iter.next_if(|i| i.as_list().is_none()) {
                if !first {
                    out.push(' ');
                }
                first = false;
                write_expr(out, item, depth + 1);
            }
            for item in iter {
                out.push('\n');
                out.push_str(&"\t".repeat(depth + 1));
                write_expr(out, item, depth + 1);
            }
            out.push('\n');
            out.push_str(&"\t".repeat(depth));
            out.push(')');
        }
    }
}

impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_expr(&mut out, self, 0);
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_lists_and_strings() {
        let expr = parse(r#"(pin input line (at 0 -2.54 0) (name "A\"B"))"#).unwrap();
        assert!(expr.is("pin"));
        assert_eq!(expr.arg(0), Some("input"));
        assert_eq!(expr.arg(1), Some("line"));
        let at = expr.child("at").unwrap();
        assert_eq!(at.num_arg(1), Some(-2.54));
        assert_eq!(expr.child("name").unwrap().arg(0), Some("A\"B"));
    }

    #[test]
    fn comments_are_skipped() {
        let expr = parse("; header\n(a ; inline\n b)").unwrap();
        assert_eq!(
            expr,
            Sexpr::List(vec![Sexpr::symbol("a"), Sexpr::symbol("b")])
        );
    }

    #[test]
    fn unclosed_list_reports_its_offset() {
        let err = parse("  (a (b c)").unwrap_err();
        assert_eq!(err, ParseError::UnclosedList { offset: 2 });
    }

    #[test]
    fn stray_close_is_rejected() {
        assert!(matches!(
            parse("(a))"),
            Err(ParseError::TrailingContent { offset: 3 })
        ));
        assert!(matches!(parse(")"), Err(ParseError::UnexpectedClose { offset: 0 })));
    }

    #[test]
    fn unterminated_string() {
        assert!(matches!(
            parse(r#"(a "open)"#),
            Err(ParseError::UnterminatedString { offset: 3 })
        ));
    }

    #[test]
    fn parse_error_maps_to_malformed_document() {
        let err: SymbolError = parse("(").unwrap_err().into();
        assert!(matches!(err, SymbolError::MalformedDocument { offset: 0, .. }));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(2.54), "2.54");
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(-0.000_01), "0");
        assert_eq!(format_number(1.27 * 3.0), "3.81");
        assert_eq!(format_number(-7.62), "-7.62");
    }

    #[test]
    fn flags_and_children() {
        let expr = parse("(pin input line hide (at 1 2 0) (alternate \"X\" input line))").unwrap();
        assert!(expr.has_flag("hide"));
        assert!(!expr.has_flag("at"));
        assert_eq!(expr.children().count(), 2);
        assert_eq!(expr.children_named("alternate").count(), 1);
    }

    #[test]
    fn printed_output_reparses() {
        let input = r#"(lib (version 1) (sym "A B" (prop "k" "v" (at 0 0 0) (effects (font (size 1.27 1.27)) (hide yes)))))"#;
        let expr = parse(input).unwrap();
        let printed = expr.to_string();
        assert!(printed.contains("(effects (font (size 1.27 1.27)) (hide yes))"));
        assert!(printed.contains("\n\t(version 1)"));
        assert_eq!(parse(&printed).unwrap(), expr);
    }
}
