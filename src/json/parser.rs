//! Flat JSON document parser.
//!
//! [`JsonParser::parse`] turns one JSON object or array into a flat table of
//! [`Entry`] values. Composites are followed by the contiguous run of their
//! descendants, and each composite records the length of that run in its
//! `count`, so a linear scan can hop to the next sibling in O(1).
//!
//! # Example
//!
//! ```
//! use jsonmsg::json::{JsonParser, ParseOutcome};
//!
//! let mut parser = JsonParser::new();
//! let outcome = parser.parse(br#"{"Action":"Ping"} {"Action":"Pong"}"#);
//!
//! assert_eq!(outcome, ParseOutcome::Complete { entries: 2, end: 18 });
//! assert_eq!(parser.find_string("Action"), Some("Ping"));
//! ```
//!
//! # Framing
//!
//! Only the first object or array is parsed. Trailing whitespace is
//! consumed and the position after it is reported as `end`, so a caller
//! holding a stream of concatenated objects can slice off the next one.
//! Running out of input while a composite is still open yields
//! [`ParseOutcome::Incomplete`]; the caller appends more bytes and parses
//! the whole buffer again.

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

use super::token::{Lexer, Span, Token};

// ============================================================================
// Constants
// ============================================================================

/// Entries allocated by a new parser.
const INITIAL_ENTRIES: usize = 100;

/// Growth factor of the entry table once its capacity is exceeded.
const GROWTH_FACTOR: usize = 4;

// ============================================================================
// EntryKind
// ============================================================================

/// JSON entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// String, value is the unescaped text.
    String,
    /// Number with no fraction or exponent that fits in an `i32`.
    Integer,
    /// Any other number, value is the source text.
    Number,
    /// Object, count is the number of nested entries.
    Object,
    /// Array, count is the number of nested entries.
    Array,
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
}

impl EntryKind {
    /// Returns `true` for objects and arrays.
    #[inline]
    #[must_use]
    pub const fn is_composite(self) -> bool {
        matches!(self, Self::Object | Self::Array)
    }
}

// ============================================================================
// Entry
// ============================================================================

/// One node of a parsed document.
///
/// Names and values are spans into the parser's scan buffer. Use
/// [`JsonParser::name`] and [`JsonParser::value`] to read them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub(crate) kind: EntryKind,
    pub(crate) name: Option<Span>,
    pub(crate) value: Option<Span>,
    pub(crate) count: usize,
    pub(crate) integer: i32,
    pub(crate) level: u32,
    pub(crate) line: u32,
}

impl Entry {
    /// Entry type.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Number of entries nested beneath a composite. Zero for scalars.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Decoded value of an `Integer` entry.
    #[inline]
    #[must_use]
    pub const fn integer(&self) -> Option<i32> {
        match self.kind {
            EntryKind::Integer => Some(self.integer),
            _ => None,
        }
    }

    /// Nesting depth. The root is at level 0.
    #[inline]
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// 1-based source line the entry started on.
    #[inline]
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Returns `true` if the entry is a named field of an object.
    #[inline]
    #[must_use]
    pub const fn has_name(&self) -> bool {
        self.name.is_some()
    }
}

// ============================================================================
// ParseOutcome
// ============================================================================

/// Result of one parse attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// A whole object or array was recognized.
    Complete {
        /// Number of entries in the table.
        entries: usize,
        /// First byte after the document and its trailing whitespace.
        end: usize,
    },
    /// More bytes could still make the input valid.
    Incomplete,
    /// The input is malformed.
    Invalid,
}

impl ParseOutcome {
    /// Returns `true` for [`ParseOutcome::Complete`].
    #[inline]
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

// ============================================================================
// State
// ============================================================================

/// Parser states.
///
/// There is no explicit done state: closing the root composite leaves the
/// parse loop with a `Complete` outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// In an object, expecting a field name. `first` allows `}`.
    Name { first: bool },
    /// Expecting a value. `first` allows `]` in an empty array.
    Value { first: bool },
    /// Expecting a separator or the end of the enclosing composite.
    Comma,
}

// ============================================================================
// JsonParser
// ============================================================================

/// Reusable JSON parser.
///
/// Each call to [`parse`](Self::parse) resets the entry table without
/// freeing it. A parser is not shared between tasks: it is owned by whoever
/// feeds it.
#[derive(Debug, Clone)]
pub struct JsonParser {
    /// Scan buffer holding the unescaped copy of the last input.
    pub(crate) source: Vec<u8>,
    /// Entry table.
    pub(crate) entries: Vec<Entry>,
    /// Entry index of each open composite.
    open: Vec<usize>,
    allow_comments: bool,
    position: usize,
    line: u32,
}

impl Default for JsonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonParser {
    /// Creates a parser that rejects comments.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: Vec::new(),
            entries: Vec::with_capacity(INITIAL_ENTRIES),
            open: Vec::new(),
            allow_comments: false,
            position: 0,
            line: 1,
        }
    }

    /// Allows `/* */` and `//` comments wherever whitespace is allowed.
    ///
    /// Comments after the document are not skipped, so they should not be
    /// used on streams framed by [`parse`](Self::parse).
    #[must_use]
    pub fn with_comments(mut self, allow: bool) -> Self {
        self.allow_comments = allow;
        self
    }

    /// Position after the last parse. See [`ParseOutcome::Complete`].
    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Line reached by the last parse, useful for locating errors.
    #[inline]
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Entries produced by the last successful parse.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entry at `index`.
    #[inline]
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the last parse produced no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses the first JSON object or array in `text`.
    ///
    /// Empty or all-whitespace input is complete with zero entries.
    pub fn parse(&mut self, text: &[u8]) -> ParseOutcome {
        self.entries.clear();
        self.open.clear();
        self.source.clear();
        self.source.extend_from_slice(text);

        let mut lexer = Lexer::new(&mut self.source, self.allow_comments);
        let outcome = Self::run(&mut lexer, &mut self.entries, &mut self.open);

        self.position = lexer.position();
        self.line = lexer.line();
        if !outcome.is_complete() {
            self.entries.clear();
        }
        outcome
    }

    /// Parses `text`, mapping non-complete outcomes to errors.
    ///
    /// # Errors
    ///
    /// - [`Error::IncompleteJson`] if the text ends inside the document
    /// - [`Error::InvalidJson`] if the text is malformed
    pub fn parse_required(&mut self, text: &[u8]) -> Result<usize> {
        match self.parse(text) {
            ParseOutcome::Complete { entries, .. } => Ok(entries),
            ParseOutcome::Incomplete => Err(Error::IncompleteJson { line: self.line }),
            ParseOutcome::Invalid => Err(Error::InvalidJson { line: self.line }),
        }
    }

    /// Runs the state machine over the lexer's input.
    fn run(lexer: &mut Lexer<'_>, entries: &mut Vec<Entry>, open: &mut Vec<usize>) -> ParseOutcome {
        let mut state = match lexer.next_token() {
            Token::StartObject => {
                open.push(push_entry(entries, lexer, EntryKind::Object, None, 0));
                State::Name { first: true }
            }
            Token::StartArray => {
                open.push(push_entry(entries, lexer, EntryKind::Array, None, 0));
                State::Value { first: true }
            }
            Token::End => {
                return ParseOutcome::Complete {
                    entries: 0,
                    end: lexer.position(),
                };
            }
            Token::Incomplete => return ParseOutcome::Incomplete,
            _ => return ParseOutcome::Invalid,
        };
        let mut name: Option<Span> = None;

        loop {
            let closed = match state {
                State::Name { first } => match lexer.next_token() {
                    Token::EndObject if first => close(entries, open, EntryKind::Object),
                    Token::String => {
                        name = Some(lexer.span());
                        match lexer.next_token() {
                            Token::Colon => {
                                state = State::Value { first: false };
                                continue;
                            }
                            Token::End | Token::Incomplete => return ParseOutcome::Incomplete,
                            _ => return ParseOutcome::Invalid,
                        }
                    }
                    Token::End | Token::Incomplete => return ParseOutcome::Incomplete,
                    _ => return ParseOutcome::Invalid,
                },

                State::Value { first } => match lexer.next_token() {
                    Token::EndArray if first => close(entries, open, EntryKind::Array),
                    token => {
                        let kind = match value_kind(token) {
                            Ok(kind) => kind,
                            Err(outcome) => return outcome,
                        };
                        let level = open.len() as u32;
                        let index = push_entry(entries, lexer, kind, name.take(), level);
                        state = match kind {
                            EntryKind::Object => {
                                open.push(index);
                                State::Name { first: true }
                            }
                            EntryKind::Array => {
                                open.push(index);
                                State::Value { first: true }
                            }
                            _ => State::Comma,
                        };
                        continue;
                    }
                },

                State::Comma => match lexer.next_token() {
                    Token::Comma => {
                        state = if in_array(entries, open) {
                            State::Value { first: false }
                        } else {
                            State::Name { first: false }
                        };
                        continue;
                    }
                    Token::EndObject => close(entries, open, EntryKind::Object),
                    Token::EndArray => close(entries, open, EntryKind::Array),
                    Token::End | Token::Incomplete => return ParseOutcome::Incomplete,
                    _ => return ParseOutcome::Invalid,
                },
            };

            match closed {
                Some(true) => break,
                Some(false) => state = State::Comma,
                None => return ParseOutcome::Invalid,
            }
        }

        lexer.skip_whitespace();
        ParseOutcome::Complete {
            entries: entries.len(),
            end: lexer.position(),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Appends an entry, growing the table geometrically when it is full.
fn push_entry(
    entries: &mut Vec<Entry>,
    lexer: &Lexer<'_>,
    kind: EntryKind,
    name: Option<Span>,
    level: u32,
) -> usize {
    if entries.len() == entries.capacity() {
        let capacity = entries.capacity().max(INITIAL_ENTRIES / GROWTH_FACTOR);
        entries.reserve_exact(capacity * (GROWTH_FACTOR - 1));
    }

    let value = match kind {
        EntryKind::String | EntryKind::Integer | EntryKind::Number => Some(lexer.span()),
        _ => None,
    };
    let mut entry = Entry {
        kind,
        name,
        value,
        count: 0,
        integer: 0,
        level,
        line: lexer.line(),
    };

    // Digits beyond the i32 range are kept as a Number.
    if kind == EntryKind::Integer {
        match std::str::from_utf8(lexer.text()).ok().and_then(|t| t.parse::<i32>().ok()) {
            Some(value) => entry.integer = value,
            None => entry.kind = EntryKind::Number,
        }
    }

    entries.push(entry);
    entries.len() - 1
}

/// Maps a token in value position to the entry it starts.
fn value_kind(token: Token) -> std::result::Result<EntryKind, ParseOutcome> {
    match token {
        Token::String => Ok(EntryKind::String),
        Token::Integer => Ok(EntryKind::Integer),
        Token::Number => Ok(EntryKind::Number),
        Token::StartObject => Ok(EntryKind::Object),
        Token::StartArray => Ok(EntryKind::Array),
        Token::True => Ok(EntryKind::True),
        Token::False => Ok(EntryKind::False),
        Token::Null => Ok(EntryKind::Null),
        Token::End | Token::Incomplete => Err(ParseOutcome::Incomplete),
        _ => Err(ParseOutcome::Invalid),
    }
}

/// Closes the innermost composite, which must be of `kind`.
///
/// Returns `Some(true)` when the root was closed, `Some(false)` when an
/// enclosing composite is still open, and `None` on a bracket mismatch.
fn close(entries: &mut [Entry], open: &mut Vec<usize>, kind: EntryKind) -> Option<bool> {
    let start = *open.last()?;
    if entries[start].kind != kind {
        return None;
    }
    open.pop();
    entries[start].count = entries.len() - start - 1;
    Some(open.is_empty())
}

/// Returns `true` if the innermost open composite is an array.
fn in_array(entries: &[Entry], open: &[usize]) -> bool {
    open.last()
        .is_some_and(|&index| entries[index].kind == EntryKind::Array)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(parser: &JsonParser) -> Vec<EntryKind> {
        parser.entries().iter().map(Entry::kind).collect()
    }

    #[test]
    fn test_parse_flat_object() {
        let mut parser = JsonParser::new();
        let src = br#"{"Action":"Send","Topic":"t","QoS":1,"Retain":false,"X":null}"#;

        let outcome = parser.parse(src);
        assert_eq!(outcome, ParseOutcome::Complete { entries: 6, end: src.len() });
        assert_eq!(
            kinds(&parser),
            vec![
                EntryKind::Object,
                EntryKind::String,
                EntryKind::String,
                EntryKind::Integer,
                EntryKind::False,
                EntryKind::Null,
            ]
        );
        assert_eq!(parser.entries()[0].count(), 5);
        assert_eq!(parser.entries()[3].integer(), Some(1));
        assert_eq!(parser.name(1), Some("Action"));
        assert_eq!(parser.value(1), Some("Send"));
    }

    #[test]
    fn test_nested_counts_and_levels() {
        let mut parser = JsonParser::new();
        let src = br#"{"a":[1,{"b":2},[]],"c":{}}"#;

        assert!(parser.parse(src).is_complete());
        let entries = parser.entries();
        // 0:{ 1:a[ 2:1 3:{ 4:b 5:[ 6:c{
        assert_eq!(entries.len(), 7);
        assert_eq!(entries[0].count(), 6);
        assert_eq!(entries[1].count(), 4);
        assert_eq!(entries[3].count(), 1);
        assert_eq!(entries[5].count(), 0);
        assert_eq!(entries[6].count(), 0);
        assert_eq!(entries[0].level(), 0);
        assert_eq!(entries[1].level(), 1);
        assert_eq!(entries[4].level(), 3);
    }

    #[test]
    fn test_array_elements_have_no_name() {
        let mut parser = JsonParser::new();
        assert!(parser.parse(br#"{"list":[{"k":1},2,"x"]}"#).is_complete());

        let names: Vec<Option<&str>> = (0..parser.len()).map(|i| parser.name(i)).collect();
        assert_eq!(
            names,
            vec![None, Some("list"), None, Some("k"), None, None]
        );
    }

    #[test]
    fn test_root_array() {
        let mut parser = JsonParser::new();
        assert_eq!(
            parser.parse(b"[true, -2, 3.5]"),
            ParseOutcome::Complete { entries: 4, end: 15 }
        );
        assert_eq!(parser.entries()[0].kind(), EntryKind::Array);
        assert_eq!(parser.entries()[0].count(), 3);
    }

    #[test]
    fn test_empty_input_is_complete() {
        let mut parser = JsonParser::new();
        assert_eq!(parser.parse(b""), ParseOutcome::Complete { entries: 0, end: 0 });
        assert_eq!(parser.parse(b" \r\n "), ParseOutcome::Complete { entries: 0, end: 4 });
        assert!(parser.is_empty());
    }

    #[test]
    fn test_scalar_root_is_invalid() {
        let mut parser = JsonParser::new();
        assert_eq!(parser.parse(b"42 "), ParseOutcome::Invalid);
        assert_eq!(parser.parse(br#""text""#), ParseOutcome::Invalid);
    }

    #[test]
    fn test_truncation_is_incomplete() {
        let mut parser = JsonParser::new();
        let src = br#"{"Action":"Send","Topic":"t","Body":"hi","QoS":1,"ID":7}"#;

        for cut in 1..src.len() {
            assert_eq!(
                parser.parse(&src[..cut]),
                ParseOutcome::Incomplete,
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn test_split_mid_string_then_complete() {
        let mut parser = JsonParser::new();
        let src = br#"{"Action":"Send","Topic":"t","Body":"hi","QoS":1,"ID":7}"#;
        let split = 38;
        assert_eq!(&src[split - 1..split], b"h");

        assert_eq!(parser.parse(&src[..split]), ParseOutcome::Incomplete);

        let mut joined = src[..split].to_vec();
        joined.extend_from_slice(&src[split..]);
        assert!(parser.parse(&joined).is_complete());
        assert_eq!(parser.find_string("Action"), Some("Send"));
        assert_eq!(parser.get_int("ID", 0), 7);
    }

    #[test]
    fn test_concatenated_objects() {
        let mut parser = JsonParser::new();
        let src = br#"{"Action":"Ping"}{"Action":"Pong"}"#;

        let ParseOutcome::Complete { end, .. } = parser.parse(src) else {
            panic!("expected complete");
        };
        assert_eq!(src[end], b'{');
        assert_eq!(parser.find_string("Action"), Some("Ping"));

        assert!(parser.parse(&src[end..]).is_complete());
        assert_eq!(parser.find_string("Action"), Some("Pong"));
    }

    #[test]
    fn test_trailing_whitespace_is_consumed() {
        let mut parser = JsonParser::new();
        let src = b"{ }\r\n\t {\"next\":1}";

        assert_eq!(parser.parse(src), ParseOutcome::Complete { entries: 1, end: 7 });
    }

    #[test]
    fn test_mismatched_brackets_are_invalid() {
        let mut parser = JsonParser::new();
        assert_eq!(parser.parse(br#"{"a":1]"#), ParseOutcome::Invalid);
        assert_eq!(parser.parse(br#"[1,2}"#), ParseOutcome::Invalid);
        assert_eq!(parser.parse(br#"{"a":[1}"#), ParseOutcome::Invalid);
        assert_eq!(parser.parse(br#"{"a" 1}"#), ParseOutcome::Invalid);
        assert_eq!(parser.parse(br#"{1:2}"#), ParseOutcome::Invalid);
    }

    #[test]
    fn test_trailing_commas_are_invalid() {
        let mut parser = JsonParser::new();
        assert_eq!(parser.parse(br#"{"a":1,}"#), ParseOutcome::Invalid);
        assert_eq!(parser.parse(br#"[1,]"#), ParseOutcome::Invalid);
        assert_eq!(parser.parse(br#"[,]"#), ParseOutcome::Invalid);
    }

    #[test]
    fn test_token_error_forces_invalid() {
        let mut parser = JsonParser::new();
        assert_eq!(parser.parse(br#"{"a":01}"#), ParseOutcome::Invalid);
        assert_eq!(parser.parse(br#"{"a":1.e5}"#), ParseOutcome::Invalid);
        assert_eq!(parser.parse(br#"{"a":"\x"}"#), ParseOutcome::Invalid);
        assert!(parser.is_empty());
    }

    #[test]
    fn test_large_integer_becomes_number() {
        let mut parser = JsonParser::new();
        assert!(parser.parse(br#"{"small":2147483647,"big":2147483648}"#).is_complete());

        assert_eq!(parser.entries()[1].kind(), EntryKind::Integer);
        assert_eq!(parser.entries()[1].integer(), Some(i32::MAX));
        assert_eq!(parser.entries()[2].kind(), EntryKind::Number);
        assert_eq!(parser.value(2), Some("2147483648"));
    }

    #[test]
    fn test_line_numbers() {
        let mut parser = JsonParser::new();
        assert!(parser.parse(b"{\n\"a\": 1,\n\n\"b\": 2\n}").is_complete());
        assert_eq!(parser.entries()[0].line(), 1);
        assert_eq!(parser.entries()[1].line(), 2);
        assert_eq!(parser.entries()[2].line(), 4);
    }

    #[test]
    fn test_comments_when_enabled() {
        let src = b"{ /* greeting */ \"a\": 1, // trailing\n \"b\": 2 }";

        let mut strict = JsonParser::new();
        assert_eq!(strict.parse(src), ParseOutcome::Invalid);

        let mut lenient = JsonParser::new().with_comments(true);
        assert!(lenient.parse(src).is_complete());
        assert_eq!(lenient.get_int("b", 0), 2);
    }

    #[test]
    fn test_entry_table_grows_and_is_reused() {
        let mut parser = JsonParser::new();
        let big = format!("[{}]", vec!["1"; 1000].join(","));

        assert!(parser.parse(big.as_bytes()).is_complete());
        assert_eq!(parser.len(), 1001);
        let capacity = parser.entries.capacity();
        assert!(capacity >= 1001);

        assert!(parser.parse(b"[1]").is_complete());
        assert_eq!(parser.len(), 2);
        assert_eq!(parser.entries.capacity(), capacity);
    }

    #[test]
    fn test_growth_is_geometric() {
        let mut parser = JsonParser::new();
        let initial = parser.entries.capacity();
        let text = format!("[{}]", vec!["0"; initial].join(","));

        assert!(parser.parse(text.as_bytes()).is_complete());
        assert!(parser.entries.capacity() >= initial * GROWTH_FACTOR);
    }

    #[test]
    fn test_parse_required() {
        let mut parser = JsonParser::new();
        assert_eq!(parser.parse_required(br#"{"a":1}"#).unwrap(), 2);
        assert!(matches!(
            parser.parse_required(b"{\n\"a\":"),
            Err(Error::IncompleteJson { line: 2 })
        ));
        assert!(matches!(
            parser.parse_required(b"{]"),
            Err(Error::InvalidJson { line: 1 })
        ));
    }
}
