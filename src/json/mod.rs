//! Streaming JSON parser.
//!
//! Parses one JSON object or array into a flat entry table and reports
//! whether the input was complete, truncated or malformed. The truncated
//! case is what lets a byte stream of back-to-back objects be framed
//! without a length prefix.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `token` | Tokenizer with in-place string unescaping |
//! | `parser` | Non-recursive document parser |
//! | `access` | Field lookup, coercion and conversion |
//!
//! # Example
//!
//! ```
//! use jsonmsg::json::{JsonParser, ParseOutcome};
//!
//! let mut parser = JsonParser::new();
//! assert_eq!(parser.parse(br#"{"Action":"Ack","ID":4"#), ParseOutcome::Incomplete);
//!
//! assert!(parser.parse(br#"{"Action":"Ack","ID":4,"RC":0}"#).is_complete());
//! assert_eq!(parser.get_int("ID", 0), 4);
//! ```

// ============================================================================
// Modules
// ============================================================================

mod access;
mod parser;
pub mod token;

// ============================================================================
// Re-exports
// ============================================================================

pub use parser::{Entry, EntryKind, JsonParser, ParseOutcome};
pub use token::{Lexer, Span, Token};
