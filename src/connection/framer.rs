//! Splits the inbound byte stream into JSON objects.
//!
//! Bytes from each read are appended to a buffer and the whole buffer is
//! parsed again from offset zero. A complete object is removed from the
//! front of the buffer, leaving any following bytes for the next call.

// ============================================================================
// Imports
// ============================================================================

use tracing::trace;

use crate::json::{JsonParser, ParseOutcome};

// ============================================================================
// Frame
// ============================================================================

/// Result of one framing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Frame {
    /// An object is parsed and available through [`Framer::parser`].
    Object,
    /// The buffer holds no complete object.
    NeedMore,
    /// The buffer is malformed and has been discarded.
    Invalid {
        /// Line the parser stopped on.
        line: u32,
    },
}

// ============================================================================
// Framer
// ============================================================================

/// Reassembly buffer plus the parser that owns the last framed object.
#[derive(Debug, Default)]
pub(crate) struct Framer {
    buffer: Vec<u8>,
    parser: JsonParser,
}

impl Framer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends bytes read from the transport.
    pub(crate) fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Frames the next object in the buffer.
    ///
    /// Call repeatedly until it returns [`Frame::NeedMore`]: one read may
    /// carry several objects.
    pub(crate) fn next_frame(&mut self) -> Frame {
        if self.buffer.is_empty() {
            return Frame::NeedMore;
        }

        match self.parser.parse(&self.buffer) {
            ParseOutcome::Complete { entries: 0, .. } => {
                // Only whitespace is buffered.
                self.buffer.clear();
                Frame::NeedMore
            }
            ParseOutcome::Complete { entries, end } => {
                trace!(entries, bytes = end, remaining = self.buffer.len() - end, "Framed object");
                self.buffer.drain(..end);
                Frame::Object
            }
            ParseOutcome::Incomplete => Frame::NeedMore,
            ParseOutcome::Invalid => {
                self.buffer.clear();
                Frame::Invalid {
                    line: self.parser.line(),
                }
            }
        }
    }

    /// Parser holding the object returned by the last [`Frame::Object`].
    #[inline]
    pub(crate) fn parser(&self) -> &JsonParser {
        &self.parser
    }

    /// Bytes waiting for the rest of their object.
    #[inline]
    pub(crate) fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_object() {
        let mut framer = Framer::new();
        framer.extend(br#"{"Action":"Send","Topic":"t","Body":"h"#);
        assert_eq!(framer.next_frame(), Frame::NeedMore);

        framer.extend(br#"i","QoS":1,"ID":7}"#);
        assert_eq!(framer.next_frame(), Frame::Object);
        assert_eq!(framer.parser().find_string("Body"), Some("hi"));
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_concatenated_objects_in_order() {
        let mut framer = Framer::new();
        framer.extend(br#"{"Action":"Ping"}{"Action":"Pong"}"#);

        assert_eq!(framer.next_frame(), Frame::Object);
        assert_eq!(framer.parser().find_string("Action"), Some("Ping"));
        assert_eq!(framer.next_frame(), Frame::Object);
        assert_eq!(framer.parser().find_string("Action"), Some("Pong"));
        assert_eq!(framer.next_frame(), Frame::NeedMore);
    }

    #[test]
    fn test_object_followed_by_fragment() {
        let mut framer = Framer::new();
        framer.extend(b"{\"Action\":\"Ping\"}\n{\"Act");

        assert_eq!(framer.next_frame(), Frame::Object);
        assert_eq!(framer.next_frame(), Frame::NeedMore);
        assert_eq!(framer.buffered(), 5);
    }

    #[test]
    fn test_whitespace_only_is_dropped() {
        let mut framer = Framer::new();
        framer.extend(b" \r\n");
        assert_eq!(framer.next_frame(), Frame::NeedMore);
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_invalid_discards_buffer() {
        let mut framer = Framer::new();
        framer.extend(b"{\"Action\":\"Ping\"]");

        assert_eq!(framer.next_frame(), Frame::Invalid { line: 1 });
        assert_eq!(framer.buffered(), 0);
    }
}
