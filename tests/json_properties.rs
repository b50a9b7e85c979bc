//! Property tests for the streaming JSON parser.
//!
//! Documents are generated as `serde_json::Value` trees and serialized with
//! serde_json, which gives an independent reference for every property.

use jsonmsg::{EntryKind, JsonParser, ParseOutcome};
use proptest::prelude::*;
use serde_json::{Map, Value};

// ============================================================================
// Strategies
// ============================================================================

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        (-1.0e12f64..1.0e12).prop_map(Value::from),
        "(?s).{0,8}".prop_map(Value::String),
    ]
}

fn object(pairs: Vec<(String, Value)>) -> Value {
    Value::Object(pairs.into_iter().collect::<Map<_, _>>())
}

fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("(?s).{0,6}", inner), 0..6).prop_map(object),
        ]
    })
}

/// A root object or array.
fn document() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::collection::vec(value(), 0..6).prop_map(Value::Array),
        prop::collection::vec(("[A-Za-z]{1,6}", value()), 0..6).prop_map(object),
    ]
}

fn parse(parser: &mut JsonParser, text: &[u8]) -> ParseOutcome {
    parser.parse(text)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn test_round_trip(doc in document()) {
        let text = serde_json::to_string(&doc).unwrap();
        let mut parser = JsonParser::new();

        let outcome = parse(&mut parser, text.as_bytes());
        prop_assert!(
            matches!(outcome, ParseOutcome::Complete { end, .. } if end == text.len()),
            "outcome {:?} for {}", outcome, text
        );
        prop_assert_eq!(parser.to_value(0), Some(doc.clone()));
        prop_assert_eq!(parser.to_json(0), Some(text));
    }

    #[test]
    fn test_pretty_input_round_trip(doc in document()) {
        let text = serde_json::to_string_pretty(&doc).unwrap();
        let mut parser = JsonParser::new();

        prop_assert!(parse(&mut parser, text.as_bytes()).is_complete());
        prop_assert_eq!(parser.to_value(0), Some(doc));
    }

    #[test]
    fn test_subtree_skip(doc in document()) {
        let text = serde_json::to_string(&doc).unwrap();
        let mut parser = JsonParser::new();
        prop_assert!(parse(&mut parser, text.as_bytes()).is_complete());

        let entries = parser.entries();
        prop_assert_eq!(entries[0].count(), entries.len() - 1);

        for (i, entry) in entries.iter().enumerate() {
            let next = parser.next_sibling(i);
            prop_assert!(next <= entries.len());

            for descendant in &entries[i + 1..next] {
                prop_assert!(descendant.level() > entry.level());
            }
            if let Some(sibling) = entries.get(next) {
                prop_assert!(sibling.level() <= entry.level());
            }
            if !matches!(entry.kind(), EntryKind::Object | EntryKind::Array) {
                prop_assert_eq!(entry.count(), 0);
            }
        }
    }

    #[test]
    fn test_truncation_is_incomplete(doc in document()) {
        let text = serde_json::to_string(&doc).unwrap();
        let bytes = text.as_bytes();
        let mut parser = JsonParser::new();

        for cut in 1..bytes.len() {
            prop_assert_eq!(parse(&mut parser, &bytes[..cut]), ParseOutcome::Incomplete);
        }
    }

    #[test]
    fn test_split_feed_matches_whole(doc in document(), split in any::<prop::sample::Index>()) {
        let text = serde_json::to_string(&doc).unwrap();
        let bytes = text.as_bytes();
        let cut = split.index(bytes.len());
        let mut parser = JsonParser::new();

        let whole = parse(&mut parser, bytes);
        let whole_value = parser.to_value(0);

        let mut buffer = bytes[..cut].to_vec();
        let first = parse(&mut parser, &buffer);
        if cut > 0 {
            prop_assert_eq!(first, ParseOutcome::Incomplete);
        }
        buffer.extend_from_slice(&bytes[cut..]);
        prop_assert_eq!(parse(&mut parser, &buffer), whole);
        prop_assert_eq!(parser.to_value(0), whole_value);
    }

    #[test]
    fn test_concatenated_documents(first in document(), second in document()) {
        let a = serde_json::to_string(&first).unwrap();
        let b = serde_json::to_string(&second).unwrap();
        let stream = format!("{a}\n{b}");
        let mut parser = JsonParser::new();

        let ParseOutcome::Complete { end, .. } = parse(&mut parser, stream.as_bytes()) else {
            return Err(TestCaseError::fail("first document not complete"));
        };
        prop_assert_eq!(end, a.len() + 1);
        prop_assert_eq!(parser.to_value(0), Some(first));

        prop_assert!(parse(&mut parser, &stream.as_bytes()[end..]).is_complete());
        prop_assert_eq!(parser.to_value(0), Some(second));
    }

    #[test]
    fn test_wrong_closer_is_invalid(doc in document()) {
        let mut text = serde_json::to_string(&doc).unwrap().into_bytes();
        let last = text.len() - 1;
        text[last] = if text[last] == b'}' { b']' } else { b'}' };

        let mut parser = JsonParser::new();
        prop_assert_eq!(parse(&mut parser, &text), ParseOutcome::Invalid);
    }
}
