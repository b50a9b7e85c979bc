//! Field lookup and conversion over a parsed entry table.
//!
//! Lookups scan the direct children of a composite and hop over nested
//! subtrees with `index + 1 + count`, so no recursion is needed to find a
//! field. Typed getters coerce loosely and fall back to a default:
//!
//! | Getter | `True` | `False` | `Integer` | `String` | `Number` | `Null` |
//! |--------|--------|---------|-----------|----------|----------|--------|
//! | [`get_string`](JsonParser::get_string) | `"true"` | `"false"` | text | text | text | `"null"` |
//! | [`get_int`](JsonParser::get_int) | 1 | 0 | value | parsed | parsed | default |
//! | [`get_bool`](JsonParser::get_bool) | true | false | `!= 0` | `"true"`/`"false"` | default | default |

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;

use serde_json::{Map, Number, Value};

use super::parser::{EntryKind, JsonParser};

// ============================================================================
// Raw Access
// ============================================================================

impl JsonParser {
    /// Field name of the entry at `index`.
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        let span = self.entries.get(index)?.name?;
        std::str::from_utf8(&self.source[span.start..span.end]).ok()
    }

    /// Unescaped text of a `String`, `Integer` or `Number` entry.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&str> {
        let span = self.entries.get(index)?.value?;
        std::str::from_utf8(&self.source[span.start..span.end]).ok()
    }

    /// Scalar view of the entry at `index`. Composites have no scalar value.
    #[must_use]
    pub fn get_value(&self, index: usize) -> Option<Cow<'_, str>> {
        match self.entries.get(index)?.kind {
            EntryKind::String | EntryKind::Integer | EntryKind::Number => {
                self.value(index).map(Cow::Borrowed)
            }
            EntryKind::True => Some(Cow::Borrowed("true")),
            EntryKind::False => Some(Cow::Borrowed("false")),
            EntryKind::Null => Some(Cow::Borrowed("null")),
            EntryKind::Object | EntryKind::Array => None,
        }
    }

    /// Index of the entry following the subtree rooted at `index`.
    #[inline]
    #[must_use]
    pub fn next_sibling(&self, index: usize) -> usize {
        match self.entries.get(index) {
            Some(entry) => index + 1 + entry.count,
            None => self.entries.len(),
        }
    }

    /// Iterates over the indices of the direct children of a composite.
    pub fn children(&self, parent: usize) -> impl Iterator<Item = usize> + '_ {
        let end = match self.entries.get(parent) {
            Some(entry) if entry.kind.is_composite() => parent + 1 + entry.count,
            _ => parent,
        };
        let mut index = parent + 1;
        std::iter::from_fn(move || {
            if index >= end {
                return None;
            }
            let current = index;
            index = self.next_sibling(current);
            Some(current)
        })
    }
}

// ============================================================================
// Field Lookup
// ============================================================================

impl JsonParser {
    /// Finds the first field called `name` directly inside the object at `parent`.
    #[must_use]
    pub fn find_in(&self, parent: usize, name: &str) -> Option<usize> {
        if self.entries.get(parent)?.kind != EntryKind::Object {
            return None;
        }
        self.children(parent).find(|&i| self.name(i) == Some(name))
    }

    /// Finds a top-level field of the root object.
    #[inline]
    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.find_in(0, name)
    }

    /// Returns a top-level field only if it is a `String`.
    #[must_use]
    pub fn find_string(&self, name: &str) -> Option<&str> {
        let index = self.find(name)?;
        match self.entries[index].kind {
            EntryKind::String => self.value(index),
            _ => None,
        }
    }

    /// Returns a top-level field as text.
    #[must_use]
    pub fn get_string<'a>(&'a self, name: &str, default: &'a str) -> Cow<'a, str> {
        self.find(name)
            .and_then(|index| self.get_value(index))
            .unwrap_or(Cow::Borrowed(default))
    }

    /// Returns a top-level field as an integer.
    #[must_use]
    pub fn get_int(&self, name: &str, default: i32) -> i32 {
        let Some(index) = self.find(name) else {
            return default;
        };
        let entry = &self.entries[index];
        match entry.kind {
            EntryKind::Integer => entry.integer,
            EntryKind::True => 1,
            EntryKind::False => 0,
            EntryKind::String | EntryKind::Number => self
                .value(index)
                .and_then(parse_int)
                .unwrap_or(default),
            _ => default,
        }
    }

    /// Returns a top-level integer field as a `u32`.
    ///
    /// Reads the digits directly, so values above `i32::MAX` that the entry
    /// table stores as `Number` are still recovered. Negative, fractional
    /// and non-numeric values give `None`.
    #[must_use]
    pub fn get_u32(&self, name: &str) -> Option<u32> {
        let index = self.find(name)?;
        match self.entries[index].kind {
            EntryKind::Integer | EntryKind::Number => self.value(index)?.parse().ok(),
            _ => None,
        }
    }

    /// Returns a top-level field as a boolean.
    #[must_use]
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        let Some(index) = self.find(name) else {
            return default;
        };
        let entry = &self.entries[index];
        match entry.kind {
            EntryKind::True => true,
            EntryKind::False => false,
            EntryKind::Integer => entry.integer != 0,
            EntryKind::String => match self.value(index) {
                Some(text) if text.eq_ignore_ascii_case("true") => true,
                Some(text) if text.eq_ignore_ascii_case("false") => false,
                _ => default,
            },
            _ => default,
        }
    }
}

/// Parses integer text, accepting a whole-valued number like `3.0`.
fn parse_int(text: &str) -> Option<i32> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i32>() {
        return Some(value);
    }
    let value = text.parse::<f64>().ok()?;
    if value.fract() == 0.0 && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
        Some(value as i32)
    } else {
        None
    }
}

// ============================================================================
// Conversion
// ============================================================================

impl JsonParser {
    /// Materializes the subtree at `index` as a [`serde_json::Value`].
    ///
    /// Object field order is preserved. Numbers that no Rust numeric type
    /// can hold are kept as strings.
    #[must_use]
    pub fn to_value(&self, index: usize) -> Option<Value> {
        let entry = self.entries.get(index)?;
        let value = match entry.kind {
            EntryKind::Object => {
                let mut map = Map::new();
                for child in self.children(index) {
                    let key = self.name(child).unwrap_or_default().to_owned();
                    map.insert(key, self.to_value(child)?);
                }
                Value::Object(map)
            }
            EntryKind::Array => Value::Array(
                self.children(index)
                    .map(|child| self.to_value(child))
                    .collect::<Option<Vec<_>>>()?,
            ),
            EntryKind::String => Value::String(self.value(index)?.to_owned()),
            EntryKind::Integer => Value::from(entry.integer),
            EntryKind::Number => number_value(self.value(index)?),
            EntryKind::True => Value::Bool(true),
            EntryKind::False => Value::Bool(false),
            EntryKind::Null => Value::Null,
        };
        Some(value)
    }

    /// Extracts an array of scalars as strings. `null` elements are `None`.
    ///
    /// Returns `None` if the entry is not an array or holds a composite.
    #[must_use]
    pub fn to_string_array(&self, index: usize) -> Option<Vec<Option<String>>> {
        if self.entries.get(index)?.kind != EntryKind::Array {
            return None;
        }
        self.children(index)
            .map(|child| match self.entries[child].kind {
                EntryKind::Null => Some(None),
                _ => self.get_value(child).map(|text| Some(text.into_owned())),
            })
            .collect()
    }

    /// Serializes the subtree at `index` back to compact JSON text.
    ///
    /// Numbers keep their source text. Names and strings are escaped by
    /// `serde_json`.
    #[must_use]
    pub fn to_json(&self, index: usize) -> Option<String> {
        self.entries.get(index)?;
        let mut out = Vec::new();
        self.write_entry(index, &mut out).ok()?;
        String::from_utf8(out).ok()
    }

    fn write_entry(&self, index: usize, out: &mut Vec<u8>) -> serde_json::Result<()> {
        let entry = &self.entries[index];
        match entry.kind {
            EntryKind::Object | EntryKind::Array => {
                let object = entry.kind == EntryKind::Object;
                out.push(if object { b'{' } else { b'[' });
                for (n, child) in self.children(index).enumerate() {
                    if n > 0 {
                        out.push(b',');
                    }
                    if object {
                        serde_json::to_writer(&mut *out, self.name(child).unwrap_or_default())?;
                        out.push(b':');
                    }
                    self.write_entry(child, out)?;
                }
                out.push(if object { b'}' } else { b']' });
            }
            EntryKind::String => {
                serde_json::to_writer(&mut *out, self.value(index).unwrap_or_default())?;
            }
            _ => out.extend_from_slice(self.get_value(index).unwrap_or_default().as_bytes()),
        }
        Ok(())
    }
}

fn number_value(text: &str) -> Value {
    if let Ok(value) = text.parse::<i64>() {
        return Value::from(value);
    }
    if let Ok(value) = text.parse::<u64>() {
        return Value::from(value);
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or_else(|| Value::String(text.to_owned()), Value::Number)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parsed(text: &str) -> JsonParser {
        let mut parser = JsonParser::new();
        assert!(parser.parse(text.as_bytes()).is_complete(), "parse {text}");
        parser
    }

    #[test]
    fn test_find_skips_nested_fields() {
        let parser = parsed(r#"{"a":{"ID":1,"x":[{"ID":2}]},"ID":3}"#);

        let index = parser.find("ID").expect("top-level ID");
        assert_eq!(parser.entries()[index].level(), 1);
        assert_eq!(parser.get_int("ID", 0), 3);
    }

    #[test]
    fn test_find_on_root_array_is_none() {
        let parser = parsed(r#"[{"a":1}]"#);
        assert_eq!(parser.find("a"), None);
        assert_eq!(parser.find_in(1, "a"), Some(2));
    }

    #[test]
    fn test_children() {
        let parser = parsed(r#"{"a":[1,[2,3],{"b":4}],"c":5}"#);
        assert_eq!(parser.children(0).collect::<Vec<_>>(), vec![1, 8]);
        assert_eq!(parser.children(1).collect::<Vec<_>>(), vec![2, 3, 6]);
        assert_eq!(parser.children(2).count(), 0);
    }

    #[test]
    fn test_get_string_coercion() {
        let parser = parsed(r#"{"s":"x","i":12,"n":1.5,"t":true,"f":false,"z":null,"o":{}}"#);

        assert_eq!(parser.get_string("s", "d"), "x");
        assert_eq!(parser.get_string("i", "d"), "12");
        assert_eq!(parser.get_string("n", "d"), "1.5");
        assert_eq!(parser.get_string("t", "d"), "true");
        assert_eq!(parser.get_string("f", "d"), "false");
        assert_eq!(parser.get_string("z", "d"), "null");
        assert_eq!(parser.get_string("o", "d"), "d");
        assert_eq!(parser.get_string("missing", "d"), "d");
    }

    #[test]
    fn test_get_int_coercion() {
        let parser = parsed(r#"{"i":-4,"s":"17","n":3.0,"x":"abc","t":true,"f":false,"big":1e20}"#);

        assert_eq!(parser.get_int("i", 0), -4);
        assert_eq!(parser.get_int("s", 0), 17);
        assert_eq!(parser.get_int("n", 0), 3);
        assert_eq!(parser.get_int("x", 9), 9);
        assert_eq!(parser.get_int("t", 0), 1);
        assert_eq!(parser.get_int("f", 5), 0);
        assert_eq!(parser.get_int("big", 9), 9);
        assert_eq!(parser.get_int("missing", -1), -1);
    }

    #[test]
    fn test_get_u32_beyond_i32_range() {
        let parser = parsed(r#"{"ID":3000000000,"small":7,"neg":-1,"frac":1.5,"s":"9","big":4294967296}"#);

        assert_eq!(parser.get_u32("ID"), Some(3_000_000_000));
        assert_eq!(parser.get_int("ID", 0), 0);
        assert_eq!(parser.get_u32("small"), Some(7));
        assert_eq!(parser.get_u32("neg"), None);
        assert_eq!(parser.get_u32("frac"), None);
        assert_eq!(parser.get_u32("s"), None);
        assert_eq!(parser.get_u32("big"), None);
        assert_eq!(parser.get_u32("missing"), None);
    }

    #[test]
    fn test_get_bool_coercion() {
        let parser = parsed(r#"{"t":true,"one":1,"zero":0,"s":"TRUE","no":"false","x":"yes"}"#);

        assert!(parser.get_bool("t", false));
        assert!(parser.get_bool("one", false));
        assert!(!parser.get_bool("zero", true));
        assert!(parser.get_bool("s", false));
        assert!(!parser.get_bool("no", true));
        assert!(parser.get_bool("x", true));
        assert!(!parser.get_bool("missing", false));
    }

    #[test]
    fn test_find_string_requires_string() {
        let parser = parsed(r#"{"Action":"Send","QoS":1}"#);
        assert_eq!(parser.find_string("Action"), Some("Send"));
        assert_eq!(parser.find_string("QoS"), None);
    }

    #[test]
    fn test_to_value_nested() {
        let parser = parsed(r#"{"b":[1,2.5,"x",null,{"k":false}],"a":{"big":12345678901}}"#);

        let value = parser.to_value(0).unwrap();
        assert_eq!(
            value,
            json!({"b": [1, 2.5, "x", null, {"k": false}], "a": {"big": 12345678901_i64}})
        );
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_to_string_array() {
        let parser = parsed(r#"{"list":["a",1,true,null],"bad":[[1]]}"#);

        let list = parser.find("list").unwrap();
        assert_eq!(
            parser.to_string_array(list),
            Some(vec![
                Some("a".to_owned()),
                Some("1".to_owned()),
                Some("true".to_owned()),
                None,
            ])
        );
        assert_eq!(parser.to_string_array(parser.find("bad").unwrap()), None);
        assert_eq!(parser.to_string_array(0), None);
    }

    #[test]
    fn test_to_json_escapes_strings() {
        let parser = parsed(r#"{"text":"line\nbreak \"q\" \u0001","n":-1.5e3,"list":[true,null]}"#);

        let text = parser.to_json(0).unwrap();
        assert_eq!(
            text,
            r#"{"text":"line\nbreak \"q\" \u0001","n":-1.5e3,"list":[true,null]}"#
        );
        let reparsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(reparsed, parser.to_value(0).unwrap());
    }

    #[test]
    fn test_subtree_to_json() {
        let parser = parsed(r#"{"Body":{"x":[1,2]}}"#);
        let body = parser.find("Body").unwrap();
        assert_eq!(parser.to_json(body).as_deref(), Some(r#"{"x":[1,2]}"#));
    }

    #[test]
    fn test_to_json_escapes_names_and_controls() {
        let parser = parsed(r#"{"a\"b\\c":"\b\f\t\u001f/\u00e9"}"#);
        assert_eq!(
            parser.to_json(0).as_deref(),
            Some(r#"{"a\"b\\c":"\b\f\t\u001f/é"}"#)
        );
    }
}
