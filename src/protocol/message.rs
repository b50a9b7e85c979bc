//! Application messages.
//!
//! A [`Message`] is what a client publishes with
//! [`Connection::publish`](crate::Connection::publish) and what arrives on
//! the delivery queue when the server sends a `Send` action.
//!
//! # Example
//!
//! ```
//! use jsonmsg::{Body, Message};
//!
//! let message = Message::topic("alerts", "disk full")
//!     .with_qos(1)
//!     .with_persistent(true);
//!
//! assert_eq!(message.destination().name(), "alerts");
//! assert_eq!(message.body(), &Body::Text("disk full".into()));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::identifiers::RequestId;
use crate::json::{EntryKind, JsonParser};

use super::request::Request;

// ============================================================================
// Destination
// ============================================================================

/// Where a message is published or a subscription listens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Publish/subscribe topic.
    Topic(String),
    /// Point-to-point queue.
    Queue(String),
}

impl Destination {
    /// Destination name without its kind.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Topic(name) | Self::Queue(name) => name,
        }
    }

    /// Returns `true` for a queue.
    #[inline]
    #[must_use]
    pub fn is_queue(&self) -> bool {
        matches!(self, Self::Queue(_))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Topic(name) => write!(f, "topic:{name}"),
            Self::Queue(name) => write!(f, "queue:{name}"),
        }
    }
}

// ============================================================================
// Body
// ============================================================================

/// Message payload.
///
/// Text is sent as a JSON string. A JSON body is embedded as is, so the
/// receiver sees an object or array in the `Body` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Body {
    /// Plain text.
    Text(String),
    /// Structured payload.
    Json(Value),
}

impl Body {
    /// Returns the text of a text body.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    /// Returns the value of a JSON body.
    #[inline]
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Text(_) => None,
            Self::Json(value) => Some(value),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

// ============================================================================
// Message
// ============================================================================

/// An application message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    name: Option<String>,
    destination: Destination,
    body: Body,
    qos: u8,
    id: RequestId,
    persistent: bool,
    retain: bool,
}

impl Message {
    /// Creates a message for a destination.
    #[must_use]
    pub fn new(destination: Destination, body: impl Into<Body>) -> Self {
        Self {
            name: None,
            destination,
            body: body.into(),
            qos: 0,
            id: RequestId::CONNECT,
            persistent: false,
            retain: false,
        }
    }

    /// Creates a message for a topic.
    #[inline]
    #[must_use]
    pub fn topic(topic: impl Into<String>, body: impl Into<Body>) -> Self {
        Self::new(Destination::Topic(topic.into()), body)
    }

    /// Creates a message for a queue.
    #[inline]
    #[must_use]
    pub fn queue(queue: impl Into<String>, body: impl Into<Body>) -> Self {
        Self::new(Destination::Queue(queue.into()), body)
    }

    /// Sets the quality of service, clamped to 2.
    #[must_use]
    pub fn with_qos(mut self, qos: u8) -> Self {
        self.qos = qos.min(2);
        self
    }

    /// Sets persistent delivery.
    #[must_use]
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Sets the retain flag.
    #[must_use]
    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    /// Subscription name the server delivered this message for.
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Destination of the message.
    #[inline]
    #[must_use]
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Payload.
    #[inline]
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Consumes the message and returns its payload.
    #[inline]
    #[must_use]
    pub fn into_body(self) -> Body {
        self.body
    }

    /// Quality of service.
    #[inline]
    #[must_use]
    pub fn qos(&self) -> u8 {
        self.qos
    }

    /// Server-assigned id of an inbound message.
    #[inline]
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Returns `true` for persistent delivery.
    #[inline]
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Returns `true` if the message is or was retained.
    #[inline]
    #[must_use]
    pub fn is_retained(&self) -> bool {
        self.retain
    }

    /// Builds a message from a parsed `Send` object.
    ///
    /// Returns `None` if the object names neither a `Topic` nor a `Queue`.
    #[must_use]
    pub fn from_parsed(parser: &JsonParser) -> Option<Self> {
        let destination = match (parser.find_string("Topic"), parser.find_string("Queue")) {
            (Some(topic), _) => Destination::Topic(topic.to_owned()),
            (None, Some(queue)) => Destination::Queue(queue.to_owned()),
            (None, None) => return None,
        };

        let body = match parser.find("Body") {
            Some(index) => match parser.entry(index).map(|entry| entry.kind()) {
                Some(EntryKind::Object | EntryKind::Array) => {
                    Body::Json(parser.to_value(index).unwrap_or(Value::Null))
                }
                Some(EntryKind::Null) => Body::default(),
                _ => Body::Text(parser.get_value(index).unwrap_or_default().into_owned()),
            },
            None => Body::default(),
        };

        let id = parser.get_u32("ID").map(RequestId::new).unwrap_or_default();
        let qos = u8::try_from(parser.get_int("QoS", 0).clamp(0, 2)).unwrap_or(0);

        Some(Self {
            name: parser.find_string("Name").map(str::to_owned),
            destination,
            body,
            qos,
            id,
            persistent: parser.get_bool("Persistent", false),
            retain: parser.get_bool("Retain", false),
        })
    }

    /// Acknowledgement owed to the server for this message, if any.
    ///
    /// QoS 0 messages and messages without an id are not acknowledged.
    #[must_use]
    pub fn ack_request(&self) -> Option<Request> {
        (self.qos > 0 && self.id.is_correlated()).then(|| Request::ack(self.id, 0))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(text: &str) -> JsonParser {
        let mut parser = JsonParser::new();
        assert!(parser.parse(text.as_bytes()).is_complete());
        parser
    }

    #[test]
    fn test_from_parsed_topic_message() {
        let parser = parse(
            r#"{"Action":"Send","Name":"sub1","Topic":"t","Body":"hi","QoS":1,"ID":7,"Retain":true}"#,
        );
        let message = Message::from_parsed(&parser).unwrap();

        assert_eq!(message.name(), Some("sub1"));
        assert_eq!(message.destination(), &Destination::Topic("t".into()));
        assert_eq!(message.body().as_text(), Some("hi"));
        assert_eq!(message.qos(), 1);
        assert_eq!(message.id(), RequestId::new(7));
        assert!(message.is_retained());
        assert!(!message.is_persistent());
    }

    #[test]
    fn test_from_parsed_queue_with_json_body() {
        let parser = parse(r#"{"Action":"Send","Queue":"q","Body":{"n":[1,2]}}"#);
        let message = Message::from_parsed(&parser).unwrap();

        assert!(message.destination().is_queue());
        assert_eq!(message.body().as_json(), Some(&json!({"n": [1, 2]})));
        assert_eq!(message.qos(), 0);
    }

    #[test]
    fn test_from_parsed_scalar_body_is_text() {
        let parser = parse(r#"{"Action":"Send","Topic":"t","Body":42}"#);
        let message = Message::from_parsed(&parser).unwrap();
        assert_eq!(message.body().as_text(), Some("42"));
    }

    #[test]
    fn test_from_parsed_without_destination() {
        let parser = parse(r#"{"Action":"Send","Body":"orphan"}"#);
        assert!(Message::from_parsed(&parser).is_none());
    }

    #[test]
    fn test_ack_request() {
        let parser = parse(r#"{"Action":"Send","Topic":"t","QoS":2,"ID":11}"#);
        let message = Message::from_parsed(&parser).unwrap();
        assert_eq!(message.ack_request(), Some(Request::ack(RequestId::new(11), 0)));

        let parser = parse(r#"{"Action":"Send","Topic":"t","QoS":0,"ID":11}"#);
        assert_eq!(Message::from_parsed(&parser).unwrap().ack_request(), None);

        let parser = parse(r#"{"Action":"Send","Topic":"t","QoS":1}"#);
        assert_eq!(Message::from_parsed(&parser).unwrap().ack_request(), None);
    }

    #[test]
    fn test_large_id_is_acked() {
        let parser = parse(r#"{"Action":"Send","Topic":"t","QoS":1,"ID":4000000000}"#);
        let message = Message::from_parsed(&parser).unwrap();

        assert_eq!(message.id(), RequestId::new(4_000_000_000));
        assert_eq!(
            message.ack_request(),
            Some(Request::ack(RequestId::new(4_000_000_000), 0))
        );
    }

    #[test]
    fn test_qos_is_clamped() {
        assert_eq!(Message::topic("t", "x").with_qos(9).qos(), 2);
    }

    #[test]
    fn test_destination_display() {
        assert_eq!(Destination::Queue("jobs".into()).to_string(), "queue:jobs");
    }
}
