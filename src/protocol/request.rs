//! Outbound control objects.
//!
//! Every request serializes to a single JSON object whose first field is
//! `Action`. Optional flags are only written when they differ from the
//! server-side default.
//!
//! # Format
//!
//! ```json
//! { "Action": "Send", "Topic": "alerts", "QoS": 1, "ID": 7, "Body": "hello" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::error::Result;
use crate::identifiers::RequestId;

use super::message::{Body, Destination, Message};
use super::subscription::Subscription;

// ============================================================================
// Request
// ============================================================================

/// A control object sent from the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "Action")]
pub enum Request {
    /// Opens the session.
    Connect {
        /// Client identifier.
        #[serde(rename = "ClientID")]
        client_id: String,
        /// Optional user name.
        #[serde(rename = "User", skip_serializing_if = "Option::is_none")]
        user: Option<String>,
        /// Optional password.
        #[serde(rename = "Password", skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },

    /// Publishes a message.
    Send {
        /// Topic destination.
        #[serde(rename = "Topic", skip_serializing_if = "Option::is_none")]
        topic: Option<String>,
        /// Queue destination.
        #[serde(rename = "Queue", skip_serializing_if = "Option::is_none")]
        queue: Option<String>,
        /// Persistent delivery.
        #[serde(rename = "Persistent", skip_serializing_if = "is_false")]
        persistent: bool,
        /// Quality of service.
        #[serde(rename = "QoS")]
        qos: u8,
        /// Correlation id. Omitted when zero.
        #[serde(rename = "ID", skip_serializing_if = "RequestId::is_uncorrelated")]
        id: RequestId,
        /// Retain flag.
        #[serde(rename = "Retain", skip_serializing_if = "is_false")]
        retain: bool,
        /// Message payload.
        #[serde(rename = "Body")]
        body: Body,
    },

    /// Creates or resumes a subscription.
    Subscribe {
        /// Subscription name.
        #[serde(rename = "Name")]
        name: String,
        /// Topic destination.
        #[serde(rename = "Topic", skip_serializing_if = "Option::is_none")]
        topic: Option<String>,
        /// Queue destination.
        #[serde(rename = "Queue", skip_serializing_if = "Option::is_none")]
        queue: Option<String>,
        /// Durable subscription.
        #[serde(rename = "Durable", skip_serializing_if = "is_false")]
        durable: bool,
        /// Shared subscription mode, 1 or 2.
        #[serde(rename = "Shared", skip_serializing_if = "Option::is_none")]
        shared: Option<u8>,
        /// Suppress messages published by this client.
        #[serde(rename = "Nolocal", skip_serializing_if = "is_false")]
        nolocal: bool,
        /// Maximum quality of service.
        #[serde(rename = "QoS")]
        qos: u8,
        /// Correlation id. Omitted when zero.
        #[serde(rename = "ID", skip_serializing_if = "RequestId::is_uncorrelated")]
        id: RequestId,
    },

    /// Stops delivery for a subscription.
    CloseSubscription {
        /// Subscription name.
        #[serde(rename = "Name")]
        name: String,
    },

    /// Removes a durable subscription.
    DestroySubscription {
        /// Subscription name.
        #[serde(rename = "Name")]
        name: String,
    },

    /// Asks for the retained message of a topic.
    GetRetained {
        /// Topic name.
        #[serde(rename = "Topic")]
        topic: String,
        /// Correlation id. Omitted when zero.
        #[serde(rename = "ID", skip_serializing_if = "RequestId::is_uncorrelated")]
        id: RequestId,
    },

    /// Deletes the retained message of a topic.
    DeleteRetained {
        /// Topic name.
        #[serde(rename = "Topic")]
        topic: String,
        /// Correlation id. Omitted when zero.
        #[serde(rename = "ID", skip_serializing_if = "RequestId::is_uncorrelated")]
        id: RequestId,
    },

    /// Acknowledges an inbound message.
    Ack {
        /// Id of the acknowledged message.
        #[serde(rename = "ID")]
        id: RequestId,
        /// Return code.
        #[serde(rename = "RC")]
        rc: i32,
    },

    /// Heartbeat request.
    Ping,

    /// Heartbeat response.
    Pong,

    /// Ends the session.
    Close,
}

impl Request {
    /// Builds a `Send` for `message`.
    #[must_use]
    pub fn send(message: &Message, id: RequestId) -> Self {
        let (topic, queue) = split_destination(message.destination());
        Self::Send {
            topic,
            queue,
            persistent: message.is_persistent(),
            qos: message.qos(),
            id,
            retain: message.is_retained(),
            body: message.body().clone(),
        }
    }

    /// Builds a `Subscribe` for `subscription`.
    #[must_use]
    pub fn subscribe(subscription: &Subscription, id: RequestId) -> Self {
        let (topic, queue) = split_destination(subscription.destination());
        Self::Subscribe {
            name: subscription.name().to_owned(),
            topic,
            queue,
            durable: subscription.is_durable(),
            shared: subscription.shared(),
            nolocal: subscription.is_nolocal(),
            qos: subscription.qos(),
            id,
        }
    }

    /// Builds the acknowledgement of an inbound message.
    #[inline]
    #[must_use]
    pub fn ack(id: RequestId, rc: i32) -> Self {
        Self::Ack { id, rc }
    }

    /// Wire name of the request.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "Connect",
            Self::Send { .. } => "Send",
            Self::Subscribe { .. } => "Subscribe",
            Self::CloseSubscription { .. } => "CloseSubscription",
            Self::DestroySubscription { .. } => "DestroySubscription",
            Self::GetRetained { .. } => "GetRetained",
            Self::DeleteRetained { .. } => "DeleteRetained",
            Self::Ack { .. } => "Ack",
            Self::Ping => "Ping",
            Self::Pong => "Pong",
            Self::Close => "Close",
        }
    }

    /// Serializes the request to its wire text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if an embedded JSON body
    /// cannot be serialized.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn split_destination(destination: &Destination) -> (Option<String>, Option<String>) {
    match destination {
        Destination::Topic(topic) => (Some(topic.clone()), None),
        Destination::Queue(queue) => (None, Some(queue.clone())),
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_connect_serialization() {
        let request = Request::Connect {
            client_id: "c1".to_string(),
            user: None,
            password: Some("secret".to_string()),
        };
        assert_eq!(
            request.to_json().unwrap(),
            r#"{"Action":"Connect","ClientID":"c1","Password":"secret"}"#
        );
    }

    #[test]
    fn test_send_text_body() {
        let message = Message::topic("alerts", "hello \"world\"").with_qos(1);
        let request = Request::send(&message, RequestId::new(7));

        assert_eq!(
            request.to_json().unwrap(),
            r#"{"Action":"Send","Topic":"alerts","QoS":1,"ID":7,"Body":"hello \"world\""}"#
        );
    }

    #[test]
    fn test_send_queue_flags_and_json_body() {
        let message = Message::queue("work", json!({"job": [1, 2]}))
            .with_persistent(true)
            .with_retain(true);
        let request = Request::send(&message, RequestId::CONNECT);

        assert_eq!(
            request.to_json().unwrap(),
            r#"{"Action":"Send","Queue":"work","Persistent":true,"QoS":0,"Retain":true,"Body":{"job":[1,2]}}"#
        );
    }

    #[test]
    fn test_subscribe_defaults() {
        let subscription = Subscription::topic("sub1", "alerts/#");
        let request = Request::subscribe(&subscription, RequestId::new(3));

        assert_eq!(
            request.to_json().unwrap(),
            r#"{"Action":"Subscribe","Name":"sub1","Topic":"alerts/#","QoS":2,"ID":3}"#
        );
    }

    #[test]
    fn test_subscribe_options() {
        let subscription = Subscription::queue("sub2", "jobs")
            .with_durable(true)
            .with_shared(1)
            .with_nolocal(true)
            .with_qos(0);
        let request = Request::subscribe(&subscription, RequestId::CONNECT);

        assert_eq!(
            request.to_json().unwrap(),
            r#"{"Action":"Subscribe","Name":"sub2","Queue":"jobs","Durable":true,"Shared":1,"Nolocal":true,"QoS":0}"#
        );
    }

    #[test]
    fn test_unit_requests() {
        assert_eq!(Request::Ping.to_json().unwrap(), r#"{"Action":"Ping"}"#);
        assert_eq!(Request::Pong.to_json().unwrap(), r#"{"Action":"Pong"}"#);
        assert_eq!(Request::Close.to_json().unwrap(), r#"{"Action":"Close"}"#);
    }

    #[test]
    fn test_ack_and_retained() {
        assert_eq!(
            Request::ack(RequestId::new(9), 0).to_json().unwrap(),
            r#"{"Action":"Ack","ID":9,"RC":0}"#
        );

        let get = Request::GetRetained {
            topic: "t".to_string(),
            id: RequestId::CONNECT,
        };
        assert_eq!(get.to_json().unwrap(), r#"{"Action":"GetRetained","Topic":"t"}"#);
        assert_eq!(get.action(), "GetRetained");
    }
}
