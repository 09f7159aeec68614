//! Wire envelope exchanged with relay clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use comms_core::RecipientId;

/// One JSON message on a relay session, tagged by `kind`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Envelope {
    /// First message on every session: the client's own recipient ID.
    Welcome {
        /// ID other clients use to address this one.
        recipient: RecipientId,
        /// When the session was registered.
        at: DateTime<Utc>,
    },
    /// Application payload addressed to a recipient.
    Message {
        /// Target recipient.
        to: RecipientId,
        /// Sender, filled in by the relay.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<RecipientId>,
        /// Opaque payload.
        body: Value,
        /// When the relay forwarded it.
        #[serde(default = "Utc::now")]
        at: DateTime<Utc>,
    },
    /// A message the relay could not hand to its target.
    Undeliverable {
        /// The recipient that was not registered.
        to: RecipientId,
        /// The original payload.
        body: Value,
        /// When the relay gave up.
        at: DateTime<Utc>,
    },
}

impl Envelope {
    /// Build a welcome for `recipient`.
    pub fn welcome(recipient: RecipientId) -> Self {
        Self::Welcome {
            recipient,
            at: Utc::now(),
        }
    }

    /// Build a client-side message (no sender yet).
    pub fn message(to: RecipientId, body: Value) -> Self {
        Self::Message {
            to,
            from: None,
            body,
            at: Utc::now(),
        }
    }

    /// Build a bounce for a message nobody received.
    pub fn undeliverable(to: RecipientId, body: Value) -> Self {
        Self::Undeliverable {
            to,
            body,
            at: Utc::now(),
        }
    }

    /// The `kind` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::Message { .. } => "message",
            Self::Undeliverable { .. } => "undeliverable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn client_message_parses_without_sender_or_timestamp() {
        let to = RecipientId::new();
        let raw = json!({"kind": "message", "to": to.to_string(), "body": {"x": 1}});
        let env: Envelope = serde_json::from_value(raw).unwrap();
        assert_matches!(env, Envelope::Message { to: t, from: None, ref body, .. } if t == to && body["x"] == 1);
    }

    #[test]
    fn welcome_serializes_with_kind_tag() {
        let id = RecipientId::new();
        let v = serde_json::to_value(Envelope::welcome(id)).unwrap();
        assert_eq!(v["kind"], "welcome");
        assert_eq!(v["recipient"], id.to_string());
        assert!(v["at"].is_string());
    }

    #[test]
    fn message_omits_missing_sender() {
        let v = serde_json::to_value(Envelope::message(RecipientId::new(), json!("hi"))).unwrap();
        assert!(v.get("from").is_none());
        assert_eq!(v["body"], "hi");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let raw = json!({"kind": "bogus"});
        assert!(serde_json::from_value::<Envelope>(raw).is_err());
    }

    #[test]
    fn kind_matches_tag() {
        let id = RecipientId::new();
        assert_eq!(Envelope::welcome(id).kind(), "welcome");
        assert_eq!(Envelope::message(id, Value::Null).kind(), "message");
        assert_eq!(Envelope::undeliverable(id, Value::Null).kind(), "undeliverable");
    }
}
