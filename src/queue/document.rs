//! On-disk queue document.
//!
//! ```json
//! {
//!     "notifications": [
//!         "a legacy entry is the plain message text",
//!         { "title": "...", "body": "...", "createdAt": "2024-05-01T09:00:00Z" }
//!     ]
//! }
//! ```
//!
//! Both entry forms may appear in the same document and are written back in
//! the form they were read. Unknown top-level fields are preserved too.

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use std::collections::VecDeque;

use crate::notification::NotificationEvent;

/// One queued message, in whichever form it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueueEntry {
    /// Legacy form: the full message text.
    Message(String),
    /// Structured form.
    Event(NotificationEvent),
}

impl QueueEntry {
    /// Title to send; legacy entries have none.
    pub fn title(&self) -> &str {
        match self {
            QueueEntry::Message(_) => "",
            QueueEntry::Event(ev) => &ev.title,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            QueueEntry::Message(text) => text,
            QueueEntry::Event(ev) => &ev.body,
        }
    }
}

impl From<NotificationEvent> for QueueEntry {
    fn from(ev: NotificationEvent) -> Self {
        QueueEntry::Event(ev)
    }
}

/// The whole persisted queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueDocument {
    pub notifications: VecDeque<QueueEntry>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl QueueDocument {
    /// Parse file contents. Empty or whitespace-only input is an empty queue.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(bytes)
    }

    /// Serialize with 4-space indentation and a trailing newline.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut ser)?;
        buf.push(b'\n');
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_and_blank_input_is_empty_queue() {
        assert!(QueueDocument::decode(b"").unwrap().notifications.is_empty());
        assert!(QueueDocument::decode(b"  \n\t").unwrap().notifications.is_empty());
    }

    #[test]
    fn mixed_entry_forms_survive_rewrite() {
        let raw = json!({
            "notifications": [
                "legacy text",
                { "title": "T", "body": "B", "createdAt": "2024-05-01T09:00:00Z" }
            ],
            "owner": "ops"
        })
        .to_string();
        let doc = QueueDocument::decode(raw.as_bytes()).unwrap();
        assert_eq!(doc.notifications.len(), 2);
        assert_eq!(doc.notifications[0], QueueEntry::Message("legacy text".into()));
        assert_eq!(doc.notifications[1].title(), "T");

        let again = QueueDocument::decode(&doc.encode().unwrap()).unwrap();
        assert_eq!(again, doc);
        assert_eq!(again.extra.get("owner"), Some(&json!("ops")));
    }

    #[test]
    fn encode_uses_four_space_indent() {
        let doc = QueueDocument {
            notifications: VecDeque::from([QueueEntry::Message("hi".into())]),
            ..Default::default()
        };
        let text = String::from_utf8(doc.encode().unwrap()).unwrap();
        assert_eq!(text, "{\n    \"notifications\": [\n        \"hi\"\n    ]\n}\n");
    }

    #[test]
    fn wrong_shapes_are_errors() {
        assert!(QueueDocument::decode(b"{not json").is_err());
        assert!(QueueDocument::decode(b"[1, 2]").is_err());
        assert!(QueueDocument::decode(b"{}").is_err());
        assert!(QueueDocument::decode(br#"{"notifications": [42]}"#).is_err());
    }

    #[test]
    fn legacy_entry_is_body_only() {
        let e = QueueEntry::Message("\nAn error occurred".into());
        assert_eq!(e.title(), "");
        assert_eq!(e.body(), "\nAn error occurred");
    }
}
