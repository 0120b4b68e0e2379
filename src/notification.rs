//! Outbound notification unit.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// One message destined for the channel.
///
/// Created by the rule evaluator (or the report/diagnostic paths), appended
/// to the queue, and removed by the delivery worker once sent. Never mutated
/// after construction; `created_at` is informational and plays no part in
/// ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    /// New event stamped with the current time (whole milliseconds, so it
    /// survives a JSON round trip unchanged).
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::at(title, body, Utc::now().trunc_subsecs(3))
    }

    pub fn at(
        title: impl Into<String>,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_timestamp() {
        let ts = DateTime::parse_from_rfc3339("2024-05-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let ev = NotificationEvent::at("T", "line1\nline2", ts);
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["title"], "T");
        assert_eq!(json["body"], "line1\nline2");
        assert_eq!(json["createdAt"], "2024-05-01T09:00:00Z");
    }

    #[test]
    fn round_trips_through_json() {
        let ev = NotificationEvent::new("title", "");
        let back: NotificationEvent =
            serde_json::from_str(&serde_json::to_string(&ev).unwrap()).unwrap();
        assert_eq!(back, ev);
    }
}
