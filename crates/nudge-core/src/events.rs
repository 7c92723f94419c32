use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every decision the engine takes produces an Event.
/// Callers may log them, forward them, or print them; the engine keeps no history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A message started a new unread episode.
    UnreadStarted {
        token: String,
        at: DateTime<Utc>,
    },
    /// The user read the conversation; escalation stops.
    ConversationRead {
        token: String,
        reminders_issued: u32,
    },
    /// A message was allowed to play a sound.
    AudibleAlert {
        token: String,
        at: DateTime<Utc>,
    },
    /// A message arrived inside the debounce window and stayed silent.
    AlertSuppressed {
        token: String,
        at: DateTime<Utc>,
    },
    /// A reminder was rendered and its count committed.
    ReminderIssued {
        token: String,
        repeat_count: u32,
        at: DateTime<Utc>,
    },
    /// Rendering or committing a reminder failed; it will be retried next scan.
    ReminderFailed {
        token: String,
        repeat_count: u32,
        error: String,
        at: DateTime<Utc>,
    },
    /// A scan ran while repeat notifications were disabled.
    ScanSkipped {
        at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let at = DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let event = Event::ReminderIssued {
            token: "room".into(),
            repeat_count: 2,
            at,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ReminderIssued");
        assert_eq!(json["repeat_count"], 2);
        assert_eq!(json["token"], "room");
    }
}
