//! Newline-delimited JSON framing for the event stream.
//!
//! Input is one gateway event per line, tagged by `"type"`. Output is one
//! platform action per line, tagged by `"action"`. Lines that can't be parsed
//! are reported on stderr as `{"error": ..., "line": n}` and otherwise
//! skipped.

use anyhow::{anyhow, Result};
use tracing::debug;

use crate::domain::types::Event;
use crate::service::recording::Action;

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse_event(line: &str) -> Result<Option<Event>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let event: Event =
        serde_json::from_str(line).map_err(|e| anyhow!("Failed to parse event: {}", e))?;
    debug!(event = %event, "Parsed event");
    Ok(Some(event))
}

/// Serialize an action as a single output line (without the newline).
pub fn format_action(action: &Action) -> Result<String> {
    Ok(serde_json::to_string(action)?)
}

/// Report a line that could not be processed.
pub fn format_error(line_number: usize, message: &str) -> String {
    serde_json::json!({
        "error": message,
        "line": line_number,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ChannelId, EventKind, MessageId, UserId};

    #[test]
    fn test_parse_message_create() {
        let line = r#"{"type":"message_create","id":7,"channel_id":104,"guild_id":1,"author":{"id":1000,"name":"alice"},"content":"hello","timestamp":"2024-05-01T12:00:00Z"}"#;
        let event = parse_event(line).unwrap().unwrap();
        assert_eq!(event.kind(), EventKind::MessageCreate);

        let message = event.message().unwrap();
        assert_eq!(message.author.id, UserId(1000));
        assert_eq!(message.author.name, "alice");
        assert!(message.attachments.is_empty());
    }

    #[test]
    fn test_parse_ready_and_delete() {
        let ready = parse_event(r#"{"type":"ready","self_id":999}"#).unwrap().unwrap();
        assert!(matches!(ready, Event::Ready { self_id: UserId(999) }));

        let delete = parse_event(r#"{"type":"message_delete","channel_id":1,"message_id":2}"#)
            .unwrap()
            .unwrap();
        assert!(matches!(
            delete,
            Event::MessageDelete {
                channel_id: ChannelId(1),
                message_id: MessageId(2)
            }
        ));
    }

    #[test]
    fn test_blank_and_comment_lines_are_skipped() {
        assert!(parse_event("").unwrap().is_none());
        assert!(parse_event("   ").unwrap().is_none());
        assert!(parse_event("# a comment").unwrap().is_none());
    }

    #[test]
    fn test_invalid_line_is_an_error() {
        assert!(parse_event("{not json").is_err());
        assert!(parse_event(r#"{"type":"unknown_event"}"#).is_err());
    }

    #[test]
    fn test_format_error() {
        let line: serde_json::Value = serde_json::from_str(&format_error(3, "bad")).unwrap();
        assert_eq!(line["error"], "bad");
        assert_eq!(line["line"], 3);
    }

    #[test]
    fn test_format_action() {
        let line = format_action(&Action::DeleteMessage {
            channel_id: ChannelId(4),
            message_id: MessageId(5),
        })
        .unwrap();
        assert_eq!(
            line,
            r#"{"action":"delete_message","channel_id":4,"message_id":5}"#
        );
    }
}
