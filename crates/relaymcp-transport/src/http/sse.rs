//! Incremental Server-Sent-Events parser.
//!
//! Feeds on raw body chunks and yields complete events. An event is a
//! block of `field: value` lines terminated by a blank line; `data:`
//! lines accumulate (joined with `\n`), the last `id:` line names the
//! event for resumption, and comment lines (leading `:`) are dropped.

/// One parsed SSE event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the last `id:` line, if any
    pub id: Option<String>,
    /// Value of the last `event:` line, if any
    pub event: Option<String>,
    /// Joined `data:` lines
    pub data: String,
}

impl SseEvent {
    /// Whether the event carries no data payload (keep-alive).
    pub fn is_empty(&self) -> bool {
        self.data.trim().is_empty()
    }
}

/// Stateful parser accumulating chunks until events complete
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
}

impl SseParser {
    /// Create an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns every event completed by it.
    pub fn push(&mut self, chunk: &str) -> Vec<SseEvent> {
        // Normalize CRLF so the blank-line scan only deals with '\n'.
        self.buffer.push_str(&chunk.replace("\r\n", "\n"));

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let block = self.buffer[..pos].to_string();
            self.buffer.drain(..pos + 2);
            if let Some(event) = parse_event(&block) {
                events.push(event);
            }
        }
        events
    }
}

fn parse_event(block: &str) -> Option<SseEvent> {
    let mut id = None;
    let mut event_type = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in block.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            // A line without a colon is a field with an empty value.
            None => (line, ""),
        };
        match field {
            "id" => id = Some(value.to_string()),
            "event" => event_type = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    if id.is_none() && event_type.is_none() && data_lines.is_empty() {
        return None;
    }

    Some(SseEvent {
        id,
        event: event_type,
        data: data_lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_event() {
        let mut parser = SseParser::new();
        let events = parser.push("data: {\"id\":1}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"id\":1}");
        assert_eq!(events[0].id, None);
    }

    #[test]
    fn event_with_id_and_type() {
        let mut parser = SseParser::new();
        let events = parser.push("id: evt-7\nevent: message\ndata: {}\n\n");
        assert_eq!(
            events,
            vec![SseEvent {
                id: Some("evt-7".to_string()),
                event: Some("message".to_string()),
                data: "{}".to_string(),
            }]
        );
    }

    #[test]
    fn multiline_data_joined() {
        let mut parser = SseParser::new();
        let events = parser.push("data: line1\ndata: line2\n\n");
        assert_eq!(events[0].data, "line1\nline2");
    }

    #[test]
    fn split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.push("data: {\"par").is_empty());
        assert!(parser.push("tial\":true}").is_empty());
        let events = parser.push("\n\ndata: next\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "{\"partial\":true}");
        assert_eq!(events[1].data, "next");
    }

    #[test]
    fn crlf_normalization() {
        let mut parser = SseParser::new();
        let events = parser.push("id: 1\r\ndata: hi\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id.as_deref(), Some("1"));
        assert_eq!(events[0].data, "hi");
    }

    #[test]
    fn comments_ignored() {
        let mut parser = SseParser::new();
        let events = parser.push(": keep-alive\n\n");
        assert!(events.is_empty());

        let events = parser.push(": comment\ndata: real\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "real");
    }

    #[test]
    fn value_without_leading_space() {
        let mut parser = SseParser::new();
        let events = parser.push("data:compact\n\n");
        assert_eq!(events[0].data, "compact");
    }
}
