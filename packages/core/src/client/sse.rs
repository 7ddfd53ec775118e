//! Server-Sent Events
//!
//! [`SseParser`] turns raw `text/event-stream` bytes into [`SseEvent`]s. It is
//! fed arbitrary chunks (a chunk may end mid-line or mid-character) and emits
//! an event at each blank line. Lines end at CRLF, LF or a bare CR.
//!
//! [`AgentProgress`] is the typed payload of the agent run stream: the SSE
//! `event:` name selects the variant and `data:` carries its JSON fields.

use serde::{Deserialize, Serialize};

use crate::client::ApiError;

/// One dispatched event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// `message` when the stream sent no `event:` field
    pub event: String,
    /// `data:` lines joined with `\n`
    pub data: String,
    /// Last event id seen on the stream
    pub id: Option<String>,
    /// Reconnection delay requested by the server, in milliseconds
    pub retry: Option<u64>,
}

#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    last_id: Option<String>,
    retry: Option<u64>,
    /// The last line ended in CR, so a leading LF belongs to it
    skip_lf: bool,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every event it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        loop {
            if self.skip_lf {
                match self.buffer.first() {
                    Some(b'\n') => {
                        self.buffer.remove(0);
                        self.skip_lf = false;
                    }
                    Some(_) => self.skip_lf = false,
                    None => break,
                }
            }
            let Some(end) = self
                .buffer
                .iter()
                .position(|&b| b == b'\n' || b == b'\r')
            else {
                break;
            };
            self.skip_lf = self.buffer[end] == b'\r';
            let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
            line.pop();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event the stream closed without terminating
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest).into_owned();
            if let Some(event) = self.process_line(&line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        // Comment / keep-alive
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            "retry" => {
                if let Ok(ms) = value.parse() {
                    self.retry = Some(ms);
                }
            }
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: event
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "message".to_string()),
            data,
            id: self.last_id.clone(),
            retry: self.retry,
        })
    }
}

/// Progress of an agent run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentProgress {
    Started {
        run_id: String,
        #[serde(default)]
        agent_id: Option<String>,
    },
    Step {
        run_id: String,
        message: String,
        /// Fraction complete in `0.0..=1.0`, when the agent reports one
        #[serde(default)]
        progress: Option<f32>,
    },
    Output {
        run_id: String,
        content: String,
    },
    Completed {
        run_id: String,
        #[serde(default)]
        summary: Option<String>,
    },
    Failed {
        run_id: String,
        error: String,
    },
}

impl AgentProgress {
    /// Decode an SSE event, or `None` for event names this client ignores
    pub fn from_event(event: &SseEvent) -> Result<Option<Self>, ApiError> {
        if !matches!(
            event.event.as_str(),
            "started" | "step" | "output" | "completed" | "failed"
        ) {
            tracing::debug!("Ignoring agent stream event '{}'", event.event);
            return Ok(None);
        }

        let mut payload: serde_json::Value =
            serde_json::from_str(&event.data).map_err(ApiError::decode)?;
        let Some(fields) = payload.as_object_mut() else {
            return Err(ApiError::Stream {
                message: format!("'{}' event data is not an object", event.event),
            });
        };
        fields.insert(
            "type".to_string(),
            serde_json::Value::String(event.event.clone()),
        );
        serde_json::from_value(payload)
            .map(Some)
            .map_err(ApiError::decode)
    }

    pub fn run_id(&self) -> &str {
        match self {
            AgentProgress::Started { run_id, .. }
            | AgentProgress::Step { run_id, .. }
            | AgentProgress::Output { run_id, .. }
            | AgentProgress::Completed { run_id, .. }
            | AgentProgress::Failed { run_id, .. } => run_id,
        }
    }

    /// Whether the run has ended
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentProgress::Completed { .. } | AgentProgress::Failed { .. }
        )
    }
}
