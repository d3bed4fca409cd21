//! JSON-lines messages exchanged with the Node bootstrap script.

use super::{EngineEvent, Outcome};
use crate::error::ReplError;
use crate::surface::Stream;
use crate::value::RemoteValue;
use serde::{Deserialize, Serialize};

/// Host to engine.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HostMessage<'a> {
    Execute { id: u64, code: &'a str },
}

/// Engine to host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EngineMessage {
    /// Sent once the bootstrap has installed its hooks.
    Ready,
    Console { stream: Stream, args: Vec<RemoteValue> },
    Write { stream: Stream, text: String },
    Result { id: u64, value: RemoteValue },
    Thrown { id: u64, value: RemoteValue, text: String },
}

impl EngineMessage {
    /// The event this message delivers, `None` for control messages.
    pub fn into_event(self) -> Option<EngineEvent> {
        match self {
            EngineMessage::Ready => None,
            EngineMessage::Console { stream, args } => Some(EngineEvent::Console { stream, args }),
            EngineMessage::Write { stream, text } => Some(EngineEvent::Text { stream, text }),
            EngineMessage::Result { id, value } => Some(EngineEvent::Completed {
                id,
                outcome: Outcome::Value(value),
            }),
            EngineMessage::Thrown { id, value, text } => Some(EngineEvent::Completed {
                id,
                outcome: Outcome::Thrown { value, text },
            }),
        }
    }
}

/// Encode one request line, newline included.
pub fn encode(message: &HostMessage<'_>) -> Result<String, ReplError> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

pub fn decode(line: &str) -> Result<EngineMessage, ReplError> {
    Ok(serde_json::from_str(line.trim_end())?)
}
