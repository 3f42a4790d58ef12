use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::events::ServerEvent;
use super::messages::ClientMessage;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Tag outside the closed event set. Logged and skipped.
    #[error("unknown event type `{kind}`")]
    UnknownEvent { kind: String },

    /// Known tag whose payload does not match the expected shape.
    #[error("malformed `{kind}` event: {reason}")]
    MalformedEvent { kind: String, reason: String },

    /// Not a `{ type, payload }` envelope at all.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),
}

impl DecodeError {
    /// Whether local state can no longer be trusted after this error.
    pub fn requires_resync(&self) -> bool {
        !matches!(self, DecodeError::UnknownEvent { .. })
    }

    /// The event tag, when the envelope was readable.
    pub fn event_kind(&self) -> Option<&str> {
        match self {
            DecodeError::UnknownEvent { kind } | DecodeError::MalformedEvent { kind, .. } => {
                Some(kind)
            }
            DecodeError::InvalidEnvelope(_) => None,
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to encode `{kind}` message: {source}")]
pub struct CodecError {
    pub kind: &'static str,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

pub fn encode(message: &ClientMessage) -> Result<String, CodecError> {
    serde_json::to_string(message).map_err(|source| CodecError {
        kind: message.kind(),
        source,
    })
}

pub fn decode(raw: &str) -> Result<ServerEvent, DecodeError> {
    let Envelope { kind, payload } =
        serde_json::from_str(raw).map_err(|err| DecodeError::InvalidEnvelope(err.to_string()))?;

    let event = match kind.as_str() {
        "roster-snapshot" => ServerEvent::RosterSnapshot(payload_as(&kind, payload)?),
        "role-assigned" => ServerEvent::RoleAssigned(payload_as(&kind, payload)?),
        "phase-changed" => ServerEvent::PhaseChanged(payload_as(&kind, payload)?),
        "participant-eliminated" => {
            ServerEvent::ParticipantEliminated(payload_as(&kind, payload)?)
        }
        "game-ended" => ServerEvent::GameEnded(payload_as(&kind, payload)?),
        "chat-appended" => ServerEvent::ChatAppended(payload_as(&kind, payload)?),
        "investigation-result" => ServerEvent::InvestigationResult(payload_as(&kind, payload)?),
        "kicked" => ServerEvent::Kicked(payload_as(&kind, payload)?),
        "host-status" => ServerEvent::HostStatus(payload_as(&kind, payload)?),
        "connection-ack" => ServerEvent::ConnectionAck(payload_as(&kind, payload)?),
        "session-snapshot" => ServerEvent::SessionSnapshot(payload_as(&kind, payload)?),
        _ => return Err(DecodeError::UnknownEvent { kind }),
    };

    Ok(event)
}

fn payload_as<T: DeserializeOwned>(kind: &str, payload: Value) -> Result<T, DecodeError> {
    // payload-less events arrive with no payload or `null`
    let payload = match payload {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(payload).map_err(|err| DecodeError::MalformedEvent {
        kind: kind.to_string(),
        reason: err.to_string(),
    })
}
