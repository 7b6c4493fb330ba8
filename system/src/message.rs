use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type ConnectionId = u32;
pub type SessionId = String;

pub const START_SESSION: &str = "START_SESSION";
pub const UPDATE_LOCATION: &str = "UPDATE_LOCATION";
pub const STOP_SESSION: &str = "STOP_SESSION";
pub const SUBSCRIBE: &str = "SUBSCRIBE";
pub const UNSUBSCRIBE: &str = "UNSUBSCRIBE";
pub const LIST_SESSIONS: &str = "LIST_SESSIONS";
pub const ERROR: &str = "ERROR";

/// A location exactly as the sender wrote it. Coordinates are never parsed,
/// and fields other than `latitude` and `longitude` ride along untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: Value,
    pub longitude: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Location {
    pub fn new(latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self {
            latitude: Value::String(latitude.into()),
            longitude: Value::String(longitude.into()),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRef {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    pub session_id: SessionId,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Ingress
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    StartSession(SessionRef),
    UpdateLocation(LocationUpdate),
    StopSession(SessionRef),
    Subscribe(SessionRef),
    Unsubscribe(SessionRef),
    ListSessions,
}

/// Egress. Serialized as `{ "type": ..., "payload": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    StartSession(Notice),
    UpdateLocation(Location),
    StopSession(Notice),
    Subscribe(Notice),
    Unsubscribe(Notice),
    ListSessions(Vec<SessionId>),
    Error(Notice),
}

impl ServerMessage {
    pub fn error(error: &RelayError) -> Self {
        ServerMessage::Error(Notice::new(error.to_string()))
    }

    pub fn to_json(&self) -> String {
        // Every variant is plain strings and sequences of strings.
        serde_json::to_string(self).unwrap_or_else(|err| {
            log::error!("Failed to serialize {:?}: {}", self, err);
            String::from(r#"{"type":"ERROR","payload":{"message":"Internal error"}}"#)
        })
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

/// Decodes one inbound text frame.
///
/// Anything that isn't a JSON object with a string `type` is malformed. A
/// well-formed envelope with a `type` outside the vocabulary is unrecognized,
/// and a recognized `type` whose payload lacks required fields is malformed
/// again.
pub fn decode_client_message(text: &str) -> Result<ClientMessage, RelayError> {
    let envelope: Envelope =
        serde_json::from_str(text).map_err(|_| RelayError::MalformedMessage)?;

    let message = match envelope.kind.as_str() {
        START_SESSION => ClientMessage::StartSession(payload(envelope.payload)?),
        UPDATE_LOCATION => ClientMessage::UpdateLocation(payload(envelope.payload)?),
        STOP_SESSION => ClientMessage::StopSession(payload(envelope.payload)?),
        SUBSCRIBE => ClientMessage::Subscribe(payload(envelope.payload)?),
        UNSUBSCRIBE => ClientMessage::Unsubscribe(payload(envelope.payload)?),
        LIST_SESSIONS => ClientMessage::ListSessions,
        _ => return Err(RelayError::UnrecognizedMessageType(envelope.kind)),
    };
    Ok(message)
}

fn payload<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, RelayError> {
    serde_json::from_value(value).map_err(|_| RelayError::MalformedMessage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn it_decodes_update_location() {
        let message = decode_client_message(
            r#"{"type":"UPDATE_LOCATION","payload":{"sessionId":"trip1","location":{"latitude":"1.0","longitude":"2.0"}}}"#,
        )
        .expect("");
        assert_eq!(
            message,
            ClientMessage::UpdateLocation(LocationUpdate {
                session_id: "trip1".into(),
                location: Location::new("1.0", "2.0"),
            })
        );
    }

    #[test]
    fn it_decodes_list_sessions_without_payload() {
        let message = decode_client_message(r#"{"type":"LIST_SESSIONS"}"#).expect("");
        assert_eq!(message, ClientMessage::ListSessions);
    }

    #[test]
    fn it_rejects_unknown_type() {
        let err = decode_client_message(r#"{"type":"JUMP","payload":{}}"#).unwrap_err();
        assert_eq!(err, RelayError::UnrecognizedMessageType("JUMP".into()));
        assert_eq!(err.to_string(), "Unknown message type");
    }

    #[test]
    fn it_rejects_malformed_input() {
        for text in &[
            "not json",
            "[1, 2]",
            r#"{"payload":{"sessionId":"a"}}"#,
            r#"{"type":"SUBSCRIBE","payload":{}}"#,
            r#"{"type":"UPDATE_LOCATION","payload":{"sessionId":"a"}}"#,
            r#"{"type":"UPDATE_LOCATION","payload":{"sessionId":"a","location":{"longitude":"2"}}}"#,
        ] {
            let err = decode_client_message(text).unwrap_err();
            assert_eq!(err, RelayError::MalformedMessage, "{}", text);
            assert_eq!(err.to_string(), "Invalid message format");
        }
    }

    #[test]
    fn it_serializes_with_type_and_payload() {
        let message = ServerMessage::UpdateLocation(Location::new("37.5665", "126.9780"));
        let value: Value = serde_json::from_str(&message.to_json()).expect("");
        assert_eq!(
            value,
            json!({
                "type": "UPDATE_LOCATION",
                "payload": { "latitude": "37.5665", "longitude": "126.9780" }
            })
        );

        let value: Value =
            serde_json::from_str(&ServerMessage::ListSessions(vec!["a".into()]).to_json())
                .expect("");
        assert_eq!(value, json!({ "type": "LIST_SESSIONS", "payload": ["a"] }));
    }

    #[test]
    fn it_keeps_location_fields_as_written() {
        let message = decode_client_message(
            r#"{"type":"UPDATE_LOCATION","payload":{"sessionId":"a","location":{"latitude":1.5,"longitude":-2.25,"accuracy":"5"}}}"#,
        )
        .expect("");
        let location = match message {
            ClientMessage::UpdateLocation(update) => update.location,
            other => panic!("unexpected message {:?}", other),
        };

        let value: Value =
            serde_json::from_str(&ServerMessage::UpdateLocation(location).to_json()).expect("");
        assert_eq!(
            value,
            json!({
                "type": "UPDATE_LOCATION",
                "payload": { "latitude": 1.5, "longitude": -2.25, "accuracy": "5" }
            })
        );
    }

    #[test]
    fn it_builds_error_replies() {
        let message = ServerMessage::error(&RelayError::SessionNotFound("x".into()));
        assert_eq!(message, ServerMessage::Error(Notice::new("Session not found")));
    }
}
