use crate::message::SessionId;
use thiserror::Error;

/// Failures reported back to the connection that asked for something.
///
/// `Display` is the message clients see in the `ERROR` payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("Session {0} already exists.")]
    SessionAlreadyExists(SessionId),
    #[error("Session not found")]
    SessionNotFound(SessionId),
    #[error("cannot subscribe to own session")]
    SelfSubscriptionRejected,
    /// Warning only. The operation that noticed it still completes.
    #[error("No subscriber!")]
    NoSubscribers,
    #[error("Only the session sender can {0}")]
    NotSender(&'static str),
    #[error("Unknown message type")]
    UnrecognizedMessageType(String),
    #[error("Invalid message format")]
    MalformedMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("connection is not registered")]
    UnknownConnection,
    #[error("connection buffer is full")]
    Full,
    #[error("connection is closed")]
    Closed,
}
