use crate::error::DeliveryError;
use crate::message::{ConnectionId, ServerMessage};

/// The ability to hand a message to a connection.
///
/// Sends never block and never panic; a dead or saturated connection shows
/// up as an `Err` the caller may log and move past.
pub trait Outbox {
    fn send(&mut self, to: ConnectionId, message: ServerMessage) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub to: ConnectionId,
    pub message: ServerMessage,
}

/// Collects every send, in order.
impl Outbox for Vec<Delivery> {
    fn send(&mut self, to: ConnectionId, message: ServerMessage) -> Result<(), DeliveryError> {
        self.push(Delivery { to, message });
        Ok(())
    }
}
