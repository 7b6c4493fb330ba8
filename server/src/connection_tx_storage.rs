use std::collections::HashMap;

use system::{ConnectionId, DeliveryError, Outbox, ServerMessage};
use tokio::sync::mpsc::error::TrySendError;

pub type ConnectionTx = tokio::sync::mpsc::Sender<ServerMessage>;

/// Egress channels of every open connection.
pub struct ConnectionTxStorage {
    connection_txs: HashMap<ConnectionId, ConnectionTx>,
}

impl ConnectionTxStorage {
    pub fn new() -> Self {
        Self {
            connection_txs: HashMap::new(),
        }
    }

    pub fn insert(&mut self, connection_id: ConnectionId, tx: ConnectionTx) {
        self.connection_txs.insert(connection_id, tx);
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<ConnectionTx> {
        self.connection_txs.remove(connection_id)
    }

    pub fn len(&self) -> usize {
        self.connection_txs.len()
    }
}

/// Never waits on a connection: a full buffer drops the message.
impl Outbox for ConnectionTxStorage {
    fn send(&mut self, to: ConnectionId, message: ServerMessage) -> Result<(), DeliveryError> {
        let tx = self
            .connection_txs
            .get_mut(&to)
            .ok_or(DeliveryError::UnknownConnection)?;
        tx.try_send(message).map_err(|err| match err {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}
