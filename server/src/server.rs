use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use system::{ClientMessage, ConnectionId, Outbox, RelayError, ServerMessage, SessionRegistry};

use crate::admin::AdminCommand;
use crate::connection::ConnectionCommand;
use crate::connection_tx_storage::ConnectionTxStorage;

pub type ServerTx = UnboundedSender<ServerCommand>;

#[derive(Debug)]
pub enum ServerCommand {
    Connection(ConnectionCommand),
    AdminCommand(AdminCommand),
}

/// Owns the registry and every connection's egress channel. Commands are
/// handled one at a time, each to completion.
pub struct Server {
    registry: SessionRegistry,
    connections: ConnectionTxStorage,
}

impl Server {
    pub fn new() -> Self {
        Self {
            registry: SessionRegistry::new(),
            connections: ConnectionTxStorage::new(),
        }
    }

    pub fn handle_command(&mut self, command: ServerCommand) {
        match command {
            ServerCommand::Connection(command) => self.handle_connection_command(command),
            ServerCommand::AdminCommand(AdminCommand::ListSessions { tx }) => {
                let _ = tx.send(self.registry.summaries());
            }
        }
    }

    fn handle_connection_command(&mut self, command: ConnectionCommand) {
        match command {
            ConnectionCommand::Connect { from, tx } => {
                self.connections.insert(from, tx);
                log::info!("Connection {} established", from);
            }
            ConnectionCommand::Disconnect { from } => {
                let removed = self.registry.drop_connection(from, &mut self.connections);
                self.connections.remove(&from);
                log::info!(
                    "Connection {} closed, {} session(s) removed, {} connection(s) open",
                    from,
                    removed.len(),
                    self.connections.len()
                );
            }
            ConnectionCommand::ClientMessage { from, message } => {
                match self.handle_client_message(from, message) {
                    Ok(Some(reply)) => self.reply(from, reply),
                    Ok(None) => {}
                    Err(err) => self.reply(from, ServerMessage::error(&err)),
                }
            }
            ConnectionCommand::Invalid { from, error } => {
                self.reply(from, ServerMessage::error(&error));
            }
        }
    }

    fn handle_client_message(
        &mut self,
        from: ConnectionId,
        message: ClientMessage,
    ) -> Result<Option<ServerMessage>, RelayError> {
        match message {
            ClientMessage::StartSession(session) => self
                .registry
                .create_session(&session.session_id, from)
                .map(Some),
            ClientMessage::UpdateLocation(update) => self
                .registry
                .update_location(
                    &update.session_id,
                    from,
                    &update.location,
                    &mut self.connections,
                )
                .map(|_| None),
            ClientMessage::StopSession(session) => self
                .registry
                .stop_session(&session.session_id, from, &mut self.connections)
                .map(Some),
            ClientMessage::Subscribe(session) => self
                .registry
                .subscribe_to_session(&session.session_id, from)
                .map(Some),
            ClientMessage::Unsubscribe(session) => self
                .registry
                .unsubscribe_from_session(&session.session_id, from)
                .map(Some),
            ClientMessage::ListSessions => {
                Ok(Some(ServerMessage::ListSessions(self.registry.list_sessions())))
            }
        }
    }

    fn reply(&mut self, to: ConnectionId, message: ServerMessage) {
        if let Err(err) = self.connections.send(to, message) {
            log::warn!("Failed to reply to connection {}: {}", to, err);
        }
    }
}

pub fn spawn_server() -> ServerTx {
    let (srv_tx, mut srv_rx) = unbounded_channel::<ServerCommand>();

    tokio::spawn(async move {
        let mut server = Server::new();

        while let Some(command) = srv_rx.recv().await {
            server.handle_command(command);
        }
        log::info!("Server loop terminated");
    });

    srv_tx
}
