use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use actix::{Actor, ActorContext, AsyncContext, Handler, Message, Running, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;

use system::{decode_client_message, ClientMessage, ConnectionId, RelayError, ServerMessage};

use crate::config::Config;
use crate::connection_tx_storage::ConnectionTx;
use crate::server::{ServerCommand, ServerTx};

pub type ConnectionIdSource = Arc<AtomicU32>;

#[derive(Debug)]
pub enum ConnectionCommand {
    Connect {
        from: ConnectionId,
        tx: ConnectionTx,
    },
    Disconnect {
        from: ConnectionId,
    },
    ClientMessage {
        from: ConnectionId,
        message: ClientMessage,
    },
    /// A frame that could not be decoded. Answered in order with everything
    /// else sent to the connection.
    Invalid {
        from: ConnectionId,
        error: RelayError,
    },
}

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionActorMessage(ServerMessage);

struct ConnectionActor {
    connection_id: ConnectionId,
    srv_tx: ServerTx,
    buffer: usize,
}

impl ConnectionActor {
    fn forward(&mut self, command: ConnectionCommand, ctx: &mut ws::WebsocketContext<Self>) {
        if self.srv_tx.send(ServerCommand::Connection(command)).is_err() {
            log::error!(
                "Connection {} cannot reach the server, closing",
                self.connection_id
            );
            ctx.stop();
        }
    }

    fn ingress(&mut self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        log::debug!("Ingress from {}: {}", self.connection_id, text);
        let from = self.connection_id;
        let command = match decode_client_message(text) {
            Ok(message) => ConnectionCommand::ClientMessage { from, message },
            Err(error) => {
                log::warn!("Rejected frame from connection {}: {}", from, error);
                ConnectionCommand::Invalid { from, error }
            }
        };
        self.forward(command, ctx);
    }
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<ServerMessage>(self.buffer);

        self.forward(
            ConnectionCommand::Connect {
                from: self.connection_id,
                tx,
            },
            ctx,
        );

        let addr = ctx.address().recipient();
        let connection_id = self.connection_id;

        tokio::spawn(async move {
            log::debug!("connection {} green thread - started", connection_id);
            while let Some(msg) = rx.recv().await {
                if addr.do_send(ConnectionActorMessage(msg)).is_err() {
                    break;
                }
            }
            log::debug!("connection {} green thread - terminated", connection_id);
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        let _ = self.srv_tx.send(ServerCommand::Connection(ConnectionCommand::Disconnect {
            from: self.connection_id,
        }));
        Running::Stop
    }
}

/// Ingress
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Text(text)) => self.ingress(&text, ctx),
            Ok(ws::Message::Binary(bin)) => match std::str::from_utf8(&bin) {
                Ok(text) => self.ingress(text, ctx),
                Err(_) => self.forward(
                    ConnectionCommand::Invalid {
                        from: self.connection_id,
                        error: RelayError::MalformedMessage,
                    },
                    ctx,
                ),
            },
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(err) => {
                log::warn!("Connection {} protocol error: {}", self.connection_id, err);
                ctx.stop();
            }
            _ => (),
        }
    }
}

/// Egress
impl Handler<ConnectionActorMessage> for ConnectionActor {
    type Result = ();

    fn handle(
        &mut self,
        msg: ConnectionActorMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) -> Self::Result {
        let serialized = msg.0.to_json();
        log::debug!("Egress to {}: {}", self.connection_id, serialized);
        ctx.text(serialized);
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    srv_tx: web::Data<ServerTx>,
    connection_ids: web::Data<ConnectionIdSource>,
    config: web::Data<Config>,
) -> Result<HttpResponse, Error> {
    let connection_id = connection_ids.fetch_add(1, Ordering::SeqCst);
    ws::start(
        ConnectionActor {
            connection_id,
            srv_tx: srv_tx.get_ref().clone(),
            buffer: config.connection_buffer,
        },
        &req,
        stream,
    )
}
