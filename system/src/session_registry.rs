use std::collections::HashMap;

use crate::error::RelayError;
use crate::message::{ConnectionId, Location, Notice, ServerMessage, SessionId};
use crate::outbox::Outbox;
use crate::session::{Session, SessionSummary};

/// Owns every live session, keyed by the id its sender picked.
///
/// Operations return the reply meant for the calling connection; anything
/// addressed to other connections goes through the outbox.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get_session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn create_session(
        &mut self,
        session_id: &str,
        sender: ConnectionId,
    ) -> Result<ServerMessage, RelayError> {
        if self.sessions.contains_key(session_id) {
            log::warn!("Session {} already exists", session_id);
            return Err(RelayError::SessionAlreadyExists(session_id.to_owned()));
        }
        self.sessions.insert(
            session_id.to_owned(),
            Session::new(session_id.to_owned(), sender),
        );
        log::info!("Session {} created by connection {}", session_id, sender);
        Ok(ServerMessage::StartSession(Notice::new(format!(
            "Session {} created",
            session_id
        ))))
    }

    pub fn start_session(
        &self,
        session_id: &str,
        from: ConnectionId,
        outbox: &mut impl Outbox,
    ) -> Result<usize, RelayError> {
        self.session(session_id)?.start(from, outbox)
    }

    pub fn stop_session(
        &mut self,
        session_id: &str,
        from: ConnectionId,
        outbox: &mut impl Outbox,
    ) -> Result<ServerMessage, RelayError> {
        let notified = self.session_mut(session_id)?.stop(from, outbox)?;
        log::info!(
            "Session {} stopped, {} receiver(s) notified",
            session_id,
            notified
        );
        Ok(ServerMessage::StopSession(Notice::new(format!(
            "Session {} stopped",
            session_id
        ))))
    }

    /// Every session id exactly once, in ascending order.
    pub fn list_sessions(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn summaries(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> =
            self.sessions.values().map(Session::summary).collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    pub fn subscribe_to_session(
        &mut self,
        session_id: &str,
        from: ConnectionId,
    ) -> Result<ServerMessage, RelayError> {
        self.session_mut(session_id)?.subscribe(from)?;
        log::info!("Connection {} subscribed to session {}", from, session_id);
        Ok(ServerMessage::Subscribe(Notice::new(format!(
            "Subscribed to session {}",
            session_id
        ))))
    }

    pub fn unsubscribe_from_session(
        &mut self,
        session_id: &str,
        from: ConnectionId,
    ) -> Result<ServerMessage, RelayError> {
        self.session_mut(session_id)?.unsubscribe(from);
        log::info!("Connection {} unsubscribed from session {}", from, session_id);
        Ok(ServerMessage::Unsubscribe(Notice::new(format!(
            "Unsubscribed from session {}",
            session_id
        ))))
    }

    pub fn update_location(
        &self,
        session_id: &str,
        from: ConnectionId,
        location: &Location,
        outbox: &mut impl Outbox,
    ) -> Result<usize, RelayError> {
        self.session(session_id)?
            .update_location(from, location, outbox)
    }

    /// Forgets a closed connection.
    ///
    /// Sessions it was sending are stopped (receivers get `STOP_SESSION`) and
    /// removed; it is dropped from every receiver set. Returns the ids of the
    /// removed sessions.
    pub fn drop_connection(
        &mut self,
        connection_id: ConnectionId,
        outbox: &mut impl Outbox,
    ) -> Vec<SessionId> {
        let mut owned: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|s| s.sender() == connection_id)
            .map(|s| s.id().clone())
            .collect();
        owned.sort();

        for session_id in &owned {
            if let Some(mut session) = self.sessions.remove(session_id) {
                match session.stop(connection_id, outbox) {
                    Ok(notified) => log::info!(
                        "Session {} removed, sender {} disconnected, {} receiver(s) notified",
                        session_id,
                        connection_id,
                        notified
                    ),
                    Err(err) => log::warn!(
                        "Session {} removed without notifying receivers: {}",
                        session_id,
                        err
                    ),
                }
            }
        }

        for session in self.sessions.values_mut() {
            if session.unsubscribe(connection_id) {
                log::info!(
                    "Connection {} left session {} on disconnect",
                    connection_id,
                    session.id()
                );
            }
        }

        owned
    }

    fn session(&self, session_id: &str) -> Result<&Session, RelayError> {
        self.sessions.get(session_id).ok_or_else(|| {
            log::warn!("Session {} not found", session_id);
            RelayError::SessionNotFound(session_id.to_owned())
        })
    }

    fn session_mut(&mut self, session_id: &str) -> Result<&mut Session, RelayError> {
        self.sessions.get_mut(session_id).ok_or_else(|| {
            log::warn!("Session {} not found", session_id);
            RelayError::SessionNotFound(session_id.to_owned())
        })
    }
}
