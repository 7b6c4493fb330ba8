use std::collections::HashSet;
use std::time::SystemTime;

use crate::error::RelayError;
use crate::message::{ConnectionId, Location, Notice, ServerMessage, SessionId};
use crate::outbox::Outbox;

/// One sender broadcasting to any number of receivers.
///
/// The sender is fixed at construction and can never be a receiver of its
/// own session.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    sender: ConnectionId,
    receivers: HashSet<ConnectionId>,
    created_at: SystemTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub sender: ConnectionId,
    pub receivers: usize,
    pub created_at: SystemTime,
}

impl Session {
    pub fn new(id: SessionId, sender: ConnectionId) -> Self {
        Self {
            id,
            sender,
            receivers: HashSet::new(),
            created_at: SystemTime::now(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn sender(&self) -> ConnectionId {
        self.sender
    }

    pub fn receivers(&self) -> impl Iterator<Item = &ConnectionId> {
        self.receivers.iter()
    }

    pub fn is_receiver(&self, connection_id: &ConnectionId) -> bool {
        self.receivers.contains(connection_id)
    }

    pub fn receiver_count(&self) -> usize {
        self.receivers.len()
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            sender: self.sender,
            receivers: self.receivers.len(),
            created_at: self.created_at,
        }
    }

    /// Announces the session to its receivers.
    pub fn start(&self, from: ConnectionId, outbox: &mut impl Outbox) -> Result<usize, RelayError> {
        self.ensure_sender(from, "start the session")?;
        if self.receivers.is_empty() {
            self.warn_no_subscribers(outbox);
            return Ok(0);
        }
        Ok(self.broadcast(
            ServerMessage::StartSession(Notice::new("Session started")),
            outbox,
        ))
    }

    pub fn update_location(
        &self,
        from: ConnectionId,
        location: &Location,
        outbox: &mut impl Outbox,
    ) -> Result<usize, RelayError> {
        self.ensure_sender(from, "update the location")?;
        if self.receivers.is_empty() {
            self.warn_no_subscribers(outbox);
            return Ok(0);
        }
        Ok(self.broadcast(ServerMessage::UpdateLocation(location.clone()), outbox))
    }

    /// Tells every receiver the session ended and drops them all.
    pub fn stop(&mut self, from: ConnectionId, outbox: &mut impl Outbox) -> Result<usize, RelayError> {
        self.ensure_sender(from, "stop the session")?;
        if self.receivers.is_empty() {
            return Ok(0);
        }
        let delivered = self.broadcast(
            ServerMessage::StopSession(Notice::new("Session ended")),
            outbox,
        );
        self.receivers.clear();
        Ok(delivered)
    }

    /// Returns whether `from` was newly added.
    pub fn subscribe(&mut self, from: ConnectionId) -> Result<bool, RelayError> {
        if from == self.sender {
            log::warn!(
                "Connection {} tried to subscribe to its own session {}",
                from,
                self.id
            );
            return Err(RelayError::SelfSubscriptionRejected);
        }
        Ok(self.receivers.insert(from))
    }

    /// Returns whether `from` was subscribed.
    pub fn unsubscribe(&mut self, from: ConnectionId) -> bool {
        self.receivers.remove(&from)
    }

    fn ensure_sender(&self, from: ConnectionId, action: &'static str) -> Result<(), RelayError> {
        if from == self.sender {
            Ok(())
        } else {
            log::warn!(
                "Connection {} is not the sender of session {}, cannot {}",
                from,
                self.id,
                action
            );
            Err(RelayError::NotSender(action))
        }
    }

    fn warn_no_subscribers(&self, outbox: &mut impl Outbox) {
        let warning = ServerMessage::error(&RelayError::NoSubscribers);
        if let Err(err) = outbox.send(self.sender, warning) {
            log::warn!("Failed to warn sender {}: {}", self.sender, err);
        }
    }

    fn broadcast(&self, message: ServerMessage, outbox: &mut impl Outbox) -> usize {
        let mut delivered = 0;
        for receiver in &self.receivers {
            match outbox.send(*receiver, message.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => log::warn!(
                    "Dropped message to receiver {} of session {}: {}",
                    receiver,
                    self.id,
                    err
                ),
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeliveryError;
    use crate::outbox::Delivery;

    const SENDER: ConnectionId = 1;

    fn location() -> Location {
        Location::new("1.0", "2.0")
    }

    fn no_subscriber() -> ServerMessage {
        ServerMessage::Error(Notice::new("No subscriber!"))
    }

    #[test]
    fn it_warns_sender_when_nobody_listens() {
        let session = Session::new("s".into(), SENDER);
        let mut outbox: Vec<Delivery> = Vec::new();

        assert_eq!(session.start(SENDER, &mut outbox), Ok(0));
        assert_eq!(session.update_location(SENDER, &location(), &mut outbox), Ok(0));

        assert_eq!(
            outbox,
            vec![
                Delivery { to: SENDER, message: no_subscriber() },
                Delivery { to: SENDER, message: no_subscriber() },
            ]
        );
    }

    #[test]
    fn it_rejects_non_sender_broadcasts() {
        let mut session = Session::new("s".into(), SENDER);
        session.subscribe(2).expect("");
        let mut outbox: Vec<Delivery> = Vec::new();

        assert!(matches!(session.start(2, &mut outbox), Err(RelayError::NotSender(_))));
        assert!(matches!(
            session.update_location(2, &location(), &mut outbox),
            Err(RelayError::NotSender(_))
        ));
        assert!(matches!(session.stop(3, &mut outbox), Err(RelayError::NotSender(_))));

        assert!(outbox.is_empty());
        assert!(session.is_receiver(&2));
    }

    #[test]
    fn it_broadcasts_start_to_receivers() {
        let mut session = Session::new("s".into(), SENDER);
        session.subscribe(2).expect("");
        let mut outbox: Vec<Delivery> = Vec::new();

        assert_eq!(session.start(SENDER, &mut outbox), Ok(1));
        assert_eq!(
            outbox,
            vec![Delivery {
                to: 2,
                message: ServerMessage::StartSession(Notice::new("Session started")),
            }]
        );
    }

    #[test]
    fn it_stops_and_clears_receivers() {
        let mut session = Session::new("s".into(), SENDER);
        session.subscribe(2).expect("");
        session.subscribe(3).expect("");
        let mut outbox: Vec<Delivery> = Vec::new();

        assert_eq!(session.stop(SENDER, &mut outbox), Ok(2));
        assert_eq!(session.receiver_count(), 0);
        assert!(outbox
            .iter()
            .all(|d| d.message == ServerMessage::StopSession(Notice::new("Session ended"))));

        outbox.clear();
        assert_eq!(session.update_location(SENDER, &location(), &mut outbox), Ok(0));
        assert_eq!(outbox, vec![Delivery { to: SENDER, message: no_subscriber() }]);
    }

    #[test]
    fn it_stops_silently_without_receivers() {
        let mut session = Session::new("s".into(), SENDER);
        let mut outbox: Vec<Delivery> = Vec::new();
        assert_eq!(session.stop(SENDER, &mut outbox), Ok(0));
        assert!(outbox.is_empty());
    }

    #[test]
    fn it_rejects_self_subscription() {
        let mut session = Session::new("s".into(), SENDER);
        assert_eq!(
            session.subscribe(SENDER),
            Err(RelayError::SelfSubscriptionRejected)
        );
        assert!(!session.is_receiver(&SENDER));
    }

    #[test]
    fn it_keeps_membership_idempotent() {
        let mut session = Session::new("s".into(), SENDER);
        assert_eq!(session.subscribe(2), Ok(true));
        assert_eq!(session.subscribe(2), Ok(false));
        assert_eq!(session.receiver_count(), 1);

        assert!(session.unsubscribe(2));
        assert!(!session.unsubscribe(2));
        assert!(!session.is_receiver(&2));

        session.subscribe(2).expect("");
        assert!(session.is_receiver(&2));
    }

    struct FlakyOutbox {
        dead: ConnectionId,
        sent: Vec<ConnectionId>,
    }

    impl Outbox for FlakyOutbox {
        fn send(&mut self, to: ConnectionId, _: ServerMessage) -> Result<(), DeliveryError> {
            if to == self.dead {
                Err(DeliveryError::Closed)
            } else {
                self.sent.push(to);
                Ok(())
            }
        }
    }

    #[test]
    fn it_keeps_broadcasting_past_dead_receivers() {
        let mut session = Session::new("s".into(), SENDER);
        for receiver in 2..6 {
            session.subscribe(receiver).expect("");
        }
        let mut outbox = FlakyOutbox {
            dead: 3,
            sent: Vec::new(),
        };

        assert_eq!(session.update_location(SENDER, &location(), &mut outbox), Ok(3));
        outbox.sent.sort();
        assert_eq!(outbox.sent, vec![2, 4, 5]);
    }
}
