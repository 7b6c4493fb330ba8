use system::SessionSummary;
use tokio::sync::oneshot::Sender;

#[derive(Debug)]
pub enum AdminCommand {
    ListSessions { tx: Sender<Vec<SessionSummary>> },
}
