use std::time::SystemTime;

use crate::admin::AdminCommand;
use crate::server::{ServerCommand, ServerTx};
use actix_web::error;
use actix_web::web;
use actix_web::Responder;
use actix_web::Result;
use askama_actix::Template;
use system::{ConnectionId, SessionSummary};

pub fn configure_admin_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin").service(
            web::resource("/")
                .name("admin_index")
                .route(web::get().to(admin_index)),
        ),
    );
}

struct SessionRow {
    id: String,
    sender: ConnectionId,
    receivers: usize,
    age_secs: u64,
}

impl SessionRow {
    fn from_summary(summary: SessionSummary, now: SystemTime) -> Self {
        let age_secs = now
            .duration_since(summary.created_at)
            .map(|age| age.as_secs())
            .unwrap_or(0);
        Self {
            id: summary.id,
            sender: summary.sender,
            receivers: summary.receivers,
            age_secs,
        }
    }
}

#[derive(Template)]
#[template(path = "admin-index.html")]
pub struct AdminIndexTemplate {
    sessions: Vec<SessionRow>,
}

pub async fn admin_index(srv_tx: web::Data<ServerTx>) -> Result<impl Responder> {
    let (tx, rx) = tokio::sync::oneshot::channel::<Vec<SessionSummary>>();

    srv_tx
        .get_ref()
        .clone()
        .send(ServerCommand::AdminCommand(AdminCommand::ListSessions { tx }))
        .map_err(|_| error::ErrorInternalServerError("Internal Server Error"))?;

    let summaries = rx
        .await
        .map_err(|_| error::ErrorInternalServerError("Receiver await error"))?;

    let now = SystemTime::now();
    Ok(AdminIndexTemplate {
        sessions: summaries
            .into_iter()
            .map(|summary| SessionRow::from_summary(summary, now))
            .collect(),
    })
}
