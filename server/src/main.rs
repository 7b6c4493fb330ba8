use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use actix_web::{App, HttpServer};
use clap::Parser;

use server::config::Config;
use server::connection::ConnectionIdSource;
use server::handlers;
use server::server::spawn_server;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    let srv_tx = spawn_server();
    let connection_ids: ConnectionIdSource = Arc::new(AtomicU32::new(1));
    let bind_address = config.bind_address();

    log::info!("Location relay listening on {}", bind_address);
    HttpServer::new(move || {
        App::new()
            .data(srv_tx.clone())
            .data(connection_ids.clone())
            .data(config.clone())
            .configure(handlers::root)
    })
    .bind(bind_address)?
    .run()
    .await
}
