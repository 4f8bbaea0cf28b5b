// src/main.rs
// HTTP entry point: serves the simulation API and the browser renderer page.

use actix_files::Files; // Static file service for the renderer page
use actix_web::{middleware, web, App, HttpServer};
use double_pendulum_sim::config::ServerConfig;
use double_pendulum_sim::ui::{self, AppState};
use std::io;
use tracing::info;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = ServerConfig::load().await.map_err(io::Error::other)?;
    let state = web::Data::new(AppState {
        max_steps: config.max_steps,
    });
    let static_dir = config.static_dir.clone();

    info!(
        address = %config.bind_address,
        port = config.port,
        max_steps = config.max_steps,
        "starting double pendulum server"
    );

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(ui::configure)
            .service(Files::new("/", static_dir.clone()).index_file("index.html"))
    })
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await
}
