//! Web server for bracket tournaments: JSON API via REST.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default. Override with env: HOST, PORT.
//! Formation timeouts and the bracket canvas size are also read from the env (see `Config`).

use actix_web::{web::Data, App, HttpServer};
use bracket_tourney::api::{configure, AppData};
use bracket_tourney::{Config, LogNotifier, MemoryStore, TournamentService};
use chrono::Utc;
use std::time::Duration;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();
    log::info!("Starting server at http://{}:{}", config.host, config.port);

    let state = Data::new(AppData {
        service: TournamentService::new(MemoryStore::new(), LogNotifier, &config),
        bounds: config.bracket_bounds(),
    });

    // Background task: expire unanswered formations and invites, drop old closed ones
    let state_sweep = state.clone();
    let every = Duration::from_secs(config.sweep_interval_secs);
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match state_sweep.service.sweep(Utc::now()) {
                Ok(report) if report.expired + report.invites_expired > 0 => log::info!(
                    "Expired {} unanswered team formation(s) and {} invite(s)",
                    report.expired,
                    report.invites_expired
                ),
                Ok(_) => {}
                Err(e) => log::warn!("Formation sweep failed: {}", e),
            }
        }
    });

    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind((config.host.as_str(), config.port))?
        .run()
        .await
}
