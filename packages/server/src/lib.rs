#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the community development map.
//!
//! Serves the dashboard (map layers plus the unified permit table) for a
//! single community, along with the community list and dataset
//! attribution. All data is fetched live from the open-data portal
//! through a memoized [`Pipeline`].

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use community_map_pipeline::Pipeline;
use community_map_pipeline::config::PipelineConfig;

/// Shared application state.
pub struct AppState {
    /// The pipeline behind every data endpoint.
    pub pipeline: Arc<Pipeline>,
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/communities", web::get().to(handlers::communities))
            .route("/sources", web::get().to(handlers::sources))
            .route("/dashboard", web::get().to(handlers::dashboard)),
    );
}

/// Starts the community map API server.
///
/// Reads [`PipelineConfig`] from the environment, builds the production
/// pipeline, and serves on `BIND_ADDR:PORT` (default `127.0.0.1:8080`).
/// The caller provides the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the configuration is invalid or
/// the HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let config = PipelineConfig::from_env().map_err(std::io::Error::other)?;

    log::info!(
        "Serving permits from {} (default community {})",
        config.domain,
        config.default_community
    );

    let state = web::Data::new(AppState {
        pipeline: Arc::new(Pipeline::from_config(config)),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
