//! HTTP handler functions for the community map API.

use actix_web::{HttpResponse, web};
use community_map_pipeline::PipelineError;
use community_map_server_models::{ApiDashboard, ApiError, ApiHealth, ApiSource, DashboardQueryParams};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/communities`
///
/// Returns every community name, sorted, for the community selector.
pub async fn communities(state: web::Data<AppState>) -> HttpResponse {
    match state.pipeline.communities().await {
        Ok(communities) => {
            let names: Vec<String> = communities.into_iter().map(|c| c.name).collect();
            HttpResponse::Ok().json(names)
        }
        Err(e) => pipeline_error("load communities", &e),
    }
}

/// `GET /api/sources`
///
/// Lists the configured permit datasets with their portal pages.
pub async fn sources(state: web::Data<AppState>) -> HttpResponse {
    let domain = &state.pipeline.config().domain;
    let sources: Vec<ApiSource> = state
        .pipeline
        .datasets()
        .iter()
        .map(|dataset| ApiSource::new(dataset, domain))
        .collect();

    HttpResponse::Ok().json(sources)
}

/// `GET /api/dashboard?community=<name>`
///
/// Runs the pipeline for the requested community. Unknown names fall back
/// to the default community with a warning rather than failing.
pub async fn dashboard(
    state: web::Data<AppState>,
    params: web::Query<DashboardQueryParams>,
) -> HttpResponse {
    match state.pipeline.run(params.community.as_deref()).await {
        Ok(dashboard) => HttpResponse::Ok().json(ApiDashboard::from(dashboard)),
        Err(e) => pipeline_error("build dashboard", &e),
    }
}

/// Upstream failures surface as `502 Bad Gateway`; details stay in the log.
fn pipeline_error(action: &str, e: &PipelineError) -> HttpResponse {
    log::error!("Failed to {action}: {e}");

    let body = ApiError {
        error: format!("Failed to {action}"),
    };
    match e {
        PipelineError::Source(_) | PipelineError::Geography(_) => {
            HttpResponse::BadGateway().json(body)
        }
        PipelineError::Config { .. } => HttpResponse::InternalServerError().json(body),
    }
}
