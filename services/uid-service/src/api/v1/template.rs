//! Request-template descriptor endpoints.
//!
//! Serves the descriptor loaded at startup from `UID_TEMPLATE_PATH`.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use uid_template::Configuration;

use crate::api::authz::{self, Role};
use crate::api::error::ApiError;
use crate::api::request_context::RequestContext;
use crate::state::AppState;

const READERS: &[Role] = &[Role::Viewer, Role::Administrator];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_configuration))
        .route("/{environment}", get(get_environment))
        .route("/{environment}/{template}", get(get_template))
}

fn configuration<'a>(
    state: &'a AppState,
    ctx: &RequestContext,
) -> Result<&'a Configuration, ApiError> {
    state.templates().ok_or_else(|| {
        ApiError::not_found("not_found", "No request-template descriptor is configured")
            .with_request_id(ctx.request_id.clone())
    })
}

/// GET /v1/template
async fn get_configuration(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Response, ApiError> {
    authz::require_any(&ctx, READERS)?;
    let configuration = configuration(&state, &ctx)?;
    Ok(Json(configuration).into_response())
}

/// GET /v1/template/{environment}
async fn get_environment(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(environment): Path<String>,
) -> Result<Response, ApiError> {
    authz::require_any(&ctx, READERS)?;

    let found = configuration(&state, &ctx)?
        .environment(&environment)
        .ok_or_else(|| {
            ApiError::not_found("not_found", format!("environment '{environment}' not found"))
                .with_request_id(ctx.request_id.clone())
        })?;
    Ok(Json(found).into_response())
}

/// GET /v1/template/{environment}/{template}
async fn get_template(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((environment, template)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    authz::require_any(&ctx, READERS)?;

    let found = configuration(&state, &ctx)?
        .environment(&environment)
        .and_then(|e| e.template(&template))
        .ok_or_else(|| {
            ApiError::not_found(
                "not_found",
                format!("template '{environment}/{template}' not found"),
            )
            .with_request_id(ctx.request_id.clone())
        })?;
    Ok(Json(found).into_response())
}
