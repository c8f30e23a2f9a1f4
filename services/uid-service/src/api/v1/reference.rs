//! Reference entity API endpoints.
//!
//! The same handlers serve every [`ReferenceKind`]; the kind is attached to
//! each nested router as an extension.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{ListResponse, PageQuery};
use crate::api::authz::{self, Role};
use crate::api::error::ApiError;
use crate::api::request_context::RequestContext;
use crate::model::{Reference, ReferenceKind};
use crate::service::ReferenceService;
use crate::state::AppState;

const READERS: &[Role] = &[Role::Viewer, Role::Administrator];

/// Create routes for one reference kind.
pub fn routes(kind: ReferenceKind) -> Router<AppState> {
    Router::new()
        .route("/", get(list_references).post(create_reference))
        .route(
            "/{id}",
            get(get_reference)
                .put(update_reference)
                .delete(delete_reference),
        )
        .layer(Extension(kind))
}

#[derive(Debug, Deserialize)]
pub struct CreateReferenceRequest {
    pub id: String,
    pub name: String,
    /// Defaults to true.
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReferenceRequest {
    pub name: String,
    /// Unchanged when absent.
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ReferenceResponse {
    pub id: String,
    pub name: String,
    pub active: bool,
}

impl From<Reference> for ReferenceResponse {
    fn from(reference: Reference) -> Self {
        Self {
            id: reference.id,
            name: reference.name,
            active: reference.active,
        }
    }
}

/// GET /v1/{kind}
async fn list_references(
    State(state): State<AppState>,
    Extension(kind): Extension<ReferenceKind>,
    ctx: RequestContext,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    authz::require_any(&ctx, READERS)?;

    let page = ReferenceService::new(state.store())
        .list(kind, query.window(&state))
        .await
        .map_err(|e| ApiError::from_service(e, &ctx.request_id))?;

    Ok(Json(ListResponse::from_page(page, ReferenceResponse::from)).into_response())
}

/// GET /v1/{kind}/{id}
async fn get_reference(
    State(state): State<AppState>,
    Extension(kind): Extension<ReferenceKind>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    authz::require_any(&ctx, READERS)?;

    let reference = ReferenceService::new(state.store())
        .get(kind, &id)
        .await
        .map_err(|e| ApiError::from_service(e, &ctx.request_id))?;

    Ok(Json(ReferenceResponse::from(reference)).into_response())
}

/// POST /v1/{kind}
async fn create_reference(
    State(state): State<AppState>,
    Extension(kind): Extension<ReferenceKind>,
    ctx: RequestContext,
    Json(req): Json<CreateReferenceRequest>,
) -> Result<Response, ApiError> {
    authz::require(&ctx, Role::Administrator)?;

    let reference = Reference {
        kind,
        id: req.id,
        name: req.name,
        active: req.active.unwrap_or(true),
    };
    let reference = ReferenceService::new(state.store())
        .create(reference)
        .await
        .map_err(|e| ApiError::from_service(e, &ctx.request_id))?;

    Ok((StatusCode::CREATED, Json(ReferenceResponse::from(reference))).into_response())
}

/// PUT /v1/{kind}/{id}
async fn update_reference(
    State(state): State<AppState>,
    Extension(kind): Extension<ReferenceKind>,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateReferenceRequest>,
) -> Result<Response, ApiError> {
    authz::require(&ctx, Role::Administrator)?;

    let service = ReferenceService::new(state.store());
    let result = async {
        let current = service.get(kind, &id).await?;
        service
            .update(Reference {
                name: req.name,
                active: req.active.unwrap_or(current.active),
                ..current
            })
            .await
    }
    .await;
    let reference = result.map_err(|e| ApiError::from_service(e, &ctx.request_id))?;

    Ok(Json(ReferenceResponse::from(reference)).into_response())
}

/// DELETE /v1/{kind}/{id}
async fn delete_reference(
    State(state): State<AppState>,
    Extension(kind): Extension<ReferenceKind>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    authz::require(&ctx, Role::Administrator)?;

    ReferenceService::new(state.store())
        .delete(kind, &id)
        .await
        .map_err(|e| ApiError::from_service(e, &ctx.request_id))?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
