//! Surrogate API endpoints.
//!
//! Provides listing, lookup, generation, registration and soft deletion of
//! Surrogate identifiers.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ListResponse;
use crate::api::authz::{self, Role};
use crate::api::error::ApiError;
use crate::api::request_context::RequestContext;
use crate::model::Surrogate;
use crate::service::{Draft, SurrogateService};
use crate::state::AppState;

/// Create uid routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_uids).post(generate_uid).put(register_uid))
        .route("/{uid}", get(get_uid).delete(delete_uid))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUidsQuery {
    /// Filter expression, e.g. `tenant eq "A-36-0-P1"`.
    pub filter: Option<String>,
    pub start_index: Option<u64>,
    pub count: Option<u64>,
}

/// Request to register a caller-built identifier.
#[derive(Debug, Deserialize)]
pub struct RegisterUidRequest {
    pub uid: Option<String>,
}

/// Response for a single Surrogate.
#[derive(Debug, Serialize)]
pub struct UidResponse {
    /// Full identifier.
    pub uid: String,
    pub tenant: String,
    pub ptt: String,
    pub cid: String,
    pub sid: String,
    pub pts: String,
    pub tid: String,
    pub eid: String,
    /// `GENERATED`, `REGISTERED` or `0`.
    pub state: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

impl From<Surrogate> for UidResponse {
    fn from(surrogate: Surrogate) -> Self {
        let uid = surrogate.key().to_string();
        let tenant = surrogate.tenant();
        let s = surrogate.segments;
        Self {
            uid,
            tenant,
            ptt: s.ptt,
            cid: s.cid,
            sid: s.sid,
            pts: s.pts,
            tid: s.tid,
            eid: s.eid,
            state: surrogate.state.code().to_string(),
            created_by: surrogate.created_by,
            created_at: surrogate.created_at,
            updated_by: surrogate.updated_by,
            updated_at: surrogate.updated_at,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// List Surrogates visible to the caller.
///
/// GET /v1/uid?filter=&startIndex=&count=
async fn list_uids(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<ListUidsQuery>,
) -> Result<Response, ApiError> {
    let principal = authz::require_any(&ctx, authz::READERS)?;

    let window = super::PageQuery {
        start_index: query.start_index,
        count: query.count,
    }
    .window(&state);

    let page = SurrogateService::new(state.store(), state.generator(), principal)
        .list(query.filter.as_deref(), window)
        .await
        .map_err(|e| ApiError::from_service(e, &ctx.request_id))?;

    Ok(Json(ListResponse::from_page(page, UidResponse::from)).into_response())
}

/// Get a Surrogate by identifier.
///
/// GET /v1/uid/{uid}
async fn get_uid(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(uid): Path<String>,
) -> Result<Response, ApiError> {
    let principal = authz::require_any(&ctx, authz::READERS)?;

    let surrogate = SurrogateService::new(state.store(), state.generator(), principal)
        .lookup(&uid)
        .await
        .map_err(|e| ApiError::from_service(e, &ctx.request_id))?;

    Ok(Json(UidResponse::from(surrogate)).into_response())
}

/// Generate a Surrogate.
///
/// POST /v1/uid
async fn generate_uid(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(draft): Json<Draft>,
) -> Result<Response, ApiError> {
    let principal = authz::require(&ctx, Role::Generate)?;

    let surrogate = SurrogateService::new(state.store(), state.generator(), principal)
        .generate(draft)
        .await
        .map_err(|e| ApiError::from_service(e, &ctx.request_id))?;

    Ok(created(surrogate))
}

/// Register a caller-built Surrogate.
///
/// PUT /v1/uid
async fn register_uid(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(req): Json<RegisterUidRequest>,
) -> Result<Response, ApiError> {
    let principal = authz::require(&ctx, Role::Register)?;

    let surrogate = SurrogateService::new(state.store(), state.generator(), principal)
        .register(req.uid.as_deref())
        .await
        .map_err(|e| ApiError::from_service(e, &ctx.request_id))?;

    Ok(created(surrogate))
}

/// Deactivate a Surrogate. Irreversible.
///
/// DELETE /v1/uid/{uid}
async fn delete_uid(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(uid): Path<String>,
) -> Result<Response, ApiError> {
    let principal = authz::require(&ctx, Role::Administrator)?;

    SurrogateService::new(state.store(), state.generator(), principal)
        .delete(&uid)
        .await
        .map_err(|e| ApiError::from_service(e, &ctx.request_id))?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

fn created(surrogate: Surrogate) -> Response {
    let body = UidResponse::from(surrogate);
    let location = format!("/v1/uid/{}", body.uid);
    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(body),
    )
        .into_response()
}
