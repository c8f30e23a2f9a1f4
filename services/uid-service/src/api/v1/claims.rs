//! Tenant claim API endpoints.
//!
//! Claims grant a principal the `generate` or `register` role on a tenant.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::authz::{self, Role};
use crate::api::error::ApiError;
use crate::api::request_context::RequestContext;
use crate::model::Claim;
use crate::service::ReferenceService;
use crate::state::AppState;

/// Create claim routes, nested under `/v1/tenant/{id}/claim`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_claims))
        .route("/{principal}/{role}", put(grant_claim).delete(revoke_claim))
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub tenant: String,
    pub principal: String,
    pub role: String,
}

impl From<Claim> for ClaimResponse {
    fn from(claim: Claim) -> Self {
        Self {
            tenant: claim.tenant,
            principal: claim.principal,
            role: claim.role.label().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListClaimsResponse {
    pub items: Vec<ClaimResponse>,
}

/// GET /v1/tenant/{id}/claim
async fn list_claims(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(tenant): Path<String>,
) -> Result<Response, ApiError> {
    authz::require(&ctx, Role::Administrator)?;

    let claims = ReferenceService::new(state.store())
        .claims(&tenant)
        .await
        .map_err(|e| ApiError::from_service(e, &ctx.request_id))?;

    let items = claims.into_iter().map(ClaimResponse::from).collect();
    Ok(Json(ListClaimsResponse { items }).into_response())
}

/// PUT /v1/tenant/{id}/claim/{principal}/{role}
///
/// 201 when the claim is new, 200 when it already existed.
async fn grant_claim(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((tenant, principal, role)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    authz::require(&ctx, Role::Administrator)?;

    let created = ReferenceService::new(state.store())
        .grant(&tenant, &principal, &role)
        .await
        .map_err(|e| ApiError::from_service(e, &ctx.request_id))?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let body = ClaimResponse {
        tenant,
        principal,
        role,
    };
    Ok((status, Json(body)).into_response())
}

/// DELETE /v1/tenant/{id}/claim/{principal}/{role}
async fn revoke_claim(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((tenant, principal, role)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    authz::require(&ctx, Role::Administrator)?;

    ReferenceService::new(state.store())
        .revoke(&tenant, &principal, &role)
        .await
        .map_err(|e| ApiError::from_service(e, &ctx.request_id))?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
