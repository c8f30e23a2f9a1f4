//! Role gating.
//!
//! Roles gate whole operations. Outside dev mode they are derived from
//! stored state by [`resolve_roles`]; tenant scoping is a separate, finer
//! check done by the service layer against claims.

use std::collections::BTreeSet;
use std::fmt;

use crate::api::error::ApiError;
use crate::api::request_context::RequestContext;
use crate::model::ClaimRole;
use crate::state::AppState;
use crate::store::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Generate,
    Register,
    Viewer,
    Administrator,
}

/// Any role that may read Surrogates.
pub const READERS: &[Role] = &[Role::Viewer, Role::Generate, Role::Register, Role::Administrator];

pub fn parse_role(role: &str) -> Option<Role> {
    match role {
        "generate" => Some(Role::Generate),
        "register" => Some(Role::Register),
        "viewer" => Some(Role::Viewer),
        "administrator" => Some(Role::Administrator),
        _ => None,
    }
}

pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::Generate => "generate",
        Role::Register => "register",
        Role::Viewer => "viewer",
        Role::Administrator => "administrator",
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(role_label(*self))
    }
}

/// Roles held by `principal`.
///
/// Every authenticated principal may view. `generate` and `register` follow
/// from holding a claim of that role on some tenant; `administrator` is
/// granted by configuration only.
pub async fn resolve_roles(state: &AppState, principal: &str) -> Result<BTreeSet<Role>, DbError> {
    let mut roles = BTreeSet::from([Role::Viewer]);
    if state.is_administrator(principal) {
        roles.insert(Role::Administrator);
    }
    for claim in state.store().claims_for_principal(principal).await? {
        roles.insert(match claim.role {
            ClaimRole::Generate => Role::Generate,
            ClaimRole::Register => Role::Register,
        });
    }
    Ok(roles)
}

/// Returns the caller's principal, or 401 for anonymous requests.
pub fn require_authenticated(ctx: &RequestContext) -> Result<&str, ApiError> {
    ctx.principal.as_deref().ok_or_else(|| {
        ApiError::unauthorized("unauthorized", "Missing or invalid Authorization token")
            .with_request_id(ctx.request_id.clone())
    })
}

/// Requires `role`; returns the caller's principal.
pub fn require(ctx: &RequestContext, role: Role) -> Result<&str, ApiError> {
    require_any(ctx, &[role])
}

/// Requires at least one of `roles`; returns the caller's principal.
pub fn require_any<'a>(ctx: &'a RequestContext, roles: &[Role]) -> Result<&'a str, ApiError> {
    let principal = require_authenticated(ctx)?;

    if roles.iter().any(|role| ctx.roles.contains(role)) {
        return Ok(principal);
    }

    let wanted = roles
        .iter()
        .map(|r| role_label(*r))
        .collect::<Vec<_>>()
        .join(" or ");
    Err(
        ApiError::forbidden("forbidden", format!("Role {wanted} required for this operation"))
            .with_request_id(ctx.request_id.clone()),
    )
}
