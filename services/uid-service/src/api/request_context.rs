//! Request-scoped context extracted from HTTP requests.

use std::collections::BTreeSet;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use uuid::Uuid;

use crate::api::authz::{parse_role, resolve_roles, Role};
use crate::api::error::ApiError;
use crate::state::AppState;

pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    /// None for anonymous requests.
    pub principal: Option<String>,
    pub roles: BTreeSet<Role>,
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Caller named by the `Authorization` header.
#[derive(Debug, PartialEq)]
struct Caller {
    principal: String,
    /// Roles listed in the token itself; honoured only in dev mode.
    declared: Option<BTreeSet<Role>>,
}

/// Reads the caller from `Authorization: Bearer <principal>[:<role>,<role>...]`.
///
/// Dev stub: the principal is trusted as given. A real deployment puts an
/// authenticating proxy in front that rewrites the header.
fn caller_from_authorization_header(
    headers: &HeaderMap,
    request_id: &str,
) -> Result<Option<Caller>, ApiError> {
    let Some(auth_value) = header_string(headers, AUTHORIZATION_HEADER) else {
        return Ok(None);
    };

    let invalid = |message: &str| {
        ApiError::unauthorized("invalid_token", message).with_request_id(request_id.to_string())
    };

    let Some(token) = auth_value.trim().strip_prefix("Bearer ") else {
        return Err(ApiError::unauthorized(
            "invalid_authorization",
            "Authorization must be a Bearer token",
        )
        .with_request_id(request_id.to_string()));
    };

    let (principal, roles) = match token.trim().split_once(':') {
        Some((principal, roles)) => (principal.trim(), Some(roles)),
        None => (token.trim(), None),
    };
    if principal.is_empty() {
        return Err(invalid("Bearer token must name a principal"));
    }

    let declared = match roles {
        Some(roles) => {
            let mut granted = BTreeSet::new();
            for label in roles.split(',').map(str::trim).filter(|r| !r.is_empty()) {
                let Some(role) = parse_role(label) else {
                    return Err(invalid(&format!("unknown role '{label}'")));
                };
                granted.insert(role);
            }
            Some(granted)
        }
        None => None,
    };

    Ok(Some(Caller {
        principal: principal.to_string(),
        declared,
    }))
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let request_id = header_string(&parts.headers, REQUEST_ID_HEADER)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let Some(caller) = caller_from_authorization_header(&parts.headers, &request_id)? else {
            return Ok(Self {
                request_id,
                principal: None,
                roles: BTreeSet::new(),
            });
        };

        let roles = match caller.declared {
            Some(declared) if state.dev_mode() => declared,
            Some(_) => {
                return Err(ApiError::unauthorized(
                    "invalid_token",
                    "Role lists in Bearer tokens are accepted only in dev mode",
                )
                .with_request_id(request_id));
            }
            None => resolve_roles(state, &caller.principal)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, request_id = %request_id, "Failed to resolve roles");
                    ApiError::internal("internal_error", "Failed to resolve caller roles")
                        .with_request_id(request_id.clone())
                })?,
        };

        Ok(Self {
            request_id,
            principal: Some(caller.principal),
            roles,
        })
    }
}
