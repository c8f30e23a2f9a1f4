use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uid_service::{
    api,
    generator::RandomGenerator,
    model::{Claim, ClaimRole, Reference, ReferenceKind},
    state::{AppState, Settings},
    store::{MemoryStore, Store},
};

const TENANT: &str = "A-36-0-P1";
const ALICE: &str = "Bearer alice:viewer,generate,register,administrator";

async fn seeded_router() -> Router {
    let settings = Settings {
        dev_mode: true,
        ..Settings::default()
    };
    seeded_router_with(settings).await
}

async fn seeded_router_with(settings: Settings) -> Router {
    let store = MemoryStore::new();
    for (kind, id) in [
        (ReferenceKind::ParticipantType, "A"),
        (ReferenceKind::Country, "36"),
        (ReferenceKind::State, "0"),
        (ReferenceKind::Participant, "P1"),
        (ReferenceKind::AccountType, "101"),
        (ReferenceKind::Tenant, TENANT),
    ] {
        store
            .insert_reference(&Reference {
                kind,
                id: id.to_string(),
                name: format!("{kind} {id}"),
                active: true,
            })
            .await
            .unwrap();
    }
    for role in [ClaimRole::Generate, ClaimRole::Register] {
        store
            .grant_claim(&Claim {
                tenant: TENANT.to_string(),
                principal: "alice".to_string(),
                role,
            })
            .await
            .unwrap();
    }

    let state = AppState::with_settings(
        Arc::new(store),
        Arc::new(RandomGenerator::default()),
        settings,
    );
    api::create_router(state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn draft() -> Value {
    json!({ "ptt": "A", "cid": "36", "sid": "0", "pts": "P1", "tid": "101" })
}

#[tokio::test]
async fn generate_then_lookup() {
    let app = seeded_router().await;

    let response = send(&app, "POST", "/v1/uid", Some(ALICE), Some(draft())).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()[header::LOCATION]
        .to_str()
        .unwrap()
        .to_string();
    let body = json_body(response).await;

    let uid = body["uid"].as_str().unwrap().to_string();
    assert!(uid.starts_with("A-36-0-P1-101-"));
    assert_eq!(body["tenant"], TENANT);
    assert_eq!(body["state"], "GENERATED");
    assert_eq!(body["eid"].as_str().unwrap().len(), 11);
    assert_eq!(location, format!("/v1/uid/{uid}"));

    let response = send(&app, "GET", &location, Some("Bearer alice:viewer"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["uid"], uid.as_str());
}

#[tokio::test]
async fn register_rejects_separator_in_external_id() {
    let app = seeded_router().await;

    let response = send(
        &app,
        "PUT",
        "/v1/uid",
        Some(ALICE),
        Some(json!({ "uid": "A-36-0-P1-101-E-1234" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/problem+json"
    );

    let body = json_body(response).await;
    assert_eq!(body["code"], "invalidValue");
    assert_eq!(body["details"][0]["field"], "eid");
}

#[tokio::test]
async fn register_then_duplicate_conflicts() {
    let app = seeded_router().await;
    let uid = json!({ "uid": "A-36-0-P1-101-E1234" });

    let response = send(&app, "PUT", "/v1/uid", Some(ALICE), Some(uid.clone())).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["state"], "REGISTERED");

    let response = send(&app, "PUT", "/v1/uid", Some(ALICE), Some(uid)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["code"], "uniqueness");
}

#[tokio::test]
async fn lookup_rejects_short_identifier() {
    let app = seeded_router().await;

    let response = send(&app, "GET", "/v1/uid/A-36-0", Some(ALICE), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "invalidValue");
}

#[tokio::test]
async fn lookup_of_unknown_identifier_is_not_found() {
    let app = seeded_router().await;

    let response = send(&app, "GET", "/v1/uid/A-36-0-P1-101-NOPE1", Some(ALICE), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn filter_on_foreign_tenant_is_forbidden() {
    let app = seeded_router().await;

    let uri = "/v1/uid?filter=tenant%20eq%20%22B-1-0-P2%22";
    let response = send(&app, "GET", uri, Some(ALICE), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["code"], "forbidden");
}

#[tokio::test]
async fn filter_with_tenant_inequality_is_invalid() {
    let app = seeded_router().await;

    let uri = "/v1/uid?filter=tenant%20ne%20%22A-36-0-P1%22";
    let response = send(&app, "GET", uri, Some(ALICE), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "invalidFilter");
}

#[tokio::test]
async fn list_pages_through_results() {
    let app = seeded_router().await;
    for _ in 0..3 {
        let response = send(&app, "POST", "/v1/uid", Some(ALICE), Some(draft())).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = send(&app, "GET", "/v1/uid?count=2", Some(ALICE), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["count"], 2);
    assert_eq!(body["start_index"], 1);

    let response = send(&app, "GET", "/v1/uid?startIndex=3&count=2", Some(ALICE), None).await;
    let body = json_body(response).await;
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn delete_is_one_way() {
    let app = seeded_router().await;

    let response = send(&app, "POST", "/v1/uid", Some(ALICE), Some(draft())).await;
    let uid = json_body(response).await["uid"]
        .as_str()
        .unwrap()
        .to_string();
    let path = format!("/v1/uid/{uid}");

    let response = send(&app, "DELETE", &path, Some(ALICE), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, "GET", &path, Some(ALICE), None).await;
    assert_eq!(json_body(response).await["state"], "0");

    let response = send(&app, "DELETE", &path, Some(ALICE), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "mutability");
}

#[tokio::test]
async fn anonymous_requests_are_unauthorized() {
    let app = seeded_router().await;

    let response = send(&app, "GET", "/v1/uid", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, "GET", "/v1/uid", Some("Basic YWxpY2U6"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["code"], "invalid_authorization");
}

#[tokio::test]
async fn missing_role_is_forbidden() {
    let app = seeded_router().await;

    let response = send(&app, "POST", "/v1/uid", Some("Bearer alice:viewer"), Some(draft())).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn generate_without_tenant_claim_is_forbidden() {
    let app = seeded_router().await;

    let response = send(&app, "POST", "/v1/uid", Some("Bearer bob:generate"), Some(draft())).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_endpoints_need_no_auth() {
    let app = seeded_router().await;

    for path in ["/healthz", "/livez", "/readyz"] {
        let response = send(&app, "GET", path, None, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
async fn reference_lifecycle() {
    let app = seeded_router().await;
    let admin = Some("Bearer root:administrator");

    let body = json!({ "id": "840", "name": "United States" });
    let response = send(&app, "POST", "/v1/country", admin, Some(body.clone())).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(&app, "POST", "/v1/country", admin, Some(body)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(
        &app,
        "PUT",
        "/v1/country/840",
        admin,
        Some(json!({ "name": "USA", "active": false })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], "USA");
    assert_eq!(body["active"], false);

    let response = send(&app, "GET", "/v1/country", Some("Bearer viewer:viewer"), None).await;
    assert_eq!(json_body(response).await["total"], 2);

    let response = send(&app, "DELETE", "/v1/country/840", admin, None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, "GET", "/v1/country/840", admin, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reference_with_bad_id_is_rejected() {
    let app = seeded_router().await;

    let response = send(
        &app,
        "POST",
        "/v1/country",
        Some("Bearer root:administrator"),
        Some(json!({ "id": "USA", "name": "United States" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["details"][0]["field"], "cid");
}

#[tokio::test]
async fn claims_are_administered_per_tenant() {
    let app = seeded_router().await;
    let admin = Some("Bearer root:administrator");
    let path = format!("/v1/tenant/{TENANT}/claim/bob/generate");

    let response = send(&app, "PUT", &path, admin, None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = send(&app, "PUT", &path, admin, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    // bob can now generate
    let response = send(&app, "POST", "/v1/uid", Some("Bearer bob:generate"), Some(draft())).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(&app, "GET", &format!("/v1/tenant/{TENANT}/claim"), admin, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let items = json_body(response).await["items"].as_array().unwrap().len();
    assert_eq!(items, 3);

    let response = send(&app, "DELETE", &path, admin, None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = send(&app, "DELETE", &path, admin, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, "PUT", &format!("/v1/tenant/{TENANT}/claim/bob/viewer"), admin, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, "GET", "/v1/tenant/Z-1-0-ZZ/claim", admin, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn templates_are_not_found_when_unconfigured() {
    let app = seeded_router().await;

    let response = send(&app, "GET", "/v1/template", Some("Bearer v:viewer"), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["code"], "not_found");
}

async fn production_router() -> Router {
    let settings = Settings {
        administrators: BTreeSet::from(["root".to_string()]),
        ..Settings::default()
    };
    seeded_router_with(settings).await
}

#[tokio::test]
async fn declared_roles_are_rejected_outside_dev_mode() {
    let app = production_router().await;
    let path = format!("/v1/tenant/{TENANT}/claim/mallory/generate");

    let response = send(&app, "PUT", &path, Some("Bearer mallory:administrator"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["code"], "invalid_token");

    let response = send(&app, "PUT", &path, Some("Bearer mallory"), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, "POST", "/v1/uid", Some("Bearer mallory"), Some(draft())).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn roles_follow_claims_and_configured_administrators() {
    let app = production_router().await;

    let response = send(&app, "POST", "/v1/uid", Some("Bearer alice"), Some(draft())).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(&app, "GET", "/v1/uid", Some("Bearer alice"), None).await;
    assert_eq!(json_body(response).await["total"], 1);

    // alice holds claims but is not an administrator
    let path = format!("/v1/tenant/{TENANT}/claim/bob/generate");
    let response = send(&app, "PUT", &path, Some("Bearer alice"), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, "PUT", &path, Some("Bearer root"), None).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(&app, "POST", "/v1/uid", Some("Bearer bob"), Some(draft())).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}
