/// Access gate tests over the full router
///
/// Every request here is answered by the gate or by a handler that never
/// touches the database, so no PostgreSQL is needed.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::Utc;
use common::TestContext;
use fleetdesk_shared::integrations::webhook::{
    WebhookVerifier, HEADER_ID, HEADER_SIGNATURE, HEADER_TIMESTAMP,
};
use fleetdesk_shared::models::user::Role;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_anonymous_admin_page_redirects_to_sign_in() {
    let ctx = TestContext::lazy();

    let response = ctx.get("/admin/trips", None).await;

    assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.location(),
        Some("/sign-in?redirect_url=%2Fadmin%2Ftrips")
    );
}

#[tokio::test]
async fn test_wrong_role_goes_home() {
    let ctx = TestContext::lazy();

    let driver = ctx.token_for(Uuid::new_v4(), Some(Role::Driver));
    let client = ctx.token_for(Uuid::new_v4(), Some(Role::Client));

    let response = ctx.get("/admin/users", Some(&driver)).await;
    assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.location(), Some("/driver/dashboard"));

    let response = ctx.get("/api/admin/vehicles", Some(&client)).await;
    assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.location(), Some("/client/dashboard"));

    let response = ctx.get("/client/shipments", Some(&ctx.admin_token)).await;
    assert_eq!(response.location(), Some("/admin/dashboard"));
}

#[tokio::test]
async fn test_missing_role_always_ends_at_onboarding() {
    let ctx = TestContext::lazy();
    let fresh = ctx.token_for(Uuid::new_v4(), None);

    for path in ["/dashboard", "/admin/dashboard", "/driver/trips", "/api/account/me"] {
        let response = ctx.get(path, Some(&fresh)).await;

        assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT, "{}", path);
        assert_eq!(response.location(), Some("/onboarding"), "{}", path);
    }
}

#[tokio::test]
async fn test_onboarding_page() {
    let ctx = TestContext::lazy();

    let fresh = ctx.token_for(Uuid::new_v4(), None);
    let response = ctx.get("/onboarding", Some(&fresh)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["roles"], json!(["driver", "client"]));

    let client = ctx.token_for(Uuid::new_v4(), Some(Role::Client));
    let response = ctx.get("/onboarding", Some(&client)).await;
    assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.location(), Some("/client/dashboard"));
}

#[tokio::test]
async fn test_dashboard_sends_role_home() {
    let ctx = TestContext::lazy();
    let driver = ctx.token_for(Uuid::new_v4(), Some(Role::Driver));

    let response = ctx.get("/dashboard", Some(&driver)).await;

    assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.location(), Some("/driver/dashboard"));
}

#[tokio::test]
async fn test_sign_in_page_is_public() {
    let ctx = TestContext::lazy();

    let response = ctx.get("/sign-in?redirect_url=%2Fadmin%2Ftrips", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["action"], "/api/auth/sign-in");
    assert_eq!(response.body["redirect_url"], "/admin/trips");
}

#[tokio::test]
async fn test_upload_signature_for_drivers_only() {
    let ctx = TestContext::lazy();

    let driver = ctx.token_for(Uuid::new_v4(), Some(Role::Driver));
    let response = ctx
        .post("/api/uploads/signature", Some(&driver), json!({ "folder": "receipts" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["folder"], "receipts");
    assert_eq!(response.body["cloud_name"], "fleetdesk-test");
    assert_eq!(response.body["signature"].as_str().map(str::len), Some(64));

    let response = ctx
        .post("/api/uploads/signature", Some(&driver), json!({ "folder": "../etc" }))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let client = ctx.token_for(Uuid::new_v4(), Some(Role::Client));
    let response = ctx
        .post("/api/uploads/signature", Some(&client), json!({ "folder": "receipts" }))
        .await;
    assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn test_unsigned_webhook_is_rejected() {
    let ctx = TestContext::lazy();

    let response = ctx
        .post(
            "/api/webhooks/identity",
            None,
            json!({ "type": "user.deleted", "data": { "id": "user_1" } }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["success"], false);
}

/// Posts a raw webhook delivery and returns the status
async fn deliver_webhook(
    ctx: &TestContext,
    timestamp: &str,
    signature: &str,
    body: &'static [u8],
) -> StatusCode {
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/identity")
        .header(header::CONTENT_TYPE, "application/json")
        .header(HEADER_ID, "msg_1")
        .header(HEADER_TIMESTAMP, timestamp)
        .header(HEADER_SIGNATURE, signature)
        .body(Body::from(body.to_vec()))
        .unwrap();

    ctx.app.clone().oneshot(request).await.unwrap().status()
}

fn webhook_verifier(ctx: &TestContext) -> WebhookVerifier {
    WebhookVerifier::new(ctx.config.identity.webhook_secret.as_deref().unwrap()).unwrap()
}

const IGNORED_EVENT: &[u8] = br#"{"type":"session.created","data":{"id":"sess_1"}}"#;

#[tokio::test]
async fn test_ignored_webhook_event_is_acknowledged() {
    let ctx = TestContext::lazy();
    let now = Utc::now().timestamp();
    let signature = webhook_verifier(&ctx).sign("msg_1", now, IGNORED_EVENT);

    let status = deliver_webhook(
        &ctx,
        &now.to_string(),
        &format!("v1,{}", signature),
        IGNORED_EVENT,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_stale_webhook_is_rejected() {
    let ctx = TestContext::lazy();
    let stale = Utc::now().timestamp() - 10 * 60;
    let signature = webhook_verifier(&ctx).sign("msg_1", stale, IGNORED_EVENT);

    let status = deliver_webhook(
        &ctx,
        &stale.to_string(),
        &format!("v1,{}", signature),
        IGNORED_EVENT,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrongly_signed_webhook_is_rejected() {
    let ctx = TestContext::lazy();
    let now = Utc::now().timestamp();
    let forged = WebhookVerifier::new("not-the-configured-secret")
        .unwrap()
        .sign("msg_1", now, IGNORED_EVENT);

    let status = deliver_webhook(
        &ctx,
        &now.to_string(),
        &format!("v1,{}", forged),
        IGNORED_EVENT,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_out_of_range_webhook_timestamp_is_rejected() {
    let ctx = TestContext::lazy();

    let status = deliver_webhook(&ctx, &i64::MIN.to_string(), "v1,AAAA", IGNORED_EVENT).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
