//! Integration tests for the association endpoints.

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{body_json, build_test_app, get, post_json, temp_store};
use lockbank_core::association::AssociationPolicy;
use lockbank_core::types::CardId;
use lockbank_db::AssociationBroker;
use serde_json::json;

#[tokio::test]
async fn status_is_idle_before_any_request() {
    let (_dir, store) = temp_store().await;
    let response = get(build_test_app(store), "/api/v1/associations/status").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "idle");
    assert!(json["data"].get("email").is_none());
}

#[tokio::test]
async fn valid_email_starts_waiting() {
    let (_dir, store) = temp_store().await;
    let app = build_test_app(store);

    let response = post_json(
        app.clone(),
        "/api/v1/associations",
        json!({ "email": "  Bob@Epitech.EU " }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "waiting");
    assert_eq!(json["data"]["email"], "bob@epitech.eu");
    assert!(json["data"]["expires_at"].is_string());

    let json = body_json(get(app, "/api/v1/associations/status").await).await;
    assert_eq!(json["data"]["status"], "waiting");
}

#[tokio::test]
async fn foreign_domain_is_rejected_before_any_write() {
    let (_dir, store) = temp_store().await;
    let app = build_test_app(store);

    for email in ["bob@gmail.com", "not-an-email", "", "bob@epitech.eu.evil.com"] {
        let response = post_json(app.clone(), "/api/v1/associations", json!({ "email": email })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "email {email:?}");
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }

    let json = body_json(get(app, "/api/v1/associations/status").await).await;
    assert_eq!(json["data"]["status"], "idle");
}

#[tokio::test]
async fn second_email_gets_busy_while_first_is_pending() {
    let (_dir, store) = temp_store().await;
    let app = build_test_app(store);

    let first = post_json(app.clone(), "/api/v1/associations", json!({ "email": "a@epitech.eu" })).await;
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let second = post_json(app.clone(), "/api/v1/associations", json!({ "email": "b@epitech.digital" })).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["code"], "BUSY");

    let again = post_json(app, "/api/v1/associations", json!({ "email": "a@epitech.eu" })).await;
    assert_eq!(again.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn status_reports_success_after_scan() {
    let (_dir, store) = temp_store().await;
    let app = build_test_app(store.clone());

    post_json(app.clone(), "/api/v1/associations", json!({ "email": "b@epitech.eu" })).await;

    // The reader process consumes the request.
    let reader = AssociationBroker::new(store, AssociationPolicy::default());
    let email = reader.poll(Utc::now()).await.unwrap().expect("pending");
    reader
        .fulfill(&CardId::new("Y").unwrap(), &email, Utc::now())
        .await
        .unwrap();

    let json = body_json(get(app, "/api/v1/associations/status").await).await;
    assert_eq!(json["data"]["status"], "success");
    assert_eq!(json["data"]["card_id"], "Y");
}
