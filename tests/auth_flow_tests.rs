// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration, login, and invite flow tests against the Firestore emulator.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app_with_db, test_db};

fn json_post(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, uuid::Uuid::new_v4())
}

#[tokio::test]
async fn test_coach_register_login_me() {
    require_emulator!();
    let db = test_db().await;
    let email = unique_email("coach");

    // Register
    let (app, _state) = create_test_app_with_db(db.clone());
    let response = app
        .oneshot(json_post(
            "/api/auth/register",
            format!(
                r#"{{"email":"{}","password":"longenough","name":"Coach Carter"}}"#,
                email
            ),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["user"]["role"], "coach");
    assert!(body["token"].is_string());
    assert!(body["user"].get("password_hash").is_none());

    // Duplicate email
    let (app, _state) = create_test_app_with_db(db.clone());
    let response = app
        .oneshot(json_post(
            "/api/auth/register",
            format!(
                r#"{{"email":"{}","password":"longenough","name":"Copycat"}}"#,
                email
            ),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Login with the right password
    let (app, _state) = create_test_app_with_db(db.clone());
    let response = app
        .oneshot(json_post(
            "/api/auth/login",
            format!(r#"{{"email":"{}","password":"longenough"}}"#, email),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    // Login with the wrong password
    let (app, _state) = create_test_app_with_db(db.clone());
    let response = app
        .oneshot(json_post(
            "/api/auth/login",
            format!(r#"{{"email":"{}","password":"wrong-password"}}"#, email),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // /me with the issued token
    let (app, _state) = create_test_app_with_db(db);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["email"], email.as_str());
}

#[tokio::test]
async fn test_invite_flow_registers_athlete_once() {
    require_emulator!();
    let db = test_db().await;
    let coach_email = unique_email("coach");
    let athlete_email = unique_email("athlete");

    // Register a coach and keep the token
    let (app, _state) = create_test_app_with_db(db.clone());
    let response = app
        .oneshot(json_post(
            "/api/auth/register",
            format!(
                r#"{{"email":"{}","password":"longenough","name":"Coach"}}"#,
                coach_email
            ),
        ))
        .await
        .unwrap();
    let coach_token = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    // Create an invite
    let (app, _state) = create_test_app_with_db(db.clone());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/invites")
                .header(header::AUTHORIZATION, format!("Bearer {}", coach_token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(format!(r#"{{"email":"{}"}}"#, athlete_email)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let invite = body_json(response).await;
    let invite_token = invite["token"].as_str().unwrap().to_string();
    assert!(invite["invite_url"]
        .as_str()
        .unwrap()
        .contains(&invite_token));

    // Public verification shows the coach name
    let (app, _state) = create_test_app_with_db(db.clone());
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/invites/verify/{}", invite_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let verified = body_json(response).await;
    assert_eq!(verified["email"], athlete_email.as_str());
    assert_eq!(verified["coach_name"], "Coach");

    // Registration with a mismatched email is rejected
    let (app, _state) = create_test_app_with_db(db.clone());
    let response = app
        .oneshot(json_post(
            "/api/auth/register/athlete",
            format!(
                r#"{{"email":"{}","password":"longenough","name":"Wrong","invite_token":"{}"}}"#,
                unique_email("other"),
                invite_token
            ),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Registration with the invited email succeeds and links the coach
    let (app, _state) = create_test_app_with_db(db.clone());
    let response = app
        .oneshot(json_post(
            "/api/auth/register/athlete",
            format!(
                r#"{{"email":"{}","password":"longenough","name":"Runner","invite_token":"{}"}}"#,
                athlete_email, invite_token
            ),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["user"]["role"], "athlete");
    assert!(body["user"]["coach_id"].is_string());

    // The invite is single-use
    let (app, _state) = create_test_app_with_db(db);
    let response = app
        .oneshot(json_post(
            "/api/auth/register/athlete",
            format!(
                r#"{{"email":"{}","password":"longenough","name":"Again","invite_token":"{}"}}"#,
                athlete_email, invite_token
            ),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
