mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use common::{PASSWORD, as_user, login, spawn, spawn_with, with_bearer};
use news_portal::{
    InMemoryRepository,
    auth::{Claims, sign_claims},
    config::{AppConfig, Env},
    models::Session,
};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn test_login_issues_cookie_and_token() {
    let app = spawn().await;
    let (status, headers, body) = login(&app, "editor", PASSWORD).await;

    assert_eq!(status, StatusCode::OK);
    let cookie = headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("news_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=10800"));

    assert_eq!(body["user"]["username"], "editor");
    assert_eq!(body["user"]["role"], "Editor");
    let token = body["token"].as_str().unwrap();
    assert!(cookie.contains(token));

    let (status, _, me) = app
        .send(with_bearer(Method::GET, "/account/me", token, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "editor@noticias.test");
    assert_eq!(me["fullName"], "editor full name");
}

#[tokio::test]
async fn test_session_cookie_authenticates() {
    let app = spawn().await;
    let (_, _, body) = login(&app, "admin", PASSWORD).await;
    let token = body["token"].as_str().unwrap();

    let request = Request::builder()
        .uri("/admin/dashboard")
        .header(header::COOKIE, format!("news_session={token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = spawn().await;

    let (wrong_status, _, wrong_password) = login(&app, "editor", "not-the-password").await;
    let (unknown_status, _, unknown_user) = login(&app, "nobody", PASSWORD).await;
    let (inactive_status, _, inactive_user) = login(&app, "retired", PASSWORD).await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(inactive_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_user);
    assert_eq!(wrong_password, inactive_user);
    assert_eq!(wrong_password["error"], "invalid username or password");
}

#[tokio::test]
async fn test_empty_login_is_a_validation_error() {
    let app = spawn().await;
    let (status, _, _) = login(&app, "", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_revokes_the_token() {
    let app = spawn().await;
    let (_, _, body) = login(&app, "editor", PASSWORD).await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, headers, _) = app
        .send(with_bearer(Method::POST, "/account/logout", &token, None))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let cleared = headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));

    // The signature and exp are still valid; the session row is gone.
    let (status, _, _) = app
        .send(with_bearer(Method::GET, "/account/me", &token, None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = spawn().await;
    let editor = &app.seed.editor;
    let issued_at = Utc::now() - Duration::hours(5);

    // A live session row, but a token whose exp is in the past.
    let session = Session {
        id: Uuid::new_v4(),
        user_id: editor.id,
        issued_at,
        expires_at: Utc::now() + Duration::hours(1),
    };
    app.repo().create_session(&session).await.unwrap();
    let claims = Claims {
        sub: editor.id,
        username: editor.username.clone(),
        email: editor.email.clone(),
        role: editor.role,
        name: editor.full_name.clone(),
        jti: session.id,
        iat: issued_at.timestamp(),
        exp: (issued_at + Duration::hours(3)).timestamp(),
    };
    let token = sign_claims(&app.state.config, &claims).unwrap();

    let (status, _, _) = app
        .send(with_bearer(Method::GET, "/account/me", &token, None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_session_row_is_rejected() {
    let app = spawn().await;
    let editor = &app.seed.editor;
    let now = Utc::now();

    // The token itself is still valid; the server-side session has lapsed.
    let session = Session {
        id: Uuid::new_v4(),
        user_id: editor.id,
        issued_at: now - Duration::hours(4),
        expires_at: now - Duration::hours(1),
    };
    app.repo().create_session(&session).await.unwrap();
    let claims = Claims {
        sub: editor.id,
        username: editor.username.clone(),
        email: editor.email.clone(),
        role: editor.role,
        name: editor.full_name.clone(),
        jti: session.id,
        iat: now.timestamp(),
        exp: (now + Duration::hours(1)).timestamp(),
    };
    let token = sign_claims(&app.state.config, &claims).unwrap();

    let (status, _, _) = app
        .send(with_bearer(Method::GET, "/account/me", &token, None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deactivated_user_loses_access() {
    let app = spawn().await;
    let (_, _, body) = login(&app, "reporter", PASSWORD).await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _, _) = app
        .send(as_user(
            Method::PUT,
            &format!("/admin/users/{}", app.seed.other_editor.id),
            &app.seed.admin,
            Some(serde_json::json!({ "active": false })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = app
        .send(with_bearer(Method::GET, "/account/me", &token, None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_or_garbage_credentials_are_unauthorized() {
    let app = spawn().await;

    let (status, _, body) = app.send(common::get("/admin/dashboard")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "authentication required");

    let (status, _, _) = app
        .send(with_bearer(Method::GET, "/admin/dashboard", "not.a.jwt", None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dev_bypass_needs_local_env_and_opt_in() {
    let local = spawn().await;
    let (status, _, _) = local
        .send(as_user(Method::GET, "/account/me", &local.seed.editor, None))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Inactive users cannot use the bypass either.
    let (status, _, _) = local
        .send(as_user(Method::GET, "/account/me", &local.seed.retired, None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let production = AppConfig {
        env: Env::Production,
        dev_bypass: true,
        ..AppConfig::default()
    };
    let prod = spawn_with(Arc::new(InMemoryRepository::new()), production).await;
    let (status, _, _) = prod
        .send(as_user(Method::GET, "/account/me", &prod.seed.admin, None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A local run without the switch treats the header as no credential at all.
    let locked = spawn_with(Arc::new(InMemoryRepository::new()), AppConfig::default()).await;
    let (status, _, _) = locked
        .send(as_user(Method::GET, "/admin/users", &locked.seed.admin, None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_production_cookie_is_secure() {
    let production = AppConfig {
        env: Env::Production,
        ..AppConfig::default()
    };
    let app = spawn_with(Arc::new(InMemoryRepository::new()), production).await;
    let (status, headers, _) = login(&app, "admin", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        headers[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .contains("Secure")
    );
}
