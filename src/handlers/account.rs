use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::{
    AppState,
    auth::{self, AuthUser},
    error::AppError,
    handlers::validated,
    models::{LoginRequest, LoginResponse, SessionProfile},
};

/// login
///
/// [Public Route] Exchanges a username and password for a session credential. The token
/// is returned in the body and set as the `news_session` HttpOnly cookie.
///
/// Unknown users, inactive users and wrong passwords all produce the same 401.
#[utoipa::path(
    post,
    path = "/account/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = LoginResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = validated(payload)?;
    let user = auth::authenticate(
        &state.repo,
        &state.config,
        &payload.username,
        &payload.password,
    )
    .await?;
    let issued = auth::issue_session(&state.repo, &state.config, &user).await?;

    let cookie = auth::session_cookie(&state.config, &issued.token);
    let body = LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user: SessionProfile::from(&user),
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

/// logout
///
/// [Authenticated Route] Revokes the current session so its token stops working
/// immediately, and clears the cookie.
#[utoipa::path(
    post,
    path = "/account/logout",
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "No valid session")
    )
)]
pub async fn logout(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(session_id) = user.session_id {
        state.repo.revoke_session(session_id).await?;
        tracing::info!(user_id = user.id, %session_id, "session revoked");
    }
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, auth::clear_session_cookie())],
    ))
}

/// me
///
/// [Authenticated Route] The profile of the signed-in user.
#[utoipa::path(
    get,
    path = "/account/me",
    responses(
        (status = 200, description = "Profile", body = SessionProfile),
        (status = 401, description = "No valid session")
    )
)]
pub async fn me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<SessionProfile>, AppError> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(SessionProfile::from(&user)))
}
