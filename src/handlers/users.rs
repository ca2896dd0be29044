use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    auth::{self, AuthUser},
    error::AppError,
    handlers::validated,
    models::{CreateUserRequest, MIN_PASSWORD_LENGTH, UpdateUserRequest, User, UserDetail},
    policy::{self, Operation, Policy, Resource},
    repository::{ArticleQuery, DeleteOutcome, NewUser, UserChanges},
};

const IDENTITY_TAKEN: &str = "username or email already exists";

fn guard(user: &AuthUser, op: Operation) -> Result<(), AppError> {
    policy::require_policy(user, Policy::AdminOnly)?;
    policy::require(Some(user), Resource::User, op)
}

fn check_password_length(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "Users", body = [User]),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, AppError> {
    guard(&user, Operation::List)?;
    Ok(Json(state.repo.list_users().await?))
}

/// get_user
///
/// [Admin Route] A user plus the number of articles they authored.
#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserDetail),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserDetail>, AppError> {
    guard(&user, Operation::View)?;
    let found = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))?;
    let article_count = state
        .repo
        .count_articles(&ArticleQuery {
            author_id: Some(id),
            ..ArticleQuery::default()
        })
        .await?;
    Ok(Json(UserDetail {
        user: found,
        article_count,
    }))
}

/// create_user
///
/// [Admin Route] Creates an account. Username and email must be unused; the password is
/// hashed with bcrypt before it is stored.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 400, description = "Validation failed or identity taken")
    )
)]
pub async fn create_user(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    guard(&user, Operation::Create)?;
    let payload = validated(payload)?;
    if payload.password.trim().is_empty() {
        return Err(AppError::Validation("password must not be blank".to_string()));
    }

    if state
        .repo
        .identity_taken(&payload.username, &payload.email, None)
        .await?
    {
        return Err(AppError::Validation(IDENTITY_TAKEN.to_string()));
    }

    let password_hash =
        auth::hash_password_async(payload.password, state.config.bcrypt_cost).await?;
    // A concurrent insert can still win the race; the unique index turns it into a 400.
    let created = state
        .repo
        .create_user(NewUser {
            username: payload.username,
            email: payload.email,
            full_name: payload.full_name,
            role: payload.role,
            active: payload.active,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = created.id, actor = %user.username, "user created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// update_user
///
/// [Admin Route] Partial update. A blank `newPassword` keeps the current one.
#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 400, description = "Validation failed or identity taken"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    guard(&user, Operation::Edit)?;
    let payload = validated(payload)?;
    let existing = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))?;

    let username = payload.username.as_deref().unwrap_or(&existing.username);
    let email = payload.email.as_deref().unwrap_or(&existing.email);
    if state.repo.identity_taken(username, email, Some(id)).await? {
        return Err(AppError::Validation(IDENTITY_TAKEN.to_string()));
    }

    let password_hash = match payload.new_password.as_deref() {
        Some(password) if !password.trim().is_empty() => {
            check_password_length(password)?;
            let hash =
                auth::hash_password_async(password.to_owned(), state.config.bcrypt_cost).await?;
            Some(hash)
        }
        _ => None,
    };
    let password_changed = password_hash.is_some();

    let updated = state
        .repo
        .update_user(
            id,
            UserChanges {
                username: payload.username,
                email: payload.email,
                full_name: payload.full_name,
                role: payload.role,
                active: payload.active,
                password_hash,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))?;

    if password_changed {
        tracing::info!(user_id = id, actor = %user.username, "password changed");
    }
    tracing::info!(user_id = id, actor = %user.username, "user updated");
    Ok(Json(updated))
}

/// delete_user
///
/// [Admin Route] Refused with 409 while the user is the author of any article.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Still the author of articles")
    )
)]
pub async fn delete_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    guard(&user, Operation::Delete)?;
    match state.repo.delete_user(id).await? {
        DeleteOutcome::Deleted => {
            tracing::info!(user_id = id, actor = %user.username, "user deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        DeleteOutcome::NotFound => Err(AppError::NotFound(format!("user {id} not found"))),
        DeleteOutcome::Referenced(count) => Err(AppError::ConflictOnDelete(format!(
            "user {id} cannot be deleted: they are the author of {count} article(s)"
        ))),
    }
}
