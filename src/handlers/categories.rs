use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    handlers::validated,
    models::{Category, CategoryDetail, CreateCategoryRequest, UpdateCategoryRequest},
    policy::{self, Operation, Policy, Resource},
    repository::{ArticleQuery, DeleteOutcome},
};

fn guard(user: &AuthUser, op: Operation) -> Result<(), AppError> {
    policy::require_policy(user, Policy::AdminOnly)?;
    policy::require(Some(user), Resource::Category, op)
}

/// list_categories
///
/// [Admin Route] All categories, active or not, ordered by name.
#[utoipa::path(
    get,
    path = "/admin/categories",
    responses(
        (status = 200, description = "Categories", body = [Category]),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_categories(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    guard(&user, Operation::List)?;
    Ok(Json(state.repo.list_categories(false).await?))
}

/// get_category
///
/// [Admin Route] A category plus the number of articles filed under it, so a client can
/// warn before attempting a delete.
#[utoipa::path(
    get,
    path = "/admin/categories/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category", body = CategoryDetail),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CategoryDetail>, AppError> {
    guard(&user, Operation::View)?;
    let category = state
        .repo
        .get_category(id, false)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {id} not found")))?;
    let article_count = state
        .repo
        .count_articles(&ArticleQuery {
            category_id: Some(id),
            ..ArticleQuery::default()
        })
        .await?;
    Ok(Json(CategoryDetail {
        category,
        article_count,
    }))
}

#[utoipa::path(
    post,
    path = "/admin/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_category(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    guard(&user, Operation::Create)?;
    let payload = validated(payload)?;
    let category = state.repo.create_category(payload).await?;
    tracing::info!(category_id = category.id, actor = %user.username, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    put,
    path = "/admin/categories/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Updated", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    guard(&user, Operation::Edit)?;
    let payload = validated(payload)?;
    let category = state
        .repo
        .update_category(id, payload)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {id} not found")))?;
    tracing::info!(category_id = id, actor = %user.username, "category updated");
    Ok(Json(category))
}

/// delete_category
///
/// [Admin Route] Removes a category no article refers to. A referenced category is
/// left untouched and the request fails with 409.
#[utoipa::path(
    delete,
    path = "/admin/categories/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Still referenced by articles")
    )
)]
pub async fn delete_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    guard(&user, Operation::Delete)?;
    match state.repo.delete_category(id).await? {
        DeleteOutcome::Deleted => {
            tracing::info!(category_id = id, actor = %user.username, "category deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        DeleteOutcome::NotFound => Err(AppError::NotFound(format!("category {id} not found"))),
        DeleteOutcome::Referenced(count) => Err(AppError::ConflictOnDelete(format!(
            "category {id} cannot be deleted: {count} article(s) are filed under it"
        ))),
    }
}
