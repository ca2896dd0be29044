use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    handlers::validated,
    models::{Article, ArticleSummary, CreateArticleRequest, DashboardStats, UpdateArticleRequest},
    policy::{self, Operation, Policy, Resource},
    repository::{ArticleQuery, NewArticle},
};

/// AdminArticleFilter
///
/// Query parameters of the admin article listing (GET /admin/articles).
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct AdminArticleFilter {
    pub search: Option<String>,
    pub category_id: Option<i32>,
    pub country_id: Option<i32>,
}

/// Editors only ever see their own articles.
fn author_scope(user: &AuthUser) -> Option<i32> {
    if user.is_admin() { None } else { Some(user.id) }
}

/// Category and country of a new or edited article must exist and be active.
async fn ensure_links(
    state: &AppState,
    country_id: Option<i32>,
    category_id: Option<i32>,
) -> Result<(), AppError> {
    if let Some(country_id) = country_id {
        if state.repo.get_country(country_id, true).await?.is_none() {
            return Err(AppError::Validation(format!(
                "country {country_id} does not exist or is inactive"
            )));
        }
    }
    if let Some(category_id) = category_id {
        if state.repo.get_category(category_id, true).await?.is_none() {
            return Err(AppError::Validation(format!(
                "category {category_id} does not exist or is inactive"
            )));
        }
    }
    Ok(())
}

/// Loads an article and checks the caller may perform `op` on it. A missing id is 404;
/// an existing article owned by someone else is 403.
async fn load_authorized(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    op: Operation,
) -> Result<Article, AppError> {
    let article = state
        .repo
        .get_article(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("article {id} not found")))?;
    policy::require(
        Some(user),
        Resource::Article {
            owner_id: article.author_id,
        },
        op,
    )?;
    Ok(article)
}

/// dashboard
///
/// [Admin Route] Landing page counters. Article figures are scoped to the caller when
/// the caller is an Editor; the active user count is Admin-only.
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = DashboardStats),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn dashboard(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, AppError> {
    policy::require_policy(&user, Policy::EditorOrAdmin)?;
    policy::require(Some(&user), Resource::Dashboard, Operation::View)?;
    Ok(Json(state.repo.dashboard_stats(author_scope(&user)).await?))
}

/// list_articles
///
/// [Admin Route] Every article (active or not) matching the filters, newest first.
#[utoipa::path(
    get,
    path = "/admin/articles",
    params(AdminArticleFilter),
    responses((status = 200, description = "Articles", body = [ArticleSummary]))
)]
pub async fn list_articles(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<AdminArticleFilter>,
) -> Result<Json<Vec<ArticleSummary>>, AppError> {
    policy::require_policy(&user, Policy::EditorOrAdmin)?;
    policy::require(Some(&user), Resource::Articles, Operation::List)?;

    let query = ArticleQuery {
        active_only: false,
        country_id: filter.country_id,
        category_id: filter.category_id,
        author_id: author_scope(&user),
        search: filter.search,
    };
    Ok(Json(state.repo.list_articles(&query, None).await?))
}

#[utoipa::path(
    get,
    path = "/admin/articles/{id}",
    params(("id" = i32, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Article", body = ArticleSummary),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ArticleSummary>, AppError> {
    policy::require_policy(&user, Policy::EditorOrAdmin)?;
    load_authorized(&state, &user, id, Operation::View).await?;
    state
        .repo
        .get_article_summary(id, false)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("article {id} not found")))
}

/// create_article
///
/// [Admin Route] Publishes a new article. The caller becomes the author, the server
/// clock sets `publishedAt`, and the article starts active.
#[utoipa::path(
    post,
    path = "/admin/articles",
    request_body = CreateArticleRequest,
    responses(
        (status = 201, description = "Created", body = Article),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_article(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateArticleRequest>,
) -> Result<impl IntoResponse, AppError> {
    policy::require_policy(&user, Policy::EditorOrAdmin)?;
    policy::require(Some(&user), Resource::Articles, Operation::Create)?;
    let payload = validated(payload)?;
    ensure_links(&state, Some(payload.country_id), Some(payload.category_id)).await?;

    let article = state
        .repo
        .create_article(NewArticle {
            title: payload.title,
            body: payload.body,
            summary: payload.summary,
            image_url: payload.image_url,
            published_at: Utc::now(),
            active: true,
            country_id: payload.country_id,
            category_id: payload.category_id,
            author_id: user.id,
        })
        .await?;

    tracing::info!(article_id = article.id, actor = %user.username, "article created");
    Ok((StatusCode::CREATED, Json(article)))
}

/// update_article
///
/// [Admin Route] Partial update. Editors may edit only their own articles and may not
/// hand them over to another author.
#[utoipa::path(
    put,
    path = "/admin/articles/{id}",
    params(("id" = i32, Path, description = "Article ID")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Updated", body = Article),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateArticleRequest>,
) -> Result<Json<Article>, AppError> {
    policy::require_policy(&user, Policy::EditorOrAdmin)?;
    let existing = load_authorized(&state, &user, id, Operation::Edit).await?;
    let payload = validated(payload)?;

    if let Some(author_id) = payload.author_id {
        if author_id != existing.author_id {
            if !user.is_admin() {
                return Err(AppError::Forbidden);
            }
            if state.repo.get_user(author_id).await?.is_none() {
                return Err(AppError::Validation(format!(
                    "author {author_id} does not exist"
                )));
            }
        }
    }

    let changed_country = payload.country_id.filter(|id| *id != existing.country_id);
    let changed_category = payload.category_id.filter(|id| *id != existing.category_id);
    ensure_links(&state, changed_country, changed_category).await?;

    let article = state
        .repo
        .update_article(id, payload)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("article {id} not found")))?;

    tracing::info!(article_id = id, actor = %user.username, "article updated");
    Ok(Json(article))
}

#[utoipa::path(
    delete,
    path = "/admin/articles/{id}",
    params(("id" = i32, Path, description = "Article ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    policy::require_policy(&user, Policy::EditorOrAdmin)?;
    load_authorized(&state, &user, id, Operation::Delete).await?;

    if !state.repo.delete_article(id).await? {
        return Err(AppError::NotFound(format!("article {id} not found")));
    }
    tracing::info!(article_id = id, actor = %user.username, "article deleted");
    Ok(StatusCode::NO_CONTENT)
}
