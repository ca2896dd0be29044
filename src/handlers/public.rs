use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    AppState,
    error::AppError,
    models::{PublicArticle, PublicCategory, PublicCountry},
    pagination::{DEFAULT_PER_PAGE, MAX_PER_PAGE, Page, PageRequest},
    repository::ArticleQuery,
};

/// Number of articles returned by the featured endpoint when `cantidad` is omitted.
pub const DEFAULT_FEATURED: i64 = 5;

// --- Query Structs ---

/// ArticleFilter
///
/// Query parameters of the public article listing (GET /api/Noticias).
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ArticleFilter {
    /// Only articles of this country.
    pub pais_id: Option<i32>,
    /// Only articles of this category.
    pub categoria_id: Option<i32>,
    /// Case-insensitive match on title, body or summary.
    pub busqueda: Option<String>,
    /// 1-based page number (default 1).
    pub pagina: Option<i64>,
    /// Page size (default 10, at most 100).
    pub por_pagina: Option<i64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct PageQuery {
    pub pagina: Option<i64>,
    pub por_pagina: Option<i64>,
}

impl PageQuery {
    fn page_request(&self) -> PageRequest {
        page_request(self.pagina, self.por_pagina)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeaturedQuery {
    /// How many articles to return (default 5).
    pub cantidad: Option<i64>,
}

fn page_request(page: Option<i64>, per_page: Option<i64>) -> PageRequest {
    PageRequest::new(page.unwrap_or(1), per_page.unwrap_or(DEFAULT_PER_PAGE))
}

// --- Articles ---

/// list_articles
///
/// [Public Route] Paginated listing of active articles, newest first. The page metadata
/// travels in the `X-Total-Count`, `X-Page`, `X-Per-Page` and `X-Total-Pages` headers.
#[utoipa::path(
    get,
    path = "/api/Noticias",
    params(ArticleFilter),
    responses((status = 200, description = "One page of active articles", body = [PublicArticle]))
)]
pub async fn list_articles(
    State(state): State<AppState>,
    Query(filter): Query<ArticleFilter>,
) -> Result<Page<PublicArticle>, AppError> {
    let query = ArticleQuery {
        country_id: filter.pais_id,
        category_id: filter.categoria_id,
        search: filter.busqueda,
        ..ArticleQuery::public()
    };
    let page = page_request(filter.pagina, filter.por_pagina);
    Ok(state
        .repo
        .find_articles(&query, page)
        .await?
        .map(PublicArticle::from))
}

/// get_article
///
/// [Public Route] A single active article. Inactive and missing ids are both 404.
#[utoipa::path(
    get,
    path = "/api/Noticias/{id}",
    params(("id" = i32, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Article", body = PublicArticle),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PublicArticle>, AppError> {
    state
        .repo
        .get_article_summary(id, true)
        .await?
        .map(|article| Json(PublicArticle::from(article)))
        .ok_or_else(|| AppError::NotFound(format!("article {id} not found")))
}

/// featured_articles
///
/// [Public Route] The most recent active articles, for the landing page.
#[utoipa::path(
    get,
    path = "/api/Noticias/Destacadas",
    params(FeaturedQuery),
    responses((status = 200, description = "Latest active articles", body = [PublicArticle]))
)]
pub async fn featured_articles(
    State(state): State<AppState>,
    Query(featured): Query<FeaturedQuery>,
) -> Result<Json<Vec<PublicArticle>>, AppError> {
    let limit = featured
        .cantidad
        .unwrap_or(DEFAULT_FEATURED)
        .clamp(1, MAX_PER_PAGE);
    let articles = state
        .repo
        .list_articles(&ArticleQuery::public(), Some(limit))
        .await?;
    Ok(Json(articles.into_iter().map(PublicArticle::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/Noticias/PorCategoria/{categoriaId}",
    params(("categoriaId" = i32, Path, description = "Category ID"), PageQuery),
    responses((status = 200, description = "One page of the category's active articles", body = [PublicArticle]))
)]
pub async fn articles_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<i32>,
    Query(paging): Query<PageQuery>,
) -> Result<Page<PublicArticle>, AppError> {
    let query = ArticleQuery {
        category_id: Some(category_id),
        ..ArticleQuery::public()
    };
    Ok(state
        .repo
        .find_articles(&query, paging.page_request())
        .await?
        .map(PublicArticle::from))
}

#[utoipa::path(
    get,
    path = "/api/Noticias/PorPais/{paisId}",
    params(("paisId" = i32, Path, description = "Country ID"), PageQuery),
    responses((status = 200, description = "One page of the country's active articles", body = [PublicArticle]))
)]
pub async fn articles_by_country(
    State(state): State<AppState>,
    Path(country_id): Path<i32>,
    Query(paging): Query<PageQuery>,
) -> Result<Page<PublicArticle>, AppError> {
    let query = ArticleQuery {
        country_id: Some(country_id),
        ..ArticleQuery::public()
    };
    Ok(state
        .repo
        .find_articles(&query, paging.page_request())
        .await?
        .map(PublicArticle::from))
}

// --- Categories ---

/// list_categories
///
/// [Public Route] Active categories ordered by name.
#[utoipa::path(
    get,
    path = "/api/Categorias",
    responses((status = 200, description = "Active categories", body = [PublicCategory]))
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicCategory>>, AppError> {
    let categories = state.repo.list_categories(true).await?;
    Ok(Json(categories.into_iter().map(PublicCategory::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/Categorias/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category", body = PublicCategory),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PublicCategory>, AppError> {
    state
        .repo
        .get_category(id, true)
        .await?
        .map(|category| Json(PublicCategory::from(category)))
        .ok_or_else(|| AppError::NotFound(format!("category {id} not found")))
}

/// category_articles
///
/// [Public Route] Every active article of an active category. A missing or inactive
/// category yields an empty list.
#[utoipa::path(
    get,
    path = "/api/Categorias/{id}/Noticias",
    params(("id" = i32, Path, description = "Category ID")),
    responses((status = 200, description = "Active articles of the category", body = [PublicArticle]))
)]
pub async fn category_articles(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<PublicArticle>>, AppError> {
    if state.repo.get_category(id, true).await?.is_none() {
        return Ok(Json(Vec::new()));
    }
    let query = ArticleQuery {
        category_id: Some(id),
        ..ArticleQuery::public()
    };
    let articles = state.repo.list_articles(&query, None).await?;
    Ok(Json(articles.into_iter().map(PublicArticle::from).collect()))
}

// --- Countries ---

#[utoipa::path(
    get,
    path = "/api/Paises",
    responses((status = 200, description = "Active countries", body = [PublicCountry]))
)]
pub async fn list_countries(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicCountry>>, AppError> {
    let countries = state.repo.list_countries(true).await?;
    Ok(Json(countries.into_iter().map(PublicCountry::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/Paises/{id}",
    params(("id" = i32, Path, description = "Country ID")),
    responses(
        (status = 200, description = "Country", body = PublicCountry),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_country(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PublicCountry>, AppError> {
    state
        .repo
        .get_country(id, true)
        .await?
        .map(|country| Json(PublicCountry::from(country)))
        .ok_or_else(|| AppError::NotFound(format!("country {id} not found")))
}

/// Same as [`category_articles`], keyed by country.
#[utoipa::path(
    get,
    path = "/api/Paises/{id}/Noticias",
    params(("id" = i32, Path, description = "Country ID")),
    responses((status = 200, description = "Active articles of the country", body = [PublicArticle]))
)]
pub async fn country_articles(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<PublicArticle>>, AppError> {
    if state.repo.get_country(id, true).await?.is_none() {
        return Ok(Json(Vec::new()));
    }
    let query = ArticleQuery {
        country_id: Some(id),
        ..ArticleQuery::public()
    };
    let articles = state.repo.list_articles(&query, None).await?;
    Ok(Json(articles.into_iter().map(PublicArticle::from).collect()))
}

/// health
///
/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}
