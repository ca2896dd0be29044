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
    models::{Country, CountryDetail, CreateCountryRequest, UpdateCountryRequest},
    policy::{self, Operation, Policy, Resource},
    repository::{ArticleQuery, DeleteOutcome},
};

fn guard(user: &AuthUser, op: Operation) -> Result<(), AppError> {
    policy::require_policy(user, Policy::AdminOnly)?;
    policy::require(Some(user), Resource::Country, op)
}

#[utoipa::path(
    get,
    path = "/admin/countries",
    responses(
        (status = 200, description = "Countries", body = [Country]),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_countries(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Country>>, AppError> {
    guard(&user, Operation::List)?;
    Ok(Json(state.repo.list_countries(false).await?))
}

#[utoipa::path(
    get,
    path = "/admin/countries/{id}",
    params(("id" = i32, Path, description = "Country ID")),
    responses(
        (status = 200, description = "Country", body = CountryDetail),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_country(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CountryDetail>, AppError> {
    guard(&user, Operation::View)?;
    let country = state
        .repo
        .get_country(id, false)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("country {id} not found")))?;
    let article_count = state
        .repo
        .count_articles(&ArticleQuery {
            country_id: Some(id),
            ..ArticleQuery::default()
        })
        .await?;
    Ok(Json(CountryDetail {
        country,
        article_count,
    }))
}

#[utoipa::path(
    post,
    path = "/admin/countries",
    request_body = CreateCountryRequest,
    responses(
        (status = 201, description = "Created", body = Country),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_country(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCountryRequest>,
) -> Result<impl IntoResponse, AppError> {
    guard(&user, Operation::Create)?;
    let payload = validated(payload)?;
    let country = state.repo.create_country(payload).await?;
    tracing::info!(country_id = country.id, actor = %user.username, "country created");
    Ok((StatusCode::CREATED, Json(country)))
}

#[utoipa::path(
    put,
    path = "/admin/countries/{id}",
    params(("id" = i32, Path, description = "Country ID")),
    request_body = UpdateCountryRequest,
    responses(
        (status = 200, description = "Updated", body = Country),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_country(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCountryRequest>,
) -> Result<Json<Country>, AppError> {
    guard(&user, Operation::Edit)?;
    let payload = validated(payload)?;
    let country = state
        .repo
        .update_country(id, payload)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("country {id} not found")))?;
    tracing::info!(country_id = id, actor = %user.username, "country updated");
    Ok(Json(country))
}

/// delete_country
///
/// [Admin Route] Same guard as categories: refused with 409 while articles point at it.
#[utoipa::path(
    delete,
    path = "/admin/countries/{id}",
    params(("id" = i32, Path, description = "Country ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Still referenced by articles")
    )
)]
pub async fn delete_country(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    guard(&user, Operation::Delete)?;
    match state.repo.delete_country(id).await? {
        DeleteOutcome::Deleted => {
            tracing::info!(country_id = id, actor = %user.username, "country deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        DeleteOutcome::NotFound => Err(AppError::NotFound(format!("country {id} not found"))),
        DeleteOutcome::Referenced(count) => Err(AppError::ConflictOnDelete(format!(
            "country {id} cannot be deleted: {count} article(s) reference it"
        ))),
    }
}
