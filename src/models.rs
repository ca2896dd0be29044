use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Roles ---

/// Role
///
/// The two roles of the admin surface. Stored as TEXT (`'Admin'` / `'Editor'`) in
/// `users.role` and carried inside the session credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub enum Role {
    Admin,
    #[default]
    Editor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Editor => "Editor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Admin" => Ok(Role::Admin),
            "Editor" => Ok(Role::Editor),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

// --- Core Schemas (Mapped to Database) ---

/// Article
///
/// A published news item, as stored in the `articles` table. The admin surface works
/// with this shape; the public API serves the joined [`ArticleSummary`] as a
/// [`PublicArticle`].
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Article {
    pub id: i32,
    pub title: String,
    pub body: String,
    pub summary: String,
    pub image_url: Option<String>,
    #[ts(type = "string")]
    pub published_at: DateTime<Utc>,
    pub active: bool,
    pub country_id: i32,
    pub category_id: i32,
    // FK to users.id (Owner).
    pub author_id: i32,
}

/// ArticleSummary
///
/// Joined read model: the article plus the names of its country, category and author,
/// so a listing needs a single query. The public API renders it as [`PublicArticle`].
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ArticleSummary {
    pub id: i32,
    pub title: String,
    pub body: String,
    pub summary: String,
    pub image_url: Option<String>,
    #[ts(type = "string")]
    pub published_at: DateTime<Utc>,
    pub active: bool,
    pub country_id: i32,
    pub country_name: String,
    pub country_code: String,
    pub category_id: i32,
    pub category_name: String,
    pub author_id: i32,
    pub author_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Country {
    pub id: i32,
    pub name: String,
    /// Short country code, e.g. "HN".
    pub code: String,
    pub active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// User
///
/// An account of the admin surface. The password hash is loaded for credential
/// verification but is never serialized.
#[derive(Debug, Clone, Serialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[serde(skip)]
    pub password_hash: String,
    pub active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Session
///
/// Server-side record backing an issued credential. The token's `jti` is the row id;
/// logging out deletes the row, which invalidates the token before its expiry.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: i32,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// --- Public Views (Output) ---
//
// The consumer client reads the public API with Spanish field names; these views keep
// that wire contract while the rest of the crate works with the English models.

/// PublicArticle
///
/// An active article as served under `/api/Noticias` and the per-category/per-country
/// listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct PublicArticle {
    #[serde(rename = "noticiaId")]
    pub id: i32,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "contenido")]
    pub body: String,
    #[serde(rename = "resumen")]
    pub summary: String,
    #[serde(rename = "imagenUrl")]
    pub image_url: Option<String>,
    #[serde(rename = "fechaPublicacion")]
    #[ts(type = "string")]
    pub published_at: DateTime<Utc>,
    #[serde(rename = "activo")]
    pub active: bool,
    #[serde(rename = "paisId")]
    pub country_id: i32,
    #[serde(rename = "paisNombre")]
    pub country_name: String,
    #[serde(rename = "paisCodigo")]
    pub country_code: String,
    #[serde(rename = "categoriaId")]
    pub category_id: i32,
    #[serde(rename = "categoriaNombre")]
    pub category_name: String,
    #[serde(rename = "autorNombre")]
    pub author_name: String,
}

impl From<ArticleSummary> for PublicArticle {
    fn from(article: ArticleSummary) -> Self {
        Self {
            id: article.id,
            title: article.title,
            body: article.body,
            summary: article.summary,
            image_url: article.image_url,
            published_at: article.published_at,
            active: article.active,
            country_id: article.country_id,
            country_name: article.country_name,
            country_code: article.country_code,
            category_id: article.category_id,
            category_name: article.category_name,
            author_name: article.author_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct PublicCategory {
    #[serde(rename = "categoriaId")]
    pub id: i32,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "activo")]
    pub active: bool,
}

impl From<Category> for PublicCategory {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            active: category.active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct PublicCountry {
    #[serde(rename = "paisId")]
    pub id: i32,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "activo")]
    pub active: bool,
}

impl From<Country> for PublicCountry {
    fn from(country: Country) -> Self {
        Self {
            id: country.id,
            name: country.name,
            code: country.code,
            active: country.active,
        }
    }
}

// --- Detail Views (Output) ---

/// Entity detail augmented with the number of articles pointing at it. Shown before a
/// delete so the caller knows whether the delete guard will reject it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategoryDetail {
    pub category: Category,
    pub article_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CountryDetail {
    pub country: Country,
    pub article_count: i64,
}

#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserDetail {
    pub user: User,
    pub article_count: i64,
}

/// DashboardStats
///
/// Counters for the admin landing page. Article figures are scoped to the caller when
/// the caller is an Editor.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardStats {
    pub total_articles: i64,
    pub active_categories: i64,
    pub active_countries: i64,
    /// Always 0 for Editors.
    pub active_users: i64,
    pub latest_articles: Vec<ArticleSummary>,
}

// --- Session Schemas ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginRequest {
    #[garde(length(min = 1))]
    pub username: String,
    #[garde(length(min = 1))]
    pub password: String,
}

/// SessionProfile
///
/// The identity carried by a session credential.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionProfile {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub full_name: String,
}

impl From<&User> for SessionProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            full_name: user.full_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    #[ts(type = "string")]
    pub expires_at: DateTime<Utc>,
    pub user: SessionProfile,
}

// --- Request Payloads (Input Schemas) ---

/// CreateArticleRequest
///
/// The author and publication timestamp are not accepted from the client: they come
/// from the session and the server clock.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateArticleRequest {
    #[garde(length(min = 1, max = 200))]
    pub title: String,
    #[garde(length(min = 1))]
    pub body: String,
    #[garde(length(min = 1, max = 500))]
    pub summary: String,
    #[garde(length(max = 500))]
    pub image_url: Option<String>,
    #[garde(range(min = 1))]
    pub country_id: i32,
    #[garde(range(min = 1))]
    pub category_id: i32,
}

/// UpdateArticleRequest
///
/// Partial update: only `Some` fields are written. Reassigning `authorId` to another
/// user is an Admin-only operation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateArticleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(length(min = 1))]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(length(min = 1, max = 500))]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(length(max = 500))]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(range(min = 1))]
    pub country_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(range(min = 1))]
    pub category_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(range(min = 1))]
    pub author_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateCategoryRequest {
    #[garde(length(min = 1, max = 100))]
    pub name: String,
    #[garde(length(max = 500))]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    #[garde(skip)]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateCategoryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(length(max = 500))]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateCountryRequest {
    #[garde(length(min = 1, max = 100))]
    pub name: String,
    #[garde(length(min = 2, max = 3))]
    pub code: String,
    #[serde(default = "default_active")]
    #[garde(skip)]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateCountryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(length(min = 2, max = 3))]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub active: Option<bool>,
}

/// Minimum accepted password length for admin accounts.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// CreateUserRequest
///
/// The plain password is hashed before it reaches the repository and is never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateUserRequest {
    #[garde(length(min = 3, max = 50))]
    pub username: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1, max = 100))]
    pub full_name: String,
    #[garde(skip)]
    pub role: Role,
    #[serde(default = "default_active")]
    #[garde(skip)]
    pub active: bool,
    #[garde(length(chars, min = 6))]
    pub password: String,
}

/// UpdateUserRequest
///
/// A missing or blank `newPassword` keeps the stored hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(length(min = 3, max = 50))]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(email)]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub active: Option<bool>,
    // Length is checked by the handler after blank values are discarded.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub new_password: Option<String>,
}

fn default_active() -> bool {
    true
}
