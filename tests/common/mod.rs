#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use news_portal::{
    AppConfig, AppState, InMemoryRepository, create_router,
    auth::hash_password,
    models::{
        Article, Category, Country, CreateCategoryRequest, CreateCountryRequest, Role, User,
    },
    repository::{NewArticle, NewUser, RepositoryState},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "secret123";

/// Fixture records shared by the router tests.
pub struct Seed {
    pub honduras: Country,
    pub guatemala: Country,
    pub hidden_country: Country,
    pub sports: Category,
    pub politics: Category,
    pub hidden_category: Category,
    pub admin: User,
    pub editor: User,
    pub other_editor: User,
    pub retired: User,
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub seed: Seed,
}

impl TestApp {
    pub fn repo(&self) -> &RepositoryState {
        &self.state.repo
    }

    /// Sends a request through the full router and decodes the body as JSON.
    /// Empty bodies decode to `Value::Null`, non-JSON bodies to `Value::String`.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        send(&self.router, request).await
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, headers, body)
}

/// Local config with the `x-user-id` bypass switched on, so router tests can act as a
/// seeded user without logging in first.
pub fn test_config() -> AppConfig {
    AppConfig {
        dev_bypass: true,
        ..AppConfig::default()
    }
}

pub async fn spawn_with(repo: RepositoryState, config: AppConfig) -> TestApp {
    let state = AppState { repo, config };
    let seed = seed(&state.repo).await;
    let router = create_router(state.clone());
    TestApp {
        state,
        router,
        seed,
    }
}

pub async fn spawn() -> TestApp {
    spawn_with(Arc::new(InMemoryRepository::new()), test_config()).await
}

async fn user(repo: &RepositoryState, username: &str, role: Role, active: bool) -> User {
    repo.create_user(NewUser {
        username: username.to_string(),
        email: format!("{username}@noticias.test"),
        full_name: format!("{username} full name"),
        role,
        active,
        password_hash: hash_password(PASSWORD, 4).unwrap(),
    })
    .await
    .unwrap()
}

async fn country(repo: &RepositoryState, name: &str, code: &str, active: bool) -> Country {
    repo.create_country(CreateCountryRequest {
        name: name.to_string(),
        code: code.to_string(),
        active,
    })
    .await
    .unwrap()
}

async fn category(repo: &RepositoryState, name: &str, active: bool) -> Category {
    repo.create_category(CreateCategoryRequest {
        name: name.to_string(),
        description: Some(format!("{name} news")),
        active,
    })
    .await
    .unwrap()
}

pub async fn seed(repo: &RepositoryState) -> Seed {
    Seed {
        honduras: country(repo, "Honduras", "HN", true).await,
        guatemala: country(repo, "Guatemala", "GT", true).await,
        hidden_country: country(repo, "Atlantis", "AT", false).await,
        sports: category(repo, "Deportes", true).await,
        politics: category(repo, "Politica", true).await,
        hidden_category: category(repo, "Archivo", false).await,
        admin: user(repo, "admin", Role::Admin, true).await,
        editor: user(repo, "editor", Role::Editor, true).await,
        other_editor: user(repo, "reporter", Role::Editor, true).await,
        retired: user(repo, "retired", Role::Editor, false).await,
    }
}

/// Builder for fixture articles. Defaults: active, Honduras, Deportes.
pub struct ArticleFixture<'a> {
    pub title: String,
    pub minutes_ago: i64,
    pub active: bool,
    pub country: &'a Country,
    pub category: &'a Category,
    pub author: &'a User,
}

impl<'a> ArticleFixture<'a> {
    pub fn new(seed: &'a Seed, title: &str, author: &'a User) -> Self {
        Self {
            title: title.to_string(),
            minutes_ago: 0,
            active: true,
            country: &seed.honduras,
            category: &seed.sports,
            author,
        }
    }

    pub fn minutes_ago(mut self, minutes: i64) -> Self {
        self.minutes_ago = minutes;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn in_country(mut self, country: &'a Country) -> Self {
        self.country = country;
        self
    }

    pub fn in_category(mut self, category: &'a Category) -> Self {
        self.category = category;
        self
    }

    pub async fn insert(self, repo: &RepositoryState) -> Article {
        repo.create_article(NewArticle {
            title: self.title.clone(),
            body: format!("Body of {}", self.title),
            summary: format!("Summary of {}", self.title),
            image_url: None,
            published_at: Utc::now() - Duration::minutes(self.minutes_ago),
            active: self.active,
            country_id: self.country.id,
            category_id: self.category.id,
            author_id: self.author.id,
        })
        .await
        .unwrap()
    }
}

// --- Request builders ---

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// A request authenticated through the local `x-user-id` bypass.
pub fn as_user(method: Method, uri: &str, user: &User, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", user.id.to_string());
    with_json(builder, body)
}

pub fn with_bearer(method: Method, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    with_json(builder, body)
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    with_json(Request::builder().method(method).uri(uri), Some(body))
}

fn with_json(builder: axum::http::request::Builder, body: Option<Value>) -> Request<Body> {
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn login(
    app: &TestApp,
    username: &str,
    password: &str,
) -> (StatusCode, HeaderMap, Value) {
    app.send(json_request(
        Method::POST,
        "/account/login",
        serde_json::json!({ "username": username, "password": password }),
    ))
    .await
}

pub fn ids(body: &Value) -> Vec<i64> {
    ids_by(body, "id")
}

/// Ids of a public article listing, which keeps the client's `noticiaId` key.
pub fn noticia_ids(body: &Value) -> Vec<i64> {
    ids_by(body, "noticiaId")
}

fn ids_by(body: &Value, key: &str) -> Vec<i64> {
    body.as_array()
        .expect("expected a JSON array")
        .iter()
        .map(|item| item[key].as_i64().unwrap())
        .collect()
}
