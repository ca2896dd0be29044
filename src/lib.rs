use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod pagination;
pub mod policy;
pub mod repository;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use memory::InMemoryRepository;
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// The OpenAPI document, aggregated from every `#[utoipa::path]` handler and
/// `ToSchema` model. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::public::list_articles, handlers::public::get_article,
        handlers::public::featured_articles, handlers::public::articles_by_category,
        handlers::public::articles_by_country, handlers::public::list_categories,
        handlers::public::get_category, handlers::public::category_articles,
        handlers::public::list_countries, handlers::public::get_country,
        handlers::public::country_articles, handlers::public::health,
        handlers::account::login, handlers::account::logout, handlers::account::me,
        handlers::articles::dashboard, handlers::articles::list_articles,
        handlers::articles::get_article, handlers::articles::create_article,
        handlers::articles::update_article, handlers::articles::delete_article,
        handlers::categories::list_categories, handlers::categories::get_category,
        handlers::categories::create_category, handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::countries::list_countries, handlers::countries::get_country,
        handlers::countries::create_country, handlers::countries::update_country,
        handlers::countries::delete_country,
        handlers::users::list_users, handlers::users::get_user, handlers::users::create_user,
        handlers::users::update_user, handlers::users::delete_user
    ),
    components(
        schemas(
            models::Role, models::Article, models::ArticleSummary, models::PublicArticle,
            models::PublicCategory, models::PublicCountry, models::Category,
            models::Country, models::User, models::CategoryDetail, models::CountryDetail,
            models::UserDetail, models::DashboardStats, models::LoginRequest,
            models::LoginResponse, models::SessionProfile, models::CreateArticleRequest,
            models::UpdateArticleRequest, models::CreateCategoryRequest,
            models::UpdateCategoryRequest, models::CreateCountryRequest,
            models::UpdateCountryRequest, models::CreateUserRequest, models::UpdateUserRequest,
        )
    ),
    tags(
        (name = "news-portal", description = "News Portal API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared container handed to every request: the data access layer and the
/// immutable configuration. Cloning is cheap (an `Arc` and a small struct).
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres in production, in-memory in tests.
    pub repo: RepositoryState,
    /// Configuration: loaded once at startup.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Let extractors such as `AuthUser` pull single components out of the shared state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated and admin routers. Resolving `AuthUser` fails with 401 for
/// a missing, expired or revoked credential, so the handler never runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// cors_layer
///
/// Explicit origin allow-list with credentials (the session cookie). The pagination
/// headers are exposed so the browser client can read them.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
        .expose_headers([
            pagination::TOTAL_COUNT_HEADER,
            pagination::PAGE_HEADER,
            pagination::PER_PAGE_HEADER,
            pagination::TOTAL_PAGES_HEADER,
            HeaderName::from_static("x-request-id"),
        ])
}

/// create_router
///
/// Assembles the routing tree, applies the scoped authentication layer and the global
/// observability layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: No middleware applied.
        .merge(public::public_routes())
        // Authenticated Routes: a valid session is required.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin Routes: authenticated here, role policies in the handlers.
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // Request Tracing: one span per request, carrying the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: HTTP method, URI and the `x-request-id` set by the
/// request-id layer, so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
