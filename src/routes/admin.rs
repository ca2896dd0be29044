use crate::{
    AppState,
    handlers::{articles, categories, countries, users},
};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// The management surface, nested under `/admin` and wrapped in the authentication
/// layer. Role checks happen in the handlers:
/// - EditorOrAdmin: dashboard and articles (Editors limited to their own articles).
/// - AdminOnly: categories, countries and users.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/dashboard
        .route("/dashboard", get(articles::dashboard))
        // --- Articles ---
        .route(
            "/articles",
            get(articles::list_articles).post(articles::create_article),
        )
        .route(
            "/articles/{id}",
            get(articles::get_article)
                .put(articles::update_article)
                .delete(articles::delete_article),
        )
        // --- Categories ---
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        // --- Countries ---
        .route(
            "/countries",
            get(countries::list_countries).post(countries::create_country),
        )
        .route(
            "/countries/{id}",
            get(countries::get_country)
                .put(countries::update_country)
                .delete(countries::delete_country),
        )
        // --- Users ---
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
}
