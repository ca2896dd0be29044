use crate::{
    AppState,
    handlers::{account, public},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Read-only news API consumed by the SPA, plus the login endpoint. Every read here is
/// restricted to active records at the repository level.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        .route("/health", get(public::health))
        // POST /account/login
        // Issues a session credential (body + HttpOnly cookie).
        .route("/account/login", post(account::login))
        // GET /api/Noticias?paisId=&categoriaId=&busqueda=&pagina=&porPagina=
        // Paginated listing; metadata in the X-Total-Count/X-Page/X-Per-Page/X-Total-Pages headers.
        .route("/api/Noticias", get(public::list_articles))
        // GET /api/Noticias/Destacadas?cantidad=
        .route("/api/Noticias/Destacadas", get(public::featured_articles))
        .route(
            "/api/Noticias/PorCategoria/{categoriaId}",
            get(public::articles_by_category),
        )
        .route("/api/Noticias/PorPais/{paisId}", get(public::articles_by_country))
        .route("/api/Noticias/{id}", get(public::get_article))
        .route("/api/Categorias", get(public::list_categories))
        .route("/api/Categorias/{id}", get(public::get_category))
        .route("/api/Categorias/{id}/Noticias", get(public::category_articles))
        .route("/api/Paises", get(public::list_countries))
        .route("/api/Paises/{id}", get(public::get_country))
        .route("/api/Paises/{id}/Noticias", get(public::country_articles))
}
