use crate::{AppState, handlers::account};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Session management for any signed-in user. The `auth_middleware` layer installed by
/// `create_router` rejects requests without a valid session before these handlers run.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /account/logout
        // Deletes the session row, so the token stops working before its expiry.
        .route("/account/logout", post(account::logout))
        // GET /account/me
        .route("/account/me", get(account::me))
}
