use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Account management. The router sits behind the authentication layer; the
/// ADMIN role itself is checked by every operation in `users`, so a valid
/// non-admin token gets 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /users, POST /users
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        // GET/PUT/DELETE /users/{id}
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        // GET /users/username/{username}
        .route(
            "/users/username/{username}",
            get(handlers::get_user_by_username),
        )
}
