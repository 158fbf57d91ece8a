use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// The only endpoints reachable without a bearer token: the liveness probe and
/// the login gateway that issues tokens.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/login
        // Credentials in, signed session token out.
        .route("/auth/login", post(handlers::login))
}
