use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes available to any caller holding a valid token. Role and district
/// checks happen in the service functions the handlers call, so a valid token
/// alone never grants write access or widens a district operator's view.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /auth/me
        .route("/auth/me", get(handlers::get_me))
        // --- Reference Data ---
        .route("/ibans/eco-codes", get(handlers::get_eco_codes))
        .route("/ibans/raions", get(handlers::get_districts))
        // GET /ibans/localities/{districtCode}
        // Drives the dependent locality dropdown. Unknown districts give [].
        .route(
            "/ibans/localities/{districtCode}",
            get(handlers::get_localities),
        )
        // --- Reads (scoped to the caller's district where applicable) ---
        // GET /ibans, POST /ibans
        .route(
            "/ibans",
            get(handlers::list_ibans).post(handlers::create_iban),
        )
        // GET /ibans/filter?year&ecoCode&districtCode&localityCode
        .route("/ibans/filter", get(handlers::filter_ibans))
        // GET /ibans/raion/{districtCode}?year
        .route(
            "/ibans/raion/{districtCode}",
            get(handlers::get_ibans_by_district),
        )
        // GET /ibans/export?...same filters
        // CSV attachment, same rows and order as /ibans/filter.
        .route("/ibans/export", get(handlers::export_ibans))
        // --- Single Record ---
        // Writes are restricted to ADMIN and OPERATOR inside the handlers.
        .route(
            "/ibans/{id}",
            get(handlers::get_iban)
                .put(handlers::update_iban)
                .delete(handlers::delete_iban),
        )
}
