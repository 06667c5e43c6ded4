use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes for any caller holding a valid session. Every handler receives the
/// validated `AuthUser` and resolves the caller's position from the store.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::get_me))
        // GET /me/targeting-options
        // Nodes the caller may target when authoring, per level, active only.
        .route("/me/targeting-options", get(handlers::get_targeting_options))
        // --- Tree lookups (read-only) ---
        .route("/hierarchy/{level}/{id}", get(handlers::get_node))
        .route("/hierarchy/{level}/{id}/children", get(handlers::get_children))
        // GET/POST /content/{content_type}
        // Reader feed (exact-level visibility) and creation pinned at the author's position.
        .route(
            "/content/{content_type}",
            get(handlers::get_visible_content).post(handlers::create_content),
        )
}
