use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Manager-side views, nested under `/admin`. The set returned by each listing
/// route and the answer of the matching `can-manage` route come from the same
/// filter, so they never disagree.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/reports
        .route("/reports", get(handlers::get_admin_reports))
        // GET /admin/content/{content_type}
        // Subtree-expanded for explicit grants, exact-level for single-position admins.
        .route("/content/{content_type}", get(handlers::get_admin_content))
        .route(
            "/content/{content_type}/{id}/can-manage",
            get(handlers::can_manage_content),
        )
        // GET/POST /admin/users
        .route(
            "/users",
            get(handlers::get_manageable_users).post(handlers::create_user),
        )
        .route("/users/{id}/can-manage", get(handlers::can_manage_user))
}
