use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Visibility engine: pure, no I/O.
pub mod authority;
pub mod filter;
pub mod hierarchy;
pub mod placement;
pub mod position;
pub mod predicate;

// Storage and the per-operation service built on it.
pub mod access;
pub mod memory;
pub mod repository;

// HTTP surface and ambient concerns.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AccessError;
pub use memory::MemoryRepository;
pub use repository::{PostgresRepository, Repository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_me, handlers::get_node, handlers::get_children,
        handlers::get_visible_content, handlers::create_content, handlers::get_targeting_options,
        handlers::get_admin_content, handlers::get_admin_reports, handlers::get_manageable_users,
        handlers::create_user, handlers::can_manage_user, handlers::can_manage_content
    ),
    components(
        schemas(
            hierarchy::HierarchyLevel, hierarchy::HierarchyNode, position::ActorPosition,
            position::TargetPin, models::AdminLevel, models::ManagedNodeSet, models::User,
            models::ContentType, models::Content, models::CreateContentRequest,
            models::CreateUserRequest, models::TargetingOptions, models::ManageCheck,
        )
    ),
    tags(
        (name = "district-portal", description = "Hierarchy-scoped content and user administration")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Hierarchy, account and content store.
    pub repo: RepositoryState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

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
/// Runs the `AuthUser` extractor ahead of the authenticated routes. A failed
/// extraction rejects the request before the handler is reached.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree, the scoped auth layer and the observability
/// stack, then binds the shared state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin handlers extract `AuthUser` themselves and resolve authority per call.
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with the `x-request-id` set above.
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
