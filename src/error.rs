use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// AccessError
///
/// The error taxonomy of the access engine and the service built around it.
///
/// *Mapping*: every variant converts into an HTTP status through `IntoResponse`,
/// so handlers can simply return `Result<Json<T>, AccessError>` and use `?`.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// An actor, node or record id did not resolve. Point predicates never
    /// raise this; only top-level resolution calls do.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored position or pin violates the chain-consistency invariant.
    #[error("invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    /// A content-type argument outside the recognised set.
    #[error("unsupported entity type: {0}")]
    UnsupportedEntityType(String),

    /// The caller holds no authority for the requested write.
    #[error("forbidden")]
    Forbidden,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, AccessError>;

impl AccessError {
    pub fn status(&self) -> StatusCode {
        match self {
            AccessError::NotFound(_) => StatusCode::NOT_FOUND,
            AccessError::InvalidHierarchy(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AccessError::UnsupportedEntityType(_) => StatusCode::BAD_REQUEST,
            AccessError::Forbidden => StatusCode::FORBIDDEN,
            AccessError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Store failures are logged in full but never echoed to the client.
        let message = match &self {
            AccessError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
