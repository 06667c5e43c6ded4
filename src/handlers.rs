use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState, access,
    auth::AuthUser,
    error::AccessError,
    hierarchy::{HierarchyLevel, HierarchyNode},
    models::{
        Content, ContentType, CreateContentRequest, CreateUserRequest, ManageCheck,
        TargetingOptions, User,
    },
};

// Content types arrive as free-form path segments and are validated here,
// before any hierarchy traversal happens.
fn parse_content_type(segment: &str) -> Result<ContentType, AccessError> {
    segment.parse()
}

// --- Profile & Hierarchy ---

/// get_me
///
/// [Authenticated Route] The caller's own account record.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, AccessError> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| AccessError::NotFound(format!("user {id}")))?;
    Ok(Json(user))
}

/// get_node
///
/// [Authenticated Route] A single hierarchy node.
#[utoipa::path(
    get,
    path = "/hierarchy/{level}/{id}",
    params(
        ("level" = HierarchyLevel, Path, description = "Node level"),
        ("id" = Uuid, Path, description = "Node ID")
    ),
    responses(
        (status = 200, description = "Node", body = HierarchyNode),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_node(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((level, id)): Path<(HierarchyLevel, Uuid)>,
) -> Result<Json<HierarchyNode>, AccessError> {
    Ok(Json(access::node(state.repo.as_ref(), level, id).await?))
}

/// get_children
///
/// [Authenticated Route] The nodes one level below a node, ordered by name.
#[utoipa::path(
    get,
    path = "/hierarchy/{level}/{id}/children",
    params(
        ("level" = HierarchyLevel, Path, description = "Parent level"),
        ("id" = Uuid, Path, description = "Parent ID")
    ),
    responses((status = 200, description = "Children", body = [HierarchyNode]))
)]
pub async fn get_children(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((level, id)): Path<(HierarchyLevel, Uuid)>,
) -> Result<Json<Vec<HierarchyNode>>, AccessError> {
    Ok(Json(access::children(state.repo.as_ref(), level, id).await?))
}

// --- Reader Side ---

/// get_visible_content
///
/// [Authenticated Route] The caller's feed: content pinned at exactly their own
/// level and chain. Unscoped callers receive an empty list.
#[utoipa::path(
    get,
    path = "/content/{content_type}",
    params(("content_type" = String, Path, description = "bulletins | surveys | voting-items | reports")),
    responses(
        (status = 200, description = "Visible content", body = [Content]),
        (status = 400, description = "Unsupported content type")
    )
)]
pub async fn get_visible_content(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
    Path(content_type): Path<String>,
) -> Result<Json<Vec<Content>>, AccessError> {
    let content_type = parse_content_type(&content_type)?;
    Ok(Json(
        access::visible_content(state.repo.as_ref(), id, content_type).await?,
    ))
}

/// create_content
///
/// [Authenticated Route] Creates content pinned at the author's deepest level.
#[utoipa::path(
    post,
    path = "/content/{content_type}",
    params(("content_type" = String, Path, description = "bulletins | surveys | voting-items | reports")),
    request_body = CreateContentRequest,
    responses((status = 201, description = "Created", body = Content))
)]
pub async fn create_content(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
    Path(content_type): Path<String>,
    Json(payload): Json<CreateContentRequest>,
) -> Result<(StatusCode, Json<Content>), AccessError> {
    let content_type = parse_content_type(&content_type)?;
    let content = access::create_content(state.repo.as_ref(), id, content_type, payload).await?;
    Ok((StatusCode::CREATED, Json(content)))
}

/// get_targeting_options
///
/// [Authenticated Route] Active nodes the caller may target, per level.
#[utoipa::path(
    get,
    path = "/me/targeting-options",
    responses((status = 200, description = "Targeting options", body = TargetingOptions))
)]
pub async fn get_targeting_options(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<TargetingOptions>, AccessError> {
    Ok(Json(access::targeting_options(state.repo.as_ref(), id).await?))
}

// --- Manager Side ---

/// get_admin_content
///
/// [Admin Route] Every item of a content type the caller manages.
/// Administrators without grants receive an empty list, not an error.
#[utoipa::path(
    get,
    path = "/admin/content/{content_type}",
    params(("content_type" = String, Path, description = "bulletins | surveys | voting-items | reports")),
    responses((status = 200, description = "Manageable content", body = [Content]))
)]
pub async fn get_admin_content(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
    Path(content_type): Path<String>,
) -> Result<Json<Vec<Content>>, AccessError> {
    let content_type = parse_content_type(&content_type)?;
    Ok(Json(
        access::manageable_content(state.repo.as_ref(), id, content_type).await?,
    ))
}

/// get_admin_reports
///
/// [Admin Route] Shorthand for the reports the caller manages.
#[utoipa::path(
    get,
    path = "/admin/reports",
    responses((status = 200, description = "Manageable reports", body = [Content]))
)]
pub async fn get_admin_reports(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Content>>, AccessError> {
    Ok(Json(access::admin_reports(state.repo.as_ref(), id).await?))
}

/// get_manageable_users
///
/// [Admin Route] Every account the caller manages.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses((status = 200, description = "Manageable users", body = [User]))
)]
pub async fn get_manageable_users(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, AccessError> {
    Ok(Json(access::manageable_users(state.repo.as_ref(), id).await?))
}

/// create_user
///
/// [Admin Route] Creates an account at the caller's position.
///
/// *RBAC*: ordinary users are refused with 403, and only the General
/// Secretariat may create administrators.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn create_user(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AccessError> {
    let user = access::create_user(state.repo.as_ref(), id, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// can_manage_user
///
/// [Admin Route] Whether the caller manages the given account. Unknown
/// accounts answer `false`.
#[utoipa::path(
    get,
    path = "/admin/users/{id}/can-manage",
    params(("id" = Uuid, Path, description = "Target user ID")),
    responses((status = 200, description = "Decision", body = ManageCheck))
)]
pub async fn can_manage_user(
    AuthUser { id: admin_id }: AuthUser,
    State(state): State<AppState>,
    Path(target_id): Path<Uuid>,
) -> Result<Json<ManageCheck>, AccessError> {
    let allowed = access::can_manage_user(state.repo.as_ref(), admin_id, target_id).await?;
    Ok(Json(ManageCheck { allowed }))
}

/// can_manage_content
///
/// [Admin Route] Whether the caller manages the given content item.
#[utoipa::path(
    get,
    path = "/admin/content/{content_type}/{id}/can-manage",
    params(
        ("content_type" = String, Path, description = "bulletins | surveys | voting-items | reports"),
        ("id" = Uuid, Path, description = "Content ID")
    ),
    responses(
        (status = 200, description = "Decision", body = ManageCheck),
        (status = 400, description = "Unsupported content type")
    )
)]
pub async fn can_manage_content(
    AuthUser { id: admin_id }: AuthUser,
    State(state): State<AppState>,
    Path((content_type, content_id)): Path<(String, Uuid)>,
) -> Result<Json<ManageCheck>, AccessError> {
    let content_type = parse_content_type(&content_type)?;
    let allowed =
        access::can_manage_content(state.repo.as_ref(), admin_id, content_type, content_id).await?;
    Ok(Json(ManageCheck { allowed }))
}
