//! Access service: the engine's operations composed over a [`Repository`].
//!
//! Every operation loads its own hierarchy snapshot, resolves the calling
//! actor, and assembles its result in memory before returning it. Nothing here
//! writes except the two creation operations, each a single insert.

use uuid::Uuid;

use crate::{
    authority::{Authority, ResolvedActor},
    error::{AccessError, Result},
    filter::build_viewer_filter,
    hierarchy::{HierarchyLevel, HierarchyNode, HierarchySnapshot},
    models::{
        Content, ContentType, CreateContentRequest, CreateUserRequest, NewContent,
        NewUser, TargetingOptions, User,
    },
    placement::{determine_content_hierarchy, determine_user_position, get_content_targeting_options},
    position::ActorPosition,
    predicate::EntityKind,
    repository::Repository,
};

// --- Position Resolver ---

/// resolve_actor
///
/// Loads the actor's position and, for administrators, their grants.
///
/// A stored position that breaks the chain-consistency invariant is not
/// repaired: it is logged and the actor is treated as unscoped, which forces
/// the restrictive empty-result default.
pub async fn resolve_actor(
    repo: &dyn Repository,
    snapshot: &HierarchySnapshot,
    actor_id: Uuid,
) -> Result<ResolvedActor> {
    let actor = repo
        .get_actor(actor_id)
        .await?
        .ok_or_else(|| AccessError::NotFound(format!("actor {actor_id}")))?;

    let stored = actor.user.position();
    let position = match snapshot.check_chain(&stored) {
        Ok(()) => stored,
        Err(e) => {
            tracing::warn!(%actor_id, error = %e, "inconsistent actor position; treating as unscoped");
            ActorPosition::default()
        }
    };

    let managed = if actor.user.admin_level.is_admin() {
        actor.managed
    } else {
        Default::default()
    };

    Ok(ResolvedActor {
        id: actor.user.id,
        admin_level: actor.user.admin_level,
        position,
        managed,
    })
}

async fn load_context(
    repo: &dyn Repository,
    actor_id: Uuid,
) -> Result<(HierarchySnapshot, ResolvedActor)> {
    let snapshot = HierarchySnapshot::load(repo).await?;
    let actor = resolve_actor(repo, &snapshot, actor_id).await?;
    Ok((snapshot, actor))
}

// --- Reader Side ---

/// visible_content
///
/// The reader feed: content pinned at exactly the actor's own level and chain.
pub async fn visible_content(
    repo: &dyn Repository,
    actor_id: Uuid,
    content_type: ContentType,
) -> Result<Vec<Content>> {
    let (_, actor) = load_context(repo, actor_id).await?;
    let filter = build_viewer_filter(&actor.position);
    if filter.is_nothing() {
        return Ok(Vec::new());
    }
    repo.query_content(content_type, &filter).await
}

// --- Manager Side ---

/// manageable_content
///
/// Every item of `content_type` the actor manages, per their authority.
pub async fn manageable_content(
    repo: &dyn Repository,
    actor_id: Uuid,
    content_type: ContentType,
) -> Result<Vec<Content>> {
    let (snapshot, actor) = load_context(repo, actor_id).await?;
    let filter = Authority::of(&actor).manager_filter(&snapshot, EntityKind::Content);
    if filter.is_nothing() {
        return Ok(Vec::new());
    }
    repo.query_content(content_type, &filter).await
}

pub async fn admin_reports(repo: &dyn Repository, actor_id: Uuid) -> Result<Vec<Content>> {
    manageable_content(repo, actor_id, ContentType::Report).await
}

/// manageable_users
///
/// Every account the actor manages. Ordinary users get themselves and the
/// accounts they created.
pub async fn manageable_users(repo: &dyn Repository, actor_id: Uuid) -> Result<Vec<User>> {
    let (snapshot, actor) = load_context(repo, actor_id).await?;
    let filter = Authority::of(&actor).manager_filter(&snapshot, EntityKind::User);
    if filter.is_nothing() {
        return Ok(Vec::new());
    }
    repo.query_users(&filter).await
}

// --- Authorization Predicates ---

/// can_manage_user
///
/// Point check equal to membership in `manageable_users(admin)`. A target that
/// does not resolve yields `false`; an admin that does not resolve is an error.
pub async fn can_manage_user(
    repo: &dyn Repository,
    admin_id: Uuid,
    target_user_id: Uuid,
) -> Result<bool> {
    let (snapshot, admin) = load_context(repo, admin_id).await?;
    let Some(target) = repo.get_user(target_user_id).await? else {
        return Ok(false);
    };
    let filter = Authority::of(&admin).manager_filter(&snapshot, EntityKind::User);
    Ok(filter.matches(&target))
}

/// can_manage_content
///
/// Point check equal to membership in `manageable_content(admin, content_type)`.
pub async fn can_manage_content(
    repo: &dyn Repository,
    admin_id: Uuid,
    content_type: ContentType,
    content_id: Uuid,
) -> Result<bool> {
    let (snapshot, admin) = load_context(repo, admin_id).await?;
    let Some(content) = repo.get_content(content_type, content_id).await? else {
        return Ok(false);
    };
    let filter = Authority::of(&admin).manager_filter(&snapshot, EntityKind::Content);
    Ok(filter.matches(&content))
}

// --- Placement ---

/// create_content
///
/// Pins the new item at the author's deepest level and inserts it in one write.
pub async fn create_content(
    repo: &dyn Repository,
    actor_id: Uuid,
    content_type: ContentType,
    request: CreateContentRequest,
) -> Result<Content> {
    let (_, actor) = load_context(repo, actor_id).await?;
    let pin = determine_content_hierarchy(&actor.position);
    tracing::info!(%actor_id, %content_type, global = pin.is_global(), "creating content");

    repo.create_content(
        content_type,
        NewContent {
            title: request.title,
            body: request.body,
            pin,
            created_by_id: actor.id,
        },
    )
    .await
}

/// create_user
///
/// Creates an account placed at the creating administrator's position. Only
/// administrators may create accounts, and only the General Secretariat may
/// create other administrators.
pub async fn create_user(
    repo: &dyn Repository,
    actor_id: Uuid,
    request: CreateUserRequest,
) -> Result<User> {
    let (_, actor) = load_context(repo, actor_id).await?;
    let authority = Authority::of(&actor);
    if !authority.is_admin() {
        return Err(AccessError::Forbidden);
    }

    let admin_level = request.admin_level.unwrap_or_default();
    if admin_level.is_admin() && authority != Authority::GeneralSecretariat {
        return Err(AccessError::Forbidden);
    }

    let position = determine_user_position(&actor.position);
    tracing::info!(%actor_id, %admin_level, "creating user");

    repo.create_user(NewUser {
        email: request.email,
        display_name: request.display_name,
        admin_level,
        position,
        created_by_id: Some(actor.id),
    })
    .await
}

pub async fn targeting_options(repo: &dyn Repository, actor_id: Uuid) -> Result<TargetingOptions> {
    let (snapshot, actor) = load_context(repo, actor_id).await?;
    Ok(get_content_targeting_options(&snapshot, &Authority::of(&actor)))
}

// --- Tree Lookups ---

pub async fn node(repo: &dyn Repository, level: HierarchyLevel, id: Uuid) -> Result<HierarchyNode> {
    repo.get_node(level, id)
        .await?
        .ok_or_else(|| AccessError::NotFound(format!("{} {id}", level.as_str())))
}

/// Children of an existing node; an unknown parent is `NotFound`, not an empty list.
pub async fn children(
    repo: &dyn Repository,
    level: HierarchyLevel,
    id: Uuid,
) -> Result<Vec<HierarchyNode>> {
    node(repo, level, id).await?;
    repo.get_children(level, id).await
}

