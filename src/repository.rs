use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::Result,
    hierarchy::{HierarchyLevel, HierarchyNode},
    models::{
        Actor, AdminLevel, Content, ContentType, ManagedNodeSet, NewContent, NewUser,
        UnknownAdminLevel, User,
    },
    predicate::{EntityKind, Predicate},
};

/// Repository Trait
///
/// The data-access contract the access engine relies on. Handlers and the
/// access service only ever see this trait, so the Postgres store and the
/// in-memory store are interchangeable.
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// safely shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Hierarchy (read-only) ---
    async fn get_node(&self, level: HierarchyLevel, id: Uuid) -> Result<Option<HierarchyNode>>;
    // One level down from the given node.
    async fn get_children(&self, level: HierarchyLevel, id: Uuid) -> Result<Vec<HierarchyNode>>;
    async fn list_nodes(&self, level: HierarchyLevel) -> Result<Vec<HierarchyNode>>;

    // --- Users ---
    // User row plus explicit grants.
    async fn get_actor(&self, id: Uuid) -> Result<Option<Actor>>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn query_users(&self, predicate: &Predicate) -> Result<Vec<User>>;
    async fn create_user(&self, user: NewUser) -> Result<User>;

    // --- Content ---
    async fn get_content(&self, content_type: ContentType, id: Uuid) -> Result<Option<Content>>;
    async fn query_content(
        &self,
        content_type: ContentType,
        predicate: &Predicate,
    ) -> Result<Vec<Content>>;
    // Single-row insert; the pin is written together with every other column.
    async fn create_content(&self, content_type: ContentType, content: NewContent)
    -> Result<Content>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Row Mapping ---

#[derive(FromRow)]
struct NodeRow {
    id: Uuid,
    name: String,
    code: String,
    active: bool,
    parent_id: Option<Uuid>,
}

impl NodeRow {
    fn into_node(self, level: HierarchyLevel) -> HierarchyNode {
        HierarchyNode {
            id: self.id,
            level,
            name: self.name,
            code: self.code,
            active: self.active,
            parent_id: self.parent_id,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    display_name: String,
    admin_level: String,
    region_id: Option<Uuid>,
    locality_id: Option<Uuid>,
    admin_unit_id: Option<Uuid>,
    district_id: Option<Uuid>,
    created_by_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        // An unrecognised rank degrades to an ordinary user rather than failing the read.
        let admin_level = row.admin_level.parse().unwrap_or_else(|err: UnknownAdminLevel| {
            tracing::warn!(user_id = %row.id, error = %err, "stored admin level not recognised");
            AdminLevel::User
        });
        User {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            admin_level,
            region_id: row.region_id,
            locality_id: row.locality_id,
            admin_unit_id: row.admin_unit_id,
            district_id: row.district_id,
            created_by_id: row.created_by_id,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ContentRow {
    id: Uuid,
    title: String,
    body: String,
    target_region_id: Option<Uuid>,
    target_locality_id: Option<Uuid>,
    target_admin_unit_id: Option<Uuid>,
    target_district_id: Option<Uuid>,
    created_by_id: Uuid,
    created_at: DateTime<Utc>,
}

impl ContentRow {
    fn into_content(self, content_type: ContentType) -> Content {
        Content {
            id: self.id,
            content_type,
            title: self.title,
            body: self.body,
            target_region_id: self.target_region_id,
            target_locality_id: self.target_locality_id,
            target_admin_unit_id: self.target_admin_unit_id,
            target_district_id: self.target_district_id,
            created_by_id: self.created_by_id,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct GrantRow {
    level: String,
    node_id: Uuid,
}

const USER_COLUMNS: &str = "id, email, display_name, admin_level, region_id, locality_id, \
     admin_unit_id, district_id, created_by_id, created_at";

const CONTENT_COLUMNS: &str = "id, title, body, target_region_id, target_locality_id, \
     target_admin_unit_id, target_district_id, created_by_id, created_at";

/// Node SELECT for one level. Table and column names come from
/// `HierarchyLevel`, never from input.
fn node_select(level: HierarchyLevel) -> String {
    format!(
        "SELECT id, name, code, active, {} AS parent_id FROM {}",
        level.parent_column().unwrap_or("NULL::uuid"),
        level.table()
    )
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Filters are rendered with `QueryBuilder` so every id is bound, never interpolated.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_node(&self, level: HierarchyLevel, id: Uuid) -> Result<Option<HierarchyNode>> {
        let sql = format!("{} WHERE id = $1", node_select(level));
        let row = sqlx::query_as::<_, NodeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.into_node(level)))
    }

    /// get_children
    ///
    /// Children of a node, ordered by name. Districts have no children.
    async fn get_children(&self, level: HierarchyLevel, id: Uuid) -> Result<Vec<HierarchyNode>> {
        let Some(child_level) = level.child() else {
            return Ok(Vec::new());
        };
        let Some(parent_column) = child_level.parent_column() else {
            return Ok(Vec::new());
        };
        let sql = format!(
            "{} WHERE {} = $1 ORDER BY name ASC",
            node_select(child_level),
            parent_column
        );
        let rows = sqlx::query_as::<_, NodeRow>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.into_node(child_level)).collect())
    }

    async fn list_nodes(&self, level: HierarchyLevel) -> Result<Vec<HierarchyNode>> {
        let sql = format!("{} ORDER BY name ASC", node_select(level));
        let rows = sqlx::query_as::<_, NodeRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.into_node(level)).collect())
    }

    /// get_actor
    ///
    /// Loads the user row and the grant rows. Grants on an unknown level are
    /// skipped with a warning.
    async fn get_actor(&self, id: Uuid) -> Result<Option<Actor>> {
        let Some(user) = self.get_user(id).await? else {
            return Ok(None);
        };

        let grants = sqlx::query_as::<_, GrantRow>(
            "SELECT level, node_id FROM managed_nodes WHERE user_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let mut managed = ManagedNodeSet::default();
        for grant in grants {
            match HierarchyLevel::parse_stored(&grant.level) {
                Some(level) => managed.grant(level, grant.node_id),
                None => tracing::warn!(user_id = %id, level = %grant.level, "unknown grant level"),
            }
        }
        Ok(Some(Actor { user, managed }))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn query_users(&self, predicate: &Predicate) -> Result<Vec<User>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE "));
        predicate.push_sql(&mut builder, EntityKind::User);
        builder.push(" ORDER BY email ASC");

        let rows = builder.build_query_as::<UserRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (id, email, display_name, admin_level, region_id, locality_id, \
             admin_unit_id, district_id, created_by_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW()) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(user.admin_level.as_str())
            .bind(user.position.region_id)
            .bind(user.position.locality_id)
            .bind(user.position.admin_unit_id)
            .bind(user.position.district_id)
            .bind(user.created_by_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn get_content(&self, content_type: ContentType, id: Uuid) -> Result<Option<Content>> {
        let sql = format!(
            "SELECT {CONTENT_COLUMNS} FROM {} WHERE id = $1",
            content_type.table()
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.into_content(content_type)))
    }

    /// query_content
    ///
    /// Renders the predicate against the pin columns of the content type's table.
    /// The always-false predicate renders as `WHERE FALSE`, so an empty grant
    /// set costs a single trivial round trip.
    async fn query_content(
        &self,
        content_type: ContentType,
        predicate: &Predicate,
    ) -> Result<Vec<Content>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {CONTENT_COLUMNS} FROM {} WHERE ",
            content_type.table()
        ));
        predicate.push_sql(&mut builder, EntityKind::Content);
        builder.push(" ORDER BY created_at DESC");

        let rows = builder
            .build_query_as::<ContentRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| r.into_content(content_type))
            .collect())
    }

    async fn create_content(
        &self,
        content_type: ContentType,
        content: NewContent,
    ) -> Result<Content> {
        let sql = format!(
            "INSERT INTO {} (id, title, body, target_region_id, target_locality_id, \
             target_admin_unit_id, target_district_id, created_by_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW()) RETURNING {CONTENT_COLUMNS}",
            content_type.table()
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&content.title)
            .bind(&content.body)
            .bind(content.pin.target_region_id)
            .bind(content.pin.target_locality_id)
            .bind(content.pin.target_admin_unit_id)
            .bind(content.pin.target_district_id)
            .bind(content.created_by_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into_content(content_type))
    }
}
