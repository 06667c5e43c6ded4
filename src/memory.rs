use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::Result,
    hierarchy::{HierarchyLevel, HierarchyNode},
    models::{Actor, Content, ContentType, ManagedNodeSet, NewContent, NewUser, User},
    predicate::Predicate,
    repository::Repository,
};

#[derive(Default)]
struct MemoryState {
    nodes: Vec<HierarchyNode>,
    users: HashMap<Uuid, User>,
    grants: HashMap<Uuid, ManagedNodeSet>,
    content: HashMap<ContentType, Vec<Content>>,
}

/// MemoryRepository
///
/// A process-local `Repository` used by tests and local tooling. Predicates are
/// evaluated in memory with the same `Predicate::matches` the authorization
/// checks use, so list results and point checks stay comparable.
#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Seeding ---

    pub async fn insert_node(&self, node: HierarchyNode) {
        self.state.write().await.nodes.push(node);
    }

    pub async fn insert_user(&self, user: User) {
        self.state.write().await.users.insert(user.id, user);
    }

    pub async fn grant(&self, user_id: Uuid, level: HierarchyLevel, node_id: Uuid) {
        self.state
            .write()
            .await
            .grants
            .entry(user_id)
            .or_default()
            .grant(level, node_id);
    }

    pub async fn insert_content(&self, content: Content) {
        self.state
            .write()
            .await
            .content
            .entry(content.content_type)
            .or_default()
            .push(content);
    }

    /// Removes a node, leaving any children detached. Used to exercise
    /// concurrent tree edits.
    pub async fn remove_node(&self, id: Uuid) {
        self.state.write().await.nodes.retain(|node| node.id != id);
    }
}

fn by_name(nodes: &mut [HierarchyNode]) {
    nodes.sort_by(|a, b| a.name.cmp(&b.name));
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_node(&self, level: HierarchyLevel, id: Uuid) -> Result<Option<HierarchyNode>> {
        let state = self.state.read().await;
        Ok(state
            .nodes
            .iter()
            .find(|node| node.level == level && node.id == id)
            .cloned())
    }

    async fn get_children(&self, level: HierarchyLevel, id: Uuid) -> Result<Vec<HierarchyNode>> {
        let Some(child_level) = level.child() else {
            return Ok(Vec::new());
        };
        let state = self.state.read().await;
        let mut children: Vec<HierarchyNode> = state
            .nodes
            .iter()
            .filter(|node| node.level == child_level && node.parent_id == Some(id))
            .cloned()
            .collect();
        by_name(&mut children);
        Ok(children)
    }

    async fn list_nodes(&self, level: HierarchyLevel) -> Result<Vec<HierarchyNode>> {
        let state = self.state.read().await;
        let mut nodes: Vec<HierarchyNode> = state
            .nodes
            .iter()
            .filter(|node| node.level == level)
            .cloned()
            .collect();
        by_name(&mut nodes);
        Ok(nodes)
    }

    async fn get_actor(&self, id: Uuid) -> Result<Option<Actor>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).map(|user| Actor {
            user: user.clone(),
            managed: state.grants.get(&id).cloned().unwrap_or_default(),
        }))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn query_users(&self, predicate: &Predicate) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|user| predicate.matches(*user))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            display_name: user.display_name,
            admin_level: user.admin_level,
            region_id: user.position.region_id,
            locality_id: user.position.locality_id,
            admin_unit_id: user.position.admin_unit_id,
            district_id: user.position.district_id,
            created_by_id: user.created_by_id,
            created_at: Utc::now(),
        };
        self.insert_user(created.clone()).await;
        Ok(created)
    }

    async fn get_content(&self, content_type: ContentType, id: Uuid) -> Result<Option<Content>> {
        let state = self.state.read().await;
        Ok(state
            .content
            .get(&content_type)
            .and_then(|items| items.iter().find(|item| item.id == id))
            .cloned())
    }

    async fn query_content(
        &self,
        content_type: ContentType,
        predicate: &Predicate,
    ) -> Result<Vec<Content>> {
        let state = self.state.read().await;
        let mut items: Vec<Content> = state
            .content
            .get(&content_type)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| predicate.matches(*item))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn create_content(
        &self,
        content_type: ContentType,
        content: NewContent,
    ) -> Result<Content> {
        let created = Content {
            id: Uuid::new_v4(),
            content_type,
            title: content.title,
            body: content.body,
            target_region_id: content.pin.target_region_id,
            target_locality_id: content.pin.target_locality_id,
            target_admin_unit_id: content.pin.target_admin_unit_id,
            target_district_id: content.pin.target_district_id,
            created_by_id: content.created_by_id,
            created_at: Utc::now(),
        };
        self.insert_content(created.clone()).await;
        Ok(created)
    }
}
