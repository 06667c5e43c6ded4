#![allow(dead_code)]

use chrono::{Duration, Utc};
use district_portal::{
    AppState, MemoryRepository,
    config::{AppConfig, Env},
    hierarchy::{HierarchyLevel, HierarchyNode},
    models::{AdminLevel, Content, ContentType, User},
    position::TargetPin,
};
use std::sync::Arc;
use uuid::Uuid;

// --- Hierarchy ---
//
// north ─┬─ north-a ── au1 ─┬─ d1
//        │                  └─ d2
//        └─ north-b (inactive)
// south ──── south-a

pub const NORTH: Uuid = Uuid::from_u128(0x1);
pub const SOUTH: Uuid = Uuid::from_u128(0x2);
pub const NORTH_A: Uuid = Uuid::from_u128(0x10);
pub const NORTH_B: Uuid = Uuid::from_u128(0x11);
pub const SOUTH_A: Uuid = Uuid::from_u128(0x12);
pub const AU1: Uuid = Uuid::from_u128(0x20);
pub const D1: Uuid = Uuid::from_u128(0x30);
pub const D2: Uuid = Uuid::from_u128(0x31);

// --- Accounts ---

pub const GS: Uuid = Uuid::from_u128(0x100);
/// Region admin granted `north` explicitly.
pub const R1: Uuid = Uuid::from_u128(0x101);
/// Region admin positioned at `north`, no grants.
pub const R_POS: Uuid = Uuid::from_u128(0x102);
/// Region admin with neither grants nor a position.
pub const R_EMPTY: Uuid = Uuid::from_u128(0x103);
pub const READER_D1: Uuid = Uuid::from_u128(0x104);
pub const READER_SOUTH: Uuid = Uuid::from_u128(0x105);

// --- Reports ---

pub const C_D1: Uuid = Uuid::from_u128(0x200);
pub const C_AU1: Uuid = Uuid::from_u128(0x201);
pub const C_D2: Uuid = Uuid::from_u128(0x202);
pub const C_NORTH_A: Uuid = Uuid::from_u128(0x203);
pub const C_NORTH: Uuid = Uuid::from_u128(0x204);
pub const C_SOUTH: Uuid = Uuid::from_u128(0x205);
pub const C_GLOBAL: Uuid = Uuid::from_u128(0x206);

pub fn node(
    id: Uuid,
    level: HierarchyLevel,
    name: &str,
    parent_id: Option<Uuid>,
    active: bool,
) -> HierarchyNode {
    HierarchyNode {
        id,
        level,
        name: name.to_string(),
        code: name.to_uppercase(),
        active,
        parent_id,
    }
}

pub fn user(id: Uuid, admin_level: AdminLevel, chain: [Option<Uuid>; 4]) -> User {
    User {
        id,
        email: format!("{id}@portal.test"),
        display_name: format!("user {id}"),
        admin_level,
        region_id: chain[0],
        locality_id: chain[1],
        admin_unit_id: chain[2],
        district_id: chain[3],
        created_by_id: None,
        created_at: Utc::now(),
    }
}

pub fn pin(chain: [Option<Uuid>; 4]) -> TargetPin {
    TargetPin {
        target_region_id: chain[0],
        target_locality_id: chain[1],
        target_admin_unit_id: chain[2],
        target_district_id: chain[3],
    }
}

pub fn content(
    id: Uuid,
    content_type: ContentType,
    pin: TargetPin,
    created_by_id: Uuid,
    age_minutes: i64,
) -> Content {
    Content {
        id,
        content_type,
        title: format!("item {id}"),
        body: String::new(),
        target_region_id: pin.target_region_id,
        target_locality_id: pin.target_locality_id,
        target_admin_unit_id: pin.target_admin_unit_id,
        target_district_id: pin.target_district_id,
        created_by_id,
        created_at: Utc::now() - Duration::minutes(age_minutes),
    }
}

pub const D1_CHAIN: [Option<Uuid>; 4] = [Some(NORTH), Some(NORTH_A), Some(AU1), Some(D1)];

pub fn hierarchy_nodes() -> Vec<HierarchyNode> {
    use HierarchyLevel::*;
    vec![
        node(NORTH, Region, "north", None, true),
        node(SOUTH, Region, "south", None, true),
        node(NORTH_A, Locality, "north-a", Some(NORTH), true),
        node(NORTH_B, Locality, "north-b", Some(NORTH), false),
        node(SOUTH_A, Locality, "south-a", Some(SOUTH), true),
        node(AU1, AdminUnit, "au1", Some(NORTH_A), true),
        node(D1, District, "d1", Some(AU1), true),
        node(D2, District, "d2", Some(AU1), true),
    ]
}

pub async fn seed_hierarchy(repo: &MemoryRepository) {
    for n in hierarchy_nodes() {
        repo.insert_node(n).await;
    }
}

/// Builds the shared fixture: the tree above, one account per authority shape
/// and one report per pin shape.
pub async fn seeded_repo() -> MemoryRepository {
    let repo = MemoryRepository::new();
    seed_hierarchy(&repo).await;

    let north_only = [Some(NORTH), None, None, None];
    repo.insert_user(user(GS, AdminLevel::GeneralSecretariat, [None; 4]))
        .await;
    repo.insert_user(user(R1, AdminLevel::Region, north_only)).await;
    repo.grant(R1, HierarchyLevel::Region, NORTH).await;
    repo.insert_user(user(R_POS, AdminLevel::Region, north_only))
        .await;
    repo.insert_user(user(R_EMPTY, AdminLevel::Region, [None; 4]))
        .await;
    repo.insert_user(user(READER_D1, AdminLevel::User, D1_CHAIN))
        .await;
    repo.insert_user(user(
        READER_SOUTH,
        AdminLevel::User,
        [Some(SOUTH), None, None, None],
    ))
    .await;

    let report = ContentType::Report;
    for (id, chain, age) in [
        (C_D1, D1_CHAIN, 1),
        (C_AU1, [Some(NORTH), Some(NORTH_A), Some(AU1), None], 2),
        (C_D2, [Some(NORTH), Some(NORTH_A), Some(AU1), Some(D2)], 3),
        (C_NORTH_A, [Some(NORTH), Some(NORTH_A), None, None], 4),
        (C_NORTH, north_only, 5),
        (C_SOUTH, [Some(SOUTH), None, None, None], 6),
        (C_GLOBAL, [None; 4], 7),
    ] {
        repo.insert_content(content(id, report, pin(chain), GS, age))
            .await;
    }

    repo
}

pub fn app_state(repo: MemoryRepository, env: Env) -> AppState {
    let config = AppConfig {
        env,
        ..AppConfig::default()
    };
    AppState {
        repo: Arc::new(repo),
        config,
    }
}

pub fn sorted_ids<I: IntoIterator<Item = Uuid>>(ids: I) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort();
    ids
}
