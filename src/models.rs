use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AccessError,
    hierarchy::{HierarchyLevel, HierarchyNode},
    position::{ActorPosition, TargetPin},
};

// --- Roles & Grants ---

/// AdminLevel
///
/// The single level, if any, an actor administers broadly. Stored as the
/// upper-case text form (`GENERAL_SECRETARIAT`, `REGION`, ..., `USER`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum AdminLevel {
    GeneralSecretariat,
    Region,
    Locality,
    AdminUnit,
    District,
    #[default]
    User,
}

impl AdminLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AdminLevel::GeneralSecretariat => "GENERAL_SECRETARIAT",
            AdminLevel::Region => "REGION",
            AdminLevel::Locality => "LOCALITY",
            AdminLevel::AdminUnit => "ADMIN_UNIT",
            AdminLevel::District => "DISTRICT",
            AdminLevel::User => "USER",
        }
    }

    pub fn is_admin(self) -> bool {
        self != AdminLevel::User
    }

    /// The hierarchy level administered, for the four level-bound ranks.
    pub fn hierarchy_level(self) -> Option<HierarchyLevel> {
        match self {
            AdminLevel::Region => Some(HierarchyLevel::Region),
            AdminLevel::Locality => Some(HierarchyLevel::Locality),
            AdminLevel::AdminUnit => Some(HierarchyLevel::AdminUnit),
            AdminLevel::District => Some(HierarchyLevel::District),
            AdminLevel::GeneralSecretariat | AdminLevel::User => None,
        }
    }
}

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored or submitted admin level is not one of the known ranks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown admin level {0}")]
pub struct UnknownAdminLevel(pub String);

impl FromStr for AdminLevel {
    type Err = UnknownAdminLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GENERAL_SECRETARIAT" => Ok(AdminLevel::GeneralSecretariat),
            "REGION" => Ok(AdminLevel::Region),
            "LOCALITY" => Ok(AdminLevel::Locality),
            "ADMIN_UNIT" => Ok(AdminLevel::AdminUnit),
            "DISTRICT" => Ok(AdminLevel::District),
            "USER" => Ok(AdminLevel::User),
            other => Err(UnknownAdminLevel(other.to_string())),
        }
    }
}

/// ManagedNodeSet
///
/// Explicit node grants held by an administrator, one list per level. Several
/// disjoint nodes at the same level are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ManagedNodeSet {
    pub managed_regions: Vec<Uuid>,
    pub managed_localities: Vec<Uuid>,
    pub managed_admin_units: Vec<Uuid>,
    pub managed_districts: Vec<Uuid>,
}

impl ManagedNodeSet {
    pub fn at(&self, level: HierarchyLevel) -> &[Uuid] {
        match level {
            HierarchyLevel::Region => &self.managed_regions,
            HierarchyLevel::Locality => &self.managed_localities,
            HierarchyLevel::AdminUnit => &self.managed_admin_units,
            HierarchyLevel::District => &self.managed_districts,
        }
    }

    /// Adds a grant, ignoring duplicates.
    pub fn grant(&mut self, level: HierarchyLevel, node_id: Uuid) {
        let list = match level {
            HierarchyLevel::Region => &mut self.managed_regions,
            HierarchyLevel::Locality => &mut self.managed_localities,
            HierarchyLevel::AdminUnit => &mut self.managed_admin_units,
            HierarchyLevel::District => &mut self.managed_districts,
        };
        if !list.contains(&node_id) {
            list.push(node_id);
        }
    }

    pub fn is_empty(&self) -> bool {
        HierarchyLevel::ALL
            .into_iter()
            .all(|level| self.at(level).is_empty())
    }

    /// Every granted node with its level, shallowest level first.
    pub fn iter(&self) -> impl Iterator<Item = (HierarchyLevel, Uuid)> + '_ {
        HierarchyLevel::ALL
            .into_iter()
            .flat_map(move |level| self.at(level).iter().map(move |&id| (level, id)))
    }
}

// --- Users ---

/// User
///
/// An account record from the `users` table. The four position columns are
/// independently nullable and must form a consistent ancestor chain.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub admin_level: AdminLevel,
    pub region_id: Option<Uuid>,
    pub locality_id: Option<Uuid>,
    pub admin_unit_id: Option<Uuid>,
    pub district_id: Option<Uuid>,
    // Administrator that created this account, if any.
    pub created_by_id: Option<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn position(&self) -> ActorPosition {
        ActorPosition {
            region_id: self.region_id,
            locality_id: self.locality_id,
            admin_unit_id: self.admin_unit_id,
            district_id: self.district_id,
        }
    }
}

/// Actor
///
/// A user together with the explicit grants recorded for them.
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub user: User,
    pub managed: ManagedNodeSet,
}

/// NewUser
///
/// A fully resolved user record ready for a single atomic insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    pub admin_level: AdminLevel,
    pub position: ActorPosition,
    pub created_by_id: Option<Uuid>,
}

// --- Content ---

/// ContentType
///
/// The recognised content kinds; each has its own table with an identical layout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ContentType {
    Bulletin,
    Survey,
    Voting,
    Report,
}

impl ContentType {
    pub fn table(self) -> &'static str {
        match self {
            ContentType::Bulletin => "bulletins",
            ContentType::Survey => "surveys",
            ContentType::Voting => "voting_items",
            ContentType::Report => "reports",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Accepts the URL segment forms used by the API (`bulletins`, `voting-items`, ...).
impl FromStr for ContentType {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bulletin" | "bulletins" => Ok(ContentType::Bulletin),
            "survey" | "surveys" => Ok(ContentType::Survey),
            "voting" | "voting-items" | "voting_items" => Ok(ContentType::Voting),
            "report" | "reports" => Ok(ContentType::Report),
            other => Err(AccessError::UnsupportedEntityType(other.to_string())),
        }
    }
}

/// Content
///
/// A bulletin, survey, voting item or report. The `target_*` columns hold the
/// pin written at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Content {
    pub id: Uuid,
    pub content_type: ContentType,
    pub title: String,
    pub body: String,
    pub target_region_id: Option<Uuid>,
    pub target_locality_id: Option<Uuid>,
    pub target_admin_unit_id: Option<Uuid>,
    pub target_district_id: Option<Uuid>,
    pub created_by_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl Content {
    pub fn pin(&self) -> TargetPin {
        TargetPin {
            target_region_id: self.target_region_id,
            target_locality_id: self.target_locality_id,
            target_admin_unit_id: self.target_admin_unit_id,
            target_district_id: self.target_district_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewContent {
    pub title: String,
    pub body: String,
    pub pin: TargetPin,
    pub created_by_id: Uuid,
}

// --- Request Payloads ---

/// CreateContentRequest
///
/// Input payload for `POST /content/{content_type}`. The pin is never taken
/// from the client; it is derived from the author's position.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateContentRequest {
    pub title: String,
    pub body: String,
}

/// CreateUserRequest
///
/// Input payload for `POST /admin/users`. The new account is placed at the
/// creating administrator's position.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateUserRequest {
    pub email: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_level: Option<AdminLevel>,
}

// --- Responses ---

/// TargetingOptions
///
/// Nodes an author may target, per level, active only, ordered by name.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct TargetingOptions {
    pub regions: Vec<HierarchyNode>,
    pub localities: Vec<HierarchyNode>,
    pub admin_units: Vec<HierarchyNode>,
    pub districts: Vec<HierarchyNode>,
}

impl TargetingOptions {
    pub fn at(&self, level: HierarchyLevel) -> &[HierarchyNode] {
        match level {
            HierarchyLevel::Region => &self.regions,
            HierarchyLevel::Locality => &self.localities,
            HierarchyLevel::AdminUnit => &self.admin_units,
            HierarchyLevel::District => &self.districts,
        }
    }

    pub fn is_empty(&self) -> bool {
        HierarchyLevel::ALL
            .into_iter()
            .all(|level| self.at(level).is_empty())
    }
}

/// ManageCheck
///
/// Result body of the point authorization endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct ManageCheck {
    pub allowed: bool,
}
