use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::hierarchy::HierarchyLevel;

/// ChainFields
///
/// Shared read access to anything shaped like a (region, locality, admin unit,
/// district) chain: actor positions on users and target pins on content.
pub trait ChainFields {
    fn at(&self, level: HierarchyLevel) -> Option<Uuid>;

    /// The deepest level with a value, with that value.
    fn deepest(&self) -> Option<(HierarchyLevel, Uuid)> {
        HierarchyLevel::ALL
            .into_iter()
            .rev()
            .find_map(|level| self.at(level).map(|id| (level, id)))
    }

    fn is_empty(&self) -> bool {
        self.deepest().is_none()
    }

    /// True when no field shallower than the deepest one is missing.
    fn is_prefix_closed(&self) -> bool {
        match self.deepest() {
            None => true,
            Some((level, _)) => level.and_shallower().all(|l| self.at(l).is_some()),
        }
    }
}

/// ActorPosition
///
/// An actor's own place in the tree. An actor with no fields set is unscoped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ActorPosition {
    pub region_id: Option<Uuid>,
    pub locality_id: Option<Uuid>,
    pub admin_unit_id: Option<Uuid>,
    pub district_id: Option<Uuid>,
}

impl ActorPosition {
    pub fn set(&mut self, level: HierarchyLevel, value: Option<Uuid>) {
        let slot = match level {
            HierarchyLevel::Region => &mut self.region_id,
            HierarchyLevel::Locality => &mut self.locality_id,
            HierarchyLevel::AdminUnit => &mut self.admin_unit_id,
            HierarchyLevel::District => &mut self.district_id,
        };
        *slot = value;
    }

    pub fn is_unscoped(&self) -> bool {
        self.is_empty()
    }
}

impl ChainFields for ActorPosition {
    fn at(&self, level: HierarchyLevel) -> Option<Uuid> {
        match level {
            HierarchyLevel::Region => self.region_id,
            HierarchyLevel::Locality => self.locality_id,
            HierarchyLevel::AdminUnit => self.admin_unit_id,
            HierarchyLevel::District => self.district_id,
        }
    }
}

/// TargetPin
///
/// The level and node a content item is scoped to. All-null is a global pin.
/// Written once at creation and never changed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TargetPin {
    pub target_region_id: Option<Uuid>,
    pub target_locality_id: Option<Uuid>,
    pub target_admin_unit_id: Option<Uuid>,
    pub target_district_id: Option<Uuid>,
}

impl TargetPin {
    pub fn global() -> Self {
        Self::default()
    }

    pub fn is_global(&self) -> bool {
        self.is_empty()
    }

    /// The position of an actor standing exactly where this pin points.
    pub fn as_position(&self) -> ActorPosition {
        ActorPosition {
            region_id: self.target_region_id,
            locality_id: self.target_locality_id,
            admin_unit_id: self.target_admin_unit_id,
            district_id: self.target_district_id,
        }
    }
}

impl From<&ActorPosition> for TargetPin {
    fn from(position: &ActorPosition) -> Self {
        Self {
            target_region_id: position.region_id,
            target_locality_id: position.locality_id,
            target_admin_unit_id: position.admin_unit_id,
            target_district_id: position.district_id,
        }
    }
}

impl ChainFields for TargetPin {
    fn at(&self, level: HierarchyLevel) -> Option<Uuid> {
        match level {
            HierarchyLevel::Region => self.target_region_id,
            HierarchyLevel::Locality => self.target_locality_id,
            HierarchyLevel::AdminUnit => self.target_admin_unit_id,
            HierarchyLevel::District => self.target_district_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deepest_picks_the_deepest_set_field() {
        let position = ActorPosition {
            region_id: Some(Uuid::from_u128(1)),
            locality_id: Some(Uuid::from_u128(2)),
            ..Default::default()
        };
        assert_eq!(
            position.deepest(),
            Some((HierarchyLevel::Locality, Uuid::from_u128(2)))
        );
        assert!(position.is_prefix_closed());
        assert!(ActorPosition::default().is_unscoped());
    }

    #[test]
    fn gap_in_chain_is_not_prefix_closed() {
        let pin = TargetPin {
            target_region_id: Some(Uuid::from_u128(1)),
            target_admin_unit_id: Some(Uuid::from_u128(3)),
            ..Default::default()
        };
        assert!(!pin.is_prefix_closed());
        assert!(!pin.is_global());
    }
}
