use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AccessError, Result},
    position::{ActorPosition, ChainFields},
    repository::Repository,
};

/// HierarchyLevel
///
/// The four nesting levels of the administrative tree, ordered shallow to deep.
/// The derived `Ord` follows declaration order, so `Region < District`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum HierarchyLevel {
    Region,
    Locality,
    AdminUnit,
    District,
}

impl HierarchyLevel {
    pub const ALL: [HierarchyLevel; 4] = [
        HierarchyLevel::Region,
        HierarchyLevel::Locality,
        HierarchyLevel::AdminUnit,
        HierarchyLevel::District,
    ];

    /// Depth of the level: 0 for Region through 3 for District.
    pub fn index(self) -> usize {
        match self {
            HierarchyLevel::Region => 0,
            HierarchyLevel::Locality => 1,
            HierarchyLevel::AdminUnit => 2,
            HierarchyLevel::District => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The level one step shallower, `None` for Region.
    pub fn parent(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    /// The level one step deeper, `None` for District.
    pub fn child(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// Levels from Region down to and including `self`.
    pub fn and_shallower(self) -> impl Iterator<Item = HierarchyLevel> {
        Self::ALL.into_iter().take(self.index() + 1)
    }

    /// Levels strictly deeper than `self`.
    pub fn deeper(self) -> impl Iterator<Item = HierarchyLevel> {
        Self::ALL.into_iter().skip(self.index() + 1)
    }

    // --- Persisted layout ---

    pub fn table(self) -> &'static str {
        match self {
            HierarchyLevel::Region => "regions",
            HierarchyLevel::Locality => "localities",
            HierarchyLevel::AdminUnit => "admin_units",
            HierarchyLevel::District => "districts",
        }
    }

    /// Column on a node table that references the parent node.
    pub fn parent_column(self) -> Option<&'static str> {
        match self {
            HierarchyLevel::Region => None,
            HierarchyLevel::Locality => Some("region_id"),
            HierarchyLevel::AdminUnit => Some("locality_id"),
            HierarchyLevel::District => Some("admin_unit_id"),
        }
    }

    /// Position column on the `users` table.
    pub fn position_column(self) -> &'static str {
        match self {
            HierarchyLevel::Region => "region_id",
            HierarchyLevel::Locality => "locality_id",
            HierarchyLevel::AdminUnit => "admin_unit_id",
            HierarchyLevel::District => "district_id",
        }
    }

    /// Pin column on every content table.
    pub fn pin_column(self) -> &'static str {
        match self {
            HierarchyLevel::Region => "target_region_id",
            HierarchyLevel::Locality => "target_locality_id",
            HierarchyLevel::AdminUnit => "target_admin_unit_id",
            HierarchyLevel::District => "target_district_id",
        }
    }

    /// Stored form used by the `managed_nodes` grant table.
    pub fn as_str(self) -> &'static str {
        match self {
            HierarchyLevel::Region => "REGION",
            HierarchyLevel::Locality => "LOCALITY",
            HierarchyLevel::AdminUnit => "ADMIN_UNIT",
            HierarchyLevel::District => "DISTRICT",
        }
    }

    pub fn parse_stored(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == value)
    }
}

/// HierarchyNode
///
/// A single node of the tree. Regions carry no parent; every other node points
/// at a node exactly one level shallower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct HierarchyNode {
    pub id: Uuid,
    pub level: HierarchyLevel,
    pub name: String,
    pub code: String,
    pub active: bool,
    pub parent_id: Option<Uuid>,
}

/// HierarchySnapshot
///
/// A read-only, index-based arena of the whole tree, loaded once per request and
/// passed explicitly into every filter or placement computation.
///
/// Nodes are referenced by arena index rather than by pointer; traversals use an
/// explicit worklist so depth never grows the call stack and a snapshot can be
/// shared by independent computations without coordination.
#[derive(Debug, Clone, Default)]
pub struct HierarchySnapshot {
    nodes: Vec<HierarchyNode>,
    index: HashMap<Uuid, usize>,
    children: Vec<Vec<usize>>,
}

impl HierarchySnapshot {
    /// Builds the arena. Parent links are only accepted when the parent sits
    /// exactly one level shallower, which also rules out cycles.
    pub fn new(nodes: Vec<HierarchyNode>) -> Self {
        let mut index = HashMap::with_capacity(nodes.len());
        let mut kept = Vec::with_capacity(nodes.len());

        for node in nodes {
            if index.contains_key(&node.id) {
                tracing::warn!(node_id = %node.id, "duplicate hierarchy node id ignored");
                continue;
            }
            index.insert(node.id, kept.len());
            kept.push(node);
        }

        let mut children = vec![Vec::new(); kept.len()];
        for (slot, node) in kept.iter().enumerate() {
            let Some(parent_id) = node.parent_id else {
                continue;
            };
            match index.get(&parent_id) {
                Some(&parent) if Some(kept[parent].level) == node.level.parent() => {
                    children[parent].push(slot);
                }
                _ => tracing::warn!(
                    node_id = %node.id,
                    parent_id = %parent_id,
                    "hierarchy node has a missing or mis-levelled parent; left detached"
                ),
            }
        }

        Self {
            nodes: kept,
            index,
            children,
        }
    }

    /// load
    ///
    /// Fetches every level in parent-before-child order (one round trip per level).
    /// Any failure aborts the whole load; no partial snapshot is returned.
    pub async fn load(repo: &dyn Repository) -> Result<Self> {
        let mut nodes = Vec::new();
        for level in HierarchyLevel::ALL {
            nodes.extend(repo.list_nodes(level).await?);
        }
        tracing::debug!(nodes = nodes.len(), "hierarchy snapshot loaded");
        Ok(Self::new(nodes))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&HierarchyNode> {
        self.index.get(&id).map(|&slot| &self.nodes[slot])
    }

    /// Looks up a node and checks it lives at `level`.
    pub fn node_at(&self, level: HierarchyLevel, id: Uuid) -> Option<&HierarchyNode> {
        self.get(id).filter(|node| node.level == level)
    }

    pub fn nodes_at(&self, level: HierarchyLevel) -> impl Iterator<Item = &HierarchyNode> {
        self.nodes.iter().filter(move |node| node.level == level)
    }

    /// chain_of
    ///
    /// The full ancestor chain of a node, expressed as the position of an actor
    /// standing on that node. `None` if the node is unknown, sits at another
    /// level, or any ancestor link is broken.
    pub fn chain_of(&self, level: HierarchyLevel, id: Uuid) -> Option<ActorPosition> {
        let mut node = self.node_at(level, id)?;
        let mut chain = ActorPosition::default();
        chain.set(node.level, Some(node.id));

        while let Some(parent_level) = node.level.parent() {
            let parent = self.node_at(parent_level, node.parent_id?)?;
            chain.set(parent_level, Some(parent.id));
            node = parent;
        }
        Some(chain)
    }

    /// descendants
    ///
    /// Every node strictly below `id`, across all deeper levels, in breadth-first
    /// order. Unknown ids have no descendants.
    pub fn descendants(&self, id: Uuid) -> Vec<&HierarchyNode> {
        let Some(&root) = self.index.get(&id) else {
            return Vec::new();
        };

        let mut found = Vec::new();
        let mut worklist = VecDeque::from([root]);
        while let Some(slot) = worklist.pop_front() {
            for &child in &self.children[slot] {
                found.push(&self.nodes[child]);
                worklist.push_back(child);
            }
        }
        found
    }

    /// subtree
    ///
    /// The union of the given roots and all their descendants, each node listed
    /// once even when managed subtrees overlap. Unknown roots are skipped.
    pub fn subtree<I>(&self, roots: I) -> Vec<&HierarchyNode>
    where
        I: IntoIterator<Item = Uuid>,
    {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack: Vec<usize> = roots
            .into_iter()
            .filter_map(|id| self.index.get(&id).copied())
            .collect();
        let mut found = Vec::new();

        while let Some(slot) = stack.pop() {
            if std::mem::replace(&mut seen[slot], true) {
                continue;
            }
            found.push(&self.nodes[slot]);
            stack.extend(self.children[slot].iter().copied());
        }
        found
    }

    /// check_chain
    ///
    /// Verifies the chain-consistency invariant for a position or pin: the
    /// deepest set field names a known node at that level, and every shallower
    /// field equals that node's ancestor. The empty chain is trivially valid.
    pub fn check_chain<C: ChainFields + ?Sized>(&self, fields: &C) -> Result<()> {
        let Some((level, id)) = fields.deepest() else {
            return Ok(());
        };

        let expected = self.chain_of(level, id).ok_or_else(|| {
            AccessError::InvalidHierarchy(format!(
                "{} {} is not a known node with a complete ancestor chain",
                level.as_str(),
                id
            ))
        })?;

        for shallower in level.and_shallower() {
            if fields.at(shallower) != expected.at(shallower) {
                return Err(AccessError::InvalidHierarchy(format!(
                    "{} field does not match the ancestor of {} {}",
                    shallower.as_str(),
                    level.as_str(),
                    id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u128, level: HierarchyLevel, name: &str, parent: Option<u128>) -> HierarchyNode {
        HierarchyNode {
            id: Uuid::from_u128(id),
            level,
            name: name.to_string(),
            code: name.to_uppercase(),
            active: true,
            parent_id: parent.map(Uuid::from_u128),
        }
    }

    fn sample() -> HierarchySnapshot {
        HierarchySnapshot::new(vec![
            node(1, HierarchyLevel::Region, "north", None),
            node(2, HierarchyLevel::Locality, "north-a", Some(1)),
            node(3, HierarchyLevel::AdminUnit, "au1", Some(2)),
            node(4, HierarchyLevel::District, "d1", Some(3)),
            node(5, HierarchyLevel::District, "d2", Some(3)),
            node(6, HierarchyLevel::Region, "south", None),
        ])
    }

    #[test]
    fn level_navigation() {
        assert_eq!(HierarchyLevel::Region.parent(), None);
        assert_eq!(HierarchyLevel::District.child(), None);
        assert_eq!(
            HierarchyLevel::Locality.child(),
            Some(HierarchyLevel::AdminUnit)
        );
        assert_eq!(HierarchyLevel::AdminUnit.and_shallower().count(), 3);
        assert_eq!(HierarchyLevel::Locality.deeper().count(), 2);
        assert_eq!(
            HierarchyLevel::parse_stored("ADMIN_UNIT"),
            Some(HierarchyLevel::AdminUnit)
        );
    }

    #[test]
    fn descendants_cover_every_deeper_level() {
        let snapshot = sample();
        let ids: Vec<Uuid> = snapshot
            .descendants(Uuid::from_u128(1))
            .iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[0], Uuid::from_u128(2));
        assert!(snapshot.descendants(Uuid::from_u128(6)).is_empty());
        assert!(snapshot.descendants(Uuid::from_u128(99)).is_empty());
    }

    #[test]
    fn subtree_deduplicates_overlapping_roots() {
        let snapshot = sample();
        let nodes = snapshot.subtree([Uuid::from_u128(1), Uuid::from_u128(3)]);
        assert_eq!(nodes.len(), 5);
    }

    #[test]
    fn chain_of_district_is_complete() {
        let snapshot = sample();
        let chain = snapshot
            .chain_of(HierarchyLevel::District, Uuid::from_u128(5))
            .unwrap();
        assert_eq!(chain.region_id, Some(Uuid::from_u128(1)));
        assert_eq!(chain.locality_id, Some(Uuid::from_u128(2)));
        assert_eq!(chain.admin_unit_id, Some(Uuid::from_u128(3)));
        assert_eq!(chain.district_id, Some(Uuid::from_u128(5)));
        // Wrong level for a known id.
        assert!(
            snapshot
                .chain_of(HierarchyLevel::Region, Uuid::from_u128(5))
                .is_none()
        );
    }

    #[test]
    fn mislevelled_parent_is_detached() {
        let snapshot = HierarchySnapshot::new(vec![
            node(1, HierarchyLevel::Region, "north", None),
            // A district claiming a region as its parent.
            node(9, HierarchyLevel::District, "stray", Some(1)),
        ]);
        assert!(snapshot.descendants(Uuid::from_u128(1)).is_empty());
        assert!(
            snapshot
                .chain_of(HierarchyLevel::District, Uuid::from_u128(9))
                .is_none()
        );
    }

    #[test]
    fn check_chain_rejects_mismatched_ancestor() {
        let snapshot = sample();
        let good = snapshot
            .chain_of(HierarchyLevel::District, Uuid::from_u128(4))
            .unwrap();
        assert!(snapshot.check_chain(&good).is_ok());

        let mut bad = good.clone();
        bad.region_id = Some(Uuid::from_u128(6));
        assert!(matches!(
            snapshot.check_chain(&bad),
            Err(AccessError::InvalidHierarchy(_))
        ));

        let mut gap = good;
        gap.locality_id = None;
        assert!(snapshot.check_chain(&gap).is_err());

        assert!(snapshot.check_chain(&ActorPosition::default()).is_ok());
    }
}
