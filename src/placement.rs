use crate::{
    authority::{Authority, TargetingRoots},
    hierarchy::{HierarchyLevel, HierarchyNode, HierarchySnapshot},
    models::TargetingOptions,
    position::{ActorPosition, ChainFields, TargetPin},
};

/// determine_content_hierarchy
///
/// Pins new content at the creator's deepest set level and back-fills every
/// shallower field from the creator's chain; deeper fields stay null. An
/// unscoped creator produces a global pin.
///
/// The input is expected to be chain-consistent (the position resolver
/// guarantees this). Applying the function to the position implied by its own
/// output returns the same pin.
pub fn determine_content_hierarchy(position: &ActorPosition) -> TargetPin {
    TargetPin::from(&determine_user_position(position))
}

/// determine_user_position
///
/// Same placement rule for an account created under an actor's authority.
pub fn determine_user_position(position: &ActorPosition) -> ActorPosition {
    let mut placed = ActorPosition::default();
    if let Some((deepest, _)) = position.deepest() {
        for level in deepest.and_shallower() {
            placed.set(level, position.at(level));
        }
    }
    placed
}

/// get_content_targeting_options
///
/// Enumerates the nodes an author may target: the whole tree for the General
/// Secretariat, otherwise the full subtree of the authority's roots (the same
/// traversal as the manager filter). Inactive nodes are dropped and each level
/// is ordered by name.
pub fn get_content_targeting_options(
    snapshot: &HierarchySnapshot,
    authority: &Authority,
) -> TargetingOptions {
    let nodes: Vec<&HierarchyNode> = match authority.targeting_roots() {
        TargetingRoots::All => HierarchyLevel::ALL
            .into_iter()
            .flat_map(|level| snapshot.nodes_at(level))
            .collect(),
        TargetingRoots::Subtrees(roots) => snapshot.subtree(roots),
        TargetingRoots::None => Vec::new(),
    };

    let mut options = TargetingOptions::default();
    for node in nodes.into_iter().filter(|node| node.active) {
        let bucket = match node.level {
            HierarchyLevel::Region => &mut options.regions,
            HierarchyLevel::Locality => &mut options.localities,
            HierarchyLevel::AdminUnit => &mut options.admin_units,
            HierarchyLevel::District => &mut options.districts,
        };
        bucket.push(node.clone());
    }

    for bucket in [
        &mut options.regions,
        &mut options.localities,
        &mut options.admin_units,
        &mut options.districts,
    ] {
        bucket.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
    }
    options
}
