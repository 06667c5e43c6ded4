mod common;

use common::*;
use district_portal::{
    authority::{Authority, ResolvedActor},
    filter::{build_manager_filter, build_viewer_filter},
    hierarchy::{HierarchyLevel, HierarchySnapshot},
    models::{AdminLevel, ContentType, ManagedNodeSet},
    placement::determine_content_hierarchy,
    position::{ActorPosition, ChainFields, TargetPin},
    predicate::EntityKind,
};
use proptest::prelude::*;
use uuid::Uuid;

fn snapshot() -> HierarchySnapshot {
    HierarchySnapshot::new(hierarchy_nodes())
}

/// A chain-consistent position: unscoped, or the full chain of any fixture node.
fn position_strategy() -> impl Strategy<Value = ActorPosition> {
    prop::option::of(prop::sample::select(hierarchy_nodes())).prop_map(|node| match node {
        Some(node) => snapshot()
            .chain_of(node.level, node.id)
            .unwrap_or_default(),
        None => ActorPosition::default(),
    })
}

fn pin_strategy() -> impl Strategy<Value = TargetPin> {
    position_strategy().prop_map(|position| TargetPin::from(&position))
}

/// Arbitrary, possibly inconsistent, field assignments over a small id pool.
fn raw_position_strategy() -> impl Strategy<Value = ActorPosition> {
    let field = || prop::option::of((0u128..4).prop_map(Uuid::from_u128));
    (field(), field(), field(), field()).prop_map(|(r, l, a, d)| ActorPosition {
        region_id: r,
        locality_id: l,
        admin_unit_id: a,
        district_id: d,
    })
}

fn grants_strategy() -> impl Strategy<Value = ManagedNodeSet> {
    prop::sample::subsequence(hierarchy_nodes(), 0..4).prop_map(|nodes| {
        let mut managed = ManagedNodeSet::default();
        for node in nodes {
            managed.grant(node.level, node.id);
        }
        managed
    })
}

fn item(pin: TargetPin) -> district_portal::models::Content {
    content(Uuid::from_u128(0xc0), ContentType::Bulletin, pin, GS, 0)
}

fn in_subtree(snapshot: &HierarchySnapshot, managed: &ManagedNodeSet, pin: &TargetPin) -> bool {
    let covered: Vec<Uuid> = snapshot
        .subtree(managed.iter().map(|(_, id)| id))
        .into_iter()
        .map(|node| node.id)
        .collect();
    HierarchyLevel::ALL.into_iter().any(|level| {
        let field = match level {
            HierarchyLevel::Region => pin.target_region_id,
            HierarchyLevel::Locality => pin.target_locality_id,
            HierarchyLevel::AdminUnit => pin.target_admin_unit_id,
            HierarchyLevel::District => pin.target_district_id,
        };
        field.is_some_and(|id| covered.contains(&id))
    })
}

proptest! {
    #[test]
    fn viewer_filter_selects_exactly_the_own_pin(
        position in position_strategy(),
        pin in pin_strategy(),
    ) {
        let filter = build_viewer_filter(&position);
        let expected = !position.is_unscoped() && pin == TargetPin::from(&position);
        prop_assert_eq!(filter.matches(&item(pin)), expected);
    }

    #[test]
    fn unscoped_actor_sees_nothing(pin in pin_strategy()) {
        let filter = build_viewer_filter(&ActorPosition::default());
        prop_assert!(filter.is_nothing());
        prop_assert!(!filter.matches(&item(pin)));
    }

    #[test]
    fn manager_filter_covers_granted_subtrees(
        managed in grants_strategy(),
        pin in pin_strategy(),
    ) {
        let snapshot = snapshot();
        let filter = build_manager_filter(&snapshot, &managed);
        prop_assert_eq!(
            filter.matches(&item(pin.clone())),
            in_subtree(&snapshot, &managed, &pin)
        );
    }

    #[test]
    fn manager_view_contains_reader_view_inside_grant(
        position in position_strategy(),
        pin in pin_strategy(),
    ) {
        // An admin granted exactly the node a reader sits at manages what that reader sees.
        let snapshot = snapshot();
        let Some((level, id)) = position.deepest() else {
            return Ok(());
        };
        let mut managed = ManagedNodeSet::default();
        managed.grant(level, id);
        let admin = ResolvedActor {
            id: R1,
            admin_level: AdminLevel::Region,
            position: ActorPosition::default(),
            managed,
        };
        let manager = Authority::of(&admin).manager_filter(&snapshot, EntityKind::Content);
        let viewer = build_viewer_filter(&position);
        let record = item(pin);
        prop_assert!(!viewer.matches(&record) || manager.matches(&record));
    }

    #[test]
    fn general_secretariat_matches_every_pin(pin in pin_strategy()) {
        let gs = ResolvedActor {
            id: GS,
            admin_level: AdminLevel::GeneralSecretariat,
            ..Default::default()
        };
        let filter = Authority::of(&gs).manager_filter(&snapshot(), EntityKind::Content);
        prop_assert!(filter.matches(&item(pin)));
    }

    #[test]
    fn placement_is_idempotent(position in raw_position_strategy()) {
        let pin = determine_content_hierarchy(&position);
        prop_assert_eq!(determine_content_hierarchy(&pin.as_position()), pin);
    }

    #[test]
    fn placement_of_consistent_position_is_chain_consistent(position in position_strategy()) {
        let pin = determine_content_hierarchy(&position);
        prop_assert!(snapshot().check_chain(&pin).is_ok());
        prop_assert_eq!(pin.as_position(), position);
    }
}
