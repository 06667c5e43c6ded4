//! Viewer- and manager-side filter construction.
//!
//! Both builders produce a [`Predicate`] addressed by hierarchy level, so the
//! result can be rendered against content pins or user positions alike.

use crate::{
    hierarchy::{HierarchyLevel, HierarchySnapshot},
    models::ManagedNodeSet,
    position::{ActorPosition, ChainFields},
    predicate::{Clause, Field, Predicate},
};

/// build_viewer_filter
///
/// Upward-only visibility for an ordinary reader: content pinned at exactly the
/// reader's deepest level with the reader's chain.
///
/// One clause is built per field-presence branch, keyed on the actor's own
/// deepest field, so a chain-consistent position yields exactly one clause:
/// - district set: all four pin fields equal the reader's chain;
/// - admin unit set: region, locality and admin unit equal, district null;
/// - locality set: region and locality equal, admin unit and district null;
/// - region set: region equal, everything deeper null.
///
/// An unscoped reader gets the always-false predicate; global content is not
/// visible through this filter.
pub fn build_viewer_filter(position: &ActorPosition) -> Predicate {
    match position.deepest() {
        Some((level, _)) => Predicate::from_clause(exact_level_clause(position, level)),
        None => Predicate::nothing(),
    }
}

/// build_prefix_filter
///
/// Strict prefix equality down to the position's deepest field, with deeper
/// fields unconstrained. Used for users under a single-position administrator.
pub fn build_prefix_filter(position: &ActorPosition) -> Predicate {
    let Some((deepest, _)) = position.deepest() else {
        return Predicate::nothing();
    };
    Predicate::from_clause(prefix_clause(position, deepest))
}

/// build_manager_filter
///
/// Full subtree coverage for explicit node grants. For every managed node a
/// direct clause `field(level) == node` is added, followed by one direct clause
/// per descendant at the descendant's own level. All clauses are OR-ed.
///
/// A grant naming a node absent from the snapshot still contributes its direct
/// clause but expands to nothing. An empty grant set matches nothing.
///
/// Cost is linear in the number of descendants of all managed nodes.
pub fn build_manager_filter(snapshot: &HierarchySnapshot, managed: &ManagedNodeSet) -> Predicate {
    let mut predicate = Predicate::nothing();

    for (level, node_id) in managed.iter() {
        predicate.or(Clause::eq(Field::Level(level), node_id));

        if snapshot.node_at(level, node_id).is_none() {
            tracing::debug!(%node_id, level = level.as_str(), "managed node not in hierarchy snapshot");
            continue;
        }
        for descendant in snapshot.descendants(node_id) {
            predicate.or(Clause::eq(Field::Level(descendant.level), descendant.id));
        }
    }

    tracing::debug!(clauses = predicate.clauses().len(), "manager filter built");
    predicate
}

fn prefix_clause(position: &ActorPosition, deepest: HierarchyLevel) -> Clause {
    deepest
        .and_shallower()
        .fold(Clause::always(), |clause, level| match position.at(level) {
            Some(id) => clause.and_eq(Field::Level(level), id),
            None => clause.and_null(Field::Level(level)),
        })
}

fn exact_level_clause(position: &ActorPosition, deepest: HierarchyLevel) -> Clause {
    deepest
        .deeper()
        .fold(prefix_clause(position, deepest), |clause, level| {
            clause.and_null(Field::Level(level))
        })
}
