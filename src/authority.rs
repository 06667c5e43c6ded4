use uuid::Uuid;

use crate::{
    filter::{build_manager_filter, build_prefix_filter, build_viewer_filter},
    hierarchy::{HierarchyLevel, HierarchySnapshot},
    models::{AdminLevel, ManagedNodeSet},
    position::{ActorPosition, ChainFields},
    predicate::{Clause, EntityKind, Field, Predicate},
};

/// ResolvedActor
///
/// Output of the position resolver: a chain-consistent position (or unscoped)
/// and, for administrators, their explicit grants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedActor {
    pub id: Uuid,
    pub admin_level: AdminLevel,
    pub position: ActorPosition,
    pub managed: ManagedNodeSet,
}

/// Grant
///
/// Where a level-bound administrator's authority comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Grant {
    /// Explicit node grants; covers every managed node's full subtree.
    Managed(ManagedNodeSet),
    /// The administrator's own position; strict prefix equality, no subtree
    /// expansion for content.
    OwnPosition(ActorPosition),
    /// Neither grants nor a position: manages nothing.
    Nothing,
}

/// Authority
///
/// The grant shape of an actor, as a single tagged value. Every manager-side
/// decision (list filters, point checks, targeting options) dispatches on this
/// type instead of re-deriving it from the admin level.
#[derive(Debug, Clone, PartialEq)]
pub enum Authority {
    GeneralSecretariat,
    Scoped { level: HierarchyLevel, grant: Grant },
    SelfOnly { actor_id: Uuid },
}

/// TargetingRoots
///
/// The nodes from which an author's targeting options are enumerated.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetingRoots {
    All,
    Subtrees(Vec<Uuid>),
    None,
}

impl Authority {
    /// Explicit grants take precedence over the administrator's own position.
    pub fn of(actor: &ResolvedActor) -> Self {
        let level = match actor.admin_level {
            AdminLevel::GeneralSecretariat => return Authority::GeneralSecretariat,
            AdminLevel::User => return Authority::SelfOnly { actor_id: actor.id },
            other => match other.hierarchy_level() {
                Some(level) => level,
                None => return Authority::SelfOnly { actor_id: actor.id },
            },
        };

        let grant = if !actor.managed.is_empty() {
            Grant::Managed(actor.managed.clone())
        } else if !actor.position.is_unscoped() {
            Grant::OwnPosition(actor.position.clone())
        } else {
            Grant::Nothing
        };
        Authority::Scoped { level, grant }
    }

    pub fn is_admin(&self) -> bool {
        !matches!(self, Authority::SelfOnly { .. })
    }

    /// manager_filter
    ///
    /// The predicate selecting every record of `entity` this authority manages.
    pub fn manager_filter(&self, snapshot: &HierarchySnapshot, entity: EntityKind) -> Predicate {
        match self {
            Authority::GeneralSecretariat => Predicate::everything(),
            Authority::Scoped { level, grant } => match grant {
                Grant::Managed(managed) => {
                    for (node_level, node_id) in self.grants_above_level() {
                        tracing::warn!(
                            %node_id,
                            node_level = node_level.as_str(),
                            admin_level = level.as_str(),
                            "grant sits above the administrator's level"
                        );
                    }
                    build_manager_filter(snapshot, managed)
                }
                Grant::OwnPosition(position) => match entity {
                    // Content must sit at exactly the admin's level.
                    EntityKind::Content => build_viewer_filter(position),
                    EntityKind::User => build_prefix_filter(position),
                },
                Grant::Nothing => Predicate::nothing(),
            },
            Authority::SelfOnly { actor_id } => match entity {
                EntityKind::User => {
                    let mut predicate = Predicate::from_clause(Clause::eq(Field::Id, *actor_id));
                    predicate.or(Clause::eq(Field::CreatedBy, *actor_id));
                    predicate
                }
                EntityKind::Content => {
                    Predicate::from_clause(Clause::eq(Field::CreatedBy, *actor_id))
                }
            },
        }
    }

    /// Explicit grants shallower than the administrator's own level. They are
    /// honored as given; callers only report them.
    pub fn grants_above_level(&self) -> Vec<(HierarchyLevel, Uuid)> {
        match self {
            Authority::Scoped {
                level,
                grant: Grant::Managed(managed),
            } => managed
                .iter()
                .filter(|(node_level, _)| node_level < level)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn targeting_roots(&self) -> TargetingRoots {
        match self {
            Authority::GeneralSecretariat => TargetingRoots::All,
            Authority::Scoped { grant, .. } => match grant {
                Grant::Managed(managed) => {
                    TargetingRoots::Subtrees(managed.iter().map(|(_, id)| id).collect())
                }
                Grant::OwnPosition(position) => match position.deepest() {
                    Some((_, id)) => TargetingRoots::Subtrees(vec![id]),
                    None => TargetingRoots::None,
                },
                Grant::Nothing => TargetingRoots::None,
            },
            Authority::SelfOnly { .. } => TargetingRoots::None,
        }
    }
}
