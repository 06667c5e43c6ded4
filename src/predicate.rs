use sqlx::{Postgres, QueryBuilder};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::{
    hierarchy::HierarchyLevel,
    models::{Content, User},
    position::ChainFields,
};

/// Field
///
/// A filterable attribute of a user or content record. Hierarchy fields are
/// addressed by level; the concrete column is chosen per entity at render time,
/// so one predicate can be evaluated against users (position columns) or
/// content (pin columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Id,
    CreatedBy,
    Level(HierarchyLevel),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Eq(Field, Uuid),
    IsNull(Field),
}

impl Condition {
    fn holds<R: Record + ?Sized>(&self, record: &R) -> bool {
        match *self {
            Condition::Eq(field, id) => record.field(field) == Some(id),
            Condition::IsNull(field) => record.field(field).is_none(),
        }
    }
}

/// Clause
///
/// A conjunction of conditions. The empty clause always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Clause {
    conditions: Vec<Condition>,
}

impl Clause {
    pub fn always() -> Self {
        Self::default()
    }

    pub fn eq(field: Field, id: Uuid) -> Self {
        Self::always().and_eq(field, id)
    }

    pub fn and_eq(mut self, field: Field, id: Uuid) -> Self {
        self.conditions.push(Condition::Eq(field, id));
        self
    }

    pub fn and_null(mut self, field: Field) -> Self {
        self.conditions.push(Condition::IsNull(field));
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn holds<R: Record + ?Sized>(&self, record: &R) -> bool {
        self.conditions.iter().all(|c| c.holds(record))
    }

    fn single_eq(&self) -> Option<(Field, Uuid)> {
        match self.conditions.as_slice() {
            [Condition::Eq(field, id)] => Some((*field, *id)),
            _ => None,
        }
    }
}

/// Predicate
///
/// A filter in disjunctive normal form: an OR of AND-clauses over field equality
/// and field-is-null tests. The empty disjunction matches nothing.
///
/// The same value is evaluated in memory by the authorization predicates and
/// rendered to SQL by the store, which keeps point checks and list results in
/// agreement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    clauses: Vec<Clause>,
    // Mirrors `clauses` for constant-time duplicate checks.
    seen: HashSet<Clause>,
}

impl Predicate {
    pub fn nothing() -> Self {
        Self::default()
    }

    pub fn everything() -> Self {
        Self::from_clause(Clause::always())
    }

    pub fn from_clause(clause: Clause) -> Self {
        let mut predicate = Self::nothing();
        predicate.or(clause);
        predicate
    }

    /// Adds a clause to the disjunction unless an identical one is present.
    pub fn or(&mut self, clause: Clause) {
        if self.seen.insert(clause.clone()) {
            self.clauses.push(clause);
        }
    }

    pub fn union(mut self, other: Predicate) -> Self {
        for clause in other.clauses {
            self.or(clause);
        }
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_nothing(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        self.clauses.iter().any(|clause| clause.holds(record))
    }

    /// push_sql
    ///
    /// Appends the predicate as a parenthesised boolean SQL expression.
    /// Single-equality clauses on the same column collapse into one
    /// `column = ANY($n)` test so a large subtree expansion binds one array per
    /// column instead of one parameter per node.
    pub fn push_sql(&self, builder: &mut QueryBuilder<'_, Postgres>, entity: EntityKind) {
        if self.clauses.is_empty() {
            builder.push("FALSE");
            return;
        }

        let mut grouped: BTreeMap<Field, Vec<Uuid>> = BTreeMap::new();
        let mut rest = Vec::new();
        for clause in &self.clauses {
            match clause.single_eq() {
                Some((field, id)) => grouped.entry(field).or_default().push(id),
                None => rest.push(clause),
            }
        }

        builder.push("(");
        let mut first = true;
        for (field, ids) in grouped {
            if !std::mem::take(&mut first) {
                builder.push(" OR ");
            }
            builder.push(entity.column(field));
            builder.push(" = ANY(");
            builder.push_bind(ids);
            builder.push(")");
        }

        for clause in rest {
            if !std::mem::take(&mut first) {
                builder.push(" OR ");
            }
            if clause.conditions.is_empty() {
                builder.push("TRUE");
                continue;
            }
            builder.push("(");
            for (i, condition) in clause.conditions.iter().enumerate() {
                if i > 0 {
                    builder.push(" AND ");
                }
                match *condition {
                    Condition::Eq(field, id) => {
                        builder.push(entity.column(field));
                        builder.push(" = ");
                        builder.push_bind(id);
                    }
                    Condition::IsNull(field) => {
                        builder.push(entity.column(field));
                        builder.push(" IS NULL");
                    }
                }
            }
            builder.push(")");
        }
        builder.push(")");
    }
}

/// EntityKind
///
/// Which family of records a predicate is rendered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Content,
}

impl EntityKind {
    pub fn column(self, field: Field) -> &'static str {
        match (self, field) {
            (_, Field::Id) => "id",
            (_, Field::CreatedBy) => "created_by_id",
            (EntityKind::User, Field::Level(level)) => level.position_column(),
            (EntityKind::Content, Field::Level(level)) => level.pin_column(),
        }
    }
}

/// Record
///
/// Field access for in-memory predicate evaluation.
pub trait Record {
    fn field(&self, field: Field) -> Option<Uuid>;
}

impl Record for User {
    fn field(&self, field: Field) -> Option<Uuid> {
        match field {
            Field::Id => Some(self.id),
            Field::CreatedBy => self.created_by_id,
            Field::Level(level) => self.position().at(level),
        }
    }
}

impl Record for Content {
    fn field(&self, field: Field) -> Option<Uuid> {
        match field {
            Field::Id => Some(self.id),
            Field::CreatedBy => Some(self.created_by_id),
            Field::Level(level) => self.pin().at(level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(predicate: &Predicate, entity: EntityKind) -> String {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT id FROM t WHERE ");
        predicate.push_sql(&mut builder, entity);
        builder.sql().to_string()
    }

    #[test]
    fn empty_predicate_renders_false() {
        assert_eq!(
            render(&Predicate::nothing(), EntityKind::Content),
            "SELECT id FROM t WHERE FALSE"
        );
        assert_eq!(
            render(&Predicate::everything(), EntityKind::Content),
            "SELECT id FROM t WHERE (TRUE)"
        );
    }

    #[test]
    fn single_equalities_collapse_per_column() {
        let mut predicate = Predicate::nothing();
        predicate.or(Clause::eq(
            Field::Level(HierarchyLevel::Region),
            Uuid::from_u128(1),
        ));
        predicate.or(Clause::eq(
            Field::Level(HierarchyLevel::Region),
            Uuid::from_u128(2),
        ));
        predicate.or(Clause::eq(
            Field::Level(HierarchyLevel::District),
            Uuid::from_u128(3),
        ));
        assert_eq!(
            render(&predicate, EntityKind::Content),
            "SELECT id FROM t WHERE (target_region_id = ANY($1) OR target_district_id = ANY($2))"
        );
        assert_eq!(
            render(&predicate, EntityKind::User),
            "SELECT id FROM t WHERE (region_id = ANY($1) OR district_id = ANY($2))"
        );
    }

    #[test]
    fn conjunctions_render_with_null_tests() {
        let clause = Clause::eq(Field::Level(HierarchyLevel::Region), Uuid::from_u128(1))
            .and_null(Field::Level(HierarchyLevel::Locality));
        let predicate = Predicate::from_clause(clause);
        assert_eq!(
            render(&predicate, EntityKind::Content),
            "SELECT id FROM t WHERE ((target_region_id = $1 AND target_locality_id IS NULL))"
        );
    }

    #[test]
    fn duplicate_clauses_are_dropped() {
        let clause = Clause::eq(Field::Id, Uuid::from_u128(7));
        let predicate = Predicate::from_clause(clause.clone()).union(Predicate::from_clause(clause));
        assert_eq!(predicate.clauses().len(), 1);
    }

    #[test]
    fn repeated_or_keeps_first_seen_order() {
        let a = Clause::eq(Field::Id, Uuid::from_u128(1));
        let b = Clause::eq(Field::CreatedBy, Uuid::from_u128(2));
        let mut predicate = Predicate::nothing();
        for clause in [&a, &b, &a, &b, &a] {
            predicate.or(clause.clone());
        }
        assert_eq!(predicate.clauses(), &[a, b][..]);
    }

    #[test]
    fn evaluates_against_users() {
        let user = User {
            id: Uuid::from_u128(10),
            region_id: Some(Uuid::from_u128(1)),
            ..Default::default()
        };
        let by_region = Predicate::from_clause(Clause::eq(
            Field::Level(HierarchyLevel::Region),
            Uuid::from_u128(1),
        ));
        assert!(by_region.matches(&user));
        assert!(!Predicate::nothing().matches(&user));
        assert!(Predicate::everything().matches(&user));

        let creator = Predicate::from_clause(Clause::eq(Field::CreatedBy, Uuid::from_u128(10)));
        assert!(!creator.matches(&user));
    }
}
