//! Structural component-set predicates.
//!
//! A predicate is three sets of component type handles: `all` (every member
//! present), `any` (at least one present, ignored when empty), and `none`
//! (no member present). The representation is storage-model-agnostic: the
//! same predicate evaluates against the live world and against captured
//! snapshot component sets.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::host::{EntityId, LiveDataSource};
use crate::schema::TypeHandle;
use crate::snapshot::SnapshotStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPredicate {
    all: HashSet<TypeHandle>,
    any: HashSet<TypeHandle>,
    none: HashSet<TypeHandle>,
}

impl QueryPredicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_all(&mut self, handle: impl Into<TypeHandle>) -> &mut Self {
        self.all.insert(handle.into());
        self
    }

    pub fn add_any(&mut self, handle: impl Into<TypeHandle>) -> &mut Self {
        self.any.insert(handle.into());
        self
    }

    pub fn add_none(&mut self, handle: impl Into<TypeHandle>) -> &mut Self {
        self.none.insert(handle.into());
        self
    }

    pub fn remove_all(&mut self, handle: &str) -> &mut Self {
        self.all.remove(handle);
        self
    }

    pub fn remove_any(&mut self, handle: &str) -> &mut Self {
        self.any.remove(handle);
        self
    }

    pub fn remove_none(&mut self, handle: &str) -> &mut Self {
        self.none.remove(handle);
        self
    }

    pub fn all(&self) -> &HashSet<TypeHandle> {
        &self.all
    }

    pub fn any(&self) -> &HashSet<TypeHandle> {
        &self.any
    }

    pub fn none(&self) -> &HashSet<TypeHandle> {
        &self.none
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.any.is_empty() && self.none.is_empty()
    }

    /// Set-membership test against one component set. Empty rule sets are
    /// vacuously satisfied; the three rule groups are ANDed.
    pub fn matches(&self, components: &[TypeHandle]) -> bool {
        if !self.all.is_empty() {
            let all_present = self
                .all
                .iter()
                .all(|required| components.iter().any(|c| c == required));
            if !all_present {
                return false;
            }
        }

        if !self.any.is_empty() {
            let any_present = self
                .any
                .iter()
                .any(|candidate| components.iter().any(|c| c == candidate));
            if !any_present {
                return false;
            }
        }

        if !self.none.is_empty() {
            let none_present = self
                .none
                .iter()
                .all(|excluded| !components.iter().any(|c| c == excluded));
            if !none_present {
                return false;
            }
        }

        true
    }

    /// Reject contradictory predicates before evaluation: a handle that is
    /// both required and excluded can never match anything.
    pub fn validate(&self) -> Result<ValidatedQuery> {
        for conflicting in self.all.intersection(&self.none) {
            return Err(Error::Validation(format!(
                "component '{conflicting}' is both required and excluded"
            )));
        }
        for conflicting in self.any.intersection(&self.none) {
            return Err(Error::Validation(format!(
                "component '{conflicting}' is both a candidate and excluded"
            )));
        }
        Ok(ValidatedQuery {
            id: Uuid::new_v4().to_string(),
            predicate: self.clone(),
        })
    }

    /// Matching entities in the live world, sorted by id.
    pub fn evaluate_live(&self, live: &dyn LiveDataSource) -> Vec<EntityId> {
        let mut matching: Vec<EntityId> = live
            .entity_ids()
            .into_iter()
            .filter(|&entity| self.matches(&live.component_types(entity)))
            .collect();
        matching.sort_unstable();
        matching
    }

    /// Matching entities among captured snapshots, sorted by id.
    pub fn evaluate_snapshots(&self, store: &SnapshotStore) -> Vec<EntityId> {
        let mut matching: Vec<EntityId> = store
            .entity_ids()
            .into_iter()
            .filter(|&entity| {
                store
                    .get(entity)
                    .map(|record| self.matches(&record.component_types))
                    .unwrap_or(false)
            })
            .collect();
        matching.sort_unstable();
        matching
    }

    /// Live match count, for the query UI's running tally.
    pub fn count_live(&self, live: &dyn LiveDataSource) -> usize {
        live.entity_ids()
            .into_iter()
            .filter(|&entity| self.matches(&live.component_types(entity)))
            .count()
    }
}

/// A predicate that passed validation, stamped for UI correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedQuery {
    pub id: String,
    pub predicate: QueryPredicate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handles(names: &[&str]) -> Vec<TypeHandle> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn all_and_none_rules_combine() {
        let mut predicate = QueryPredicate::new();
        predicate.add_all("X").add_none("Y");

        assert!(predicate.matches(&handles(&["X"])));
        assert!(!predicate.matches(&handles(&["X", "Y"])));
        assert!(!predicate.matches(&handles(&[])));
    }

    #[test]
    fn empty_rule_sets_are_vacuously_satisfied() {
        let predicate = QueryPredicate::new();
        assert!(predicate.matches(&handles(&[])));
        assert!(predicate.matches(&handles(&["Anything"])));
    }

    #[test]
    fn any_requires_at_least_one_member_when_non_empty() {
        let mut predicate = QueryPredicate::new();
        predicate.add_any("A").add_any("B");

        assert!(predicate.matches(&handles(&["B", "C"])));
        assert!(!predicate.matches(&handles(&["C"])));
    }

    #[test]
    fn validation_rejects_required_and_excluded_overlap() {
        let mut predicate = QueryPredicate::new();
        predicate.add_all("X").add_none("X");
        assert!(matches!(predicate.validate(), Err(Error::Validation(_))));

        let mut predicate = QueryPredicate::new();
        predicate.add_any("X").add_none("X");
        assert!(matches!(predicate.validate(), Err(Error::Validation(_))));

        let mut predicate = QueryPredicate::new();
        predicate.add_all("X").add_none("Y");
        let validated = predicate.validate().unwrap();
        assert!(!validated.id.is_empty());
    }

    #[test]
    fn removal_mirrors_addition() {
        let mut predicate = QueryPredicate::new();
        predicate.add_all("X").add_any("Y").add_none("Z");
        predicate.remove_all("X").remove_any("Y").remove_none("Z");
        assert!(predicate.is_empty());
    }
}
