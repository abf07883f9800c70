//! Role-based action permissions.
//!
//! The ACL table maps action names to the roles permitted to perform
//! them. It is loaded once from configuration and only ever replaced
//! wholesale by an explicit [`reload`](AclEvaluator::reload); readers
//! always observe a consistent snapshot.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::engine::Identity;

/// Mapping from action name to the set of roles permitted to perform it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclTable {
    actions: HashMap<String, HashSet<String>>,
}

impl AclTable {
    /// Builds a table from `(action, roles)` entries, e.g. the `acl`
    /// section of the configuration file.
    pub fn new<A, R>(entries: impl IntoIterator<Item = (A, Vec<R>)>) -> Self
    where
        A: Into<String>,
        R: Into<String>,
    {
        Self {
            actions: entries
                .into_iter()
                .map(|(action, roles)| {
                    (action.into(), roles.into_iter().map(Into::into).collect())
                })
                .collect(),
        }
    }

    /// True when any of `roles` is configured for `action`.
    #[must_use]
    pub fn allows(&self, action: &str, roles: &[String]) -> bool {
        self.actions
            .get(action)
            .is_some_and(|allowed| roles.iter().any(|role| allowed.contains(role)))
    }

    /// Actions whose configured roles intersect the given roles.
    #[must_use]
    pub fn permitted_actions(&self, roles: &[String]) -> HashSet<String> {
        self.actions
            .iter()
            .filter(|(_, allowed)| roles.iter().any(|role| allowed.contains(role)))
            .map(|(action, _)| action.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// How a set of actions must be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Require {
    /// Every action must be permitted.
    All,
    /// At least one action must be permitted.
    Any,
}

/// Answers permission questions against an atomically swappable table.
pub struct AclEvaluator {
    table: ArcSwap<AclTable>,
}

impl AclEvaluator {
    #[must_use]
    pub fn new(table: AclTable) -> Self {
        Self {
            table: ArcSwap::from_pointee(table),
        }
    }

    /// Atomically replaces the table. In-flight readers keep the
    /// snapshot they already loaded.
    pub fn reload(&self, table: AclTable) {
        self.table.store(Arc::new(table));
    }

    /// A consistent snapshot of the current table.
    #[must_use]
    pub fn snapshot(&self) -> Arc<AclTable> {
        self.table.load_full()
    }

    /// Actions the identity's roles permit.
    #[must_use]
    pub fn permitted_actions(&self, identity: &Identity) -> HashSet<String> {
        self.table.load().permitted_actions(&identity.roles)
    }

    /// True when the identity may perform the action.
    #[must_use]
    pub fn can(&self, identity: &Identity, action: &str) -> bool {
        self.table.load().allows(action, &identity.roles)
    }

    /// Checks a set of actions, short-circuiting per [`Require`].
    ///
    /// `All` over an empty set is vacuously true; `Any` over an empty
    /// set is false.
    #[must_use]
    pub fn can_set(&self, identity: &Identity, actions: &[&str], require: Require) -> bool {
        let table = self.table.load();
        match require {
            Require::All => actions
                .iter()
                .all(|action| table.allows(action, &identity.roles)),
            Require::Any => actions
                .iter()
                .any(|action| table.allows(action, &identity.roles)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(roles: &[&str]) -> Identity {
        Identity {
            id: Some("u1".into()),
            api_key: Some("key-1".into()),
            roles: roles.iter().map(ToString::to_string).collect(),
        }
    }

    fn table() -> AclTable {
        AclTable::new([
            ("things.index", vec!["reader", "admin"]),
            ("things.create", vec!["admin"]),
            ("things.delete", vec!["admin"]),
        ])
    }

    #[test]
    fn permitted_actions_requires_role_intersection() {
        let actions = table().permitted_actions(&["reader".into()]);
        assert_eq!(actions, HashSet::from(["things.index".to_string()]));

        let actions = table().permitted_actions(&["admin".into()]);
        assert_eq!(actions.len(), 3);

        assert!(table().permitted_actions(&["nobody".into()]).is_empty());
    }

    #[test]
    fn can_checks_single_actions() {
        let acl = AclEvaluator::new(table());
        let reader = identity(&["reader"]);
        assert!(acl.can(&reader, "things.index"));
        assert!(!acl.can(&reader, "things.create"));
        assert!(!acl.can(&reader, "unconfigured.action"));
    }

    #[test]
    fn can_set_all_requires_every_action() {
        let acl = AclEvaluator::new(table());
        let admin = identity(&["admin"]);
        let reader = identity(&["reader"]);

        assert!(acl.can_set(&admin, &["things.index", "things.create"], Require::All));
        assert!(!acl.can_set(&reader, &["things.index", "things.create"], Require::All));
    }

    #[test]
    fn can_set_any_requires_one_action() {
        let acl = AclEvaluator::new(table());
        let reader = identity(&["reader"]);

        assert!(acl.can_set(&reader, &["things.create", "things.index"], Require::Any));
        assert!(!acl.can_set(&reader, &["things.create", "things.delete"], Require::Any));
    }

    #[test]
    fn empty_action_sets() {
        let acl = AclEvaluator::new(table());
        let reader = identity(&["reader"]);
        assert!(acl.can_set(&reader, &[], Require::All));
        assert!(!acl.can_set(&reader, &[], Require::Any));
    }

    #[test]
    fn anonymous_identity_is_never_permitted() {
        let acl = AclEvaluator::new(table());
        assert!(!acl.can(&Identity::anonymous(), "things.index"));
    }

    #[test]
    fn reload_swaps_table_without_disturbing_existing_snapshots() {
        let acl = AclEvaluator::new(table());
        let reader = identity(&["reader"]);

        let before = acl.snapshot();
        acl.reload(AclTable::new([("things.index", vec!["admin"])]));

        // The old snapshot still answers with the old table.
        assert!(before.allows("things.index", &reader.roles));
        // New reads see the new table.
        assert!(!acl.can(&reader, "things.index"));
    }
}
