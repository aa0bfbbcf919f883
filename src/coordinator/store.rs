use crate::domain::{GroupBinding, GroupId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Concurrent map from group id to its current binding
///
/// All mutations that depend on the current state of a binding (first-writer-wins insertion
/// and guarded removal) are evaluated while holding the same write guard, so a binding can
/// never be replaced or evicted based on a stale read.
#[derive(Debug, Default)]
pub struct GroupBindingStore {
    bindings: RwLock<HashMap<GroupId, GroupBinding>>,
}

impl GroupBindingStore {
    /// Creates a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section leaves the map consistent, a panic elsewhere does not corrupt it
    fn read(&self) -> RwLockReadGuard<'_, HashMap<GroupId, GroupBinding>> {
        self.bindings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<GroupId, GroupBinding>> {
        self.bindings.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current binding of a group
    pub fn lookup(&self, group_id: &str) -> Option<GroupBinding> {
        self.read().get(group_id).cloned()
    }

    /// Inserts the binding unless the group is already bound, returning the binding that won
    pub fn put(&self, binding: GroupBinding) -> GroupBinding {
        self.write()
            .entry(binding.group_id().to_owned())
            .or_insert(binding)
            .clone()
    }

    /// Binds the group to the route unless it is already bound, in which case the existing
    /// binding is marked as used instead
    ///
    /// Returns the winning binding and whether it has been inserted by this call.
    pub fn bind(&self, group_id: &str, route: &str, now: Instant) -> (GroupBinding, bool) {
        let mut bindings = self.write();

        match bindings.get_mut(group_id) {
            Some(existing) => {
                existing.touch(now);
                (existing.clone(), false)
            }
            None => {
                let binding = GroupBinding::at(group_id, route, now);
                bindings.insert(group_id.to_owned(), binding.clone());
                (binding, true)
            }
        }
    }

    /// Marks the binding of a group as used, returning the refreshed binding
    pub fn touch(&self, group_id: &str, now: Instant) -> Option<GroupBinding> {
        self.write().get_mut(group_id).map(|binding| {
            binding.touch(now);
            binding.clone()
        })
    }

    /// Unconditionally removes the binding of a group
    pub fn remove(&self, group_id: &str) -> Option<GroupBinding> {
        self.write().remove(group_id)
    }

    /// Removes the binding of a group if the predicate holds for it
    pub fn remove_if<P>(&self, group_id: &str, predicate: P) -> Option<GroupBinding>
    where
        P: FnOnce(&GroupBinding) -> bool,
    {
        let mut bindings = self.write();

        if bindings.get(group_id).map_or(false, predicate) {
            bindings.remove(group_id)
        } else {
            None
        }
    }

    /// Unconditionally stores the binding, returning the one it replaced
    ///
    /// Meant for caches mirroring decisions made elsewhere, authoritative stores use [`put`](Self::put).
    pub fn replace(&self, binding: GroupBinding) -> Option<GroupBinding> {
        self.write()
            .insert(binding.group_id().to_owned(), binding)
    }

    /// Copy of all bindings
    pub fn snapshot(&self) -> Vec<GroupBinding> {
        self.read().values().cloned().collect()
    }

    /// Copy of all bindings that have been unused for longer than the timeout
    pub fn idle(&self, now: Instant, timeout: Duration) -> Vec<GroupBinding> {
        self.read()
            .values()
            .filter(|binding| binding.is_idle(now, timeout))
            .cloned()
            .collect()
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether there are no bindings at all
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn keep_first_writer() {
        let store = GroupBindingStore::new();

        let first = store.put(GroupBinding::new("order-42", "consumerA"));
        let second = store.put(GroupBinding::new("order-42", "consumerB"));

        assert_eq!(first.route(), "consumerA");
        assert_eq!(second.route(), "consumerA");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn elect_single_winner_under_contention() {
        let store = Arc::new(GroupBindingStore::new());

        let winners: HashSet<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let store = store.clone();
                    scope.spawn(move || {
                        store
                            .put(GroupBinding::new("order-42", format!("consumer{}", i)))
                            .route()
                            .to_owned()
                    })
                })
                .collect();

            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(winners.len(), 1);
        assert_eq!(
            store.lookup("order-42").map(|b| b.route().to_owned()),
            winners.into_iter().next()
        );
    }

    #[test]
    fn refresh_existing_binding_on_bind() {
        let store = GroupBindingStore::new();
        let now = Instant::now();
        let later = now + Duration::from_secs(2);

        let (first, inserted_first) = store.bind("order-42", "consumerA", now);
        let (second, inserted_second) = store.bind("order-42", "consumerB", later);

        assert!(inserted_first);
        assert!(!inserted_second);
        assert_eq!(first.route(), second.route());
        assert_eq!(second.last_used_at(), later);
    }

    #[test]
    fn guard_removal() {
        let store = GroupBindingStore::new();
        store.put(GroupBinding::new("order-42", "consumerB"));

        let removed = store.remove_if("order-42", |b| b.route() == "consumerA");

        assert_eq!(removed, None);
        assert!(store.lookup("order-42").is_some());

        let removed = store.remove_if("order-42", |b| b.route() == "consumerB");

        assert_eq!(removed.map(|b| b.route().to_owned()), Some("consumerB".into()));
        assert!(store.is_empty());
    }

    #[test]
    fn ignore_removal_of_unknown_groups() {
        let store = GroupBindingStore::new();

        assert_eq!(store.remove("order-42"), None);
        assert_eq!(store.remove_if("order-42", |_| true), None);
        assert_eq!(store.touch("order-42", Instant::now()), None);
    }

    #[test]
    fn overwrite_on_replace() {
        let store = GroupBindingStore::new();
        store.put(GroupBinding::new("order-42", "consumerA"));

        let previous = store.replace(GroupBinding::new("order-42", "consumerB"));

        assert_eq!(previous.map(|b| b.route().to_owned()), Some("consumerA".into()));
        assert_eq!(
            store.lookup("order-42").map(|b| b.route().to_owned()),
            Some("consumerB".into())
        );
    }

    #[test]
    fn list_idle_bindings() {
        let store = GroupBindingStore::new();
        let now = Instant::now();
        let timeout = Duration::from_secs(5);

        store.bind("stale", "consumerA", now);
        store.bind("fresh", "consumerA", now);
        store.touch("fresh", now + Duration::from_secs(4));

        let idle = store.idle(now + Duration::from_secs(6), timeout);

        assert_eq!(idle.len(), 1);
        assert_eq!(idle[0].group_id(), "stale");
        assert_eq!(store.snapshot().len(), 2);
    }
}
