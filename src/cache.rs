use alloc::{
    collections::{btree_map::Entry, vec_deque::VecDeque, BTreeMap},
    vec::Vec,
};
use core::mem;

use crate::{instance::Instance, registry::RegistrationId};

/// Instances keyed by the registration that produced them, with their creation order
#[derive(Default)]
pub(crate) struct Cache {
    pub(crate) map: BTreeMap<RegistrationId, Instance>,
    pub(crate) resolved: ResolvedSet,
}

impl Cache {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            map: BTreeMap::new(),
            resolved: ResolvedSet::new(),
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self, id: &RegistrationId) -> Option<Instance> {
        self.map.get(id).cloned()
    }

    /// Inserts the instance if there is no entry for the registration yet.
    /// Returns the instance stored in the cache after the call.
    pub(crate) fn get_or_insert(&mut self, id: RegistrationId, instance: Instance) -> Instance {
        match self.map.entry(id) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                self.resolved.push(id);
                entry.insert(instance).clone()
            }
        }
    }

    /// Empties the cache, returning its instances in LIFO order of their creation
    #[must_use]
    pub(crate) fn take_lifo(&mut self) -> Vec<Instance> {
        let mut map = mem::take(&mut self.map);
        let mut resolved = mem::take(&mut self.resolved);

        let mut instances = Vec::with_capacity(map.len());
        while let Some(id) = resolved.0.pop_back() {
            if let Some(instance) = map.remove(&id) {
                instances.push(instance);
            }
        }
        instances
    }

    #[inline]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}

#[derive(Default, Clone)]
pub(crate) struct ResolvedSet(pub(crate) VecDeque<RegistrationId>);

impl ResolvedSet {
    pub(crate) fn new() -> Self {
        Self(VecDeque::new())
    }

    pub(crate) fn push(&mut self, id: RegistrationId) {
        self.0.push_back(id);
    }
}
