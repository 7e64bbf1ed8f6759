use alloc::{collections::BTreeMap, sync::Arc, vec, vec::Vec};
use core::sync::atomic::{AtomicU64, Ordering};

use crate::{
    any::TypeInfo, errors::ResolveErrorKind, instance::Instance, lifetime::Lifetime, resolver::Resolver, token::Token,
};

pub(crate) type BoxedFactory = Arc<dyn Fn(&Resolver<'_>) -> Result<Instance, ResolveErrorKind> + Send + Sync>;

/// Identity of a registration. Caches are keyed by it, so copies of a registration share cache entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct RegistrationId(u64);

impl RegistrationId {
    #[must_use]
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);

        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) id: RegistrationId,
    pub(crate) factory: BoxedFactory,
    pub(crate) lifetime: Lifetime,
    pub(crate) provides: TypeInfo,
}

impl Registration {
    #[inline]
    #[must_use]
    pub(crate) fn new(factory: BoxedFactory, lifetime: Lifetime, provides: TypeInfo) -> Self {
        Self {
            id: RegistrationId::next(),
            factory,
            lifetime,
            provides,
        }
    }
}

/// Registrations of every token in registration order
#[derive(Default, Clone)]
pub(crate) struct Registry {
    registrations: BTreeMap<Token, Vec<Registration>>,
}

impl Registry {
    #[inline]
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            registrations: BTreeMap::new(),
        }
    }

    /// Appends the registration to the token's sequence, previous registrations stay available for `resolve_all`
    pub(crate) fn register(&mut self, token: Token, registration: Registration) {
        use alloc::collections::btree_map::Entry::{Occupied, Vacant};

        match self.registrations.entry(token) {
            Vacant(entry) => {
                entry.insert(vec![registration]);
            }
            Occupied(entry) => {
                entry.into_mut().push(registration);
            }
        }
    }

    /// Replaces the sequence of every token registered in `source`. Caches are not copied.
    pub(crate) fn copy_from(&mut self, source: &Registry) {
        for (token, registrations) in &source.registrations {
            self.registrations.insert(token.clone(), registrations.clone());
        }
    }

    #[must_use]
    pub(crate) fn last(&self, token: &Token) -> Option<Registration> {
        self.registrations.get(token).and_then(|registrations| registrations.last()).cloned()
    }

    #[must_use]
    pub(crate) fn all(&self, token: &Token) -> Option<Vec<Registration>> {
        self.registrations
            .get(token)
            .filter(|registrations| !registrations.is_empty())
            .cloned()
    }

    #[inline]
    #[must_use]
    pub(crate) fn contains(&self, token: &Token) -> bool {
        self.registrations.contains_key(token)
    }
}
