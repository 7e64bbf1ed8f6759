use alloc::{sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicBool, Ordering};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error};

use crate::{
    cache::Cache,
    errors::{DisposeError, ResolveErrorKind},
    instance::Instance,
    registry::Registry,
};

/// State of a container or a scope.
///
/// The registry and the singleton cache are shared by reference with every scope derived from the container,
/// the scoped cache is owned by one context.
/// The resolution state lives in the [`crate::Resolver`] of each top-level call, so concurrent calls don't see each other.
pub(crate) struct ContextInner {
    pub(crate) registry: Arc<RwLock<Registry>>,
    pub(crate) singletons: Arc<Mutex<Cache>>,
    /// `None` for the container itself
    pub(crate) scoped: Option<Mutex<Cache>>,
    disposed: AtomicBool,
}

impl ContextInner {
    #[must_use]
    pub(crate) fn root() -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::new())),
            singletons: Arc::new(Mutex::new(Cache::new())),
            scoped: None,
            disposed: AtomicBool::new(false),
        }
    }

    /// Creates a scope sharing the registry and the singleton cache with this context
    pub(crate) fn child(&self) -> Result<Self, ResolveErrorKind> {
        self.ensure_not_disposed()?;

        Ok(Self {
            registry: self.registry.clone(),
            singletons: self.singletons.clone(),
            scoped: Some(Mutex::new(Cache::new())),
            disposed: AtomicBool::new(false),
        })
    }

    #[inline]
    #[must_use]
    pub(crate) const fn is_root(&self) -> bool {
        self.scoped.is_none()
    }

    #[inline]
    #[must_use]
    pub(crate) const fn kind(&self) -> &'static str {
        if self.is_root() {
            "container"
        } else {
            "scope"
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_not_disposed(&self) -> Result<(), ResolveErrorKind> {
        if self.is_disposed() {
            let err = ResolveErrorKind::Disposed;
            error!("{}", err);
            return Err(err);
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    fn owned_cache(&self) -> &Mutex<Cache> {
        self.scoped.as_ref().unwrap_or(&self.singletons)
    }

    /// Sets the disposed flag, returning the owned instances in LIFO order on the first call only
    fn begin_dispose(&self) -> Option<Vec<Instance>> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            debug!("Already disposed");
            return None;
        }
        let mut cache = self.owned_cache().lock();
        debug!(count = cache.len(), "Disposing owned instances");
        Some(cache.take_lifo())
    }

    pub(crate) fn dispose(&self) -> Result<(), DisposeError> {
        let Some(instances) = self.begin_dispose() else {
            return Ok(());
        };

        let mut errors = Vec::new();
        for instance in instances {
            if let Err(err) = instance.dispose() {
                error!("Teardown failed: {:#}", err);
                errors.push(err);
            }
        }
        finish_dispose(errors)
    }

    #[cfg(feature = "async")]
    pub(crate) async fn dispose_async(&self) -> Result<(), DisposeError> {
        let Some(instances) = self.begin_dispose() else {
            return Ok(());
        };

        let mut errors = Vec::new();
        for instance in instances {
            if let Err(err) = instance.dispose_async().await {
                error!("Teardown failed: {:#}", err);
                errors.push(err);
            }
        }
        finish_dispose(errors)
    }
}

fn finish_dispose(errors: Vec<anyhow::Error>) -> Result<(), DisposeError> {
    if errors.is_empty() {
        debug!("Disposed");
        Ok(())
    } else {
        let err = DisposeError { errors };
        error!(count = err.errors.len(), "{}", err);
        Err(err)
    }
}
