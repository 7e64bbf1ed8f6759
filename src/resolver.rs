use alloc::{sync::Arc, vec::Vec};
use core::cell::{Cell, RefCell};
use tracing::{debug, debug_span, error, warn};

#[cfg(feature = "async")]
use crate::instance::Deferred;
use crate::{
    context::ContextInner,
    errors::ResolveErrorKind,
    instance::Instance,
    lazy::Lazy,
    lifetime::Lifetime,
    registry::Registration,
    token::Token,
    CyclePath,
};

/// Resolution state of one top-level call and the factories it runs on the current call stack
#[derive(Default)]
pub(crate) struct ResolutionState {
    /// Tokens being resolved, in resolution order
    in_flight: RefCell<Vec<Token>>,
    /// Number of singleton factories being called
    singleton_depth: Cell<usize>,
}

impl ResolutionState {
    fn check_cycle(&self, token: &Token) -> Result<(), ResolveErrorKind> {
        let in_flight = self.in_flight.borrow();
        if in_flight.contains(token) {
            let err = ResolveErrorKind::CircularDependency {
                path: CyclePath::new(&in_flight, token),
            };
            error!("{}", err);
            return Err(err);
        }
        Ok(())
    }

    /// Marks the token as being resolved until the returned guard is dropped
    fn enter<'a>(&'a self, token: &'a Token, lifetime: Lifetime) -> InFlightGuard<'a> {
        self.in_flight.borrow_mut().push(token.clone());
        let singleton = lifetime == Lifetime::Singleton;
        if singleton {
            self.singleton_depth.set(self.singleton_depth.get() + 1);
        }

        InFlightGuard {
            state: self,
            token,
            singleton,
        }
    }

    #[inline]
    #[must_use]
    fn singleton_depth(&self) -> usize {
        self.singleton_depth.get()
    }

    #[cfg(test)]
    fn is_idle(&self) -> bool {
        self.in_flight.borrow().is_empty() && self.singleton_depth() == 0
    }
}

/// Restores the resolution state when a factory returns, fails or panics
struct InFlightGuard<'a> {
    state: &'a ResolutionState,
    token: &'a Token,
    singleton: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.state.in_flight.borrow_mut();
        if let Some(pos) = in_flight.iter().rposition(|token| token == self.token) {
            in_flight.remove(pos);
        }
        if self.singleton {
            self.state.singleton_depth.set(self.state.singleton_depth.get().saturating_sub(1));
        }
    }
}

/// Resolution capability bound to one container or scope and one top-level call.
///
/// Factories receive the resolver of the call they are running in,
/// so their dependencies are resolved with the same caches, cycle and captive dependency checks.
/// Calls on other threads, or later calls on the same thread, have their own state.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    context: &'a Arc<ContextInner>,
    state: &'a ResolutionState,
}

impl<'a> Resolver<'a> {
    #[inline]
    #[must_use]
    pub(crate) const fn new(context: &'a Arc<ContextInner>, state: &'a ResolutionState) -> Self {
        Self { context, state }
    }

    /// Resolves the last registration of the token
    ///
    /// # Errors
    /// - [`ResolveErrorKind::NotRegistered`] if the token has no registrations
    /// - [`ResolveErrorKind::CircularDependency`] if the token is already being resolved
    /// - [`ResolveErrorKind::CaptiveDependency`] if a scoped token is resolved while a singleton is being created
    /// - [`ResolveErrorKind::ScopedFromRoot`] if a scoped token is resolved from the container
    /// - [`ResolveErrorKind::Disposed`] if the context is disposed
    /// - any error returned by a factory
    pub fn resolve<T: Send + Sync + 'static>(&self, token: impl Into<Token>) -> Result<Arc<T>, ResolveErrorKind> {
        let token = token.into();
        match self.resolve_instance(&token, true)? {
            Some(instance) => instance.into_ready(&token)?.downcast(&token),
            None => Err(ResolveErrorKind::NotRegistered { token }),
        }
    }

    /// Like [`Self::resolve`], but returns `None` if the token has no registrations.
    /// Other errors, including missing registrations of its dependencies, are still returned.
    #[allow(clippy::missing_errors_doc)]
    pub fn try_resolve<T: Send + Sync + 'static>(&self, token: impl Into<Token>) -> Result<Option<Arc<T>>, ResolveErrorKind> {
        let token = token.into();
        self.resolve_instance(&token, false)?
            .map(|instance| instance.into_ready(&token).and_then(|ready| ready.downcast(&token)))
            .transpose()
    }

    /// Resolves every registration of the token in registration order.
    /// The last element is the instance [`Self::resolve`] returns.
    #[allow(clippy::missing_errors_doc)]
    pub fn resolve_all<T: Send + Sync + 'static>(&self, token: impl Into<Token>) -> Result<Vec<Arc<T>>, ResolveErrorKind> {
        let token = token.into();
        match self.resolve_instances(&token, true)? {
            Some(instances) => downcast_all(instances, &token),
            None => Err(ResolveErrorKind::NotRegistered { token }),
        }
    }

    /// Like [`Self::resolve_all`], but returns an empty list if the token has no registrations
    #[allow(clippy::missing_errors_doc)]
    pub fn try_resolve_all<T: Send + Sync + 'static>(&self, token: impl Into<Token>) -> Result<Vec<Arc<T>>, ResolveErrorKind> {
        let token = token.into();
        match self.resolve_instances(&token, false)? {
            Some(instances) => downcast_all(instances, &token),
            None => Ok(Vec::new()),
        }
    }

    /// Resolves the last registration of the token as a deferred instance.
    /// Registrations with a synchronous factory produce an already completed deferred instance.
    #[cfg(feature = "async")]
    #[allow(clippy::missing_errors_doc)]
    pub fn resolve_deferred<T: Send + Sync + 'static>(&self, token: impl Into<Token>) -> Result<Deferred<T>, ResolveErrorKind> {
        let token = token.into();
        match self.resolve_instance(&token, true)? {
            Some(instance) => Ok(instance.into_deferred(&token)),
            None => Err(ResolveErrorKind::NotRegistered { token }),
        }
    }

    #[cfg(feature = "async")]
    #[allow(clippy::missing_errors_doc)]
    pub fn resolve_all_deferred<T: Send + Sync + 'static>(&self, token: impl Into<Token>) -> Result<Vec<Deferred<T>>, ResolveErrorKind> {
        let token = token.into();
        match self.resolve_instances(&token, true)? {
            Some(instances) => Ok(instances.into_iter().map(|instance| instance.into_deferred(&token)).collect()),
            None => Err(ResolveErrorKind::NotRegistered { token }),
        }
    }

    /// Creates a handle that resolves the token on first access
    #[inline]
    #[must_use]
    pub fn lazy<T: Send + Sync + 'static>(&self, token: impl Into<Token>) -> Lazy<T> {
        Lazy::new(self.context, token.into())
    }
}

impl Resolver<'_> {
    pub(crate) fn resolve_instance(&self, token: &Token, required: bool) -> Result<Option<Instance>, ResolveErrorKind> {
        let span = debug_span!("resolve", %token, context = self.context.kind());
        let _guard = span.enter();

        self.context.ensure_not_disposed()?;

        let registration = self.context.registry.read().last(token);
        let Some(registration) = registration else {
            return not_registered(token, required);
        };

        self.instantiate(token, &registration).map(Some)
    }

    pub(crate) fn resolve_instances(&self, token: &Token, required: bool) -> Result<Option<Vec<Instance>>, ResolveErrorKind> {
        let span = debug_span!("resolve_all", %token, context = self.context.kind());
        let _guard = span.enter();

        self.context.ensure_not_disposed()?;

        let registrations = self.context.registry.read().all(token);
        let Some(registrations) = registrations else {
            return not_registered(token, required);
        };

        // The token is checked as a whole before any of its registrations is instantiated
        self.state.check_cycle(token)?;

        registrations
            .iter()
            .map(|registration| self.instantiate(token, registration))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    fn instantiate(&self, token: &Token, registration: &Registration) -> Result<Instance, ResolveErrorKind> {
        let Registration {
            id,
            factory,
            lifetime,
            provides,
        } = registration;

        let span = debug_span!("instantiate", %lifetime, %provides);
        let _guard = span.enter();

        if *lifetime == Lifetime::Scoped && self.context.is_root() {
            let err = ResolveErrorKind::ScopedFromRoot { token: token.clone() };
            error!("{}", err);
            return Err(err);
        }

        self.state.check_cycle(token)?;

        // Cached or not, a singleton must never hold a scoped instance
        if *lifetime == Lifetime::Scoped && self.state.singleton_depth() > 0 {
            let err = ResolveErrorKind::CaptiveDependency { token: token.clone() };
            error!("{}", err);
            return Err(err);
        }

        let cache = match lifetime {
            Lifetime::Singleton => Some(&*self.context.singletons),
            Lifetime::Scoped => self.context.scoped.as_ref(),
            Lifetime::Transient => None,
        };

        if let Some(cache) = cache {
            if let Some(instance) = cache.lock().get(id) {
                debug!("Found in cache");
                return Ok(instance);
            }
            debug!("Not found in cache");
        }

        let _in_flight = self.state.enter(token, *lifetime);

        match factory(self) {
            Ok(instance) => match cache {
                Some(cache) => {
                    let instance = cache.lock().get_or_insert(*id, instance);
                    debug!("Cached");
                    Ok(instance)
                }
                None => Ok(instance),
            },
            Err(err) => {
                error!("{}", err);
                Err(err)
            }
        }
    }
}

fn not_registered<T>(token: &Token, required: bool) -> Result<Option<T>, ResolveErrorKind> {
    if required {
        let err = ResolveErrorKind::NotRegistered { token: token.clone() };
        warn!("{}", err);
        Err(err)
    } else {
        debug!("Not registered");
        Ok(None)
    }
}

fn downcast_all<T: Send + Sync + 'static>(instances: Vec<Instance>, token: &Token) -> Result<Vec<Arc<T>>, ResolveErrorKind> {
    instances
        .into_iter()
        .map(|instance| instance.into_ready(token).and_then(|ready| ready.downcast(token)))
        .collect()
}
