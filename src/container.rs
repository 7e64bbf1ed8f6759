use alloc::sync::Arc;
use tracing::debug;

#[cfg(feature = "async")]
use crate::dispose::AsyncDispose;
#[cfg(feature = "async")]
use core::future::Future;

use crate::{
    any::TypeInfo,
    context::ContextInner,
    dispose::{Dispose, Teardown},
    errors::ResolveErrorKind,
    factory::{boxed_factory, instance_factory},
    lifetime::Lifetime,
    registry::{BoxedFactory, Registration},
    resolver::Resolver,
    token::Token,
};

/// Root context. Owns the registrations and the singleton cache.
///
/// `Container` is a cheap handle: clones share the same registrations, caches and disposed flag.
/// Scoped registrations can't be resolved from the container, create a scope with [`Container::create_scope`] instead.
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContextInner>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContextInner::root()),
        }
    }

    /// Registers a factory for the token.
    ///
    /// A token can have several registrations: `resolve` uses the last one,
    /// `resolve_all` uses all of them in registration order.
    pub fn register<T, F>(&self, token: impl Into<Token>, lifetime: Lifetime, factory: F) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<T, ResolveErrorKind> + Send + Sync + 'static,
    {
        self.add(token.into(), lifetime, TypeInfo::of::<T>(), boxed_factory(factory, None))
    }

    /// Registers a factory for the token, calling [`Dispose::dispose`] of cached instances on disposal
    pub fn register_disposable<T, F>(&self, token: impl Into<Token>, lifetime: Lifetime, factory: F) -> &Self
    where
        T: Dispose + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<T, ResolveErrorKind> + Send + Sync + 'static,
    {
        self.add(
            token.into(),
            lifetime,
            TypeInfo::of::<T>(),
            boxed_factory(factory, Some(Teardown::sync::<T>())),
        )
    }

    /// Registers a factory for the token, awaiting [`AsyncDispose::dispose_async`] of cached instances on asynchronous disposal
    #[cfg(feature = "async")]
    pub fn register_async_disposable<T, F>(&self, token: impl Into<Token>, lifetime: Lifetime, factory: F) -> &Self
    where
        T: AsyncDispose + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<T, ResolveErrorKind> + Send + Sync + 'static,
    {
        self.add(
            token.into(),
            lifetime,
            TypeInfo::of::<T>(),
            boxed_factory(factory, Some(Teardown::r#async::<T>())),
        )
    }

    /// Registers a factory returning a future.
    ///
    /// Singleton and scoped registrations cache the deferred instance itself,
    /// so every resolution shares one computation, including a failed one.
    #[cfg(feature = "async")]
    pub fn register_deferred<T, F, Fut>(&self, token: impl Into<Token>, lifetime: Lifetime, factory: F) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ResolveErrorKind>> + Send + 'static,
    {
        self.add(
            token.into(),
            lifetime,
            TypeInfo::of::<T>(),
            crate::factory::boxed_deferred_factory(factory, None),
        )
    }

    #[cfg(feature = "async")]
    pub fn register_deferred_disposable<T, F, Fut>(&self, token: impl Into<Token>, lifetime: Lifetime, factory: F) -> &Self
    where
        T: AsyncDispose + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ResolveErrorKind>> + Send + 'static,
    {
        self.add(
            token.into(),
            lifetime,
            TypeInfo::of::<T>(),
            crate::factory::boxed_deferred_factory(factory, Some(Teardown::r#async::<T>())),
        )
    }

    /// Registers a value created outside the container as a singleton
    pub fn register_instance<T>(&self, token: impl Into<Token>, value: T) -> &Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.add(token.into(), Lifetime::Singleton, TypeInfo::of::<T>(), instance_factory(value))
    }

    /// Copies every registration of the module into this container.
    ///
    /// For each token registered in the module, the container's registrations of the token are replaced.
    /// Cached instances of the module are not copied.
    pub fn use_module(&self, module: &Container) -> &Self {
        if Arc::ptr_eq(&self.inner.registry, &module.inner.registry) {
            debug!("Module shares the registry, nothing to copy");
            return self;
        }

        let source = module.inner.registry.read().clone();
        self.inner.registry.write().copy_from(&source);

        debug!("Module used");
        self
    }

    fn add(&self, token: Token, lifetime: Lifetime, provides: TypeInfo, factory: BoxedFactory) -> &Self {
        debug!(%token, %lifetime, %provides, "Registered");

        self.inner.registry.write().register(token, Registration::new(factory, lifetime, provides));
        self
    }
}

impl_context!(Container);

#[cfg(test)]
mod tests {
    extern crate std;

    use super::Container;
    use crate::{Dispose, DisposeError, Lifetime, Resolver, ResolveErrorKind, Symbol, Token};

    use alloc::{format, string::{String, ToString as _}, sync::Arc, vec::Vec};
    use core::sync::atomic::{AtomicU8, Ordering};
    use parking_lot::Mutex;
    use tracing::debug;
    use tracing_test::traced_test;

    #[derive(Debug)]
    struct Config;
    struct Database(#[allow(dead_code)] Arc<Config>);
    struct Request;

    #[test]
    #[traced_test]
    fn test_singleton_get() {
        let container = Container::new();
        container
            .register(Token::of::<Config>(), Lifetime::Singleton, |_| Ok(Config))
            .register(Token::of::<Database>(), Lifetime::Singleton, |r| {
                Ok(Database(r.resolve(Token::of::<Config>())?))
            });

        let database_1 = container.resolve::<Database>(Token::of::<Database>()).unwrap();
        let database_2 = container.resolve::<Database>(Token::of::<Database>()).unwrap();
        let config = container.resolve::<Config>(Token::of::<Config>()).unwrap();

        assert!(Arc::ptr_eq(&database_1, &database_2));
        assert!(Arc::ptr_eq(&database_1.0, &config));
    }

    #[test]
    #[traced_test]
    fn test_transient_get() {
        let call_count = Arc::new(AtomicU8::new(0));

        let container = Container::new();
        container.register(Token::named("request"), Lifetime::Transient, {
            let call_count = call_count.clone();
            move |_| {
                call_count.fetch_add(1, Ordering::SeqCst);
                Ok(Request)
            }
        });

        let request_1 = container.resolve::<Request>("request").unwrap();
        let request_2 = container.resolve::<Request>("request").unwrap();

        assert!(!Arc::ptr_eq(&request_1, &request_2));
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[traced_test]
    fn test_unit_value_cached() {
        let call_count = Arc::new(AtomicU8::new(0));

        let container = Container::new();
        container.register("unit", Lifetime::Singleton, {
            let call_count = call_count.clone();
            move |_| {
                call_count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        container.resolve::<()>("unit").unwrap();
        container.resolve::<()>("unit").unwrap();

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[traced_test]
    fn test_scoped_from_root() {
        let container = Container::new();
        container.register("request", Lifetime::Scoped, |_| Ok(Request));

        assert!(matches!(
            container.resolve::<Request>("request"),
            Err(ResolveErrorKind::ScopedFromRoot { .. })
        ));
        assert!(matches!(
            container.try_resolve::<Request>("request"),
            Err(ResolveErrorKind::ScopedFromRoot { .. })
        ));
        assert!(container.create_scope().unwrap().resolve::<Request>("request").is_ok());
    }

    #[test]
    #[traced_test]
    fn test_not_registered() {
        let container = Container::new();

        assert!(matches!(
            container.resolve::<Request>("request"),
            Err(ResolveErrorKind::NotRegistered { .. })
        ));
        assert!(matches!(
            container.resolve_all::<Request>("request"),
            Err(ResolveErrorKind::NotRegistered { .. })
        ));
        assert!(container.try_resolve::<Request>("request").unwrap().is_none());
        assert!(container.try_resolve_all::<Request>("request").unwrap().is_empty());
    }

    #[test]
    #[traced_test]
    fn test_try_resolve_propagates_missing_dependency() {
        let container = Container::new();
        container.register(Token::of::<Database>(), Lifetime::Singleton, |r| {
            Ok(Database(r.resolve(Token::of::<Config>())?))
        });

        match container.try_resolve::<Database>(Token::of::<Database>()) {
            Err(ResolveErrorKind::NotRegistered { token }) => assert_eq!(token, Token::of::<Config>()),
            _ => panic!("expected a missing dependency"),
        }
    }

    #[test]
    #[traced_test]
    fn test_incorrect_type() {
        let container = Container::new();
        container.register("port", Lifetime::Singleton, |_| Ok(8080u16));

        assert!(matches!(
            container.resolve::<u32>("port"),
            Err(ResolveErrorKind::IncorrectType { .. })
        ));
        assert_eq!(*container.resolve::<u16>("port").unwrap(), 8080);
    }

    #[test]
    #[traced_test]
    fn test_resolve_all_order() {
        let container = Container::new();
        container
            .register("handler", Lifetime::Singleton, |_| Ok(1u8))
            .register("handler", Lifetime::Transient, |_| Ok(2u8))
            .register("handler", Lifetime::Singleton, |_| Ok(3u8));

        let handlers = container.resolve_all::<u8>("handler").unwrap();
        let values: Vec<u8> = handlers.iter().map(|handler| **handler).collect();
        let last = container.resolve::<u8>("handler").unwrap();

        assert_eq!(values, [1, 2, 3]);
        assert!(Arc::ptr_eq(&last, &handlers[2]));
    }

    #[test]
    #[traced_test]
    fn test_register_instance() {
        let container = Container::new();
        container.register_instance("url", "postgres://localhost");

        assert_eq!(*container.resolve::<&str>("url").unwrap(), "postgres://localhost");
        assert!(container.contains("url"));
        assert!(!container.contains("port"));
    }

    #[test]
    #[traced_test]
    fn test_failed_factory_not_poisoned() {
        let call_count = Arc::new(AtomicU8::new(0));

        let container = Container::new();
        container.register(Token::of::<Config>(), Lifetime::Singleton, {
            let call_count = call_count.clone();
            move |_| {
                if call_count.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(anyhow::anyhow!("not ready").into());
                }
                Ok(Config)
            }
        });

        let err = container.resolve::<Config>(Token::of::<Config>()).unwrap_err();
        assert_eq!(err.to_string(), "not ready");
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        let config_1 = container.resolve::<Config>(Token::of::<Config>()).unwrap();
        let config_2 = container.resolve::<Config>(Token::of::<Config>()).unwrap();
        assert!(Arc::ptr_eq(&config_1, &config_2));
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[traced_test]
    fn test_failed_factory_resets_state() {
        let container = Container::new();
        container.register("a", Lifetime::Singleton, |r: &Resolver<'_>| -> Result<u8, ResolveErrorKind> {
            Ok(*r.resolve::<u8>("missing")? + 1)
        });

        assert!(matches!(
            container.resolve::<u8>("a"),
            Err(ResolveErrorKind::NotRegistered { .. })
        ));

        container.register("missing", Lifetime::Transient, |_| Ok(1u8));

        assert_eq!(*container.resolve::<u8>("a").unwrap(), 2);
    }

    #[test]
    #[traced_test]
    fn test_panicking_factory_resets_state() {
        let call_count = Arc::new(AtomicU8::new(0));

        let container = Container::new();
        container.register("a", Lifetime::Singleton, {
            let call_count = call_count.clone();
            move |_| {
                if call_count.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("factory panicked");
                }
                Ok(1u8)
            }
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| container.resolve::<u8>("a")));

        assert!(result.is_err());
        assert_eq!(*container.resolve::<u8>("a").unwrap(), 1);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[traced_test]
    fn test_circular_dependency() {
        let container = Container::new();
        container
            .register("A", Lifetime::Transient, |r| r.resolve::<u8>("B").map(|b| *b))
            .register("B", Lifetime::Transient, |r| r.resolve::<u8>("A").map(|a| *a));

        match container.resolve::<u8>("A") {
            Err(ResolveErrorKind::CircularDependency { path }) => assert_eq!(path.to_string(), "A -> B -> A"),
            _ => panic!("expected a circular dependency"),
        }
        match container.resolve::<u8>("B") {
            Err(ResolveErrorKind::CircularDependency { path }) => assert_eq!(path.to_string(), "B -> A -> B"),
            _ => panic!("expected a circular dependency"),
        }
    }

    #[test]
    #[traced_test]
    fn test_use_module() {
        let token = Symbol::new("database");

        let module = Container::new();
        module.register(token, Lifetime::Singleton, |_| Ok(Config));
        let from_module = module.resolve::<Config>(token).unwrap();

        let container = Container::new();
        container.register(token, Lifetime::Singleton, |_| Ok(Config));
        container.register(token, Lifetime::Singleton, |_| Ok(Config));
        container.use_module(&module);

        let from_container = container.resolve::<Config>(token).unwrap();

        assert!(!Arc::ptr_eq(&from_module, &from_container));
        assert_eq!(container.resolve_all::<Config>(token).unwrap().len(), 1);
        assert!(Arc::ptr_eq(&from_module, &module.resolve::<Config>(token).unwrap()));
    }

    #[test]
    #[traced_test]
    fn test_use_module_self() {
        let container = Container::new();
        container.register("a", Lifetime::Singleton, |_| Ok(1u8));
        container.use_module(&container.clone());

        assert_eq!(container.resolve_all::<u8>("a").unwrap().len(), 1);
    }

    #[test]
    #[traced_test]
    fn test_registry_shared_with_scope() {
        let container = Container::new();
        let scope = container.create_scope().unwrap();

        container.register("late", Lifetime::Singleton, |_| Ok(1u8));

        assert_eq!(*scope.resolve::<u8>("late").unwrap(), 1);
    }

    struct Tracked {
        position: u8,
        order: Arc<Mutex<Vec<u8>>>,
        fail: bool,
    }

    impl Dispose for Tracked {
        fn dispose(&self) -> anyhow::Result<()> {
            self.order.lock().push(self.position);
            debug!(position = self.position, "Disposed");
            if self.fail {
                anyhow::bail!("teardown {} failed", self.position);
            }
            Ok(())
        }
    }

    fn tracked_container(order: &Arc<Mutex<Vec<u8>>>, failing: &[u8]) -> Container {
        let container = Container::new();
        for position in 1..=3u8 {
            let order = order.clone();
            let fail = failing.contains(&position);
            container.register_disposable(Token::id(i64::from(position)), Lifetime::Singleton, move |_| {
                Ok(Tracked {
                    position,
                    order: order.clone(),
                    fail,
                })
            });
        }
        container
    }

    #[test]
    #[traced_test]
    fn test_dispose_lifo() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let container = tracked_container(&order, &[]);

        for position in 1..=3 {
            container.resolve::<Tracked>(Token::id(position)).unwrap();
        }

        container.dispose().unwrap();
        container.dispose().unwrap();

        assert_eq!(*order.lock(), [3, 2, 1]);
        assert!(container.is_disposed());
    }

    #[test]
    #[traced_test]
    fn test_dispose_for_unresolved() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let container = tracked_container(&order, &[]);

        container.dispose().unwrap();

        assert!(order.lock().is_empty());
    }

    #[test]
    #[traced_test]
    fn test_dispose_aggregates_errors() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let container = tracked_container(&order, &[1, 3]);

        for position in 1..=3 {
            container.resolve::<Tracked>(Token::id(position)).unwrap();
        }

        let DisposeError { errors } = container.dispose().unwrap_err();

        assert_eq!(errors.len(), 2);
        assert_eq!(*order.lock(), [3, 2, 1]);
        assert_eq!(errors[0].to_string(), "teardown 3 failed");
        assert_eq!(errors[1].to_string(), "teardown 1 failed");
    }

    #[test]
    #[traced_test]
    fn test_disposed_rejects_calls() {
        let container = Container::new();
        container.register("a", Lifetime::Singleton, |_| Ok(1u8));
        container.dispose().unwrap();

        assert!(matches!(container.resolve::<u8>("a"), Err(ResolveErrorKind::Disposed)));
        assert!(matches!(container.try_resolve::<u8>("b"), Err(ResolveErrorKind::Disposed)));
        assert!(matches!(container.resolve_all::<u8>("a"), Err(ResolveErrorKind::Disposed)));
        assert!(matches!(container.create_scope(), Err(ResolveErrorKind::Disposed)));
    }

    #[test]
    #[traced_test]
    fn test_dispose_container_keeps_scope() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let container = tracked_container(&order, &[]);
        container.register_disposable("scoped", Lifetime::Scoped, {
            let order = order.clone();
            move |_| {
                Ok(Tracked {
                    position: 10,
                    order: order.clone(),
                    fail: false,
                })
            }
        });

        let scope = container.create_scope().unwrap();
        scope.resolve::<Tracked>(Token::id(1)).unwrap();
        scope.resolve::<Tracked>("scoped").unwrap();

        container.dispose().unwrap();

        assert_eq!(*order.lock(), [1]);
        assert!(!scope.is_disposed());
        assert!(scope.resolve::<Tracked>("scoped").is_ok());

        scope.dispose().unwrap();

        assert_eq!(*order.lock(), [1, 10]);
    }

    #[test]
    fn test_thread_safe() {
        fn impl_bounds<T: Send + Sync + 'static>() {}

        impl_bounds::<(Container, crate::Scope, crate::Lazy<u8>)>();

        let container = Container::new();
        container.register("a", Lifetime::Singleton, |_| Ok(1u8));

        let handle = std::thread::spawn({
            let container = container.clone();
            move || container.resolve::<u8>("a").unwrap()
        });

        let from_thread = handle.join().unwrap();
        assert!(Arc::ptr_eq(&from_thread, &container.resolve::<u8>("a").unwrap()));
    }

    #[test]
    #[traced_test]
    fn test_same_singleton_on_two_threads() {
        let call_count = Arc::new(AtomicU8::new(0));
        // Both factories have to be running at once to pass the barrier
        let barrier = Arc::new(std::sync::Barrier::new(2));

        let container = Container::new();
        container.register("slow", Lifetime::Singleton, {
            let call_count = call_count.clone();
            let barrier = barrier.clone();
            move |_| {
                call_count.fetch_add(1, Ordering::SeqCst);
                barrier.wait();
                Ok(Config)
            }
        });

        let handle = std::thread::spawn({
            let container = container.clone();
            move || container.resolve::<Config>("slow")
        });
        let from_main = container.resolve::<Config>("slow").unwrap();
        let from_thread = handle.join().unwrap().unwrap();

        assert!(Arc::ptr_eq(&from_main, &from_thread));
        assert!(Arc::ptr_eq(&from_main, &container.resolve::<Config>("slow").unwrap()));
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[traced_test]
    fn test_other_token_while_factory_runs() {
        let entered = Arc::new(std::sync::Barrier::new(2));
        let release = Arc::new(std::sync::Barrier::new(2));

        let container = Container::new();
        container
            .register("slow", Lifetime::Singleton, {
                let entered = entered.clone();
                let release = release.clone();
                move |r| {
                    entered.wait();
                    release.wait();
                    r.resolve::<u8>("fast").map(|fast| *fast)
                }
            })
            .register("fast", Lifetime::Singleton, |_| Ok(1u8));

        let handle = std::thread::spawn({
            let container = container.clone();
            move || container.resolve::<u8>("slow")
        });

        entered.wait();
        let fast = container.resolve::<u8>("fast");
        release.wait();

        assert_eq!(*fast.unwrap(), 1);
        assert_eq!(*handle.join().unwrap().unwrap(), 1);
    }
}
