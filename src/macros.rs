/// Implements resolution and disposal methods for a context handle with an `inner: Arc<ContextInner>` field
macro_rules! impl_context {
    ($ty:ident) => {
        impl $ty {
            /// Runs a top-level resolution with its own cycle and captive dependency state
            fn with_resolver<R>(&self, resolve: impl FnOnce(&$crate::Resolver<'_>) -> R) -> R {
                let state = $crate::resolver::ResolutionState::default();
                resolve(&$crate::Resolver::new(&self.inner, &state))
            }

            /// Resolves the last registration of the token.
            /// See [`crate::Resolver::resolve`] for the errors.
            #[inline]
            #[allow(clippy::missing_errors_doc)]
            pub fn resolve<T: Send + Sync + 'static>(
                &self,
                token: impl Into<$crate::Token>,
            ) -> Result<alloc::sync::Arc<T>, $crate::ResolveErrorKind> {
                self.with_resolver(|resolver| resolver.resolve::<T>(token))
            }

            #[inline]
            #[allow(clippy::missing_errors_doc)]
            pub fn try_resolve<T: Send + Sync + 'static>(
                &self,
                token: impl Into<$crate::Token>,
            ) -> Result<Option<alloc::sync::Arc<T>>, $crate::ResolveErrorKind> {
                self.with_resolver(|resolver| resolver.try_resolve::<T>(token))
            }

            #[inline]
            #[allow(clippy::missing_errors_doc)]
            pub fn resolve_all<T: Send + Sync + 'static>(
                &self,
                token: impl Into<$crate::Token>,
            ) -> Result<alloc::vec::Vec<alloc::sync::Arc<T>>, $crate::ResolveErrorKind> {
                self.with_resolver(|resolver| resolver.resolve_all::<T>(token))
            }

            #[inline]
            #[allow(clippy::missing_errors_doc)]
            pub fn try_resolve_all<T: Send + Sync + 'static>(
                &self,
                token: impl Into<$crate::Token>,
            ) -> Result<alloc::vec::Vec<alloc::sync::Arc<T>>, $crate::ResolveErrorKind> {
                self.with_resolver(|resolver| resolver.try_resolve_all::<T>(token))
            }

            #[inline]
            #[cfg(feature = "async")]
            #[allow(clippy::missing_errors_doc)]
            pub fn resolve_deferred<T: Send + Sync + 'static>(
                &self,
                token: impl Into<$crate::Token>,
            ) -> Result<$crate::Deferred<T>, $crate::ResolveErrorKind> {
                self.with_resolver(|resolver| resolver.resolve_deferred::<T>(token))
            }

            #[inline]
            #[cfg(feature = "async")]
            #[allow(clippy::missing_errors_doc)]
            pub fn resolve_all_deferred<T: Send + Sync + 'static>(
                &self,
                token: impl Into<$crate::Token>,
            ) -> Result<alloc::vec::Vec<$crate::Deferred<T>>, $crate::ResolveErrorKind> {
                self.with_resolver(|resolver| resolver.resolve_all_deferred::<T>(token))
            }

            #[inline]
            #[must_use]
            pub fn lazy<T: Send + Sync + 'static>(&self, token: impl Into<$crate::Token>) -> $crate::Lazy<T> {
                self.with_resolver(|resolver| resolver.lazy::<T>(token))
            }

            #[inline]
            #[must_use]
            pub fn contains(&self, token: impl Into<$crate::Token>) -> bool {
                self.inner.registry.read().contains(&token.into())
            }

            /// Creates a scope with its own scoped cache, sharing registrations and singletons with this context
            ///
            /// # Errors
            /// Returns [`crate::ResolveErrorKind::Disposed`] if this context is disposed
            pub fn create_scope(&self) -> Result<$crate::Scope, $crate::ResolveErrorKind> {
                let inner = self.inner.child()?;
                tracing::debug!(parent = self.inner.kind(), "Scope created");
                Ok($crate::Scope {
                    inner: alloc::sync::Arc::new(inner),
                })
            }

            /// Disposes instances owned by this context in LIFO order of their creation.
            /// The second and subsequent calls do nothing.
            ///
            /// # Errors
            /// Returns [`crate::DisposeError`] with every teardown error, after every instance had a teardown attempt
            pub fn dispose(&self) -> Result<(), $crate::DisposeError> {
                let span = tracing::debug_span!("dispose", context = self.inner.kind());
                let _guard = span.enter();

                self.inner.dispose()
            }

            /// Like `dispose`, but awaits deferred instances and asynchronous teardowns
            ///
            /// # Errors
            /// Returns [`crate::DisposeError`] with every teardown error, after every instance had a teardown attempt
            #[cfg(feature = "async")]
            pub async fn dispose_async(&self) -> Result<(), $crate::DisposeError> {
                tracing::debug!(context = self.inner.kind(), "Disposing");

                self.inner.dispose_async().await
            }

            #[inline]
            #[must_use]
            pub fn is_disposed(&self) -> bool {
                self.inner.is_disposed()
            }
        }
    };
}

/// Creates a [`crate::Container`] with the given registrations.
///
/// # Syntax
/// ```text
/// container! {
///     singleton(token) => factory,
///     scoped(token) => factory,
///     transient(token) => factory,
/// }
/// ```
///
/// # Examples
/// ```rust
/// use tenure::{container, Token};
///
/// struct Config(&'static str);
/// struct Client(std::sync::Arc<Config>);
///
/// let container = container! {
///     singleton(Token::of::<Config>()) => |_| Ok(Config("localhost")),
///     transient(Token::of::<Client>()) => |r| Ok(Client(r.resolve(Token::of::<Config>())?)),
/// };
///
/// let client = container.resolve::<Client>(Token::of::<Client>()).unwrap();
/// assert_eq!(client.0 .0, "localhost");
/// ```
#[macro_export]
macro_rules! container {
    (@lifetime singleton) => {
        $crate::Lifetime::Singleton
    };
    (@lifetime scoped) => {
        $crate::Lifetime::Scoped
    };
    (@lifetime transient) => {
        $crate::Lifetime::Transient
    };
    (
        $( $lifetime:ident ( $token:expr ) => $factory:expr ),* $(,)?
    ) => {{
        let container = $crate::Container::new();
        $(
            container.register($token, $crate::container!(@lifetime $lifetime), $factory);
        )*
        container
    }};
}
