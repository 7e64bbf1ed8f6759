use alloc::sync::Arc;
use tracing::debug;

#[cfg(feature = "async")]
use core::future::Future;

use crate::{
    dispose::Teardown,
    errors::ResolveErrorKind,
    instance::{Instance, Ready},
    registry::BoxedFactory,
    resolver::Resolver,
};

#[must_use]
pub(crate) fn boxed_factory<T, F>(factory: F, teardown: Option<Teardown>) -> BoxedFactory
where
    T: Send + Sync + 'static,
    F: Fn(&Resolver<'_>) -> Result<T, ResolveErrorKind> + Send + Sync + 'static,
{
    Arc::new(move |resolver: &Resolver<'_>| {
        let value = factory(resolver)?;

        debug!("Resolved");

        Ok(Instance::Ready(Ready::new(value, teardown)))
    })
}

/// Factory returning a deferred instance.
/// Everything resolved through the resolver before the future is returned is resolved as a dependency of the token,
/// the future itself runs after the resolution has finished.
#[must_use]
#[cfg(feature = "async")]
pub(crate) fn boxed_deferred_factory<T, F, Fut>(factory: F, teardown: Option<Teardown>) -> BoxedFactory
where
    T: Send + Sync + 'static,
    F: Fn(&Resolver<'_>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ResolveErrorKind>> + Send + 'static,
{
    Arc::new(move |resolver: &Resolver<'_>| {
        let future = factory(resolver);

        debug!("Deferred");

        Ok(Instance::deferred(future, teardown))
    })
}

/// Factory that returns a clone of the value created outside the container
#[must_use]
pub(crate) fn instance_factory<T>(value: T) -> BoxedFactory
where
    T: Clone + Send + Sync + 'static,
{
    boxed_factory(move |_: &Resolver<'_>| Ok(value.clone()), None)
}
