use tracing::warn;

#[cfg(feature = "async")]
use alloc::boxed::Box;
#[cfg(feature = "async")]
use core::future::Future;
#[cfg(feature = "async")]
use futures_util::future::BoxFuture;

use crate::any::RcAny;

/// Synchronous teardown of an instance owned by a container or scope.
///
/// Teardowns are called by [`crate::Container::dispose`] and [`crate::Scope::dispose`]
/// in LIFO order of instance creation (not the order of registration).
///
/// # Warning
/// Transient instances are never cached, so they are never disposed by the container.
pub trait Dispose {
    #[allow(clippy::missing_errors_doc)]
    fn dispose(&self) -> anyhow::Result<()>;
}

/// Asynchronous teardown, awaited by `dispose_async`
#[cfg(feature = "async")]
pub trait AsyncDispose {
    #[allow(clippy::missing_errors_doc)]
    fn dispose_async(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Teardown captured at registration time for the provided type
#[derive(Clone, Copy)]
pub(crate) enum Teardown {
    Sync(fn(&RcAny) -> anyhow::Result<()>),
    #[cfg(feature = "async")]
    Async(fn(RcAny) -> BoxFuture<'static, anyhow::Result<()>>),
}

impl Teardown {
    #[inline]
    #[must_use]
    pub(crate) fn sync<T: Dispose + Send + Sync + 'static>() -> Self {
        Self::Sync(dispose_sync::<T>)
    }

    #[inline]
    #[must_use]
    #[cfg(feature = "async")]
    pub(crate) fn r#async<T: AsyncDispose + Send + Sync + 'static>() -> Self {
        Self::Async(dispose_async::<T>)
    }

    /// Runs the teardown if it can be run without awaiting
    pub(crate) fn call(self, value: &RcAny) -> anyhow::Result<()> {
        match self {
            Teardown::Sync(teardown) => teardown(value),
            #[cfg(feature = "async")]
            Teardown::Async(_) => {
                warn!("Instance has only an asynchronous teardown, skipped. Use `dispose_async` to run it");
                Ok(())
            }
        }
    }

    #[cfg(feature = "async")]
    pub(crate) async fn call_async(self, value: RcAny) -> anyhow::Result<()> {
        match self {
            Teardown::Sync(teardown) => teardown(&value),
            Teardown::Async(teardown) => teardown(value).await,
        }
    }
}

fn dispose_sync<T: Dispose + 'static>(value: &RcAny) -> anyhow::Result<()> {
    match value.downcast_ref::<T>() {
        Some(value) => value.dispose(),
        None => {
            warn!("Teardown type mismatch, skipped");
            Ok(())
        }
    }
}

#[cfg(feature = "async")]
fn dispose_async<T: AsyncDispose + Send + Sync + 'static>(value: RcAny) -> BoxFuture<'static, anyhow::Result<()>> {
    Box::pin(async move {
        match value.downcast::<T>() {
            Ok(value) => value.dispose_async().await,
            Err(_) => {
                warn!("Teardown type mismatch, skipped");
                Ok(())
            }
        }
    })
}
