use alloc::sync::Arc;
use tracing::error;

#[cfg(feature = "async")]
use alloc::boxed::Box;
#[cfg(feature = "async")]
use core::{
    future::Future,
    marker::PhantomData,
    pin::Pin,
    task::{Context, Poll},
};
#[cfg(feature = "async")]
use futures_util::future::{BoxFuture, FutureExt as _, Shared};
#[cfg(feature = "async")]
use tracing::warn;

use crate::{any::RcAny, any::TypeInfo, dispose::Teardown, errors::ResolveErrorKind, token::Token};

/// Value stored in a cache: either ready or a shared deferred computation
#[derive(Clone)]
pub(crate) enum Instance {
    Ready(Ready),
    #[cfg(feature = "async")]
    Deferred(SharedDeferred),
}

#[derive(Clone)]
pub(crate) struct Ready {
    pub(crate) value: RcAny,
    pub(crate) type_info: TypeInfo,
    pub(crate) teardown: Option<Teardown>,
}

#[cfg(feature = "async")]
pub(crate) type SharedDeferred = Shared<BoxFuture<'static, Result<Ready, Arc<ResolveErrorKind>>>>;

impl Ready {
    #[inline]
    #[must_use]
    pub(crate) fn new<T: Send + Sync + 'static>(value: T, teardown: Option<Teardown>) -> Self {
        Self {
            value: Arc::new(value),
            type_info: TypeInfo::of::<T>(),
            teardown,
        }
    }

    pub(crate) fn downcast<T: Send + Sync + 'static>(self, token: &Token) -> Result<Arc<T>, ResolveErrorKind> {
        let actual = self.type_info;
        self.value.downcast::<T>().map_err(|_| {
            let err = ResolveErrorKind::IncorrectType {
                token: token.clone(),
                expected: TypeInfo::of::<T>(),
                actual,
            };
            error!("{}", err);
            err
        })
    }

    fn dispose(&self) -> anyhow::Result<()> {
        match self.teardown {
            Some(teardown) => teardown.call(&self.value),
            None => Ok(()),
        }
    }

    #[cfg(feature = "async")]
    async fn dispose_async(self) -> anyhow::Result<()> {
        match self.teardown {
            Some(teardown) => teardown.call_async(self.value).await,
            None => Ok(()),
        }
    }
}

impl Instance {
    #[cfg(feature = "async")]
    pub(crate) fn deferred<T, Fut>(future: Fut, teardown: Option<Teardown>) -> Self
    where
        T: Send + Sync + 'static,
        Fut: Future<Output = Result<T, ResolveErrorKind>> + Send + 'static,
    {
        let future: BoxFuture<'static, _> = Box::pin(async move {
            match future.await {
                Ok(value) => Ok(Ready::new(value, teardown)),
                Err(err) => {
                    error!("{}", err);
                    Err(Arc::new(err))
                }
            }
        });
        Self::Deferred(future.shared())
    }

    #[cfg_attr(not(feature = "async"), allow(unused_variables))]
    pub(crate) fn into_ready(self, token: &Token) -> Result<Ready, ResolveErrorKind> {
        match self {
            Instance::Ready(ready) => Ok(ready),
            #[cfg(feature = "async")]
            Instance::Deferred(_) => {
                let err = ResolveErrorKind::DeferredInstance { token: token.clone() };
                error!("{}", err);
                Err(err)
            }
        }
    }

    #[cfg(feature = "async")]
    pub(crate) fn into_deferred<T>(self, token: &Token) -> Deferred<T> {
        let inner = match self {
            Instance::Ready(ready) => {
                let future: BoxFuture<'static, _> = Box::pin(async move { Ok(ready) });
                future.shared()
            }
            Instance::Deferred(deferred) => deferred,
        };
        Deferred {
            inner,
            token: token.clone(),
            _marker: PhantomData,
        }
    }

    /// Runs the teardown of the instance without awaiting.
    /// Pending and failed deferred instances are skipped.
    pub(crate) fn dispose(&self) -> anyhow::Result<()> {
        match self {
            Instance::Ready(ready) => ready.dispose(),
            #[cfg(feature = "async")]
            Instance::Deferred(deferred) => match deferred.peek() {
                Some(Ok(ready)) => ready.dispose(),
                Some(Err(_)) => Ok(()),
                None => {
                    warn!("Deferred instance is still pending, skipped. Use `dispose_async` to await it");
                    Ok(())
                }
            },
        }
    }

    /// Awaits deferred instances and runs the teardown. Failed deferred instances are skipped.
    #[cfg(feature = "async")]
    pub(crate) async fn dispose_async(self) -> anyhow::Result<()> {
        match self {
            Instance::Ready(ready) => ready.dispose_async().await,
            Instance::Deferred(deferred) => match deferred.await {
                Ok(ready) => ready.dispose_async().await,
                Err(_) => Ok(()),
            },
        }
    }
}

/// Deferred instance returned by `resolve_deferred`.
///
/// Cached deferred instances are shared: every resolution of a singleton or scoped deferred registration
/// returns a handle to the same computation, and a failed computation yields the same error to every awaiter.
#[cfg(feature = "async")]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Deferred<T> {
    inner: SharedDeferred,
    token: Token,
    _marker: PhantomData<fn() -> T>,
}

#[cfg(feature = "async")]
impl<T> Deferred<T> {
    /// Returns `true` if both handles point to the same computation
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.inner.ptr_eq(&other.inner)
    }

    #[inline]
    #[must_use]
    pub fn token(&self) -> &Token {
        &self.token
    }
}

#[cfg(feature = "async")]
impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            token: self.token.clone(),
            _marker: PhantomData,
        }
    }
}

#[cfg(feature = "async")]
impl<T: Send + Sync + 'static> Future for Deferred<T> {
    type Output = Result<Arc<T>, ResolveErrorKind>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.inner).poll(cx).map(|result| match result {
            Ok(ready) => ready.downcast(&this.token),
            Err(err) => Err(ResolveErrorKind::Deferred(err)),
        })
    }
}
