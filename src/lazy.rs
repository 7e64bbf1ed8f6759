use alloc::sync::{Arc, Weak};
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    context::ContextInner,
    errors::ResolveErrorKind,
    resolver::{ResolutionState, Resolver},
    token::Token,
};

/// Handle that resolves a token on first access.
///
/// Only a successful resolution is kept, a failed one is retried on the next [`Lazy::get`].
/// The handle doesn't keep its container or scope alive, so a singleton can hold a lazy handle
/// to its own container. If the context is already dropped, [`ResolveErrorKind::Disposed`] is returned.
pub struct Lazy<T> {
    context: Weak<ContextInner>,
    token: Token,
    value: Mutex<Option<Arc<T>>>,
}

impl<T> Lazy<T> {
    #[inline]
    #[must_use]
    pub(crate) fn new(context: &Arc<ContextInner>, token: Token) -> Self {
        Self {
            context: Arc::downgrade(context),
            token,
            value: Mutex::new(None),
        }
    }

    #[inline]
    #[must_use]
    pub fn token(&self) -> &Token {
        &self.token
    }

    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.value.lock().is_some()
    }
}

impl<T: Send + Sync + 'static> Lazy<T> {
    /// Returns the resolved instance, resolving it on first call
    ///
    /// # Errors
    /// Returns the resolution error; the next call tries to resolve again
    pub fn get(&self) -> Result<Arc<T>, ResolveErrorKind> {
        if let Some(value) = self.value.lock().as_ref() {
            return Ok(value.clone());
        }

        let Some(context) = self.context.upgrade() else {
            debug!(token = %self.token, "Context dropped before lazy resolution");
            return Err(ResolveErrorKind::Disposed);
        };
        // The lock isn't held while resolving, so the factory may access this handle
        let state = ResolutionState::default();
        let value = Resolver::new(&context, &state).resolve::<T>(&self.token)?;

        Ok(self.value.lock().get_or_insert(value).clone())
    }
}
