use alloc::sync::Arc;

use crate::context::ContextInner;

/// Child context created by [`crate::Container::create_scope`] or [`Scope::create_scope`].
///
/// A scope shares registrations and singletons with its container and owns the cache of scoped instances.
/// Disposing a scope disposes only its scoped instances, the container and other scopes are unaffected.
#[derive(Clone)]
pub struct Scope {
    pub(crate) inner: Arc<ContextInner>,
}

impl_context!(Scope);
