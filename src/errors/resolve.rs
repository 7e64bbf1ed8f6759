use alloc::{boxed::Box, vec::Vec};
use core::fmt::{self, Display, Formatter};

#[cfg(feature = "async")]
use alloc::sync::Arc;

use crate::{any::TypeInfo, token::Token};

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("No registration found for {token}")]
    NotRegistered { token: Token },
    #[error("Circular dependency detected: {path}")]
    CircularDependency { path: CyclePath },
    #[error(
        "\
        Captive dependency detected. \
        Scoped {token} can't be resolved while a singleton is being created, \
        because the singleton would outlive the scope\
        "
    )]
    CaptiveDependency { token: Token },
    #[error("Scoped {token} can't be resolved from the container, use a derived scope")]
    ScopedFromRoot { token: Token },
    #[error("Container or scope is disposed")]
    Disposed,
    #[error("Incorrect type of {token}. Actual: {actual}, expected: {expected}")]
    IncorrectType { token: Token, expected: TypeInfo, actual: TypeInfo },
    #[cfg(feature = "async")]
    #[error("{token} is provided by a deferred factory, resolve it with `resolve_deferred`")]
    DeferredInstance { token: Token },
    #[cfg(feature = "async")]
    #[error(transparent)]
    Deferred(Arc<ResolveErrorKind>),
    #[error(transparent)]
    Factory(#[from] anyhow::Error),
}

impl ResolveErrorKind {
    /// Wraps an error raised by a factory
    #[inline]
    #[must_use]
    pub fn factory(err: impl Into<anyhow::Error>) -> Self {
        Self::Factory(err.into())
    }

    /// Returns the error raised by a factory, looking through shared deferred failures
    #[must_use]
    pub fn as_factory(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Factory(err) => Some(err),
            #[cfg(feature = "async")]
            Self::Deferred(err) => err.as_factory(),
            _ => None,
        }
    }
}

/// Cycle of tokens from the first occurrence of the repeated token to the token itself,
/// displayed as `A -> B -> A`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePath(pub(crate) Box<[Token]>);

impl CyclePath {
    pub(crate) fn new(in_flight: &[Token], token: &Token) -> Self {
        let start = in_flight.iter().position(|in_flight| in_flight == token).unwrap_or(in_flight.len());

        let mut path = Vec::with_capacity(in_flight.len() - start + 1);
        path.extend_from_slice(&in_flight[start..]);
        path.push(token.clone());

        Self(path.into_boxed_slice())
    }

    #[inline]
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.0
    }
}

impl Display for CyclePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut tokens = self.0.iter();
        if let Some(token) = tokens.next() {
            write!(f, "{token}")?;
        }
        for token in tokens {
            write!(f, " -> {token}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CyclePath, ResolveErrorKind};
    use crate::Token;

    use alloc::string::ToString as _;

    #[test]
    fn test_cycle_path_starts_at_first_occurrence() {
        let in_flight = [Token::named("X"), Token::named("A"), Token::named("B")];
        let path = CyclePath::new(&in_flight, &Token::named("A"));

        assert_eq!(path.to_string(), "A -> B -> A");
        assert_eq!(path.tokens().len(), 3);
    }

    #[test]
    fn test_cycle_path_self_reference() {
        let in_flight = [Token::named("A")];
        let path = CyclePath::new(&in_flight, &Token::named("A"));

        assert_eq!(path.to_string(), "A -> A");
    }

    #[test]
    fn test_factory_error_is_transparent() {
        let err = ResolveErrorKind::factory(anyhow::anyhow!("connection refused"));

        assert_eq!(err.to_string(), "connection refused");
        assert!(err.as_factory().is_some());
        assert!(ResolveErrorKind::Disposed.as_factory().is_none());
    }
}
