use alloc::{borrow::Cow, string::String};
use core::{
    fmt::{self, Display, Formatter},
    sync::atomic::{AtomicU64, Ordering},
};

use crate::any::TypeInfo;

/// Key under which registrations are stored.
///
/// Tokens are compared by identity: two [`Token::Type`] tokens are equal when they name the same type,
/// named and numeric tokens by value, and symbols only to themselves.
///
/// ```rust
/// use tenure::{Symbol, Token};
///
/// struct Database;
///
/// assert_eq!(Token::of::<Database>(), Token::of::<Database>());
/// assert_eq!(Token::from("db"), Token::named("db"));
/// assert_ne!(Token::from(Symbol::new("db")), Token::from(Symbol::new("db")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Token {
    Type(TypeInfo),
    Name(Cow<'static, str>),
    Id(i64),
    Symbol(Symbol),
}

impl Token {
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type(TypeInfo::of::<T>())
    }

    #[inline]
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Name(name.into())
    }

    #[inline]
    #[must_use]
    pub const fn id(id: i64) -> Self {
        Self::Id(id)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Token::Type(type_info) => Display::fmt(type_info, f),
            Token::Name(name) => f.write_str(name),
            Token::Id(id) => Display::fmt(id, f),
            Token::Symbol(symbol) => Display::fmt(symbol, f),
        }
    }
}

impl From<TypeInfo> for Token {
    fn from(type_info: TypeInfo) -> Self {
        Self::Type(type_info)
    }
}

impl From<&'static str> for Token {
    fn from(name: &'static str) -> Self {
        Self::Name(Cow::Borrowed(name))
    }
}

impl From<String> for Token {
    fn from(name: String) -> Self {
        Self::Name(Cow::Owned(name))
    }
}

impl From<i64> for Token {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<Symbol> for Token {
    fn from(symbol: Symbol) -> Self {
        Self::Symbol(symbol)
    }
}

impl From<&Token> for Token {
    fn from(token: &Token) -> Self {
        token.clone()
    }
}

/// Unique key. Each [`Symbol::new`] call yields a symbol equal only to itself and its copies,
/// the description is used for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    id: u64,
    description: &'static str,
}

impl Symbol {
    #[must_use]
    pub fn new(description: &'static str) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);

        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            description,
        }
    }

    #[inline]
    #[must_use]
    pub const fn description(&self) -> &'static str {
        self.description
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}
