#![no_std]

extern crate alloc;

#[macro_use]
pub(crate) mod macros;

pub(crate) mod any;
pub(crate) mod cache;
pub(crate) mod container;
pub(crate) mod context;
pub(crate) mod dispose;
pub(crate) mod errors;
pub(crate) mod factory;
pub(crate) mod instance;
pub(crate) mod lazy;
pub(crate) mod lifetime;
pub(crate) mod registry;
pub(crate) mod resolver;
pub(crate) mod scope;
pub(crate) mod token;

pub use any::TypeInfo;
pub use container::Container;
pub use dispose::Dispose;
pub use errors::{CyclePath, DisposeError, ResolveErrorKind, ResolveResult};
pub use lazy::Lazy;
pub use lifetime::Lifetime;
pub use resolver::Resolver;
pub use scope::Scope;
pub use token::{Symbol, Token};

#[cfg(feature = "async")]
pub use dispose::AsyncDispose;
#[cfg(feature = "async")]
pub use instance::Deferred;
