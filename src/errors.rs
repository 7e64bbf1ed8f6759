mod dispose;
mod resolve;

pub use dispose::DisposeError;
pub use resolve::{CyclePath, ResolveErrorKind};

/// Result of a factory or a resolution call
pub type ResolveResult<T> = Result<T, ResolveErrorKind>;
