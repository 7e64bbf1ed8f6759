use core::fmt::{self, Display, Formatter};

/// How long a resolved instance lives and who shares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lifetime {
    /// Created once and shared by the container and every scope derived from it
    Singleton,
    /// Created on every resolution, never cached
    Transient,
    /// Created once per scope, can't be resolved from the container itself
    Scoped,
}

impl Lifetime {
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Transient => "transient",
            Lifetime::Scoped => "scoped",
        }
    }
}

impl Display for Lifetime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
