//! Reference identity of native engines.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Equality key bound to the address of a native engine.
///
/// Every adapter wrapping no engine shares the [`TransferIdentity::Absent`]
/// bucket. The key never looks at observable fields, so it stays stable while
/// progress, state, and titles change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransferIdentity {
    /// Sentinel for adapters without an engine.
    Absent,
    /// Address of the engine allocation.
    Engine(usize),
}

impl TransferIdentity {
    /// Identity of a shared engine handle.
    #[must_use]
    pub fn of<E: ?Sized>(engine: &Arc<E>) -> Self {
        Self::Engine(Arc::as_ptr(engine).cast::<()>().addr())
    }

    /// Identity of an optional engine handle.
    #[must_use]
    pub fn of_optional<E: ?Sized>(engine: Option<&Arc<E>>) -> Self {
        engine.map_or(Self::Absent, Self::of)
    }

    /// Whether this is the sentinel identity.
    #[must_use]
    pub const fn is_absent(self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl Display for TransferIdentity {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => formatter.write_str("absent"),
            Self::Engine(address) => write!(formatter, "engine@{address:#x}"),
        }
    }
}
