//! The closed set of cascading operation kinds
//!
//! The original design dispatched on an open class hierarchy; here the kinds
//! are a plain enum so the context registry can be a fixed-size table and
//! matches stay exhaustive at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of cascading operation a unit of work can run.
///
/// At most one operation of each kind is live at a time within a unit of
/// work; the registry enforces that discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Persist a transient entity graph.
    Persist,
    /// Save new entities, update detached ones.
    SaveOrUpdate,
    /// Reconcile detached copies against managed state.
    Merge,
    /// Acquire pessimistic locks along a graph.
    Lock,
    /// Remove an entity graph.
    Delete,
    /// Re-read managed state from the backing store.
    Refresh,
    /// Copy a graph across units of work.
    Replicate,
}

impl OperationKind {
    /// Every kind, in registry slot order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Persist,
        Self::SaveOrUpdate,
        Self::Merge,
        Self::Lock,
        Self::Delete,
        Self::Refresh,
        Self::Replicate,
    ];

    /// Number of kinds; size of the registry slot table.
    pub const COUNT: usize = 7;

    /// Stable slot index for the registry table.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::Persist => 0,
            Self::SaveOrUpdate => 1,
            Self::Merge => 2,
            Self::Lock => 3,
            Self::Delete => 4,
            Self::Refresh => 5,
            Self::Replicate => 6,
        }
    }

    /// Save-family kinds must not begin (or successfully finish) while the
    /// pending-action queue still holds unresolved insert actions.
    #[inline]
    pub fn is_save_family(self) -> bool {
        matches!(self, Self::Persist | Self::SaveOrUpdate)
    }

    /// Kebab-case name used in error messages and tracing fields.
    pub fn name(self) -> &'static str {
        match self {
            Self::Persist => "persist",
            Self::SaveOrUpdate => "save-or-update",
            Self::Merge => "merge",
            Self::Lock => "lock",
            Self::Delete => "delete",
            Self::Refresh => "refresh",
            Self::Replicate => "replicate",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
