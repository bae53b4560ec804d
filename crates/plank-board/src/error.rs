//! Error types for board mutations.

use plank_types::EntityKind;

/// Errors that can occur while applying a patch.
///
/// Either error aborts the enclosing [`patch`](crate::patch) call with no
/// partial mutation observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    /// A mutation or reference named an entity that does not exist,
    /// identified by kind and the offending id.
    #[error("{0} {1} not found")]
    NotFound(EntityKind, u64),

    /// An insertion supplied an id that is already present in the owning
    /// sequence.
    #[error("duplicate {0} id {1}")]
    DuplicateId(EntityKind, u64),
}
