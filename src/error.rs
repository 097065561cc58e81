//! Error types for allocator operations.
//!
//! Every error carries the diagnostic name of the allocator that raised it
//! (see [`Allocator::set_name`](crate::allocator::Allocator::set_name)) so
//! that failures from several allocators sharing one code path can be told
//! apart.

use thiserror::Error;

/// Result type for allocator operations.
pub type AllocResult<T> = std::result::Result<T, AllocError>;

/// Allocator operation errors.
///
/// `CapacityExceeded` and `ReleasedAllocator` together form the
/// out-of-memory class: conditions a caller may reasonably hit at runtime
/// and want to recover from. The remaining kinds indicate caller bugs or
/// broken internal invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// A constructor or operation argument is invalid: zero sizes,
    /// non-power-of-two or out-of-range alignment, foreign or misaligned
    /// pointers, double free, invalid mark.
    #[error("{allocator}: invalid argument: {reason}")]
    InvalidArgument {
        /// Diagnostic name of the allocator
        allocator: String,
        /// What was wrong with the argument
        reason: String,
    },

    /// The allocation would exceed a hard capacity cap, or a non-growable
    /// allocator is full.
    #[error("{allocator}: capacity exceeded: {reason}")]
    CapacityExceeded {
        /// Diagnostic name of the allocator
        allocator: String,
        /// Which cap was hit
        reason: String,
    },

    /// An operation other than `reset` was attempted after `release`.
    #[error("{allocator}: allocator has released its memory")]
    ReleasedAllocator {
        /// Diagnostic name of the allocator
        allocator: String,
    },

    /// A stack deallocation did not target the most recent allocation.
    #[error("{allocator}: LIFO order violated: {reason}")]
    LifoViolation {
        /// Diagnostic name of the allocator
        allocator: String,
        /// How the order was violated
        reason: String,
    },

    /// An internal bookkeeping invariant is broken. Indicates a bug in the
    /// allocator itself, not in the caller.
    #[error("{allocator}: internal invariant broken: {reason}")]
    Internal {
        /// Diagnostic name of the allocator
        allocator: String,
        /// Which invariant failed
        reason: String,
    },
}

impl AllocError {
    /// Create an invalid-argument error.
    pub fn invalid_argument(allocator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument { allocator: allocator.into(), reason: reason.into() }
    }

    /// Create a capacity-exceeded error.
    pub fn capacity_exceeded(allocator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CapacityExceeded { allocator: allocator.into(), reason: reason.into() }
    }

    /// Create a released-allocator error.
    pub fn released(allocator: impl Into<String>) -> Self {
        Self::ReleasedAllocator { allocator: allocator.into() }
    }

    /// Create a LIFO-violation error.
    pub fn lifo_violation(allocator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LifoViolation { allocator: allocator.into(), reason: reason.into() }
    }

    /// Create an internal-invariant error.
    pub fn internal(allocator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Internal { allocator: allocator.into(), reason: reason.into() }
    }

    /// Diagnostic name of the allocator that raised the error.
    pub fn allocator(&self) -> &str {
        match self {
            Self::InvalidArgument { allocator, .. }
            | Self::CapacityExceeded { allocator, .. }
            | Self::ReleasedAllocator { allocator }
            | Self::LifoViolation { allocator, .. }
            | Self::Internal { allocator, .. } => allocator,
        }
    }

    /// Checks whether this is an invalid-argument error.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// Checks whether this is a capacity-exceeded error.
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }

    /// Checks whether the allocator had released its memory.
    pub fn is_released(&self) -> bool {
        matches!(self, Self::ReleasedAllocator { .. })
    }

    /// Checks whether this is a LIFO order violation.
    pub fn is_lifo_violation(&self) -> bool {
        matches!(self, Self::LifoViolation { .. })
    }

    /// Checks whether this error belongs to the out-of-memory class:
    /// a normal runtime condition rather than a caller bug.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. } | Self::ReleasedAllocator { .. })
    }
}
