//! Error types returned by [`AvlTree`](crate::AvlTree) operations.

use thiserror::Error;

/// Result type for tree operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Caller-visible failures of a mutating operation.
///
/// Every variant leaves the tree exactly as it was before the call.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash)]
pub enum Error {
    /// A key buffer could not be allocated.
    ///
    /// Only key buffers are allocated fallibly. The fixed-size node header is
    /// boxed with the global allocator's usual abort-on-failure behaviour, so
    /// exhausting memory there terminates the process instead of returning
    /// this variant.
    #[error("out of memory")]
    OutOfMemory,

    /// Insert found an identical key already in the set.
    #[error("key already exists")]
    AlreadyExists,

    /// Remove found no matching key.
    #[error("key not found")]
    NotFound,
}

/// A broken structural invariant found by [`AvlTree::validate`](crate::AvlTree::validate).
///
/// These never arise from caller input; one of them showing up means the
/// balancing code is wrong.
///
/// Only compiled in test and debug builds, or with the `validate` feature.
#[cfg(any(test, debug_assertions, feature = "validate"))]
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Cached height differs from the height recomputed from the children.
    #[error("node at depth {depth} caches height {cached}, children imply {actual}")]
    HeightMismatch {
        /// Depth of the offending node (root = 0).
        depth: usize,
        /// Height stored in the node.
        cached: u8,
        /// Height computed from the children.
        actual: u8,
    },

    /// Balance factor outside `-1..=1`.
    #[error("node at depth {depth} has balance factor {balance}")]
    Unbalanced {
        /// Depth of the offending node (root = 0).
        depth: usize,
        /// `height(left) - height(right)`.
        balance: i32,
    },

    /// In-order walk produced keys that are not strictly ascending.
    #[error("key {current:?} does not follow {previous:?}")]
    OutOfOrder {
        /// Key visited first.
        previous: Vec<u8>,
        /// Key visited right after it.
        current: Vec<u8>,
    },

    /// Recorded length differs from the number of reachable nodes.
    #[error("tree records {recorded} keys but {reachable} nodes are reachable")]
    LenMismatch {
        /// Value of the length counter.
        recorded: usize,
        /// Number of nodes found by walking from the root.
        reachable: usize,
    },

    /// `len == 0` and "root is absent" disagree.
    #[error("length is {len} but root_present is {root_present}")]
    RootPresenceMismatch {
        /// Value of the length counter.
        len: usize,
        /// Whether a root node exists.
        root_present: bool,
    },
}
