//! # avl-rs
//!
//! An ordered set of variable-length byte keys, kept height-balanced with the
//! AVL discipline so that every lookup, insert and remove touches
//! `O(log n)` nodes.
//!
//! Keys are ordered by [`compare_keys`]: a shorter key always sorts before a
//! longer one, and keys of equal length compare bytewise. This is *not* plain
//! lexicographic order.
//!
//! ## Example
//!
//! ```rust
//! use avl_rs::{AvlTree, Error};
//!
//! let mut tree = AvlTree::new();
//! tree.insert(b"c").unwrap();
//! tree.insert(b"a").unwrap();
//! tree.insert(b"bb").unwrap();
//! assert_eq!(tree.insert(b"a"), Err(Error::AlreadyExists));
//!
//! let keys: Vec<&[u8]> = tree.iter().collect();
//! assert_eq!(keys, [&b"a"[..], b"c", b"bb"]);
//!
//! tree.remove(b"c").unwrap();
//! assert_eq!(tree.remove(b"c"), Err(Error::NotFound));
//! assert_eq!(tree.len(), 2);
//! ```
//!
//! ## Features
//!
//! - `validate`: keeps [`AvlTree::validate`] and `InvariantViolation` in
//!   release builds. Without it they only exist under `debug_assertions`, so
//!   a dependent crate calling `validate()` compiles in debug but fails to
//!   compile with `--release`. Enable the feature, or gate the call on
//!   `cfg(debug_assertions)`.

#![deny(unsafe_code)]

mod error;

#[cfg(any(test, debug_assertions, feature = "validate"))]
pub use error::InvariantViolation;
pub use error::{Error, Result};

use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;

use tracing::{debug, trace};

// =============================================================================
// Key ordering
// =============================================================================

/// Total order used by the set: length first, then bytes.
///
/// ```rust
/// use std::cmp::Ordering;
/// use avl_rs::compare_keys;
///
/// assert_eq!(compare_keys(b"z", b"aa"), Ordering::Less);
/// assert_eq!(compare_keys(b"a", b"c"), Ordering::Less);
/// assert_eq!(compare_keys(b"ab", b"ab"), Ordering::Equal);
/// ```
#[inline]
pub fn compare_keys(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

// =============================================================================
// Nodes
// =============================================================================

type Link = Option<Box<Node>>;

#[derive(Clone)]
struct Node {
    /// Exactly `key.len()` bytes, never mutated after allocation.
    key: Box<[u8]>,
    /// Height of the subtree rooted here; a leaf is 1.
    height: u8,
    left: Link,
    right: Link,
}

/// Copies `key` into a buffer of exactly its length, failing instead of
/// aborting when the allocator refuses.
fn alloc_key(key: &[u8]) -> Result<Box<[u8]>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(key.len())
        .map_err(|_| Error::OutOfMemory)?;
    buf.extend_from_slice(key);
    Ok(buf.into_boxed_slice())
}

impl Node {
    fn leaf(key: &[u8]) -> Result<Box<Self>> {
        Ok(Box::new(Self {
            key: alloc_key(key)?,
            height: 1,
            left: None,
            right: None,
        }))
    }

    #[inline]
    fn update_height(&mut self) {
        self.height = height(&self.left).max(height(&self.right)).saturating_add(1);
    }

    #[inline]
    fn balance(&self) -> i32 {
        i32::from(height(&self.left)) - i32::from(height(&self.right))
    }
}

#[inline]
fn height(link: &Link) -> u8 {
    link.as_ref().map_or(0, |n| n.height)
}

#[inline]
fn balance(link: &Link) -> i32 {
    link.as_ref().map_or(0, |n| n.balance())
}

fn min_key(mut node: &Node) -> &[u8] {
    while let Some(left) = node.left.as_deref() {
        node = left;
    }
    &node.key
}

// =============================================================================
// Rotations
// =============================================================================
//
// Each rotation takes ownership of a subtree root and hands back the new root;
// the caller stores it where the old root used to be.

/// ```text
///         r            l
///        / \          / \
///       l   c   =>   a   r
///      / \              / \
///     a   b            b   c
/// ```
fn rotate_ll(mut root: Box<Node>) -> Box<Node> {
    let mut pivot = root.left.take().expect("LL rotation needs a left child");
    root.left = pivot.right.take();
    root.update_height();
    pivot.right = Some(root);
    pivot.update_height();
    pivot
}

/// Mirror of [`rotate_ll`].
fn rotate_rr(mut root: Box<Node>) -> Box<Node> {
    let mut pivot = root.right.take().expect("RR rotation needs a right child");
    root.right = pivot.left.take();
    root.update_height();
    pivot.left = Some(root);
    pivot.update_height();
    pivot
}

/// ```text
///       r
///      /
///     l
///      \
///       m
/// ```
fn rotate_lr(mut root: Box<Node>) -> Box<Node> {
    let left = root.left.take().expect("LR rotation needs a left child");
    root.left = Some(rotate_rr(left));
    rotate_ll(root)
}

fn rotate_rl(mut root: Box<Node>) -> Box<Node> {
    let right = root.right.take().expect("RL rotation needs a right child");
    root.right = Some(rotate_ll(right));
    rotate_rr(root)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rotation {
    Ll,
    Rr,
    Lr,
    Rl,
}

impl Rotation {
    fn apply(self, root: Box<Node>) -> Box<Node> {
        match self {
            Self::Ll => rotate_ll(root),
            Self::Rr => rotate_rr(root),
            Self::Lr => rotate_lr(root),
            Self::Rl => rotate_rl(root),
        }
    }
}

fn rotate_slot(slot: &mut Link, rotation: Rotation) {
    if let Some(root) = slot.take() {
        let root = rotation.apply(root);
        trace!(?rotation, height = root.height, "rotated subtree");
        *slot = Some(root);
    }
}

// =============================================================================
// Insert
// =============================================================================

fn insert_at(slot: &mut Link, key: &[u8]) -> Result<()> {
    let Some(node) = slot else {
        *slot = Some(Node::leaf(key)?);
        return Ok(());
    };

    let rotation = match compare_keys(key, &node.key) {
        Ordering::Equal => return Err(Error::AlreadyExists),
        Ordering::Less => {
            insert_at(&mut node.left, key)?;
            node.update_height();
            if node.balance() > 1 {
                let below_left = node
                    .left
                    .as_ref()
                    .is_some_and(|l| compare_keys(key, &l.key) == Ordering::Less);
                Some(if below_left { Rotation::Ll } else { Rotation::Lr })
            } else {
                None
            }
        }
        Ordering::Greater => {
            insert_at(&mut node.right, key)?;
            node.update_height();
            if node.balance() < -1 {
                let beyond_right = node
                    .right
                    .as_ref()
                    .is_some_and(|r| compare_keys(key, &r.key) == Ordering::Greater);
                Some(if beyond_right { Rotation::Rr } else { Rotation::Rl })
            } else {
                None
            }
        }
    };

    if let Some(rotation) = rotation {
        rotate_slot(slot, rotation);
    }
    Ok(())
}

// =============================================================================
// Remove
// =============================================================================

fn remove_at(slot: &mut Link, key: &[u8]) -> Result<()> {
    let Some(node) = slot else {
        return Err(Error::NotFound);
    };

    match compare_keys(key, &node.key) {
        Ordering::Less => remove_at(&mut node.left, key)?,
        Ordering::Greater => remove_at(&mut node.right, key)?,
        Ordering::Equal if node.left.is_none() || node.right.is_none() => {
            if let Some(mut old) = slot.take() {
                *slot = old.left.take().or_else(|| old.right.take());
            }
            return Ok(());
        }
        Ordering::Equal => replace_with_successor(slot)?,
    }

    rebalance_after_remove(slot);
    Ok(())
}

/// Swaps a two-child node for a copy of its in-order successor, then removes
/// the successor from the right subtree.
fn replace_with_successor(slot: &mut Link) -> Result<()> {
    let Some(node) = slot.as_deref() else {
        return Err(Error::NotFound);
    };
    let Some(right) = node.right.as_deref() else {
        return Err(Error::NotFound);
    };
    // Allocate before touching the tree so a failure leaves it intact.
    let successor = alloc_key(min_key(right))?;

    let Some(mut old) = slot.take() else {
        return Err(Error::NotFound);
    };
    let mut replacement = Box::new(Node {
        key: successor,
        height: old.height,
        left: old.left.take(),
        right: old.right.take(),
    });
    drop(old);

    // The successor has no left child, so this is a plain splice.
    let Node { key, right, .. } = &mut *replacement;
    let removed = remove_at(right, key);
    debug_assert!(removed.is_ok(), "successor must be present in right subtree");

    *slot = Some(replacement);
    Ok(())
}

fn rebalance_after_remove(slot: &mut Link) {
    let Some(node) = slot else {
        return;
    };
    node.update_height();

    let diff = node.balance();
    let rotation = if diff > 1 {
        if balance(&node.left) >= 0 {
            Rotation::Ll
        } else {
            Rotation::Lr
        }
    } else if diff < -1 {
        if balance(&node.right) <= 0 {
            Rotation::Rr
        } else {
            Rotation::Rl
        }
    } else {
        return;
    };

    rotate_slot(slot, rotation);
}

// =============================================================================
// Release
// =============================================================================

/// Frees a subtree and returns how many nodes it held.
///
/// Left subtrees are released recursively while the right spine is walked in
/// a loop, so stack depth stays within the tree height.
fn release(mut link: Link) -> usize {
    let mut released = 0;
    while let Some(mut node) = link {
        released += release(node.left.take());
        link = node.right.take();
        released += 1;
    }
    released
}

// =============================================================================
// AvlTree
// =============================================================================

/// A height-balanced ordered set of byte keys.
///
/// Keys are copied in on insert and owned by the tree. Iteration yields them
/// in [`compare_keys`] order.
#[derive(Clone, Default)]
pub struct AvlTree {
    root: Link,
    len: usize,
}

impl AvlTree {
    pub const fn new() -> Self {
        Self { root: None, len: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the root subtree; 0 for an empty tree.
    #[inline]
    pub fn height(&self) -> usize {
        usize::from(height(&self.root))
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            current = match compare_keys(key, &node.key) {
                Ordering::Equal => return true,
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
            };
        }
        false
    }

    /// Adds `key` to the set.
    ///
    /// Fails with [`Error::AlreadyExists`] if an identical key is present, or
    /// [`Error::OutOfMemory`] if the key could not be copied. The tree is left
    /// untouched on failure.
    pub fn insert(&mut self, key: &[u8]) -> Result<()> {
        insert_at(&mut self.root, key)?;
        self.len += 1;
        trace!(key_len = key.len(), len = self.len, "inserted key");
        Ok(())
    }

    /// Removes `key` from the set.
    ///
    /// Fails with [`Error::NotFound`] if the key is absent, or
    /// [`Error::OutOfMemory`] if the replacement for a two-child node could
    /// not be allocated. The tree is left untouched on failure.
    pub fn remove(&mut self, key: &[u8]) -> Result<()> {
        remove_at(&mut self.root, key)?;
        self.len -= 1;
        debug_assert_eq!(self.len == 0, self.root.is_none());
        trace!(key_len = key.len(), len = self.len, "removed key");
        Ok(())
    }

    /// Releases every key, keeping the tree usable. Returns how many keys
    /// were released.
    pub fn clear(&mut self) -> usize {
        let released = release(self.root.take());
        debug_assert_eq!(released, self.len);
        self.len = 0;
        debug!(released, "cleared tree");
        released
    }

    /// Releases every key and consumes the tree. Returns how many keys were
    /// released.
    pub fn destroy(mut self) -> usize {
        self.clear()
    }

    pub fn iter(&self) -> Iter<'_> {
        let mut iter = Iter {
            stack: Vec::with_capacity(self.height()),
            remaining: self.len,
        };
        iter.push_left_spine(self.root.as_deref());
        iter
    }
}

impl Drop for AvlTree {
    fn drop(&mut self) {
        release(self.root.take());
    }
}

impl fmt::Debug for AvlTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a AvlTree {
    type Item = &'a [u8];
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Validation
// =============================================================================

#[cfg(any(test, debug_assertions, feature = "validate"))]
fn check_subtree(
    link: Option<&Node>,
    depth: usize,
) -> std::result::Result<(usize, u8), InvariantViolation> {
    let Some(node) = link else {
        return Ok((0, 0));
    };

    let (left_count, left_height) = check_subtree(node.left.as_deref(), depth + 1)?;
    let (right_count, right_height) = check_subtree(node.right.as_deref(), depth + 1)?;

    let actual = left_height.max(right_height).saturating_add(1);
    if node.height != actual {
        return Err(InvariantViolation::HeightMismatch {
            depth,
            cached: node.height,
            actual,
        });
    }

    let balance = i32::from(left_height) - i32::from(right_height);
    if !(-1..=1).contains(&balance) {
        return Err(InvariantViolation::Unbalanced { depth, balance });
    }

    Ok((left_count + right_count + 1, actual))
}

#[cfg(any(test, debug_assertions, feature = "validate"))]
impl AvlTree {
    /// Walks the whole tree and re-verifies every structural invariant:
    /// cached heights, balance factors, strictly ascending key order and the
    /// length counter. Returns the number of reachable nodes.
    ///
    /// This is `O(n)` and is never called by the mutating operations.
    ///
    /// Available in debug builds, or in any build with the `validate`
    /// feature enabled.
    pub fn validate(&self) -> std::result::Result<usize, InvariantViolation> {
        if (self.len == 0) != self.root.is_none() {
            return Err(InvariantViolation::RootPresenceMismatch {
                len: self.len,
                root_present: self.root.is_some(),
            });
        }

        let (reachable, _) = check_subtree(self.root.as_deref(), 0)?;
        if reachable != self.len {
            return Err(InvariantViolation::LenMismatch {
                recorded: self.len,
                reachable,
            });
        }

        let mut previous: Option<&[u8]> = None;
        for key in self.iter() {
            if let Some(prev) = previous {
                if compare_keys(prev, key) != Ordering::Less {
                    return Err(InvariantViolation::OutOfOrder {
                        previous: prev.to_vec(),
                        current: key.to_vec(),
                    });
                }
            }
            previous = Some(key);
        }

        Ok(reachable)
    }
}

// =============================================================================
// Iteration
// =============================================================================

/// In-order iterator over the keys of an [`AvlTree`].
///
/// Holds at most one node reference per tree level.
#[derive(Clone)]
pub struct Iter<'a> {
    stack: Vec<&'a Node>,
    remaining: usize,
}

impl<'a> Iter<'a> {
    fn push_left_spine(&mut self, mut link: Option<&'a Node>) {
        while let Some(node) = link {
            self.stack.push(node);
            link = node.left.as_deref();
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right.as_deref());
        self.remaining = self.remaining.saturating_sub(1);
        Some(&node.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}


#[cfg(test)]
mod proptests;
