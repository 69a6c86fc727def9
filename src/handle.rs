//! Public handle types. All of them are plain values: a position handle
//! (`NodeRef`, `ValueRef`, `Checkpoint`) is just an arena offset and is
//! `Copy`, cheap to pass around, and safe to hold across mutations. A
//! read-result handle (`Match`, `Found`, `ValueFound`) additionally borrows
//! the value bytes it names, tying it to the lifetime of the `&Tree` call
//! that produced it — the borrow checker is what enforces the "readers
//! without a concurrent writer" rule the core relies on.

/// A bit-sequence key: `bits` significant bits of `bytes`, read MSB-first.
#[derive(Clone, Copy, Debug)]
pub struct BitKey<'a> {
    bytes: &'a [u8],
    bits: u64,
}

impl<'a> BitKey<'a> {
    /// A key of exactly `bits` bits, taken from the front of `bytes`. If
    /// `bits` exceeds `8 * bytes.len()`, it is silently clamped to that many
    /// bits rather than panicking — callers passing malformed lengths get a
    /// shorter key, never a crash.
    pub fn new(bytes: &'a [u8], bits: u64) -> Self {
        debug_assert!(bits <= 8 * bytes.len() as u64, "bits exceeds byte length");
        let bits = bits.min(8 * bytes.len() as u64);
        Self { bytes, bits }
    }

    /// A byte-aligned key covering all of `bytes`.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            bits: 8 * bytes.len() as u64,
        }
    }

    #[inline]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[inline]
    pub fn bits(&self) -> u64 {
        self.bits
    }
}

/// A position in the tree: the offset of a `Node`, or 0 for "no node" (the
/// empty iterator, or "not found").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct NodeRef(pub(crate) u64);

impl NodeRef {
    /// The empty handle: no node. Seeds traversal and matching at the head.
    pub const EMPTY: NodeRef = NodeRef(0);

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn to_checkpoint(self) -> Checkpoint {
        Checkpoint(self.0)
    }
}

/// A position in a key's version chain: the offset of an `Item`, or 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ValueRef(pub(crate) u64);

impl ValueRef {
    pub const EMPTY: ValueRef = ValueRef(0);

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn to_checkpoint(self) -> Checkpoint {
        Checkpoint(self.0)
    }
}

/// An opaque arena watermark captured by [`crate::Tree::checkpoint`]. Lowers
/// the bump pointer and unwinds structure on [`crate::Tree::checkpoint_restore`].
///
/// `NodeRef::to_checkpoint` and `ValueRef::to_checkpoint` are provided for
/// API symmetry with the reference implementation, but are only meaningful
/// when the handle's offset happens to equal the watermark taken right after
/// that record was appended. Prefer [`crate::Tree::checkpoint`] for general use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint(pub(crate) u64);

impl Checkpoint {
    #[inline]
    pub fn state(self) -> u64 {
        self.0
    }

    /// Reconstructs a checkpoint from a watermark previously obtained from
    /// [`Checkpoint::state`] — e.g. one persisted outside the process, as
    /// the CLI demo does.
    #[inline]
    pub fn from_state(state: u64) -> Self {
        Checkpoint(state)
    }
}

/// Result of an exact/first/longest prefix match: a node, how many input
/// bits were consumed up to it, and its value bytes.
#[derive(Clone, Copy, Debug)]
pub struct Match<'a> {
    pub node: NodeRef,
    pub matched_bits: u64,
    pub data: &'a [u8],
}

impl<'a> Match<'a> {
    pub(crate) const EMPTY: Match<'static> = Match {
        node: NodeRef::EMPTY,
        matched_bits: 0,
        data: &[],
    };

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.node.is_empty()
    }

    /// Drops the borrowed data, keeping only the position — usable as the
    /// seed for a later traversal or mutation.
    #[inline]
    pub fn to_node_ref(&self) -> NodeRef {
        self.node
    }
}

/// Result of a lexicographic or chronological node traversal.
#[derive(Clone, Copy, Debug)]
pub struct Found<'a> {
    pub node: NodeRef,
    pub data: &'a [u8],
}

impl<'a> Found<'a> {
    pub(crate) const EMPTY: Found<'static> = Found {
        node: NodeRef::EMPTY,
        data: &[],
    };

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.node.is_empty()
    }

    #[inline]
    pub fn to_node_ref(&self) -> NodeRef {
        self.node
    }
}

/// Result of a value-chain or chronological item traversal.
#[derive(Clone, Copy, Debug)]
pub struct ValueFound<'a> {
    pub item: ValueRef,
    pub data: &'a [u8],
}

impl<'a> ValueFound<'a> {
    pub(crate) const EMPTY: ValueFound<'static> = ValueFound {
        item: ValueRef::EMPTY,
        data: &[],
    };

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.item.is_empty()
    }

    #[inline]
    pub fn to_value_ref(&self) -> ValueRef {
        self.item
    }
}
