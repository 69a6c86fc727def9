//! The tree engine: insertion, removal, prefix matching, lexicographic and
//! chronological traversal, key reconstruction, and checkpoint/restore.
//!
//! Every operation that comes in nullable/non-nullable pairs in the public
//! API (`match_`/`match_nullable`, `next`/`next_nullable`, ...) is a thin
//! wrapper around one generic routine parameterized by an `include_tombstones`
//! bool, rather than two near-identical copies of the same walk.

use crate::arena::{Arena, META_SIZE};
use crate::bits;
use crate::error::TreeError;
use crate::handle::{BitKey, Checkpoint, Found, Match, NodeRef, ValueFound, ValueRef};
use crate::record;

/// The head node always lives immediately after `Meta`.
const HEAD: u64 = META_SIZE;

/// A Patricia tree over a caller-supplied byte buffer.
///
/// `Tree` does not own its memory: it borrows a `&mut [u8]` for its entire
/// lifetime and treats every cross-reference as a byte offset into it. Two
/// trees can share one buffer only sequentially, never concurrently — the
/// borrow checker enforces that through the `&'a mut [u8]` this type holds.
pub struct Tree<'a> {
    arena: Arena<'a>,
}

enum MatchMode {
    Exact,
    First,
    Longest,
}

impl<'a> Tree<'a> {
    /// Wraps `buf` without touching its contents. Call [`Tree::clear`] on a
    /// fresh or zeroed buffer before first use; a buffer carrying a
    /// previously-written tree can be wrapped directly.
    pub fn create(buf: &'a mut [u8]) -> Self {
        Self {
            arena: Arena::new(buf),
        }
    }

    /// Discards all structure, returning the arena to the empty state.
    pub fn clear(&mut self) -> Result<(), TreeError> {
        self.arena.clear()
    }

    /// Bytes of the buffer currently in use.
    pub fn memory_usage(&self) -> u64 {
        self.arena.memory_usage()
    }

    /// The empty node handle — seeds matching and traversal at the head.
    pub fn iterator(&self) -> NodeRef {
        NodeRef::EMPTY
    }

    /// The empty value handle.
    pub fn value_iterator(&self) -> ValueRef {
        ValueRef::EMPTY
    }

    /// Captures the current arena watermark.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.arena.structure_end())
    }

    // -- Insertion and removal -------------------------------------------

    /// Inserts `data` under `key`, starting the walk at `at` (or the head, if
    /// `at` is empty). Appends a new version if the key already has one.
    pub fn insert(&mut self, at: NodeRef, key: BitKey, data: &[u8]) -> Result<ValueRef, TreeError> {
        let node = self.descend_for_write(at, key)?;
        self.append_item(node, data)
    }

    /// Logically removes the value at `key`, starting the walk at `at`. A
    /// no-op (but still appends a zero-size tombstone) if the key has no
    /// current value, mirroring the reference semantics: presence is judged
    /// by the version chain, not by a separate existence check.
    pub fn remove(&mut self, at: NodeRef, key: BitKey) -> Result<ValueRef, TreeError> {
        let node = self.descend_for_write(at, key)?;
        self.append_item(node, &[])
    }

    /// Walks `key` from `at`, splitting nodes as needed, and returns the
    /// offset of the node the key now terminates on. Lazily creates the
    /// `Meta` + head node on first use if the arena has never held a node.
    fn descend_for_write(&mut self, at: NodeRef, key: BitKey) -> Result<u64, TreeError> {
        let mut node = at.0;
        if node == 0 {
            node = self.ensure_head()?;
        }

        let key_bytes = key.bytes();
        let key_bits = key.bits();
        let mut pos = 0u64;

        while pos < key_bits {
            let direction = bits::bit_get(key_bytes, pos);
            let child_addr = record::child(&self.arena, node, direction);

            if child_addr == 0 {
                let remaining = key_bits - pos;
                let frag_bytes = (remaining + 7) / 8;
                let needed = record::NODE_HEADER_SIZE + frag_bytes;
                let new_node = self.arena.bump(needed)?;
                let prior_last_node = self.arena.last_node();
                let frag_off = new_node + record::NODE_HEADER_SIZE;
                bits::bit_copy(key_bytes, pos, self.arena.bytes_mut(), frag_off * 8, remaining);
                record::write_node(
                    &mut self.arena,
                    new_node,
                    node,
                    0,
                    0,
                    frag_off,
                    frag_off + remaining / 8,
                    0,
                    (remaining % 8) as u8,
                    0,
                    prior_last_node,
                );
                record::set_child(&mut self.arena, node, direction, new_node);
                self.arena.set_last_node(new_node);
                log::trace!("insert: new leaf node {new_node} under {node}, {remaining} bits");
                node = new_node;
                pos = key_bits;
                break;
            }

            let (test_fore, test_rear) = record::fragment_range(&self.arena, child_addr);
            let frag_len = test_rear - test_fore;
            let matched = bits::bit_compare(key_bytes, pos, key_bits, self.arena.bytes(), test_fore, test_rear);

            if matched < frag_len {
                let split_bit_abs = test_fore + matched;
                let split_dir = bits::bit_get(self.arena.bytes(), split_bit_abs);
                let test_parent = record::parent(&self.arena, child_addr);
                let orig_fore_byte = record::key_fore(&self.arena, child_addr);
                let orig_fore_off = record::key_fore_offset(&self.arena, child_addr) as u64;
                let split_point = orig_fore_off + matched;
                let new_rear_byte = orig_fore_byte + split_point / 8;
                let new_rear_off = (split_point % 8) as u8;

                let new_node = self.arena.bump(record::NODE_HEADER_SIZE)?;
                let prior_last_node = self.arena.last_node();
                record::write_node(
                    &mut self.arena,
                    new_node,
                    test_parent,
                    if split_dir { 0 } else { child_addr },
                    if split_dir { child_addr } else { 0 },
                    orig_fore_byte,
                    new_rear_byte,
                    orig_fore_off as u8,
                    new_rear_off,
                    0,
                    prior_last_node,
                );
                record::set_parent(&mut self.arena, child_addr, new_node);
                record::set_key_fore(&mut self.arena, child_addr, new_rear_byte);
                record::set_key_fore_offset(&mut self.arena, child_addr, new_rear_off);
                record::set_child(&mut self.arena, node, direction, new_node);
                self.arena.set_last_node(new_node);
                log::trace!("insert: split node {new_node}, {matched} bits matched of {frag_len}");

                node = new_node;
                pos += matched;
                continue;
            }

            node = child_addr;
            pos += matched;
        }

        Ok(node)
    }

    fn ensure_head(&mut self) -> Result<u64, TreeError> {
        if self.arena.last_node() != 0 {
            return Ok(HEAD);
        }
        let needed = META_SIZE + record::NODE_HEADER_SIZE;
        let available = self.arena.capacity().saturating_sub(self.arena.structure_end());
        if needed > available {
            return Err(TreeError::OutOfMemory { needed, available });
        }
        record::write_node(&mut self.arena, HEAD, 0, 0, 0, 0, 0, 0, 0, 0, 0);
        self.arena.set_last_node(HEAD);
        self.arena.set_last_item(0);
        self.arena.set_structure_end(needed);
        log::debug!("tree: lazily created head node at {HEAD}");
        Ok(HEAD)
    }

    fn append_item(&mut self, node: u64, data: &[u8]) -> Result<ValueRef, TreeError> {
        let needed = record::ITEM_HEADER_SIZE + data.len() as u64;
        let new_item = self.arena.bump(needed)?;
        let previous = record::item(&self.arena, node);
        let last_item = self.arena.last_item();
        record::write_item(&mut self.arena, new_item, data.len() as u64, node, previous, last_item, data);
        record::set_item(&mut self.arena, node, new_item);
        self.arena.set_last_item(new_item);
        log::trace!("tree: item {new_item} on node {node} ({} bytes)", data.len());
        Ok(ValueRef(new_item))
    }

    // -- Prefix matching ---------------------------------------------------

    fn item_if_visible(&self, node: u64, include_tombstones: bool) -> Option<&[u8]> {
        let item = record::item(&self.arena, node);
        if item == 0 {
            return None;
        }
        if !include_tombstones && record::is_tombstone(&self.arena, item) {
            return None;
        }
        Some(record::data(&self.arena, item))
    }

    fn match_generic(&self, at: NodeRef, key: BitKey, mode: MatchMode, include_tombstones: bool) -> Match<'_> {
        let mut node = at.0;
        if node == 0 {
            if self.arena.last_node() == 0 {
                return Match::EMPTY;
            }
            node = HEAD;
        }

        let key_bytes = key.bytes();
        let key_bits = key.bits();
        let mut pos = 0u64;
        let mut longest_best: Option<Match> = None;

        loop {
            match mode {
                MatchMode::Exact => {
                    if pos == key_bits {
                        return match self.item_if_visible(node, include_tombstones) {
                            Some(d) => Match {
                                node: NodeRef(node),
                                matched_bits: pos,
                                data: d,
                            },
                            None => Match::EMPTY,
                        };
                    }
                }
                MatchMode::First => {
                    if let Some(d) = self.item_if_visible(node, include_tombstones) {
                        return Match {
                            node: NodeRef(node),
                            matched_bits: pos,
                            data: d,
                        };
                    }
                }
                MatchMode::Longest => {
                    if let Some(d) = self.item_if_visible(node, include_tombstones) {
                        longest_best = Some(Match {
                            node: NodeRef(node),
                            matched_bits: pos,
                            data: d,
                        });
                    }
                }
            }

            if pos >= key_bits {
                break;
            }

            let direction = bits::bit_get(key_bytes, pos);
            let child_addr = record::child(&self.arena, node, direction);
            if child_addr == 0 {
                break;
            }
            let (test_fore, test_rear) = record::fragment_range(&self.arena, child_addr);
            let frag_len = test_rear - test_fore;
            let matched = bits::bit_compare(key_bytes, pos, key_bits, self.arena.bytes(), test_fore, test_rear);
            if matched < frag_len {
                break;
            }
            node = child_addr;
            pos += matched;
        }

        match mode {
            MatchMode::Longest => longest_best.unwrap_or(Match::EMPTY),
            _ => Match::EMPTY,
        }
    }

    /// Exact match: `key` must terminate precisely on a node carrying a live
    /// value.
    pub fn match_(&self, at: NodeRef, key: BitKey) -> Match<'_> {
        self.match_generic(at, key, MatchMode::Exact, false)
    }

    /// As [`Tree::match_`], but a tombstoned key still yields its (empty)
    /// data rather than being treated as absent.
    pub fn match_nullable(&self, at: NodeRef, key: BitKey) -> Match<'_> {
        self.match_generic(at, key, MatchMode::Exact, true)
    }

    /// The shallowest node along `key`'s path carrying a live value.
    pub fn match_first(&self, at: NodeRef, key: BitKey) -> Match<'_> {
        self.match_generic(at, key, MatchMode::First, false)
    }

    /// As [`Tree::match_first`], including tombstoned values.
    pub fn match_first_nullable(&self, at: NodeRef, key: BitKey) -> Match<'_> {
        self.match_generic(at, key, MatchMode::First, true)
    }

    /// The deepest node along `key`'s path carrying a live value.
    pub fn match_longest(&self, at: NodeRef, key: BitKey) -> Match<'_> {
        self.match_generic(at, key, MatchMode::Longest, false)
    }

    /// As [`Tree::match_longest`], including tombstoned values.
    pub fn match_longest_nullable(&self, at: NodeRef, key: BitKey) -> Match<'_> {
        self.match_generic(at, key, MatchMode::Longest, true)
    }

    // -- Lexicographic traversal -------------------------------------------

    #[inline]
    fn lo_child(&self, node: u64, swapped: bool) -> u64 {
        if swapped {
            record::child_greater(&self.arena, node)
        } else {
            record::child_smaller(&self.arena, node)
        }
    }

    #[inline]
    fn hi_child(&self, node: u64, swapped: bool) -> u64 {
        if swapped {
            record::child_smaller(&self.arena, node)
        } else {
            record::child_greater(&self.arena, node)
        }
    }

    fn successor(&self, at: NodeRef, swapped: bool, include_tombstones: bool) -> Found<'_> {
        let mut node = at.0;
        if node == 0 {
            if self.arena.last_node() == 0 {
                return Found::EMPTY;
            }
            node = HEAD;
            if let Some(d) = self.item_if_visible(node, include_tombstones) {
                return Found {
                    node: NodeRef(node),
                    data: d,
                };
            }
        }

        loop {
            let lo = self.lo_child(node, swapped);
            let hi = self.hi_child(node, swapped);
            if lo != 0 || hi != 0 {
                node = if lo != 0 { lo } else { hi };
                if let Some(d) = self.item_if_visible(node, include_tombstones) {
                    return Found {
                        node: NodeRef(node),
                        data: d,
                    };
                }
                continue;
            }

            loop {
                let par = record::parent(&self.arena, node);
                if par == 0 {
                    return Found::EMPTY;
                }
                let par_hi = self.hi_child(par, swapped);
                if par_hi != 0 && par_hi != node {
                    node = par_hi;
                    break;
                }
                node = par;
            }
            if let Some(d) = self.item_if_visible(node, include_tombstones) {
                return Found {
                    node: NodeRef(node),
                    data: d,
                };
            }
        }
    }

    fn predecessor_walk(&self, at: NodeRef, swapped: bool, include_tombstones: bool) -> Found<'_> {
        let mut node = at.0;
        if node == 0 {
            if self.arena.last_node() == 0 {
                return Found::EMPTY;
            }
            node = HEAD;
            loop {
                let hi = self.hi_child(node, swapped);
                let lo = self.lo_child(node, swapped);
                if hi == 0 && lo == 0 {
                    break;
                }
                node = if hi != 0 { hi } else { lo };
            }
            if let Some(d) = self.item_if_visible(node, include_tombstones) {
                return Found {
                    node: NodeRef(node),
                    data: d,
                };
            }
        }

        loop {
            let par = record::parent(&self.arena, node);
            if par == 0 {
                return Found::EMPTY;
            }
            let par_lo = self.lo_child(par, swapped);
            if par_lo != 0 && par_lo != node {
                node = par_lo;
                loop {
                    let hi = self.hi_child(node, swapped);
                    let lo = self.lo_child(node, swapped);
                    if hi == 0 && lo == 0 {
                        break;
                    }
                    node = if hi != 0 { hi } else { lo };
                }
            } else {
                node = par;
            }
            if let Some(d) = self.item_if_visible(node, include_tombstones) {
                return Found {
                    node: NodeRef(node),
                    data: d,
                };
            }
        }
    }

    /// The lexicographic successor of `at` (empty seeds at the smallest key).
    pub fn next(&self, at: NodeRef) -> Found<'_> {
        self.successor(at, false, false)
    }

    pub fn next_nullable(&self, at: NodeRef) -> Found<'_> {
        self.successor(at, false, true)
    }

    /// The lexicographic predecessor of `at` (empty seeds at the largest key).
    pub fn prev(&self, at: NodeRef) -> Found<'_> {
        self.predecessor_walk(at, false, false)
    }

    pub fn prev_nullable(&self, at: NodeRef) -> Found<'_> {
        self.predecessor_walk(at, false, true)
    }

    /// Identical to [`Tree::next`] with the two child slots swapped.
    pub fn next_inverse(&self, at: NodeRef) -> Found<'_> {
        self.successor(at, true, false)
    }

    pub fn next_inverse_nullable(&self, at: NodeRef) -> Found<'_> {
        self.successor(at, true, true)
    }

    /// Identical to [`Tree::prev`] with the two child slots swapped.
    pub fn prev_inverse(&self, at: NodeRef) -> Found<'_> {
        self.predecessor_walk(at, true, false)
    }

    pub fn prev_inverse_nullable(&self, at: NodeRef) -> Found<'_> {
        self.predecessor_walk(at, true, true)
    }

    /// Walks the parent chain only, returning the nearest strict ancestor
    /// carrying a live value — unlike [`Tree::prev`], this never descends
    /// into a sibling subtree.
    pub fn predecessor(&self, at: NodeRef) -> Found<'_> {
        self.predecessor_chain(at, false)
    }

    pub fn predecessor_nullable(&self, at: NodeRef) -> Found<'_> {
        self.predecessor_chain(at, true)
    }

    fn predecessor_chain(&self, at: NodeRef, include_tombstones: bool) -> Found<'_> {
        let mut node = at.0;
        if node == 0 {
            return Found::EMPTY;
        }
        loop {
            let par = record::parent(&self.arena, node);
            if par == 0 {
                return Found::EMPTY;
            }
            node = par;
            if let Some(d) = self.item_if_visible(node, include_tombstones) {
                return Found {
                    node: NodeRef(node),
                    data: d,
                };
            }
        }
    }

    // -- Chronological traversal -------------------------------------------

    fn earlier_generic(&self, at: NodeRef, include_tombstones: bool) -> Found<'_> {
        let mut node = at.0;
        if node == 0 {
            let last = self.arena.last_node();
            if last == 0 {
                return Found::EMPTY;
            }
            node = last;
            if let Some(d) = self.item_if_visible(node, include_tombstones) {
                return Found {
                    node: NodeRef(node),
                    data: d,
                };
            }
        }
        loop {
            let ln = record::last_node(&self.arena, node);
            if ln == 0 {
                return Found::EMPTY;
            }
            node = ln;
            if let Some(d) = self.item_if_visible(node, include_tombstones) {
                return Found {
                    node: NodeRef(node),
                    data: d,
                };
            }
        }
    }

    /// Steps to the node that was appended just before `at`, regardless of
    /// tree position — the insertion-order history, not lexicographic order.
    pub fn earlier(&self, at: NodeRef) -> Found<'_> {
        self.earlier_generic(at, false)
    }

    pub fn earlier_nullable(&self, at: NodeRef) -> Found<'_> {
        self.earlier_generic(at, true)
    }

    fn value_earlier_generic(&self, at: ValueRef, include_tombstones: bool) -> ValueFound<'_> {
        let mut item = at.0;
        if item == 0 {
            let last = self.arena.last_item();
            if last == 0 {
                return ValueFound::EMPTY;
            }
            item = last;
            if include_tombstones || !record::is_tombstone(&self.arena, item) {
                return ValueFound {
                    item: ValueRef(item),
                    data: record::data(&self.arena, item),
                };
            }
        }
        loop {
            let li = record::last_item(&self.arena, item);
            if li == 0 {
                return ValueFound::EMPTY;
            }
            item = li;
            if include_tombstones || !record::is_tombstone(&self.arena, item) {
                return ValueFound {
                    item: ValueRef(item),
                    data: record::data(&self.arena, item),
                };
            }
        }
    }

    /// Steps to the item that was appended just before `at`, across every
    /// key in the tree.
    pub fn value_earlier(&self, at: ValueRef) -> ValueFound<'_> {
        self.value_earlier_generic(at, false)
    }

    pub fn value_earlier_nullable(&self, at: ValueRef) -> ValueFound<'_> {
        self.value_earlier_generic(at, true)
    }

    /// Steps to the version of `at`'s key that was current just before it.
    /// The nullable variant returns the immediately-previous item
    /// unconditionally (it may be a tombstone); the non-nullable variant
    /// skips tombstones to find the previous live value.
    pub fn value_previous(&self, at: ValueRef) -> ValueFound<'_> {
        let item0 = at.0;
        if item0 == 0 {
            return ValueFound::EMPTY;
        }
        let mut item = item0;
        loop {
            let prev = record::previous(&self.arena, item);
            if prev == 0 {
                return ValueFound::EMPTY;
            }
            if !record::is_tombstone(&self.arena, prev) {
                return ValueFound {
                    item: ValueRef(prev),
                    data: record::data(&self.arena, prev),
                };
            }
            item = prev;
        }
    }

    pub fn value_previous_nullable(&self, at: ValueRef) -> ValueFound<'_> {
        let item0 = at.0;
        if item0 == 0 {
            return ValueFound::EMPTY;
        }
        let prev = record::previous(&self.arena, item0);
        if prev == 0 {
            return ValueFound::EMPTY;
        }
        ValueFound {
            item: ValueRef(prev),
            data: record::data(&self.arena, prev),
        }
    }

    // -- Handle conversions -------------------------------------------------

    /// The current value attached to `node`, if any.
    pub fn node_to_value(&self, node: NodeRef) -> ValueFound<'_> {
        if node.is_empty() {
            return ValueFound::EMPTY;
        }
        let item = record::item(&self.arena, node.0);
        if item == 0 {
            return ValueFound::EMPTY;
        }
        ValueFound {
            item: ValueRef(item),
            data: record::data(&self.arena, item),
        }
    }

    /// The node that owns `value`.
    pub fn value_to_node(&self, value: ValueRef) -> NodeRef {
        if value.is_empty() {
            return NodeRef::EMPTY;
        }
        NodeRef(record::owner_node(&self.arena, value.0))
    }

    // -- Key reconstruction -------------------------------------------------

    /// The number of bits in the key that terminates at `at`.
    pub fn key_bits(&self, at: NodeRef) -> u64 {
        let mut node = at.0;
        let mut bits = 0u64;
        while node != 0 {
            bits += record::fragment_bits(&self.arena, node);
            node = record::parent(&self.arena, node);
        }
        bits
    }

    /// Reconstructs the key terminating at `at` into `out`, most significant
    /// bit first. If `out_bits` is smaller than the true key length, writes
    /// the trailing (deepest) `out_bits` bits of the key and returns
    /// [`TreeError::OutOfMemory`].
    pub fn key_copy(&self, at: NodeRef, out: &mut [u8], out_bits: u64) -> Result<(), TreeError> {
        let mut node = at.0;
        let mut remaining = out_bits;

        while node != 0 {
            let node_bits = record::fragment_bits(&self.arena, node);
            let (fore, rear) = record::fragment_range(&self.arena, node);

            if remaining < node_bits {
                let src_off = rear - remaining;
                bits::bit_copy(self.arena.bytes(), src_off, out, 0, remaining);
                let total = self.key_bits(at);
                log::warn!("key_copy: buffer of {out_bits} bits too small for {total}-bit key");
                return Err(TreeError::OutOfMemory {
                    needed: total,
                    available: out_bits,
                });
            }

            remaining -= node_bits;
            bits::bit_copy(self.arena.bytes(), fore, out, remaining, node_bits);
            node = record::parent(&self.arena, node);
        }

        Ok(())
    }

    // -- Checkpoint ----------------------------------------------------------

    /// Unwinds every node and item appended since `cp` was captured, in
    /// reverse append order. A split node whose only surviving child is the
    /// one being kept is collapsed back onto its own parent; a leaf with no
    /// surviving children clears its parent's child slot.
    pub fn checkpoint_restore(&mut self, cp: Checkpoint) {
        let state = cp.0;

        loop {
            let li = self.arena.last_item();
            if li == 0 || li < state {
                break;
            }
            let owner = record::owner_node(&self.arena, li);
            let prev = record::previous(&self.arena, li);
            record::set_item(&mut self.arena, owner, prev);
            self.arena.set_last_item(record::last_item(&self.arena, li));
        }

        loop {
            let ln = self.arena.last_node();
            if ln == 0 || ln < state {
                break;
            }
            let par = record::parent(&self.arena, ln);
            let dir = record::fragment_first_bit(&self.arena, ln);
            let child_s = record::child_smaller(&self.arena, ln);
            let child_g = record::child_greater(&self.arena, ln);

            if child_s != 0 || child_g != 0 {
                let survivor = if child_s != 0 { child_s } else { child_g };
                let fore_byte = record::key_fore(&self.arena, ln);
                let fore_off = record::key_fore_offset(&self.arena, ln);
                record::set_parent(&mut self.arena, survivor, par);
                record::set_key_fore(&mut self.arena, survivor, fore_byte);
                record::set_key_fore_offset(&mut self.arena, survivor, fore_off);
                if par != 0 {
                    record::set_child(&mut self.arena, par, dir, survivor);
                }
            } else if par != 0 {
                record::set_child(&mut self.arena, par, dir, 0);
            }

            self.arena.set_last_node(record::last_node(&self.arena, ln));
        }

        self.arena.set_structure_end(state);
        log::debug!("tree: checkpoint restore to watermark {state}");
    }
}
