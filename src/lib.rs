//! # radix-arena
//!
//! A bit-keyed, append-only, arena-backed Patricia (compressed binary radix)
//! trie. Values are versioned: inserting over an existing key appends a new
//! version rather than overwriting one, and the whole version history —
//! across every key, in the order it was written — can be walked
//! chronologically. Removal is logical (a zero-size tombstone version), so a
//! removed key's history is still visible to the nullable and chronological
//! query variants.
//!
//! The tree owns no memory of its own: every instance borrows a
//! caller-supplied `&mut [u8]` for its entire lifetime and never grows or
//! reallocates it. Every cross-reference inside that buffer — a node's
//! parent, a value's previous version — is a `u64` byte offset, not a
//! pointer, so the buffer can be copied, memory-mapped, or persisted as-is.
//! Because nothing is ever freed in place, any past state of the tree can be
//! returned to in O(1) by recording the arena's append watermark as a
//! [`Checkpoint`] and restoring it later — no structural diffing, no undo
//! log beyond the arena itself.
//!
//! ## Example
//!
//! ```rust
//! use radix_arena::{BitKey, Tree};
//!
//! let mut buf = vec![0u8; 4096];
//! let mut tree = Tree::create(&mut buf);
//! tree.clear().unwrap();
//!
//! let root = tree.iterator();
//! tree.insert(root, BitKey::from_bytes(b"hello"), b"world").unwrap();
//!
//! let found = tree.match_(root, BitKey::from_bytes(b"hello"));
//! assert_eq!(found.data, b"world");
//! ```
//!
//! ## Handles
//!
//! The API splits in two along the Rust borrow checker rather than trying to
//! reproduce the reference C API's single self-referential iterator struct:
//!
//! - Position handles ([`NodeRef`], [`ValueRef`], [`Checkpoint`]) are plain
//!   `Copy` offsets. They carry no borrowed data, so they can be stored,
//!   compared, and fed into mutating calls freely.
//! - Read-result handles ([`Match`], [`Found`], [`ValueFound`]) additionally
//!   borrow the value bytes they name, tying them to the `&Tree` call that
//!   produced them. A result handle can't outlive the borrow it came from,
//!   so the compiler — not a runtime check — rejects holding one across a
//!   mutation.
//!
//! Every handle type has an empty value (`NodeRef::EMPTY`, `Match::EMPTY`,
//! ...) standing in for "not found", "end of traversal", or "no value
//! attached", so no operation here returns `Option` — check `.is_empty()`.

mod arena;
mod bits;
mod error;
mod handle;
mod record;
mod tree;

pub use error::TreeError;
pub use handle::{BitKey, Checkpoint, Found, Match, NodeRef, ValueFound, ValueRef};
pub use tree::Tree;

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(size: usize) -> Vec<u8> {
        vec![0u8; size]
    }

    #[test]
    fn insert_and_exact_match_byte_aligned() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        t.insert(root, BitKey::from_bytes(b"alpha"), b"1").unwrap();
        t.insert(root, BitKey::from_bytes(b"beta"), b"2").unwrap();

        assert_eq!(t.match_(root, BitKey::from_bytes(b"alpha")).data, b"1");
        assert_eq!(t.match_(root, BitKey::from_bytes(b"beta")).data, b"2");
        assert!(t.match_(root, BitKey::from_bytes(b"gamma")).is_empty());
    }

    #[test]
    fn insert_over_existing_key_appends_a_version() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        t.insert(root, BitKey::from_bytes(b"k"), b"v1").unwrap();
        let v2 = t.insert(root, BitKey::from_bytes(b"k"), b"v2").unwrap();

        assert_eq!(t.match_(root, BitKey::from_bytes(b"k")).data, b"v2");
        let prev = t.value_previous(v2);
        assert_eq!(prev.data, b"v1");
        assert!(t.value_previous(prev.to_value_ref()).is_empty());
    }

    #[test]
    fn remove_is_a_tombstone_not_a_deletion() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        t.insert(root, BitKey::from_bytes(b"k"), b"v1").unwrap();
        t.remove(root, BitKey::from_bytes(b"k")).unwrap();

        assert!(t.match_(root, BitKey::from_bytes(b"k")).is_empty());
        let nullable = t.match_nullable(root, BitKey::from_bytes(b"k"));
        assert!(!nullable.is_empty());
        assert_eq!(nullable.data, b"");
    }

    #[test]
    fn checkpoint_restore_undoes_inserts() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        t.insert(root, BitKey::from_bytes(b"a"), b"1").unwrap();
        let cp = t.checkpoint();
        t.insert(root, BitKey::from_bytes(b"b"), b"2").unwrap();
        t.insert(root, BitKey::from_bytes(b"c"), b"3").unwrap();
        assert!(!t.match_(root, BitKey::from_bytes(b"b")).is_empty());

        t.checkpoint_restore(cp);

        assert!(!t.match_(root, BitKey::from_bytes(b"a")).is_empty());
        assert!(t.match_(root, BitKey::from_bytes(b"b")).is_empty());
        assert!(t.match_(root, BitKey::from_bytes(b"c")).is_empty());
        assert_eq!(t.memory_usage(), cp.state());
    }

    #[test]
    fn lexicographic_next_visits_in_sorted_order() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        for k in ["banana", "apple", "cherry"] {
            t.insert(root, BitKey::from_bytes(k.as_bytes()), k.as_bytes()).unwrap();
        }

        let mut seen = Vec::new();
        let mut cur = root;
        loop {
            let found = t.next(cur);
            if found.is_empty() {
                break;
            }
            seen.push(found.data.to_vec());
            cur = found.to_node_ref();
        }
        assert_eq!(seen, vec![b"apple".to_vec(), b"banana".to_vec(), b"cherry".to_vec()]);
    }

    #[test]
    fn key_bits_and_key_copy_round_trip() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        let m = t.insert(root, BitKey::from_bytes(b"roundtrip"), b"v").unwrap();
        let node = t.value_to_node(m);
        let bits = t.key_bits(node);
        assert_eq!(bits, 8 * "roundtrip".len() as u64);

        let mut out = vec![0u8; "roundtrip".len()];
        t.key_copy(node, &mut out, bits).unwrap();
        assert_eq!(out, b"roundtrip");
    }

    #[test]
    fn key_copy_reports_out_of_memory_for_undersized_buffer() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        let m = t.insert(root, BitKey::from_bytes(b"abc"), b"v").unwrap();
        let node = t.value_to_node(m);

        let mut out = vec![0u8; 1];
        let err = t.key_copy(node, &mut out, 8).unwrap_err();
        assert!(matches!(err, TreeError::OutOfMemory { .. }));
        // The last byte ('c') should still have been written.
        assert_eq!(out, b"c");
    }

    #[test]
    fn arena_exhaustion_surfaces_as_out_of_memory() {
        let mut b = buf(64);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        let err = t.insert(root, BitKey::from_bytes(b"way too long a key for this arena"), b"x");
        assert!(err.is_err());
    }

    #[test]
    fn match_first_and_match_longest_scenario() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        t.insert(root, BitKey::from_bytes(b"Key-a"), b" Value-a").unwrap();
        t.insert(root, BitKey::from_bytes(b"Key-aa"), b" Value-aa").unwrap();
        t.insert(root, BitKey::from_bytes(b"Key-ab"), b" Value-ab").unwrap();

        let longest = t.match_longest(root, BitKey::from_bytes(b"Key-abc"));
        assert_eq!(longest.data, b" Value-ab");
        assert_eq!(longest.matched_bits, 48);

        let first = t.match_first(root, BitKey::from_bytes(b"Key-a"));
        assert_eq!(first.data, b" Value-a");
        assert_eq!(first.matched_bits, 40);
    }

    #[test]
    fn match_first_and_longest_nullable_see_tombstones_non_nullable_skip_them() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        t.insert(root, BitKey::from_bytes(b"Key-a"), b" Value-a").unwrap();
        t.insert(root, BitKey::from_bytes(b"Key-aa"), b" Value-aa").unwrap();
        t.remove(root, BitKey::from_bytes(b"Key-a")).unwrap();

        let first = t.match_first(root, BitKey::from_bytes(b"Key-aa"));
        assert_eq!(first.data, b" Value-aa");
        assert_eq!(first.matched_bits, 48);

        assert!(t.match_longest(root, BitKey::from_bytes(b"Key-a")).is_empty());

        let longest_nullable = t.match_longest_nullable(root, BitKey::from_bytes(b"Key-a"));
        assert!(!longest_nullable.is_empty());
        assert_eq!(longest_nullable.data, b"");
        assert_eq!(longest_nullable.matched_bits, 40);

        let first_nullable = t.match_first_nullable(root, BitKey::from_bytes(b"Key-a"));
        assert!(!first_nullable.is_empty());
        assert_eq!(first_nullable.data, b"");
    }

    #[test]
    fn next_inverse_visits_in_descending_order() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        for k in ["banana", "apple", "cherry"] {
            t.insert(root, BitKey::from_bytes(k.as_bytes()), k.as_bytes()).unwrap();
        }

        let mut seen = Vec::new();
        let mut cur = root;
        loop {
            let found = t.next_inverse(cur);
            if found.is_empty() {
                break;
            }
            seen.push(found.data.to_vec());
            cur = found.to_node_ref();
        }
        assert_eq!(seen, vec![b"cherry".to_vec(), b"banana".to_vec(), b"apple".to_vec()]);
    }

    #[test]
    fn prev_visits_descending_prev_inverse_visits_ascending() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        for k in ["banana", "apple", "cherry"] {
            t.insert(root, BitKey::from_bytes(k.as_bytes()), k.as_bytes()).unwrap();
        }

        let mut descending = Vec::new();
        let mut cur = root;
        loop {
            let found = t.prev(cur);
            if found.is_empty() {
                break;
            }
            descending.push(found.data.to_vec());
            cur = found.to_node_ref();
        }
        assert_eq!(descending, vec![b"cherry".to_vec(), b"banana".to_vec(), b"apple".to_vec()]);

        let mut ascending = Vec::new();
        cur = root;
        loop {
            let found = t.prev_inverse(cur);
            if found.is_empty() {
                break;
            }
            ascending.push(found.data.to_vec());
            cur = found.to_node_ref();
        }
        assert_eq!(ascending, vec![b"apple".to_vec(), b"banana".to_vec(), b"cherry".to_vec()]);
    }

    #[test]
    fn traversal_nullable_variants_include_tombstones() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        for k in ["banana", "apple", "cherry"] {
            t.insert(root, BitKey::from_bytes(k.as_bytes()), k.as_bytes()).unwrap();
        }
        t.remove(root, BitKey::from_bytes(b"banana")).unwrap();

        let mut seen = Vec::new();
        let mut cur = root;
        loop {
            let found = t.next(cur);
            if found.is_empty() {
                break;
            }
            seen.push(found.data.to_vec());
            cur = found.to_node_ref();
        }
        assert_eq!(seen, vec![b"apple".to_vec(), b"cherry".to_vec()]);

        let mut seen_nullable = Vec::new();
        cur = root;
        loop {
            let found = t.next_nullable(cur);
            if found.is_empty() {
                break;
            }
            seen_nullable.push(found.data.to_vec());
            cur = found.to_node_ref();
        }
        assert_eq!(seen_nullable, vec![b"apple".to_vec(), b"".to_vec(), b"cherry".to_vec()]);

        let first = t.prev_nullable(root);
        assert_eq!(first.data, b"cherry");
        let second = t.prev_nullable(first.to_node_ref());
        assert_eq!(second.data, b"");

        assert_eq!(t.next_inverse_nullable(root).data, b"cherry");
        assert_eq!(t.prev_inverse_nullable(root).data, b"apple");
    }

    #[test]
    fn predecessor_walks_parent_chain_only() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        let ka = t.insert(root, BitKey::from_bytes(b"Key-a"), b" Value-a").unwrap();
        t.insert(root, BitKey::from_bytes(b"Key-aa"), b" Value-aa").unwrap();
        let kab = t.insert(root, BitKey::from_bytes(b"Key-ab"), b" Value-ab").unwrap();

        let node_a = t.value_to_node(ka);
        let node_ab = t.value_to_node(kab);

        assert_eq!(t.predecessor(node_ab).data, b" Value-a");
        assert!(t.predecessor(node_a).is_empty());
    }

    #[test]
    fn predecessor_nullable_stops_at_tombstoned_ancestor() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        t.insert(root, BitKey::from_bytes(b"Key-a"), b" Value-a").unwrap();
        let kab = t.insert(root, BitKey::from_bytes(b"Key-ab"), b" Value-ab").unwrap();
        t.remove(root, BitKey::from_bytes(b"Key-a")).unwrap();

        let node_ab = t.value_to_node(kab);
        assert!(t.predecessor(node_ab).is_empty());

        let nullable = t.predecessor_nullable(node_ab);
        assert!(!nullable.is_empty());
        assert_eq!(nullable.data, b"");
    }

    #[test]
    fn earlier_visits_nodes_in_reverse_chronological_order() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        for k in ["banana", "apple", "cherry"] {
            t.insert(root, BitKey::from_bytes(k.as_bytes()), k.as_bytes()).unwrap();
        }

        let mut seen = Vec::new();
        let mut cur = root;
        loop {
            let found = t.earlier(cur);
            if found.is_empty() {
                break;
            }
            seen.push(found.data.to_vec());
            cur = found.to_node_ref();
        }
        assert_eq!(seen, vec![b"cherry".to_vec(), b"apple".to_vec(), b"banana".to_vec()]);
    }

    #[test]
    fn value_earlier_visits_items_in_reverse_chronological_order() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        t.insert(root, BitKey::from_bytes(b"a"), b"1").unwrap();
        t.insert(root, BitKey::from_bytes(b"b"), b"2").unwrap();
        t.insert(root, BitKey::from_bytes(b"a"), b"3").unwrap();

        let mut seen = Vec::new();
        let mut cur = t.value_iterator();
        loop {
            let found = t.value_earlier(cur);
            if found.is_empty() {
                break;
            }
            seen.push(found.data.to_vec());
            cur = found.to_value_ref();
        }
        assert_eq!(seen, vec![b"3".to_vec(), b"2".to_vec(), b"1".to_vec()]);

        // value_earlier_nullable differs only by including tombstoned items;
        // none were written here, so it must agree with the non-nullable walk.
        let mut seen_nullable = Vec::new();
        cur = t.value_iterator();
        loop {
            let found = t.value_earlier_nullable(cur);
            if found.is_empty() {
                break;
            }
            seen_nullable.push(found.data.to_vec());
            cur = found.to_value_ref();
        }
        assert_eq!(seen_nullable, seen);
    }

    #[test]
    fn value_previous_nullable_returns_tombstone_non_nullable_skips_it() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        t.insert(root, BitKey::from_bytes(b"k"), b"v1").unwrap();
        t.remove(root, BitKey::from_bytes(b"k")).unwrap();
        let v2 = t.insert(root, BitKey::from_bytes(b"k"), b"v2").unwrap();

        let nullable = t.value_previous_nullable(v2);
        assert!(!nullable.is_empty());
        assert_eq!(nullable.data, b"");

        assert_eq!(t.value_previous(v2).data, b"v1");
    }

    #[test]
    fn node_to_value_returns_the_current_attached_version() {
        let mut b = buf(4096);
        let mut t = Tree::create(&mut b);
        t.clear().unwrap();
        let root = t.iterator();

        let v = t.insert(root, BitKey::from_bytes(b"k"), b"v1").unwrap();
        let node = t.value_to_node(v);

        let attached = t.node_to_value(node);
        assert_eq!(attached.data, b"v1");
        assert_eq!(attached.to_value_ref(), v);

        assert!(t.node_to_value(NodeRef::EMPTY).is_empty());
    }
}
