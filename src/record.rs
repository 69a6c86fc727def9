//! Fixed-layout `Node` and `Item` records. All fields are accessed by byte
//! offset within the arena; nothing here owns memory or allocates — see
//! [`crate::arena::Arena`] for the bump allocator these sit on top of.

use crate::arena::Arena;

// -- Node ----------------------------------------------------------------
//
// parent(8) childSmaller(8) childGreater(8) keyFore(8) keyRear(8)
// keyForeOffset(1) keyRearOffset(1) item(8) lastNode(8)

const NODE_PARENT: u64 = 0;
const NODE_CHILD_SMALLER: u64 = 8;
const NODE_CHILD_GREATER: u64 = 16;
const NODE_KEY_FORE: u64 = 24;
const NODE_KEY_REAR: u64 = 32;
const NODE_KEY_FORE_OFFSET: u64 = 40;
const NODE_KEY_REAR_OFFSET: u64 = 41;
const NODE_ITEM: u64 = 42;
const NODE_LAST_NODE: u64 = 50;

/// Byte size of a `Node` header, not counting its trailing key-fragment
/// bytes.
pub const NODE_HEADER_SIZE: u64 = 58;

/// Which child slot a bit selects.
#[inline]
pub fn child_slot(direction: bool) -> u64 {
    if direction {
        NODE_CHILD_GREATER
    } else {
        NODE_CHILD_SMALLER
    }
}

#[inline]
pub fn parent(arena: &Arena, node: u64) -> u64 {
    arena.read_u64(node + NODE_PARENT)
}

#[inline]
pub fn set_parent(arena: &mut Arena, node: u64, value: u64) {
    arena.write_u64(node + NODE_PARENT, value);
}

#[inline]
pub fn child_smaller(arena: &Arena, node: u64) -> u64 {
    arena.read_u64(node + NODE_CHILD_SMALLER)
}

#[inline]
pub fn set_child_smaller(arena: &mut Arena, node: u64, value: u64) {
    arena.write_u64(node + NODE_CHILD_SMALLER, value);
}

#[inline]
pub fn child_greater(arena: &Arena, node: u64) -> u64 {
    arena.read_u64(node + NODE_CHILD_GREATER)
}

#[inline]
pub fn set_child_greater(arena: &mut Arena, node: u64, value: u64) {
    arena.write_u64(node + NODE_CHILD_GREATER, value);
}

/// Reads the child offset in the given direction (`false` = smaller,
/// `true` = greater).
#[inline]
pub fn child(arena: &Arena, node: u64, direction: bool) -> u64 {
    if direction {
        child_greater(arena, node)
    } else {
        child_smaller(arena, node)
    }
}

#[inline]
pub fn set_child(arena: &mut Arena, node: u64, direction: bool, value: u64) {
    if direction {
        set_child_greater(arena, node, value);
    } else {
        set_child_smaller(arena, node, value);
    }
}

#[inline]
pub fn key_fore(arena: &Arena, node: u64) -> u64 {
    arena.read_u64(node + NODE_KEY_FORE)
}

#[inline]
pub fn set_key_fore(arena: &mut Arena, node: u64, value: u64) {
    arena.write_u64(node + NODE_KEY_FORE, value);
}

#[inline]
pub fn key_rear(arena: &Arena, node: u64) -> u64 {
    arena.read_u64(node + NODE_KEY_REAR)
}

#[inline]
pub fn set_key_rear(arena: &mut Arena, node: u64, value: u64) {
    arena.write_u64(node + NODE_KEY_REAR, value);
}

#[inline]
pub fn key_fore_offset(arena: &Arena, node: u64) -> u8 {
    arena.read_u8(node + NODE_KEY_FORE_OFFSET)
}

#[inline]
pub fn set_key_fore_offset(arena: &mut Arena, node: u64, value: u8) {
    debug_assert!(value < 8);
    arena.write_u8(node + NODE_KEY_FORE_OFFSET, value);
}

#[inline]
pub fn key_rear_offset(arena: &Arena, node: u64) -> u8 {
    arena.read_u8(node + NODE_KEY_REAR_OFFSET)
}

#[inline]
pub fn set_key_rear_offset(arena: &mut Arena, node: u64, value: u8) {
    debug_assert!(value < 8);
    arena.write_u8(node + NODE_KEY_REAR_OFFSET, value);
}

#[inline]
pub fn item(arena: &Arena, node: u64) -> u64 {
    arena.read_u64(node + NODE_ITEM)
}

#[inline]
pub fn set_item(arena: &mut Arena, node: u64, value: u64) {
    arena.write_u64(node + NODE_ITEM, value);
}

#[inline]
pub fn last_node(arena: &Arena, node: u64) -> u64 {
    arena.read_u64(node + NODE_LAST_NODE)
}

#[inline]
pub fn set_last_node(arena: &mut Arena, node: u64, value: u64) {
    arena.write_u64(node + NODE_LAST_NODE, value);
}

/// The fragment's first bit, as an absolute bit index into the arena buffer.
#[inline]
pub fn fragment_fore_bit(arena: &Arena, node: u64) -> u64 {
    8 * key_fore(arena, node) + key_fore_offset(arena, node) as u64
}

/// The fragment's one-past-the-last bit, as an absolute bit index.
#[inline]
pub fn fragment_rear_bit(arena: &Arena, node: u64) -> u64 {
    8 * key_rear(arena, node) + key_rear_offset(arena, node) as u64
}

/// Fragment bit-length: `8*(keyRear - keyFore) + keyRearOffset - keyForeOffset`.
#[inline]
pub fn fragment_bits(arena: &Arena, node: u64) -> u64 {
    fragment_rear_bit(arena, node) - fragment_fore_bit(arena, node)
}

/// The absolute `[fore, rear)` bit range of a node's key fragment.
#[inline]
pub fn fragment_range(arena: &Arena, node: u64) -> (u64, u64) {
    (fragment_fore_bit(arena, node), fragment_rear_bit(arena, node))
}

/// The first bit of a node's key fragment — the slot it occupies under its
/// parent.
#[inline]
pub fn fragment_first_bit(arena: &Arena, node: u64) -> bool {
    crate::bits::bit_get(arena.bytes(), fragment_fore_bit(arena, node))
}

/// Writes a freshly-allocated `Node` header at `at`. `key_fore`/`key_rear`
/// point at the (already-written) fragment bytes.
#[allow(clippy::too_many_arguments)]
pub fn write_node(
    arena: &mut Arena,
    at: u64,
    parent_off: u64,
    child_smaller_off: u64,
    child_greater_off: u64,
    key_fore_off: u64,
    key_rear_off: u64,
    key_fore_bit_off: u8,
    key_rear_bit_off: u8,
    item_off: u64,
    last_node_off: u64,
) {
    set_parent(arena, at, parent_off);
    set_child_smaller(arena, at, child_smaller_off);
    set_child_greater(arena, at, child_greater_off);
    set_key_fore(arena, at, key_fore_off);
    set_key_rear(arena, at, key_rear_off);
    set_key_fore_offset(arena, at, key_fore_bit_off);
    set_key_rear_offset(arena, at, key_rear_bit_off);
    set_item(arena, at, item_off);
    set_last_node(arena, at, last_node_off);
}

// -- Item ------------------------------------------------------------------
//
// size(8) node(8) previous(8) lastItem(8)

const ITEM_SIZE: u64 = 0;
const ITEM_NODE: u64 = 8;
const ITEM_PREVIOUS: u64 = 16;
const ITEM_LAST_ITEM: u64 = 24;

/// Byte size of an `Item` header, not counting its trailing data bytes.
pub const ITEM_HEADER_SIZE: u64 = 32;

#[inline]
pub fn size(arena: &Arena, item: u64) -> u64 {
    arena.read_u64(item + ITEM_SIZE)
}

#[inline]
pub fn owner_node(arena: &Arena, item: u64) -> u64 {
    arena.read_u64(item + ITEM_NODE)
}

#[inline]
pub fn previous(arena: &Arena, item: u64) -> u64 {
    arena.read_u64(item + ITEM_PREVIOUS)
}

#[inline]
pub fn last_item(arena: &Arena, item: u64) -> u64 {
    arena.read_u64(item + ITEM_LAST_ITEM)
}

/// The data bytes following an `Item` header.
#[inline]
pub fn data<'a>(arena: &'a Arena, item: u64) -> &'a [u8] {
    arena.read_bytes(item + ITEM_HEADER_SIZE, size(arena, item))
}

/// Whether this item is a tombstone (a logical remove).
#[inline]
pub fn is_tombstone(arena: &Arena, item: u64) -> bool {
    size(arena, item) == 0
}

pub fn write_item(
    arena: &mut Arena,
    at: u64,
    size_val: u64,
    node_off: u64,
    previous_off: u64,
    last_item_off: u64,
    payload: &[u8],
) {
    arena.write_u64(at + ITEM_SIZE, size_val);
    arena.write_u64(at + ITEM_NODE, node_off);
    arena.write_u64(at + ITEM_PREVIOUS, previous_off);
    arena.write_u64(at + ITEM_LAST_ITEM, last_item_off);
    arena.write_bytes(at + ITEM_HEADER_SIZE, payload);
}
