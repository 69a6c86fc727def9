//! The arena: a caller-supplied byte buffer, a bump watermark, and nothing
//! else. All cross-references into the arena are `u64` byte offsets; offset
//! `0` means "none". The structure owns no memory beyond the buffer it was
//! given and never reallocates it.

use crate::error::TreeError;

/// Size of the `Meta` record at offset 0: `lastNode`, `lastItem`,
/// `structureEnd`, each a `u64`.
pub const META_SIZE: u64 = 24;

const META_LAST_NODE: u64 = 0;
const META_LAST_ITEM: u64 = 8;
const META_STRUCTURE_END: u64 = 16;

/// Owns the caller-supplied buffer and the bump allocator over it. This is
/// intentionally a thin wrapper: all structural knowledge (what a `Node` or
/// `Item` looks like) lives in [`crate::record`], layered on top of the raw
/// offset read/write primitives here.
pub struct Arena<'a> {
    buf: &'a mut [u8],
}

impl<'a> Arena<'a> {
    /// Wraps `buf` as an arena. Does not touch the buffer's contents —
    /// callers starting from zeroed memory still need [`Arena::clear`], and
    /// callers restoring a previously-used buffer can rely on its `Meta`
    /// being intact as written.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf }
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.buf.len() as u64
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        self.buf
    }

    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.buf
    }

    // -- Meta ----------------------------------------------------------

    #[inline]
    pub fn last_node(&self) -> u64 {
        self.read_u64(META_LAST_NODE)
    }

    #[inline]
    pub fn set_last_node(&mut self, offset: u64) {
        self.write_u64(META_LAST_NODE, offset);
    }

    #[inline]
    pub fn last_item(&self) -> u64 {
        self.read_u64(META_LAST_ITEM)
    }

    #[inline]
    pub fn set_last_item(&mut self, offset: u64) {
        self.write_u64(META_LAST_ITEM, offset);
    }

    #[inline]
    pub fn structure_end(&self) -> u64 {
        self.read_u64(META_STRUCTURE_END)
    }

    #[inline]
    pub fn set_structure_end(&mut self, end: u64) {
        self.write_u64(META_STRUCTURE_END, end);
    }

    /// Resets `Meta` to the empty state. Requires the buffer to be at least
    /// large enough to hold `Meta` itself.
    pub fn clear(&mut self) -> Result<(), TreeError> {
        if self.capacity() < META_SIZE {
            return Err(TreeError::OutOfMemory {
                needed: META_SIZE,
                available: self.capacity(),
            });
        }
        self.set_last_node(0);
        self.set_last_item(0);
        self.set_structure_end(META_SIZE);
        log::debug!("arena cleared, structure_end={META_SIZE}");
        Ok(())
    }

    /// Bytes of the buffer's prefix that are live — the rest is unused
    /// capacity.
    #[inline]
    pub fn memory_usage(&self) -> u64 {
        self.structure_end()
    }

    // -- Bump allocation -------------------------------------------------

    /// Reserves `len` bytes at the current watermark, advances the
    /// watermark, and returns the offset the caller should write to.
    pub fn bump(&mut self, len: u64) -> Result<u64, TreeError> {
        let capacity = self.capacity();
        let end = self.structure_end();
        let available = capacity - end;
        if len > available {
            log::warn!("arena out of memory: need {len} bytes, {available} available");
            return Err(TreeError::OutOfMemory {
                needed: len,
                available,
            });
        }
        self.set_structure_end(end + len);
        Ok(end)
    }

    // -- Raw field access -------------------------------------------------

    #[inline]
    pub fn read_u64(&self, at: u64) -> u64 {
        let at = at as usize;
        u64::from_le_bytes(self.buf[at..at + 8].try_into().unwrap())
    }

    #[inline]
    pub fn write_u64(&mut self, at: u64, value: u64) {
        let at = at as usize;
        self.buf[at..at + 8].copy_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn read_u8(&self, at: u64) -> u8 {
        self.buf[at as usize]
    }

    #[inline]
    pub fn write_u8(&mut self, at: u64, value: u8) {
        self.buf[at as usize] = value;
    }

    #[inline]
    pub fn read_bytes(&self, at: u64, len: u64) -> &[u8] {
        let at = at as usize;
        &self.buf[at..at + len as usize]
    }

    #[inline]
    pub fn write_bytes(&mut self, at: u64, data: &[u8]) {
        let at = at as usize;
        self.buf[at..at + data.len()].copy_from_slice(data);
    }
}
