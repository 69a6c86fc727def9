use thiserror::Error;

/// Failure modes of the tree. Every other outcome — "not found", "end of
/// iteration", "no value attached" — is encoded as an empty handle rather
/// than an error; see the `*_is_empty` methods on the handle types.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// The bump allocator could not satisfy a request, or `key_copy` was
    /// given an output buffer too small for the reconstructed key.
    #[error("out of memory: need {needed} bytes, {available} available")]
    OutOfMemory { needed: u64, available: u64 },
}
