//! Error types for bloblist operations

use thiserror::Error;

/// Result type alias for bloblist operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while creating, validating or mutating a bloblist
#[derive(Error, Debug)]
pub enum Error {
    /// The region's fixed capacity cannot hold the requested allocation.
    #[error("out of space: need {needed} bytes, {available} available")]
    NoSpace { needed: u32, available: u32 },

    /// The region base address does not satisfy the required alignment.
    #[error("region base {addr:#x} not aligned to {align}")]
    Misaligned { addr: usize, align: u32 },

    /// The region is too small to hold even the list header.
    #[error("region of {size} bytes is smaller than the {min}-byte header")]
    TooSmall { size: usize, min: u32 },

    /// No bloblist at the given region: wrong magic or truncated header.
    /// Distinct from [`Error::Corruption`].
    #[error("no bloblist present")]
    NotFound,

    /// No record with the given tag exists.
    #[error("record with tag {0:#x} not found")]
    RecordNotFound(u32),

    #[error("version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    /// The stored region size disagrees with the size the caller expected.
    #[error("region size mismatch: expected {expected}, found {found}")]
    SizeMismatch { expected: u32, found: u32 },

    /// An existing record has a different size than the one requested.
    /// Carries the stored size so the caller can decide to resize or abort.
    #[error("record {tag:#x} exists with size {found}, requested {requested}")]
    RecordSizeMismatch { tag: u32, requested: u32, found: u32 },

    /// Checksum mismatch: the committed bytes do not match the stored CRC32.
    #[error("corruption detected: stored checksum {stored:#010x}, computed {computed:#010x}")]
    Corruption { stored: u32, computed: u32 },

    /// Structurally invalid list (out-of-range offsets, bad record header).
    #[error("malformed bloblist: {0}")]
    Malformed(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
