//! # bloblist
//!
//! A checksummed, tag-addressed record store for boot-stage handoff.
//!
//! A bloblist is a single contiguous memory region holding a fixed header
//! followed by a packed sequence of variable-size, tag-identified records.
//! Boot stages use it to pass structured data forward: an early stage creates
//! the list and appends records, a later stage validates the list (magic,
//! version, CRC32) and reads them back. The byte layout is the handoff
//! contract, so every field is packed by hand at a fixed offset.
//!
//! ## Region layout
//!
//! ```text
//! [HEADER: 28 bytes]
//!   - version:  4 bytes (u32 LE), must equal VERSION
//!   - hdr_size: 4 bytes, offset of the first record
//!   - flags:    4 bytes, caller-defined
//!   - magic:    4 bytes, MAGIC sentinel
//!   - size:     4 bytes, total region capacity
//!   - alloced:  4 bytes, bytes committed so far
//!   - chksum:   4 bytes, CRC32, 0 until finish()
//!
//! [RECORDS: variable]
//!   per record:
//!   - tag:      4 bytes, nonzero, unique within the list
//!   - hdr_size: 4 bytes, record start -> payload start (absorbs padding)
//!   - size:     4 bytes, payload length (not rounded up)
//!   - spare:    4 bytes, always 0
//!   - payload, then padding to the next DEFAULT_ALIGN boundary
//! ```
//!
//! Record payloads are aligned to [`DEFAULT_ALIGN`] (or a larger power of
//! two requested at creation); `alloced` always points exactly at the end of
//! the last record's padding, so records are contiguous with no gaps.
//!
//! ## Example
//!
//! ```ignore
//! use bloblist::{Bloblist, Region, tags};
//!
//! let mut list = Bloblist::create(Region::alloc(4096), 0)?;
//! let rec = list.add(tags::MEMORY_LAYOUT, 64, 0)?;
//! list.payload_mut(rec).copy_from_slice(&layout_bytes);
//! list.finish();
//! // ... next boot stage ...
//! let list = Bloblist::open(list.into_region(), 0)?;
//! ```

pub mod tags;

mod error;
mod init;
mod region;
mod store;

pub use error::{Error, Result};
pub use init::{init, FixedRegion, InitConfig};
pub use region::{map_physical, Region};
pub use store::{Bloblist, Record, Records};

/// Format version; a list with any other version is rejected.
pub const VERSION: u32 = 1;

/// Magic sentinel identifying a valid bloblist region.
pub const MAGIC: u32 = 0xb10b_1157;

/// Default payload alignment, and the alignment the region base must satisfy.
pub const DEFAULT_ALIGN: u32 = 16;
