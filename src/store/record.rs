//! Record wire layout and the record walk
//!
//! Each record is a 16-byte header followed by its payload:
//!
//! ```text
//! | tag (4) | hdr_size (4) | size (4) | spare (4) | payload (size) | pad |
//! ```
//!
//! `hdr_size` is the distance from the record start to the payload start and
//! absorbs any padding needed to align the payload. `size` is the payload
//! length exactly as requested, not rounded up. The next record begins at
//! the record start plus `hdr_size + size`, rounded up to
//! [`DEFAULT_ALIGN`](crate::DEFAULT_ALIGN).

use crate::DEFAULT_ALIGN;

/// Size of the on-wire record header in bytes.
pub(crate) const REC_HDR_SIZE: u32 = 16;

const REC_TAG: usize = 0;
const REC_HDR_SIZE_OFS: usize = 4;
const REC_SIZE: usize = 8;
const REC_SPARE: usize = 12;

pub(crate) fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
}

pub(crate) fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Round `value` up to the next multiple of `align` (a power of two).
pub(crate) fn align_up(value: u64, align: u32) -> u64 {
    let align = align as u64;
    (value + align - 1) & !(align - 1)
}

/// Signed round-up toward positive infinity, for resize deltas.
pub(crate) fn align_up_i64(value: i64, align: u32) -> i64 {
    let align = align as i64;
    (value + align - 1).div_euclid(align) * align
}

/// Descriptor for one record: its tag, sizes and byte offsets within the
/// region. Descriptors are plain values; they are invalidated by any
/// mutation of the list (a `resize` may shift the record they refer to).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    /// Caller-defined type of the payload; never 0.
    pub tag: u32,
    /// Payload length in bytes.
    pub size: u32,
    /// Record start to payload start, including alignment padding.
    pub hdr_size: u32,
    /// Byte offset of the record header from the region base.
    pub offset: usize,
}

impl Record {
    /// Byte offset of the payload from the region base.
    pub fn payload_offset(&self) -> usize {
        self.offset + self.hdr_size as usize
    }

    /// Offset of the next record: payload end rounded to the default
    /// alignment. Equals `alloced` for the last record.
    pub(crate) fn end_offset(&self) -> usize {
        let end = self.offset as u64 + self.hdr_size as u64 + self.size as u64;
        align_up(end, DEFAULT_ALIGN) as usize
    }

    /// Parse the record header at `offset`, bounds-checked against the
    /// committed length `limit`. Returns `None` for anything that cannot be
    /// a record the store wrote: a truncated header, an undersized
    /// `hdr_size`, or a payload running past `limit`.
    pub(crate) fn parse(buf: &[u8], offset: usize, limit: usize) -> Option<Record> {
        if offset + REC_HDR_SIZE as usize > limit || limit > buf.len() {
            return None;
        }
        let tag = read_u32(buf, offset + REC_TAG);
        let hdr_size = read_u32(buf, offset + REC_HDR_SIZE_OFS);
        let size = read_u32(buf, offset + REC_SIZE);
        if hdr_size < REC_HDR_SIZE {
            return None;
        }
        if offset as u64 + hdr_size as u64 + size as u64 > limit as u64 {
            return None;
        }
        Some(Record {
            tag,
            size,
            hdr_size,
            offset,
        })
    }

    /// Write a record header at `offset`. `spare` is always written as 0.
    pub(crate) fn write(buf: &mut [u8], offset: usize, tag: u32, hdr_size: u32, size: u32) {
        write_u32(buf, offset + REC_TAG, tag);
        write_u32(buf, offset + REC_HDR_SIZE_OFS, hdr_size);
        write_u32(buf, offset + REC_SIZE, size);
        write_u32(buf, offset + REC_SPARE, 0);
    }

    /// Offset of the `size` field within the record header.
    pub(crate) fn size_field_offset(&self) -> usize {
        self.offset + REC_SIZE
    }
}

/// Iterator over the records of a list, in insertion order.
///
/// Walks from the first record until the committed boundary is reached.
/// Stops early if it encounters a header it cannot parse;
/// [`crate::Bloblist::open`] rejects such lists up front, so for any list
/// obtained through this crate the walk always covers every record.
pub struct Records<'a> {
    buf: &'a [u8],
    offset: usize,
    alloced: usize,
}

impl<'a> Records<'a> {
    pub(crate) fn new(buf: &'a [u8], first: usize, alloced: usize) -> Records<'a> {
        Records {
            buf,
            offset: first,
            alloced,
        }
    }
}

impl Iterator for Records<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.offset >= self.alloced {
            return None;
        }
        let rec = Record::parse(self.buf, self.offset, self.alloced)?;
        // hdr_size >= 16 was checked by parse, so this always advances
        self.offset = rec.end_offset();
        Some(rec)
    }
}
