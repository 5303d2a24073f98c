//! Memory regions backing a bloblist
//!
//! A [`Region`] is a flat byte buffer with a stable base address: either an
//! owned heap allocation carved out with the store's base alignment, or a raw
//! physical range handed over by the platform via [`map_physical`]. All store
//! code addresses the region by byte offset through bounds-checked slices;
//! this module is the only place that touches pointers.

use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::slice;

use crate::DEFAULT_ALIGN;

enum Inner {
    Owned {
        ptr: NonNull<u8>,
        len: usize,
        layout: Layout,
    },
    Raw {
        ptr: NonNull<u8>,
        len: usize,
    },
}

/// A contiguous byte region with exclusive ownership semantics.
///
/// While a [`crate::Bloblist`] holds a region, it is the sole writer; handing
/// the region to another owner goes through `into_region`/`reloc`, never
/// through aliasing.
pub struct Region {
    inner: Inner,
}

impl Region {
    /// Allocate a zeroed, owned region aligned to [`DEFAULT_ALIGN`].
    ///
    /// Panics if `len` is zero or on allocation failure.
    pub fn alloc(len: usize) -> Region {
        Region::alloc_aligned(len, DEFAULT_ALIGN)
    }

    /// Allocate a zeroed, owned region with a caller-chosen base alignment.
    ///
    /// Records requested at an alignment larger than [`DEFAULT_ALIGN`] are
    /// placed at aligned byte offsets; their payload address is then aligned
    /// too whenever the base is, which is what this constructor guarantees.
    /// Alignments below [`DEFAULT_ALIGN`] are raised to it.
    ///
    /// Panics if `len` is zero, `align` is not a power of two, or on
    /// allocation failure.
    pub fn alloc_aligned(len: usize, align: u32) -> Region {
        assert!(len > 0, "zero-length region");
        assert!(align.is_power_of_two(), "alignment must be a power of two");
        let align = align.max(DEFAULT_ALIGN);
        let layout = Layout::from_size_align(len, align as usize)
            .unwrap_or_else(|_| panic!("invalid region length {len}"));
        // SAFETY: layout has nonzero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(ptr) else {
            alloc::handle_alloc_error(layout)
        };
        Region {
            inner: Inner::Owned { ptr, len, layout },
        }
    }

    /// Wrap a raw memory range without taking ownership of its storage.
    ///
    /// # Safety
    ///
    /// `addr..addr + len` must be mapped, readable and writable for the
    /// lifetime of the region, and must not be accessed through any other
    /// path while the region (or a store built on it) is alive.
    pub unsafe fn from_raw(addr: usize, len: usize) -> Region {
        let ptr = NonNull::new(addr as *mut u8).unwrap_or(NonNull::dangling());
        Region {
            inner: Inner::Raw { ptr, len },
        }
    }

    /// Base address of the region.
    pub fn addr(&self) -> usize {
        match &self.inner {
            Inner::Owned { ptr, .. } | Inner::Raw { ptr, .. } => ptr.as_ptr() as usize,
        }
    }

    /// Capacity in bytes.
    pub fn len(&self) -> usize {
        match &self.inner {
            Inner::Owned { len, .. } | Inner::Raw { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        match &self.inner {
            Inner::Owned { ptr, len, .. } | Inner::Raw { ptr, len } => {
                // SAFETY: the range is valid per construction (owned) or per
                // the from_raw contract, and we hold the only reference.
                unsafe { slice::from_raw_parts(ptr.as_ptr(), *len) }
            }
        }
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        match &mut self.inner {
            Inner::Owned { ptr, len, .. } | Inner::Raw { ptr, len } => {
                // SAFETY: as above, via &mut self.
                unsafe { slice::from_raw_parts_mut(ptr.as_ptr(), *len) }
            }
        }
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        if let Inner::Owned { ptr, layout, .. } = &self.inner {
            // SAFETY: allocated in Region::alloc with this layout.
            unsafe { alloc::dealloc(ptr.as_ptr(), *layout) };
        }
    }
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.inner {
            Inner::Owned { .. } => "owned",
            Inner::Raw { .. } => "raw",
        };
        f.debug_struct("Region")
            .field("kind", &kind)
            .field("addr", &format_args!("{:#x}", self.addr()))
            .field("len", &self.len())
            .finish()
    }
}

/// Map a physical memory range into an addressable [`Region`].
///
/// Firmware runs with physical addressing (or an identity map), so this is a
/// direct wrap of the address. Hosted callers should only pass addresses of
/// memory they own.
///
/// # Safety
///
/// Same contract as [`Region::from_raw`].
pub unsafe fn map_physical(addr: usize, len: usize) -> Region {
    Region::from_raw(addr, len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_is_aligned_and_zeroed() {
        let region = Region::alloc(256);
        assert_eq!(region.addr() % DEFAULT_ALIGN as usize, 0);
        assert_eq!(region.len(), 256);
        assert!(region.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn alloc_aligned_honors_larger_alignment() {
        let region = Region::alloc_aligned(256, 64);
        assert_eq!(region.addr() % 64, 0);
        assert!(region.as_slice().iter().all(|&b| b == 0));

        // alignments below the default are raised to it
        let region = Region::alloc_aligned(256, 1);
        assert_eq!(region.addr() % DEFAULT_ALIGN as usize, 0);
    }

    #[test]
    fn raw_region_reads_back_writes() {
        let mut backing = Region::alloc(64);
        let addr = backing.addr();

        let mut raw = unsafe { Region::from_raw(addr, 64) };
        raw.as_mut_slice()[..4].copy_from_slice(&[1, 2, 3, 4]);
        drop(raw);

        assert_eq!(&backing.as_mut_slice()[..4], &[1, 2, 3, 4]);
    }
}
