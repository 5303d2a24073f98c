//! Boot-phase bloblist setup
//!
//! Each boot phase starts by obtaining its bloblist: either the one a
//! previous phase left at a pre-agreed fixed address, or a freshly created
//! one. [`init`] implements that policy; the store operations themselves
//! never retry or fall back.

use crate::{map_physical, Bloblist, Error, Region, Result};

/// A pre-agreed region for cross-stage handoff.
///
/// The address and size are fixed by the platform configuration; the memory
/// must be reserved for the bloblist for the whole boot, per the contract of
/// [`map_physical`].
#[derive(Clone, Copy, Debug)]
pub struct FixedRegion {
    pub addr: usize,
    pub size: usize,
}

/// Policy for obtaining a bloblist at boot-phase entry.
#[derive(Clone, Copy, Debug)]
pub struct InitConfig {
    /// Fixed handoff region, if the platform defines one.
    pub fixed: Option<FixedRegion>,
    /// Whether this is the very first phase to run. The first phase never
    /// expects to inherit a list; later phases try to open one first.
    pub first_phase: bool,
    /// Whether this phase may allocate a fresh region from its own heap.
    pub can_alloc: bool,
    /// Region size when allocating fresh; ignored when a fixed region is
    /// configured.
    pub alloc_size: usize,
    /// Header flags for a freshly created list.
    pub flags: u32,
}

/// Obtain the bloblist for this boot phase.
///
/// With a fixed region configured and a previous phase expected to have run,
/// tries to validate the list left there; on failure logs a warning and
/// falls through to creating a fresh list in the fixed region. Without a
/// fixed region, creates a fresh list in allocated memory if permitted.
/// Fails with [`Error::NotFound`] when no list can be obtained either way.
pub fn init(cfg: &InitConfig) -> Result<Bloblist> {
    if let Some(fixed) = cfg.fixed {
        let expected = u32::try_from(fixed.size).map_err(|_| {
            Error::InvalidArgument(format!(
                "fixed region of {} bytes exceeds the u32 size field",
                fixed.size
            ))
        })?;

        if !cfg.first_phase {
            // SAFETY: the platform reserves the fixed region for handoff
            let region = unsafe { map_physical(fixed.addr, fixed.size) };
            match Bloblist::open(region, expected) {
                Ok(list) => {
                    log::debug!(
                        "using bloblist from previous phase at {:#x}, {} bytes used",
                        fixed.addr,
                        list.alloced()
                    );
                    return Ok(list);
                }
                Err(err) => {
                    log::warn!(
                        "no usable bloblist at {:#x} ({err}); creating a fresh one",
                        fixed.addr
                    );
                }
            }
        }

        // SAFETY: as above
        let region = unsafe { map_physical(fixed.addr, fixed.size) };
        return Bloblist::create(region, cfg.flags);
    }

    if cfg.can_alloc {
        return Bloblist::create(Region::alloc(cfg.alloc_size), cfg.flags);
    }

    Err(Error::NotFound)
}
