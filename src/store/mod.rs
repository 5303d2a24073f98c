//! The bloblist store
//!
//! This module implements the record store itself: the list header, the
//! packed record layout, and the create/open/add/find/ensure/resize/finish/
//! reloc operations. The byte layout it reads and writes is the handoff
//! contract between boot stages (see the crate docs).

mod list;
mod record;

pub use list::Bloblist;
pub use record::{Record, Records};
