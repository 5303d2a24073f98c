//! Well-known record tags
//!
//! Tags identify what a record's payload means; the values are part of the
//! cross-stage contract. The name table here is used only for diagnostics
//! (see the `Display` impl on [`crate::Bloblist`]), never for correctness.

/// Reserved "no record" sentinel; never assigned to a record.
pub const NONE: u32 = 0;

/// State handed from one boot phase to the next.
pub const PHASE_HANDOFF: u32 = 1;

/// Description of the RAM banks discovered by the first phase.
pub const MEMORY_LAYOUT: u32 = 2;

/// Console log carried across phases.
pub const CONSOLE_LOG: u32 = 3;

/// Flattened device tree for the OS.
pub const DEVICE_TREE: u32 = 4;

/// First tag value reserved for board- or vendor-private records.
pub const VENDOR_FIRST: u32 = 0x8000;

/// Human-readable name for a tag, for display purposes.
pub fn name(tag: u32) -> &'static str {
    match tag {
        NONE => "none",
        PHASE_HANDOFF => "phase-handoff",
        MEMORY_LAYOUT => "memory-layout",
        CONSOLE_LOG => "console-log",
        DEVICE_TREE => "device-tree",
        t if t >= VENDOR_FIRST => "vendor",
        _ => "unknown",
    }
}
