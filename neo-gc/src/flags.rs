//! Per-allocation GC flags.
//!
//! Transcribed from `gc_flags_t` in the original's `neo_gc.h`.

use bitflags::bitflags;

bitflags! {
    /// Flags tracked alongside each GC-managed allocation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GcFlags: u8 {
        /// Set during mark phase for every allocation found reachable;
        /// cleared again once sweep has run.
        const MARK = 1 << 0;
        /// Always treated as reachable regardless of what the stack scan
        /// finds - used for values the embedder holds outside any scanned
        /// stack.
        const ROOT = 1 << 1;
        /// Contains no further GC references; mark phase does not scan
        /// its bytes for pointers. An optimization, not a correctness
        /// requirement: an allocation that is actually a leaf but isn't
        /// flagged as one is still collected correctly, just scanned
        /// needlessly.
        const LEAF = 1 << 2;
    }
}

impl Default for GcFlags {
    fn default() -> Self {
        GcFlags::empty()
    }
}
