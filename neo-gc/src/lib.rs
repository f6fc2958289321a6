//! Conservative mark-and-sweep garbage collector.
//!
//! Tracks allocations in an open-addressed table ([`alloc::AllocTable`])
//! keyed by base address and collects them against an explicitly-supplied
//! root scan buffer ([`context::GcContext::collect`]), rather than reading
//! ambient stack state the way the original's native-stack scan does.

pub mod alloc;
pub mod context;
pub mod flags;

pub use alloc::{AllocTable, TrackedAlloc};
pub use context::{GcContext, GC_ALLOC_GRANULARITY, GC_LOAD_FACTOR, GC_SWEEP_FACTOR};
pub use flags::GcFlags;
