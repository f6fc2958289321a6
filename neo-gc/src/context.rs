//! Conservative mark-and-sweep collection over a tracked-allocation table.
//!
//! Grounded on `gc_context_t` and the `gc_*` functions in the original's
//! `neo_gc.h`. The original scans the native VM stack (`stktop`/`stkbot`,
//! the VM's own heap-allocated operand stack, not the host call stack) for
//! values that look like pointers into tracked memory. This port has no
//! native stack to walk: the VM's operand stack is an explicit
//! `Vec<Record>`, so [`GcContext::collect`] takes that buffer's raw words
//! as an explicit argument instead of reaching for ambient stack state.

use std::alloc::{alloc, dealloc, Layout};
use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::alloc::{AllocTable, TrackedAlloc};
use crate::flags::GcFlags;

/// GC must be this full before the allocation table resizes.
pub const GC_LOAD_FACTOR: f64 = 0.9;
/// Trigger a sweep once allocations exceed this fraction of table capacity.
pub const GC_SWEEP_FACTOR: f64 = 0.5;
/// Allocation granularity in bytes; every tracked allocation is rounded up
/// to a multiple of this.
pub const GC_ALLOC_GRANULARITY: usize = 8;

const INITIAL_SLOTS: usize = 32;

fn round_up_granularity(size: usize) -> usize {
    let g = GC_ALLOC_GRANULARITY;
    (size + g - 1) / g * g
}

/// Thread-local (in the original; single-owner here) garbage-collected
/// heap. Owns every pointer it hands out via [`GcContext::alloc`] and is
/// responsible for freeing them again, either explicitly via
/// [`GcContext::free`] or implicitly during [`GcContext::collect`].
#[derive(Debug)]
pub struct GcContext {
    table: AllocTable,
    threshold: usize,
    load_factor: f64,
    sweep_factor: f64,
    paused: bool,
}

impl GcContext {
    /// Creates a fresh, empty context.
    pub fn new() -> Self {
        GcContext {
            table: AllocTable::new(INITIAL_SLOTS),
            threshold: INITIAL_SLOTS,
            load_factor: GC_LOAD_FACTOR,
            sweep_factor: GC_SWEEP_FACTOR,
            paused: false,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Number of live tracked allocations.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Allocates `size` bytes tracked under `flags`, triggering a
    /// collection first if the table has grown past its sweep threshold
    /// and the GC isn't paused. `dtor`, if given, runs once just before the
    /// allocation is actually freed - by an explicit [`GcContext::free`] or
    /// by a sweep collecting it as garbage - matching `gc_vmalloc`'s own
    /// `dtor` parameter.
    #[instrument(skip(self, dtor))]
    pub fn alloc(&mut self, size: usize, flags: GcFlags, roots: &[u64], dtor: Option<fn(*mut u8)>) -> *mut u8 {
        if !self.paused && self.table.len() >= self.threshold {
            self.collect(roots);
            self.threshold = ((self.table.capacity() as f64) * self.sweep_factor) as usize;
            self.threshold = self.threshold.max(INITIAL_SLOTS);
        }
        let size = round_up_granularity(size.max(1));
        let layout = Layout::from_size_align(size, GC_ALLOC_GRANULARITY).expect("valid layout");
        let ptr = unsafe { alloc(layout) };
        assert!(!ptr.is_null(), "allocation failure");
        self.table.insert(
            TrackedAlloc {
                addr: ptr as usize,
                size,
                flags,
                dtor,
            },
            self.load_factor,
        );
        ptr
    }

    /// Explicitly frees a tracked allocation, bypassing collection. Runs
    /// the allocation's destructor, if any, before releasing its memory -
    /// matching `gc_objfree`'s "invoke destructor, if any" before the
    /// underlying bytes are released.
    pub fn free(&mut self, ptr: *mut u8) {
        if let Some(entry) = self.table.remove(ptr as usize) {
            self.dealloc_raw(entry);
        }
    }

    /// Runs `entry`'s destructor, if any, then releases its memory. Every
    /// caller that removes a [`TrackedAlloc`] from the table - explicit
    /// [`GcContext::free`], sweep, and `Drop` - routes through here so the
    /// destructor-then-free ordering can't be forgotten at a new call site.
    fn dealloc_raw(&self, entry: TrackedAlloc) {
        if let Some(dtor) = entry.dtor {
            dtor(entry.addr as *mut u8);
        }
        let layout = Layout::from_size_align(entry.size, GC_ALLOC_GRANULARITY).expect("valid layout");
        unsafe { dealloc(entry.addr as *mut u8, layout) };
    }

    /// Looks up the tracked allocation whose base address is exactly
    /// `ptr`. Interior pointers never resolve, matching `gc_resolve_ptr`.
    pub fn resolve_ptr(&self, ptr: *const u8) -> Option<&TrackedAlloc> {
        self.table.find(ptr as usize)
    }

    pub fn set_flags(&mut self, ptr: *mut u8, flags: GcFlags) {
        if let Some(entry) = self.table.find_mut(ptr as usize) {
            entry.flags = flags;
        }
    }

    pub fn get_flags(&self, ptr: *const u8) -> Option<GcFlags> {
        self.table.find(ptr as usize).map(|e| e.flags)
    }

    pub fn get_size(&self, ptr: *const u8) -> Option<usize> {
        self.table.find(ptr as usize).map(|e| e.size)
    }

    /// Runs one mark-and-sweep cycle.
    ///
    /// `roots` is a conservative scan buffer: every `u64` word in it that
    /// happens to equal the base address of a tracked allocation is
    /// treated as a live reference to that allocation, exactly like the
    /// original's word-by-word scan of `[stkbot, stktop)`. Allocations
    /// flagged [`GcFlags::ROOT`] are kept alive unconditionally; those
    /// flagged [`GcFlags::LEAF`] are marked but never scanned for nested
    /// pointers, since by construction they contain none.
    #[instrument(skip(self, roots))]
    pub fn collect(&mut self, roots: &[u64]) {
        if self.paused {
            return;
        }
        let live_addrs: HashSet<usize> = self.table.iter().map(|a| a.addr()).collect();

        let mut worklist: Vec<usize> = self
            .table
            .iter()
            .filter(|a| a.flags().contains(GcFlags::ROOT))
            .map(|a| a.addr())
            .collect();
        for &word in roots {
            let addr = word as usize;
            if live_addrs.contains(&addr) {
                worklist.push(addr);
            }
        }

        let mut marked: HashSet<usize> = HashSet::new();
        while let Some(addr) = worklist.pop() {
            if !marked.insert(addr) {
                continue;
            }
            let Some(entry) = self.table.find(addr) else {
                continue;
            };
            if entry.flags().contains(GcFlags::LEAF) {
                continue;
            }
            // Scan the allocation's own bytes for further tracked
            // addresses - conservative, same rule as the root scan.
            let bytes = unsafe { std::slice::from_raw_parts(addr as *const u8, entry.size()) };
            for chunk in bytes.chunks_exact(std::mem::size_of::<u64>()) {
                let word = u64::from_ne_bytes(chunk.try_into().unwrap());
                let candidate = word as usize;
                if live_addrs.contains(&candidate) {
                    worklist.push(candidate);
                }
            }
        }

        for addr in &marked {
            if let Some(entry) = self.table.find_mut(*addr) {
                entry.flags.insert(GcFlags::MARK);
            }
        }

        let garbage: Vec<TrackedAlloc> = self
            .table
            .iter()
            .filter(|a| !a.flags().contains(GcFlags::MARK))
            .copied()
            .collect();
        debug!(collected = garbage.len(), live = marked.len(), "gc sweep");
        for entry in garbage {
            self.table.remove(entry.addr());
            self.dealloc_raw(entry);
        }
        for entry in self.table.iter_mut() {
            entry.flags.remove(GcFlags::MARK);
        }
    }
}

impl Default for GcContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for GcContext {
    fn drop(&mut self) {
        let all: Vec<TrackedAlloc> = self.table.iter().copied().collect();
        for entry in all {
            self.table.remove(entry.addr());
            self.dealloc_raw(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_is_tracked_and_resolves() {
        let mut ctx = GcContext::new();
        let ptr = ctx.alloc(16, GcFlags::empty(), &[], None);
        assert_eq!(ctx.len(), 1);
        assert!(ctx.resolve_ptr(ptr).is_some());
        assert_eq!(ctx.get_size(ptr), Some(16));
    }

    #[test]
    fn unreachable_allocation_is_collected() {
        let mut ctx = GcContext::new();
        let _ptr = ctx.alloc(8, GcFlags::empty(), &[], None);
        assert_eq!(ctx.len(), 1);
        ctx.collect(&[]);
        assert_eq!(ctx.len(), 0);
    }

    #[test]
    fn rooted_allocation_survives_collection() {
        let mut ctx = GcContext::new();
        let ptr = ctx.alloc(8, GcFlags::ROOT, &[], None);
        ctx.collect(&[]);
        assert_eq!(ctx.len(), 1);
        assert!(ctx.resolve_ptr(ptr).is_some());
    }

    #[test]
    fn allocation_reachable_from_stack_word_survives() {
        let mut ctx = GcContext::new();
        let ptr = ctx.alloc(8, GcFlags::empty(), &[], None);
        let roots = [ptr as u64];
        ctx.collect(&roots);
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn pause_prevents_collection() {
        let mut ctx = GcContext::new();
        let _ptr = ctx.alloc(8, GcFlags::empty(), &[], None);
        ctx.pause();
        ctx.collect(&[]);
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn explicit_free_removes_tracking() {
        let mut ctx = GcContext::new();
        let ptr = ctx.alloc(8, GcFlags::empty(), &[], None);
        ctx.free(ptr);
        assert_eq!(ctx.len(), 0);
        assert!(ctx.resolve_ptr(ptr).is_none());
    }

    #[test]
    fn interior_pointer_does_not_resolve() {
        let mut ctx = GcContext::new();
        let ptr = ctx.alloc(16, GcFlags::empty(), &[], None);
        let interior = unsafe { ptr.add(4) };
        assert!(ctx.resolve_ptr(interior).is_none());
    }

    #[test]
    fn destructor_runs_before_explicit_free_releases_memory() {
        static DTOR_RAN: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);
        fn mark_ran(_ptr: *mut u8) {
            DTOR_RAN.store(true, std::sync::atomic::Ordering::SeqCst);
        }
        let mut ctx = GcContext::new();
        let ptr = ctx.alloc(8, GcFlags::empty(), &[], Some(mark_ran));
        ctx.free(ptr);
        assert!(DTOR_RAN.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn destructor_runs_when_swept_as_garbage() {
        static DTOR_RAN: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);
        fn mark_ran(_ptr: *mut u8) {
            DTOR_RAN.store(true, std::sync::atomic::Ordering::SeqCst);
        }
        let mut ctx = GcContext::new();
        let _ptr = ctx.alloc(8, GcFlags::empty(), &[], Some(mark_ran));
        ctx.collect(&[]);
        assert!(DTOR_RAN.load(std::sync::atomic::Ordering::SeqCst));
    }
}
