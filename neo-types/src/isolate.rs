//! Process-wide isolate identity.
//!
//! Grounded on `vm_init`'s `mkid` counter in the original implementation:
//! a single atomic counter, seeded above a small reserved range, handed out
//! once per isolate and mixed with the creating thread's id so that ids
//! minted concurrently on different threads don't collide even if the
//! counter itself were to wrap.

use std::sync::atomic::{AtomicI64, Ordering};
use std::thread;

/// Counter backing [`next_isolate_id`]. Starts at `0x1000` so that small ids
/// stay free for sentinel use, matching the original's `mkid` seed.
static NEXT_ID: AtomicI64 = AtomicI64::new(0x1000);

/// Mints a fresh isolate id.
///
/// Combines a monotonically increasing counter with bits derived from the
/// calling thread's [`ThreadId`](thread::ThreadId) so that two isolates
/// created concurrently on different threads never compare equal even
/// before either is fully initialized.
pub fn next_isolate_id() -> i64 {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let tid = thread_id_bits();
    seq ^ (tid << 32)
}

fn thread_id_bits() -> i64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    use std::hash::{Hash, Hasher};
    thread::current().id().hash(&mut hasher);
    (hasher.finish() as i64) & 0xffff_ffff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_unique() {
        let a = next_isolate_id();
        let b = next_isolate_id();
        assert_ne!(a, b);
    }

    #[test]
    fn many_ids_are_pairwise_unique() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(next_isolate_id()));
        }
    }
}
