//! Arena references into an [`AstPool`](crate::pool::AstPool).
//!
//! Grounded on `astref_t` in the original's `neo_ast.h`: a 32-bit index
//! where `0` is reserved to mean "no node" and real nodes are numbered
//! starting at `1`. [`std::num::NonZeroU32`] gives that invariant for free -
//! optionality is expressed as `Option<AstRef>` (which is a plain `u32` in
//! memory thanks to the niche optimization) rather than a sentinel value
//! compared by hand.

use std::num::NonZeroU32;

/// A reference to a node stored in an [`AstPool`](crate::pool::AstPool).
///
/// `Option<AstRef>` is the idiomatic replacement for the original's
/// "optional" reference fields (`astref_decl(opt)`), since `ASTREF_NULL`
/// collapses to `None` with no extra storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AstRef(NonZeroU32);

impl AstRef {
    pub(crate) fn from_index(index: u32) -> Self {
        AstRef(NonZeroU32::new(index + 1).expect("index + 1 is never zero"))
    }

    /// The node pool index this reference resolves to.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }
}

/// A reference to a list segment header stored in an
/// [`AstPool`](crate::pool::AstPool)'s list table.
///
/// Grounded on the `nodes`/`len`/`cap` triple embedded directly in
/// `node_block_t` in the original; here the triple lives in a side table
/// (see [`crate::pool::ListSeg`]) so that growing a list never needs to
/// touch the node that references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListRef(NonZeroU32);

impl ListRef {
    pub(crate) fn from_index(index: u32) -> Self {
        ListRef(NonZeroU32::new(index + 1).expect("index + 1 is never zero"))
    }

    pub(crate) fn index(self) -> u32 {
        self.0.get() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ast_ref_round_trips_index() {
        let r = AstRef::from_index(41);
        assert_eq!(r.index(), 41);
    }
}
