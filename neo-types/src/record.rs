//! The untagged 8-byte [`Record`] payload and its tagged wrapper.
//!
//! Mirrors `record_t`/`rtag_t`/`tvalue_t` from the original implementation:
//! a `Record` is a raw 8-byte bit pattern that means nothing on its own, and
//! a [`TaggedRecord`] pairs it with a [`RecordTag`] drawn from five variants.
//! Rather than an actual Rust `union` (which would make every field access
//! `unsafe`), `Record` stores a `u64` bit pattern and offers safe
//! reinterpreting accessors per scalar kind - the same "trust the tag"
//! contract as the original, without the `unsafe` blocks that a literal
//! union port would require throughout the rest of the workspace.

use std::fmt;

use crate::{Char, Float, Int};

/// Opaque, pointer-width handle to a GC-managed allocation.
///
/// Never exposed as a raw pointer outside the collector; holders resolve it
/// back through [`neo_gc`](https://docs.rs/neo-gc)'s tracking table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GcRef(pub u64);

impl GcRef {
    /// The null reference. No live allocation ever resolves to this value.
    pub const NULL: GcRef = GcRef(0);

    /// Returns `true` if this is the null reference.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Neo's boolean scalar: a single byte holding exactly `0` or `1`.
///
/// Kept distinct from Rust's `bool` so that [`Record`]'s 8-byte payload
/// round-trips bit-for-bit regardless of which scalar it holds; `Bool`
/// converts to and from `bool` at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bool(u8);

impl Bool {
    /// The `false` value.
    pub const FALSE: Bool = Bool(0);
    /// The `true` value.
    pub const TRUE: Bool = Bool(1);

    /// Builds a `Bool`, normalizing any nonzero byte to `1`.
    pub const fn new(value: bool) -> Self {
        Bool(value as u8)
    }

    /// Returns the underlying byte (always `0` or `1`).
    pub const fn byte(self) -> u8 {
        self.0
    }

    /// Returns the Rust `bool` equivalent.
    pub const fn get(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for Bool {
    fn from(value: bool) -> Self {
        Bool::new(value)
    }
}

impl From<Bool> for bool {
    fn from(value: Bool) -> Self {
        value.get()
    }
}

impl fmt::Display for Bool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// External tag identifying which scalar kind a [`Record`] currently holds.
///
/// Exactly the five variants of `rtag_t`: no runtime dispatch is implied by
/// this enum, it only labels an otherwise-untyped 8-byte payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::EnumIter, strum::EnumCount,
)]
#[repr(u8)]
pub enum RecordTag {
    /// [`Int`] (`i64`).
    Int = 0,
    /// [`Float`] (`f64`).
    Float = 1,
    /// [`Char`] (32-bit Unicode scalar value).
    Char = 2,
    /// [`Bool`] (single byte, 0/1).
    Bool = 3,
    /// [`GcRef`] (opaque pointer-width handle).
    Ref = 4,
}

/// Raw, untagged 8-byte scalar payload.
///
/// Construct one of the typed `from_*` constructors and read it back with
/// the matching `as_*` accessor. Reading a record with the wrong accessor
/// for the tag it was built with reinterprets the bit pattern rather than
/// panicking - exactly as dereferencing `record_t` as the wrong union
/// member would in the original. Callers that don't carry a trustworthy
/// tag alongside the record should use [`TaggedRecord`] instead.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Record {
    bits: u64,
}

impl Record {
    /// Builds a record from a signed 64-bit integer.
    pub const fn from_int(value: Int) -> Self {
        Record {
            bits: value as u64,
        }
    }

    /// Builds a record from an IEEE-754 binary64 float.
    pub fn from_float(value: Float) -> Self {
        Record {
            bits: value.to_bits(),
        }
    }

    /// Builds a record from a Unicode scalar value.
    pub const fn from_char(value: Char) -> Self {
        Record {
            bits: value as u64,
        }
    }

    /// Builds a record from a boolean scalar.
    pub const fn from_bool(value: Bool) -> Self {
        Record {
            bits: value.byte() as u64,
        }
    }

    /// Builds a record from an opaque GC reference.
    pub const fn from_ref(value: GcRef) -> Self {
        Record { bits: value.0 }
    }

    /// Builds a record directly from its raw bit pattern.
    pub const fn from_bits(bits: u64) -> Self {
        Record { bits }
    }

    /// Returns the raw bit pattern.
    pub const fn to_bits(self) -> u64 {
        self.bits
    }

    /// Reinterprets this record as a signed 64-bit integer.
    pub const fn as_int(self) -> Int {
        self.bits as i64
    }

    /// Reinterprets this record as an IEEE-754 binary64 float.
    pub fn as_float(self) -> Float {
        f64::from_bits(self.bits)
    }

    /// Reinterprets this record as a Unicode scalar value.
    ///
    /// Bit patterns outside the valid scalar-value range (surrogates, or
    /// values above `0x10FFFF`) are not reachable through the typed
    /// constructors; for a record built any other way this falls back to
    /// the Unicode replacement character rather than panicking.
    pub fn as_char(self) -> Char {
        char::from_u32(self.bits as u32).unwrap_or('\u{FFFD}')
    }

    /// Reinterprets this record as a boolean scalar.
    pub const fn as_bool(self) -> Bool {
        Bool::new(self.bits & 1 != 0)
    }

    /// Reinterprets this record as an opaque GC reference.
    pub const fn as_ref(self) -> GcRef {
        GcRef(self.bits)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record(0x{:016x})", self.bits)
    }
}

/// A [`Record`] paired with the [`RecordTag`] that says how to read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaggedRecord {
    /// Which scalar kind `record` holds.
    pub tag: RecordTag,
    /// The untagged payload.
    pub record: Record,
}

impl TaggedRecord {
    /// Builds a tagged integer record.
    pub const fn int(value: Int) -> Self {
        TaggedRecord {
            tag: RecordTag::Int,
            record: Record::from_int(value),
        }
    }

    /// Builds a tagged float record.
    pub fn float(value: Float) -> Self {
        TaggedRecord {
            tag: RecordTag::Float,
            record: Record::from_float(value),
        }
    }

    /// Builds a tagged char record.
    pub const fn char(value: Char) -> Self {
        TaggedRecord {
            tag: RecordTag::Char,
            record: Record::from_char(value),
        }
    }

    /// Builds a tagged bool record.
    pub const fn bool(value: Bool) -> Self {
        TaggedRecord {
            tag: RecordTag::Bool,
            record: Record::from_bool(value),
        }
    }

    /// Builds a tagged GC-reference record.
    pub const fn gc_ref(value: GcRef) -> Self {
        TaggedRecord {
            tag: RecordTag::Ref,
            record: Record::from_ref(value),
        }
    }

    /// Tag-aware equality: two tagged records are equal only if their tags
    /// match and the scalar value each decodes to (per its tag) is equal.
    ///
    /// Floats compare by bit pattern equality of the underlying record (via
    /// the derived `PartialEq` on `Record`), not IEEE `==`, so that `NaN`
    /// compares equal to itself and `put`/`get` on the constant pool stay
    /// consistent with simple deduplication by equal bits.
    pub fn value_eq(&self, other: &TaggedRecord) -> bool {
        self.tag == other.tag && self.record == other.record
    }
}

impl fmt::Display for TaggedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag {
            RecordTag::Int => write!(f, "{}", self.record.as_int()),
            RecordTag::Float => write!(f, "{}", self.record.as_float()),
            RecordTag::Char => write!(f, "{:?}", self.record.as_char()),
            RecordTag::Bool => write!(f, "{}", self.record.as_bool()),
            RecordTag::Ref => write!(f, "ref(0x{:x})", self.record.as_ref().0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn record_round_trips_int() {
        let r = Record::from_int(-42);
        assert_eq!(r.as_int(), -42);
    }

    #[test]
    fn record_round_trips_float_constants() {
        for x in [0.0, 1.0, 2.0, 0.5, -1.0, f64::NAN] {
            let r = Record::from_float(x);
            if x.is_nan() {
                assert!(r.as_float().is_nan());
            } else {
                assert_eq!(r.as_float(), x);
            }
        }
    }

    #[test]
    fn bool_normalizes_nonzero() {
        assert_eq!(Bool::new(true).byte(), 1);
        assert_eq!(Bool::new(false).byte(), 0);
    }

    #[test]
    fn tagged_record_dedup_equality() {
        let a = TaggedRecord::int(42);
        let b = TaggedRecord::int(42);
        let c = TaggedRecord::int(43);
        assert!(a.value_eq(&b));
        assert!(!a.value_eq(&c));
    }

    #[quickcheck]
    fn int_round_trip(x: i64) -> bool {
        Record::from_int(x).as_int() == x
    }

    #[quickcheck]
    fn char_round_trip(c: char) -> bool {
        Record::from_char(c).as_char() == c
    }
}
