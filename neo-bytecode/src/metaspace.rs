//! The constant pool (`ldc` target storage).
//!
//! Grounded on `metaspace_t` in the original's `neo_bc.h`: parallel arrays
//! of untagged [`Record`]s and their [`RecordTag`]s, keyed by a 24-bit
//! index (the `ldc` immediate can't address more than that). Inserting a
//! value that's already present returns the existing key instead of
//! appending a duplicate, matching `metaspace_insert_kv`'s "insert if not
//! existent" contract.

use neo_types::{Record, RecordTag, TaggedRecord};

use crate::instruction::UMM24_MAX;

/// A 24-bit constant pool index.
pub type ConstKey = u32;

/// Deduplicating storage for bytecode constants.
#[derive(Debug, Clone, Default)]
pub struct Metaspace {
    values: Vec<Record>,
    tags: Vec<RecordTag>,
}

impl Metaspace {
    /// Builds an empty constant pool, optionally reserving capacity.
    pub fn with_capacity(cap: usize) -> Self {
        Metaspace {
            values: Vec::with_capacity(cap),
            tags: Vec::with_capacity(cap),
        }
    }

    /// Inserts a tagged constant if not already present, returning its
    /// key either way.
    ///
    /// # Panics
    /// Panics if the pool has already grown to [`UMM24_MAX`] entries and a
    /// genuinely new constant is inserted - the `ldc` immediate has no
    /// more bits to address it with.
    pub fn insert(&mut self, tag: RecordTag, value: Record) -> ConstKey {
        let candidate = TaggedRecord { tag, record: value };
        for (i, (&existing_tag, &existing_value)) in
            self.tags.iter().zip(self.values.iter()).enumerate()
        {
            let existing = TaggedRecord {
                tag: existing_tag,
                record: existing_value,
            };
            if existing.value_eq(&candidate) {
                return i as ConstKey;
            }
        }
        assert!(
            (self.values.len() as u64) < UMM24_MAX as u64,
            "constant pool exhausted its 24-bit index space"
        );
        self.values.push(value);
        self.tags.push(tag);
        (self.values.len() - 1) as ConstKey
    }

    /// Whether `key` names a live constant.
    pub fn contains(&self, key: ConstKey) -> bool {
        (key as usize) < self.values.len()
    }

    /// Looks up a constant by key.
    pub fn get(&self, key: ConstKey) -> Option<TaggedRecord> {
        let i = key as usize;
        Some(TaggedRecord {
            tag: *self.tags.get(i)?,
            record: *self.values.get(i)?,
        })
    }

    /// Number of distinct constants stored.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the pool holds no constants.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserting_the_same_value_twice_dedups() {
        let mut pool = Metaspace::default();
        let a = pool.insert(RecordTag::Int, Record::from_int(42));
        let b = pool.insert(RecordTag::Int, Record::from_int(42));
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn same_bits_different_tag_are_distinct() {
        let mut pool = Metaspace::default();
        let as_int = pool.insert(RecordTag::Int, Record::from_int(0));
        let as_float = pool.insert(RecordTag::Float, Record::from_float(0.0));
        assert_ne!(as_int, as_float);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn lookup_round_trips() {
        let mut pool = Metaspace::default();
        let key = pool.insert(RecordTag::Float, Record::from_float(3.5));
        let got = pool.get(key).unwrap();
        assert_eq!(got.record.as_float(), 3.5);
        assert_eq!(got.tag, RecordTag::Float);
    }
}
