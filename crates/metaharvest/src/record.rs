//! Raw per-record value accumulation and the raw-to-canonical cooking step.
//!
//! A [`RecordAccumulator`] holds everything the tree walkers pull out of one
//! record scope, keyed by the path string that located it. Raw storage is an
//! ordered multimap: one key may carry several values (multiple authors from a
//! single path), and insertion order is preserved throughout.
//!
//! Cooking projects raw entries into canonical fields through a [`FieldMap`].
//! It is a pure projection: raw keys missing from the map are dropped, and a
//! raw key may fan out to several canonical fields.

use crate::fields::{MetadataField, MetadataRecord};
use indexmap::IndexMap;

/// Ordered multimap from raw path string to canonical output field(s).
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    entries: IndexMap<String, Vec<MetadataField>>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `raw_key` onto `field`. A raw key may be mapped repeatedly, onto
    /// different canonical fields.
    pub fn map(mut self, raw_key: impl Into<String>, field: MetadataField) -> Self {
        self.entries.entry(raw_key.into()).or_default().push(field);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[MetadataField])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Ordered multi-valued raw-field store for one record scope.
#[derive(Debug, Clone, Default)]
pub struct RecordAccumulator {
    raw: IndexMap<String, Vec<String>>,
}

impl RecordAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to the sequence stored under `key`. Empty values are
    /// dropped silently so an absent field stays indistinguishable from an
    /// empty one.
    pub fn put_raw(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        self.raw.entry(key.into()).or_default().push(value);
    }

    /// First raw value under `key`, if any.
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    /// All raw values under `key`, in insertion order.
    pub fn raw_values(&self, key: &str) -> &[String] {
        self.raw.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn raw_keys(&self) -> impl Iterator<Item = &str> {
        self.raw.keys().map(String::as_str)
    }

    /// Number of raw keys present.
    pub fn raw_size(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Copy every raw entry of `other` into `self`, appending to any sequence
    /// already present under the same key. Used to merge globally-scoped
    /// values into each per-record accumulator; nothing is overwritten on
    /// either side.
    pub fn merge_from(&mut self, other: &RecordAccumulator) {
        for (key, values) in &other.raw {
            for value in values {
                self.put_raw(key.clone(), value.clone());
            }
        }
    }

    /// Append the values another record holds under `key` that are not yet
    /// present here, preserving first-then-second order. This is the
    /// consolidation union.
    pub fn union_raw(&mut self, key: &str, other: &RecordAccumulator) {
        for value in other.raw_values(key) {
            if !self.raw_values(key).iter().any(|v| v == value) {
                self.put_raw(key, value.clone());
            }
        }
    }

    /// Project raw entries into a canonical [`MetadataRecord`] through
    /// `field_map`. Raw keys absent from the map contribute nothing; the
    /// cardinality of each canonical field decides whether all values or only
    /// the first survive.
    pub fn cook(&self, field_map: &FieldMap) -> MetadataRecord {
        let mut cooked = MetadataRecord::new();
        for (raw_key, fields) in field_map.iter() {
            let values = self.raw_values(raw_key);
            if values.is_empty() {
                continue;
            }
            for &field in fields {
                for value in values {
                    cooked.put(field, value.clone());
                }
            }
        }
        cooked
    }
}
