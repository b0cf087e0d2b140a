//! Canonical metadata field vocabulary and cooked records.
//!
//! The downstream metadata sink understands a closed set of field
//! identifiers. The extraction engine never invents members of this set; it
//! only maps raw path-keyed values into it through a schema's field map.

use indexmap::IndexMap;
use serde::Serialize;

/// Canonical output field identifiers understood by the metadata sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    Publisher,
    PublicationTitle,
    ArticleTitle,
    Author,
    Date,
    Doi,
    Issn,
    Eissn,
    Isbn,
    Eisbn,
    Volume,
    Issue,
    StartPage,
    EndPage,
    AccessUrl,
    Keywords,
    Language,
    Format,
}

impl MetadataField {
    /// Whether the field carries multiple values per record.
    ///
    /// Single-valued fields keep the first value cooked into them; later
    /// values for the same field are ignored.
    pub fn is_multi_valued(self) -> bool {
        matches!(
            self,
            MetadataField::Author | MetadataField::Keywords | MetadataField::Format
        )
    }
}

/// One cooked metadata record: an ordered mapping from canonical field to its
/// value(s), ready to hand to a sink.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetadataRecord {
    fields: IndexMap<MetadataField, Vec<String>>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `field`, honoring the field's cardinality:
    /// multi-valued fields accumulate, single-valued fields keep the first
    /// value they ever receive.
    pub fn put(&mut self, field: MetadataField, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        let slot = self.fields.entry(field).or_default();
        if field.is_multi_valued() || slot.is_empty() {
            slot.push(value);
        }
    }

    /// Replace whatever is stored under `field` with a single value.
    ///
    /// Used by the pre-emit check to overwrite the access URL with the
    /// companion content file that was actually found.
    pub fn replace(&mut self, field: MetadataField, value: impl Into<String>) {
        self.fields.insert(field, vec![value.into()]);
    }

    /// First value for `field`, if any.
    pub fn get(&self, field: MetadataField) -> Option<&str> {
        self.fields.get(&field).and_then(|v| v.first()).map(String::as_str)
    }

    /// All values for `field`.
    pub fn get_all(&self, field: MetadataField) -> &[String] {
        self.fields.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, field: MetadataField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (MetadataField, &[String])> {
        self.fields.iter().map(|(f, v)| (*f, v.as_slice()))
    }
}
