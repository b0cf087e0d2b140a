//! Traits at the content boundary.
//!
//! The extraction engine never touches a repository or the filesystem
//! directly. It reads delivery files through [`ContentSource`], probes for
//! companion files through [`ContentStore`], and hands finished records to an
//! [`Emitter`]. Test and embedding code supply in-memory implementations.

use std::io::Read;

use crate::error::Result;
use crate::fields::MetadataRecord;

/// One stored document: a delivery file or a companion file.
pub trait ContentSource {
    /// The URL this content was stored under.
    fn url(&self) -> &str;

    /// The charset declared when the content was stored, if any. `None`
    /// means the decoder falls back to BOM detection and sniffing.
    fn encoding(&self) -> Option<&str> {
        None
    }

    /// Whether any content is actually present at this URL.
    fn has_content(&self) -> bool;

    /// Open the content for reading. The stream is dropped as soon as the
    /// bytes are consumed, before any records are emitted.
    fn open(&self) -> Result<Box<dyn Read + '_>>;
}

/// Lookup of stored content by URL, used for companion-file probes.
pub trait ContentStore {
    /// The source at `url`, or `None` if nothing is stored there.
    fn resolve(&self, url: &str) -> Option<Box<dyn ContentSource + '_>>;
}

/// Receives finished metadata records.
pub trait Emitter {
    fn emit(&mut self, source_url: &str, record: MetadataRecord);
}

/// An `Emitter` that collects records into a `Vec`, mainly for tests and
/// small batch jobs.
#[derive(Debug, Default)]
pub struct CollectingEmitter {
    records: Vec<(String, MetadataRecord)>,
}

impl CollectingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[(String, MetadataRecord)] {
        &self.records
    }

    pub fn into_records(self) -> Vec<(String, MetadataRecord)> {
        self.records
    }
}

impl Emitter for CollectingEmitter {
    fn emit(&mut self, source_url: &str, record: MetadataRecord) {
        self.records.push((source_url.to_string(), record));
    }
}
