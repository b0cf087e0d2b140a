//! The extraction pipeline.
//!
//! [`SourceExtractor`] ties the pieces together for one delivery file: read
//! the stored bytes, run the format's walker, consolidate duplicate records,
//! verify companion files, project raw keys onto [`MetadataField`]s, and emit.
//! [`SourceExtractor::extract_batch`] runs that pipeline over many files with
//! per-document error containment.

use std::io::Read;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::consolidate::consolidate;
use crate::error::{HarvestError, Result};
use crate::fields::{MetadataField, MetadataRecord};
use crate::record::RecordAccumulator;
use crate::registry::schema_registry;
use crate::schema::SourceSchema;
use crate::source::{ContentSource, ContentStore, Emitter};
use crate::{json, xml};

/// Extracts metadata records from delivery files according to one schema.
#[derive(Clone)]
pub struct SourceExtractor {
    schema: Arc<SourceSchema>,
}

impl SourceExtractor {
    /// Create an extractor for `schema`.
    pub fn new(schema: impl Into<Arc<SourceSchema>>) -> Self {
        Self {
            schema: schema.into(),
        }
    }

    /// Create an extractor for the schema registered under `format`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaNotFound` if no schema is registered under that name.
    pub fn for_format(format: &str) -> Result<Self> {
        let schema = schema_registry()
            .read()
            .map_err(|_| HarvestError::validation("schema registry lock poisoned"))?
            .get(format)?;
        Ok(Self { schema })
    }

    pub fn schema(&self) -> &SourceSchema {
        &self.schema
    }

    /// Run the full pipeline over one delivery file, emitting every record
    /// that survives consolidation and the companion-file check.
    ///
    /// Returns the number of records emitted. The content stream is released
    /// before any record is emitted.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the source has no content, `Parse` if the
    /// document is malformed, and I/O or encoding errors from reading and
    /// decoding the stored bytes.
    pub fn extract(
        &self,
        source: &dyn ContentSource,
        store: &dyn ContentStore,
        emitter: &mut dyn Emitter,
    ) -> Result<usize> {
        let url = source.url();
        if !source.has_content() {
            return Err(HarvestError::validation(format!(
                "no content stored at {url}"
            )));
        }

        let bytes = {
            let mut reader = source.open()?;
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf)?;
            buf
        };
        debug!(url = url, bytes = bytes.len(), "read delivery file");

        let records = match self.schema.as_ref() {
            SourceSchema::Xml(schema) => xml::extract(&bytes, source.encoding(), schema)?,
            SourceSchema::Json(schema) => json::extract(&bytes, source.encoding(), schema)?,
        };
        debug!(url = url, records = records.len(), "raw records extracted");

        let records = consolidate(
            records,
            self.schema.dedup_key(),
            self.schema.consolidation_key(),
        );

        let mut emitted = 0usize;
        for record in records {
            if let Some(cooked) = self.finish_record(url, record, store) {
                emitter.emit(url, cooked);
                emitted += 1;
            }
        }
        info!(url = url, emitted = emitted, "extraction complete");
        Ok(emitted)
    }

    /// Run the pipeline over many delivery files. A failure in one document
    /// is logged and counted; the remaining documents still run.
    pub fn extract_batch<'a, I>(
        &self,
        sources: I,
        store: &dyn ContentStore,
        emitter: &mut dyn Emitter,
    ) -> BatchOutcome
    where
        I: IntoIterator<Item = &'a dyn ContentSource>,
    {
        let mut outcome = BatchOutcome::default();
        for source in sources {
            outcome.documents += 1;
            match self.extract(source, store, emitter) {
                Ok(n) => outcome.emitted += n,
                Err(e) => {
                    error!(url = source.url(), error = %e, "document extraction failed");
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    /// Companion check plus cooking. Returns `None` when the record is
    /// suppressed.
    fn finish_record(
        &self,
        url: &str,
        record: RecordAccumulator,
        store: &dyn ContentStore,
    ) -> Option<MetadataRecord> {
        let companion = self.schema.companion();
        let companion_url = if companion.is_configured() {
            match self.find_companion(url, &record, store) {
                Some(found) => Some(found),
                None => return None,
            }
        } else {
            None
        };

        let mut cooked = record.cook(self.schema.field_map());
        if cooked.is_empty() {
            debug!(url = url, "skipping record with no mapped fields");
            return None;
        }
        if let Some(found) = companion_url {
            cooked.replace(MetadataField::AccessUrl, found);
        }
        Some(cooked)
    }

    /// Probe the store for this record's companion file. Candidate URLs are
    /// built next to the delivery file from the configured prefix, the
    /// record's filename value, and each suffix in order; the first one with
    /// content wins.
    fn find_companion(
        &self,
        url: &str,
        record: &RecordAccumulator,
        store: &dyn ContentStore,
    ) -> Option<String> {
        let companion = self.schema.companion();

        let name = match &companion.filename_key {
            Some(key) => match record.get_raw(key) {
                Some(value) => value,
                None => {
                    debug!(url = url, key = key.as_str(), "record has no filename value");
                    return None;
                }
            },
            None => {
                warn!(url = url, "companion check configured without a filename key");
                return None;
            }
        };

        let base = match url.rsplit_once('/') {
            Some((dir, _)) => &url[..dir.len() + 1],
            None => "",
        };
        let prefix = companion.prefix.as_deref().unwrap_or("");

        let no_suffix = [String::new()];
        let suffixes: &[String] = if companion.suffixes.is_empty() {
            &no_suffix
        } else {
            &companion.suffixes
        };

        for suffix in suffixes {
            let candidate = format!("{base}{prefix}{name}{suffix}");
            let present = store
                .resolve(&candidate)
                .map(|s| s.has_content())
                .unwrap_or(false);
            if present {
                debug!(url = url, companion = candidate.as_str(), "companion found");
                return Some(candidate);
            }
        }
        debug!(url = url, name = name, "no companion file found; suppressing record");
        None
    }
}

/// Counts from one [`SourceExtractor::extract_batch`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Delivery files processed.
    pub documents: usize,
    /// Records emitted across all documents.
    pub emitted: usize,
    /// Documents that failed and were skipped.
    pub failed: usize,
}
