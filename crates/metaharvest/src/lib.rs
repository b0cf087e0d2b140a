//! Metaharvest - Schema-Driven Metadata Extraction for Preserved Content
//!
//! Metaharvest pulls bibliographic metadata out of XML and JSON delivery
//! files (publisher feeds, ONIX product files, JSON article manifests) using
//! declarative schemas: path expressions select the values, typed coercions
//! turn them into strings, and a field map projects raw keys onto a
//! controlled metadata vocabulary.
//!
//! # Quick Start
//!
//! ```rust
//! use metaharvest::{MetadataField, XmlKind, XmlSchema};
//!
//! # fn main() -> metaharvest::Result<()> {
//! let schema = XmlSchema::builder()
//!     .record_boundary("/feed/article")
//!     .record_field("doi", XmlKind::Text)
//!     .record_field("title", XmlKind::Text)
//!     .cook("doi", MetadataField::Doi)
//!     .cook("title", MetadataField::ArticleTitle)
//!     .build()?;
//!
//! let records = metaharvest::xml::extract(
//!     b"<feed><article><doi>10.1/x</doi><title>On Birds</title></article></feed>",
//!     None,
//!     &schema,
//! )?;
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].get_raw("doi"), Some("10.1/x"));
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Schemas** (`schema`): immutable, compiled extraction descriptions
//! - **Path engines** (`xpath`, `jsonpath`): small compiled subsets evaluated
//!   over `roxmltree` and `serde_json` trees
//! - **Walkers** (`xml`, `json`): one raw record per record scope, globals
//!   merged into every record
//! - **Pipeline** (`extract`): consolidation, companion-file checks, field
//!   projection, emission
//! - **Registry** (`registry`): named schema registration and lookup

#![deny(unsafe_code)]

pub mod consolidate;
pub mod error;
pub mod extract;
pub mod fields;
pub mod json;
pub mod jsonpath;
pub mod record;
pub mod registry;
pub mod schema;
pub mod source;
pub mod xml;
pub mod xpath;

pub use consolidate::consolidate;
pub use error::{HarvestError, Result};
pub use extract::{BatchOutcome, SourceExtractor};
pub use fields::{MetadataField, MetadataRecord};
pub use jsonpath::JsonPath;
pub use record::{FieldMap, RecordAccumulator};
pub use registry::{schema_registry, SchemaRegistry};
pub use schema::{
    json_custom_value, xml_node_value, JsonKind, JsonSchema, JsonSchemaBuilder, SourceSchema,
    XmlKind, XmlSchema, XmlSchemaBuilder,
};
pub use source::{CollectingEmitter, ContentSource, ContentStore, Emitter};
pub use xpath::XPath;
