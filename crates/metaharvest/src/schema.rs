//! Schema descriptors: the per-format configuration driving extraction.
//!
//! A schema is built once per publisher format, compiles every path
//! expression up front, and is then immutable. Share it behind an `Arc`
//! (usually through the [`crate::registry`]) across as many extraction calls
//! as needed; nothing in a schema is mutated at runtime.
//!
//! Field evaluators pair a compiled path with a value kind that decides how a
//! matched node is coerced to a string. The kinds with a closure payload
//! (`XmlKind::Node`, `JsonKind::Custom`) cover composite extraction that no
//! simple coercion can express, such as assembling "surname, given" from a
//! contributor element's children.

use crate::error::Result;
use crate::fields::MetadataField;
use crate::jsonpath::JsonPath;
use crate::record::FieldMap;
use crate::xpath::XPath;
use std::fmt;
use std::sync::Arc;

/// Structural extractor over an XML element.
pub type NodeToText =
    Arc<dyn for<'a, 'input> Fn(roxmltree::Node<'a, 'input>) -> Option<String> + Send + Sync>;

/// Structural extractor over a JSON value.
pub type ValueToText = Arc<dyn Fn(&serde_json::Value) -> Option<String> + Send + Sync>;

/// How an XML node matched by an XPath becomes a raw string value.
#[derive(Clone)]
pub enum XmlKind {
    /// Text content of the node; empty text yields no value.
    Text,
    /// Text content parsed as a number; unparseable text yields no value.
    Number,
    /// Text content parsed as a boolean.
    Boolean,
    /// Structural extraction from the element itself.
    Node(NodeToText),
}

impl fmt::Debug for XmlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XmlKind::Text => f.write_str("Text"),
            XmlKind::Number => f.write_str("Number"),
            XmlKind::Boolean => f.write_str("Boolean"),
            XmlKind::Node(_) => f.write_str("Node(..)"),
        }
    }
}

/// Build an [`XmlKind::Node`] from a closure.
pub fn xml_node_value<F>(f: F) -> XmlKind
where
    F: for<'a, 'input> Fn(roxmltree::Node<'a, 'input>) -> Option<String> + Send + Sync + 'static,
{
    XmlKind::Node(Arc::new(f))
}

/// How a JSON value matched by a JsonPath becomes raw string value(s).
#[derive(Clone)]
pub enum JsonKind {
    /// A JSON string; empty strings yield no value.
    String,
    /// A JSON number, re-rendered (integers without a decimal point).
    Number,
    /// A JSON boolean, rendered `true`/`false`.
    Boolean,
    /// A JSON array: every non-empty scalar element becomes its own raw
    /// value under the same key, preserving element order.
    Array,
    /// A JSON object, rendered as compact JSON.
    Object,
    /// Expected-null marker; contributes no value.
    Null,
    /// Structural extraction from the matched value.
    Custom(ValueToText),
}

impl fmt::Debug for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonKind::String => f.write_str("String"),
            JsonKind::Number => f.write_str("Number"),
            JsonKind::Boolean => f.write_str("Boolean"),
            JsonKind::Array => f.write_str("Array"),
            JsonKind::Object => f.write_str("Object"),
            JsonKind::Null => f.write_str("Null"),
            JsonKind::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Build a [`JsonKind::Custom`] from a closure.
pub fn json_custom_value<F>(f: F) -> JsonKind
where
    F: Fn(&serde_json::Value) -> Option<String> + Send + Sync + 'static,
{
    JsonKind::Custom(Arc::new(f))
}

/// A compiled XPath plus its value coercion.
#[derive(Debug, Clone)]
pub struct XmlEvaluator {
    pub(crate) path: XPath,
    pub(crate) kind: XmlKind,
}

/// A compiled JsonPath plus its value coercion.
#[derive(Debug, Clone)]
pub struct JsonEvaluator {
    pub(crate) path: JsonPath,
    pub(crate) kind: JsonKind,
}

/// Companion-file check configuration shared by both schema flavors.
///
/// Unconfigured (no prefix, no key, no suffixes) means every record passes
/// without any file lookup.
#[derive(Debug, Clone, Default)]
pub struct CompanionFile {
    pub(crate) prefix: Option<String>,
    pub(crate) filename_key: Option<String>,
    pub(crate) suffixes: Vec<String>,
}

impl CompanionFile {
    pub(crate) fn is_configured(&self) -> bool {
        self.prefix.is_some() || self.filename_key.is_some() || !self.suffixes.is_empty()
    }
}

/// Schema for XML delivery files.
#[derive(Debug)]
pub struct XmlSchema {
    pub(crate) global_fields: Vec<(String, XmlEvaluator)>,
    pub(crate) record_boundary: Option<XPath>,
    pub(crate) record_fields: Vec<(String, XmlEvaluator)>,
    pub(crate) field_map: FieldMap,
    pub(crate) dedup_key: Option<String>,
    pub(crate) consolidation_key: Option<String>,
    pub(crate) companion: CompanionFile,
    pub(crate) filter_bytes: bool,
}

impl XmlSchema {
    pub fn builder() -> XmlSchemaBuilder {
        XmlSchemaBuilder::default()
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.field_map
    }

    pub fn dedup_key(&self) -> Option<&str> {
        self.dedup_key.as_deref()
    }

    pub fn consolidation_key(&self) -> Option<&str> {
        self.consolidation_key.as_deref()
    }

    /// Whether the pre-parse control-byte repair filter is enabled.
    pub fn filters_bytes(&self) -> bool {
        self.filter_bytes
    }
}

/// Builder for [`XmlSchema`]. `build()` compiles every path expression and
/// fails with `PathSyntax` on the first typo, before any document is parsed.
#[derive(Debug, Default)]
pub struct XmlSchemaBuilder {
    global: Vec<(String, XmlKind)>,
    boundary: Option<String>,
    record: Vec<(String, XmlKind)>,
    field_map: FieldMap,
    dedup_key: Option<String>,
    consolidation_key: Option<String>,
    companion: CompanionFile,
    filter_bytes: bool,
}

impl XmlSchemaBuilder {
    /// Add a field evaluated once against the whole document and merged into
    /// every record.
    pub fn global_field(mut self, path: impl Into<String>, kind: XmlKind) -> Self {
        self.global.push((path.into(), kind));
        self
    }

    /// Set the path whose matches each become one record scope.
    pub fn record_boundary(mut self, path: impl Into<String>) -> Self {
        self.boundary = Some(path.into());
        self
    }

    /// Add a field evaluated relative to each record scope.
    pub fn record_field(mut self, path: impl Into<String>, kind: XmlKind) -> Self {
        self.record.push((path.into(), kind));
        self
    }

    /// Map a raw key onto a canonical field (repeatable; a raw key may map to
    /// several canonical fields).
    pub fn cook(mut self, raw_key: impl Into<String>, field: MetadataField) -> Self {
        self.field_map = self.field_map.map(raw_key, field);
        self
    }

    /// Raw field whose value identifies duplicate records.
    pub fn dedup_key(mut self, raw_key: impl Into<String>) -> Self {
        self.dedup_key = Some(raw_key.into());
        self
    }

    /// Raw field unioned across records that dedup together.
    pub fn consolidation_key(mut self, raw_key: impl Into<String>) -> Self {
        self.consolidation_key = Some(raw_key.into());
        self
    }

    /// Raw field whose value names the companion content file.
    pub fn filename_key(mut self, raw_key: impl Into<String>) -> Self {
        self.companion.filename_key = Some(raw_key.into());
        self
    }

    /// Fixed component prepended to the companion filename.
    pub fn filename_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.companion.prefix = Some(prefix.into());
        self
    }

    /// Suffixes tried in order when probing for the companion file.
    pub fn filename_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.companion.suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }

    /// Opt in to the pre-parse byte repair pass. Only applied when the
    /// resolved encoding is single-byte; some publishers' feeds need it,
    /// while filtering clean multi-byte text would corrupt it.
    pub fn filter_invalid_bytes(mut self, enabled: bool) -> Self {
        self.filter_bytes = enabled;
        self
    }

    pub fn build(self) -> Result<XmlSchema> {
        let mut global_fields = Vec::with_capacity(self.global.len());
        for (expr, kind) in self.global {
            let path = XPath::compile(&expr)?;
            global_fields.push((expr, XmlEvaluator { path, kind }));
        }
        let mut record_fields = Vec::with_capacity(self.record.len());
        for (expr, kind) in self.record {
            let path = XPath::compile(&expr)?;
            record_fields.push((expr, XmlEvaluator { path, kind }));
        }
        let record_boundary = match self.boundary {
            Some(expr) => Some(XPath::compile(&expr)?),
            None => None,
        };
        Ok(XmlSchema {
            global_fields,
            record_boundary,
            record_fields,
            field_map: self.field_map,
            dedup_key: self.dedup_key,
            consolidation_key: self.consolidation_key,
            companion: self.companion,
            filter_bytes: self.filter_bytes,
        })
    }
}

/// Schema for JSON delivery files. Mirrors [`XmlSchema`] minus the byte
/// filter, which has no JSON counterpart.
#[derive(Debug)]
pub struct JsonSchema {
    pub(crate) global_fields: Vec<(String, JsonEvaluator)>,
    pub(crate) record_boundary: Option<JsonPath>,
    pub(crate) record_fields: Vec<(String, JsonEvaluator)>,
    pub(crate) field_map: FieldMap,
    pub(crate) dedup_key: Option<String>,
    pub(crate) consolidation_key: Option<String>,
    pub(crate) companion: CompanionFile,
}

impl JsonSchema {
    pub fn builder() -> JsonSchemaBuilder {
        JsonSchemaBuilder::default()
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.field_map
    }

    pub fn dedup_key(&self) -> Option<&str> {
        self.dedup_key.as_deref()
    }

    pub fn consolidation_key(&self) -> Option<&str> {
        self.consolidation_key.as_deref()
    }
}

/// Builder for [`JsonSchema`].
#[derive(Debug, Default)]
pub struct JsonSchemaBuilder {
    global: Vec<(String, JsonKind)>,
    boundary: Option<String>,
    record: Vec<(String, JsonKind)>,
    field_map: FieldMap,
    dedup_key: Option<String>,
    consolidation_key: Option<String>,
    companion: CompanionFile,
}

impl JsonSchemaBuilder {
    pub fn global_field(mut self, path: impl Into<String>, kind: JsonKind) -> Self {
        self.global.push((path.into(), kind));
        self
    }

    pub fn record_boundary(mut self, path: impl Into<String>) -> Self {
        self.boundary = Some(path.into());
        self
    }

    pub fn record_field(mut self, path: impl Into<String>, kind: JsonKind) -> Self {
        self.record.push((path.into(), kind));
        self
    }

    pub fn cook(mut self, raw_key: impl Into<String>, field: MetadataField) -> Self {
        self.field_map = self.field_map.map(raw_key, field);
        self
    }

    pub fn dedup_key(mut self, raw_key: impl Into<String>) -> Self {
        self.dedup_key = Some(raw_key.into());
        self
    }

    pub fn consolidation_key(mut self, raw_key: impl Into<String>) -> Self {
        self.consolidation_key = Some(raw_key.into());
        self
    }

    pub fn filename_key(mut self, raw_key: impl Into<String>) -> Self {
        self.companion.filename_key = Some(raw_key.into());
        self
    }

    pub fn filename_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.companion.prefix = Some(prefix.into());
        self
    }

    pub fn filename_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.companion.suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<JsonSchema> {
        let mut global_fields = Vec::with_capacity(self.global.len());
        for (expr, kind) in self.global {
            let path = JsonPath::compile(&expr)?;
            global_fields.push((expr, JsonEvaluator { path, kind }));
        }
        let mut record_fields = Vec::with_capacity(self.record.len());
        for (expr, kind) in self.record {
            let path = JsonPath::compile(&expr)?;
            record_fields.push((expr, JsonEvaluator { path, kind }));
        }
        let record_boundary = match self.boundary {
            Some(expr) => Some(JsonPath::compile(&expr)?),
            None => None,
        };
        Ok(JsonSchema {
            global_fields,
            record_boundary,
            record_fields,
            field_map: self.field_map,
            dedup_key: self.dedup_key,
            consolidation_key: self.consolidation_key,
            companion: self.companion,
        })
    }
}

/// A schema for either supported document format.
#[derive(Debug)]
pub enum SourceSchema {
    Xml(XmlSchema),
    Json(JsonSchema),
}

impl SourceSchema {
    pub fn field_map(&self) -> &FieldMap {
        match self {
            SourceSchema::Xml(s) => s.field_map(),
            SourceSchema::Json(s) => s.field_map(),
        }
    }

    pub fn dedup_key(&self) -> Option<&str> {
        match self {
            SourceSchema::Xml(s) => s.dedup_key(),
            SourceSchema::Json(s) => s.dedup_key(),
        }
    }

    pub fn consolidation_key(&self) -> Option<&str> {
        match self {
            SourceSchema::Xml(s) => s.consolidation_key(),
            SourceSchema::Json(s) => s.consolidation_key(),
        }
    }

    pub(crate) fn companion(&self) -> &CompanionFile {
        match self {
            SourceSchema::Xml(s) => &s.companion,
            SourceSchema::Json(s) => &s.companion,
        }
    }
}

impl From<XmlSchema> for SourceSchema {
    fn from(schema: XmlSchema) -> Self {
        SourceSchema::Xml(schema)
    }
}

impl From<JsonSchema> for SourceSchema {
    fn from(schema: JsonSchema) -> Self {
        SourceSchema::Json(schema)
    }
}
