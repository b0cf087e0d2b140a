//! JSON delivery-file adapter.
//!
//! Mirrors the XML walker: global fields are evaluated once against the
//! document root, record fields against each record scope, and global values
//! are merged into every record. Record scopes are the values matched by the
//! schema's record boundary path, in document order.

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{HarvestError, Result};
use crate::record::RecordAccumulator;
use crate::schema::{JsonEvaluator, JsonKind, JsonSchema};
use crate::xml::{render_number, resolve_encoding};

/// Parse `bytes` and extract one [`RecordAccumulator`] per record scope.
/// A parse failure is fatal to this document only.
pub fn extract(
    bytes: &[u8],
    declared_encoding: Option<&str>,
    schema: &JsonSchema,
) -> Result<Vec<RecordAccumulator>> {
    let encoding = resolve_encoding(bytes, declared_encoding)?;
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        debug!(
            encoding = encoding.name(),
            "malformed byte sequences replaced during decode"
        );
    }

    let doc: Value = serde_json::from_str(&text)
        .map_err(|e| HarvestError::parse_with_source("malformed JSON document", e))?;

    Ok(walk(&doc, schema))
}

fn walk(doc: &Value, schema: &JsonSchema) -> Vec<RecordAccumulator> {
    let global = if schema.global_fields.is_empty() {
        None
    } else {
        trace!("evaluating global fields");
        Some(collect_fields(doc, &schema.global_fields))
    };

    let mut records = Vec::new();
    if !schema.record_fields.is_empty() {
        match &schema.record_boundary {
            None => {
                // the whole document is the one record scope
                let mut rec = collect_fields(doc, &schema.record_fields);
                if let Some(g) = &global {
                    rec.merge_from(g);
                }
                records.push(rec);
            }
            Some(boundary) => {
                let scopes = boundary.evaluate(doc);
                trace!(count = scopes.len(), path = boundary.as_str(), "record scopes");
                for scope in scopes {
                    let mut rec = collect_fields(scope, &schema.record_fields);
                    if let Some(g) = &global {
                        rec.merge_from(g);
                    }
                    records.push(rec);
                }
            }
        }
    } else if let Some(g) = global {
        records.push(g);
    }
    records
}

fn collect_fields(scope: &Value, fields: &[(String, JsonEvaluator)]) -> RecordAccumulator {
    let mut rec = RecordAccumulator::new();
    for (key, evaluator) in fields {
        for value in evaluator.path.evaluate(scope) {
            for raw in coerce(value, &evaluator.kind, key) {
                trace!(key = key.as_str(), value = raw.as_str(), "raw value");
                rec.put_raw(key.clone(), raw);
            }
        }
    }
    rec
}

/// Coerce one matched value. Most kinds produce at most one string; `Array`
/// produces one per scalar element.
fn coerce(value: &Value, kind: &JsonKind, key: &str) -> Vec<String> {
    match kind {
        JsonKind::String => match value {
            Value::String(s) if !s.is_empty() => vec![s.clone()],
            Value::String(_) => Vec::new(),
            other => {
                debug!(key = key, "expected a string, got {}", kind_name(other));
                Vec::new()
            }
        },
        JsonKind::Number => match value {
            Value::Number(n) => vec![n.to_string()],
            Value::String(s) => match render_number(s) {
                Some(v) => vec![v],
                None => {
                    debug!(key = key, text = s.as_str(), "ignoring invalid number");
                    Vec::new()
                }
            },
            other => {
                debug!(key = key, "expected a number, got {}", kind_name(other));
                Vec::new()
            }
        },
        JsonKind::Boolean => match value {
            Value::Bool(b) => vec![b.to_string()],
            other => {
                debug!(key = key, "expected a boolean, got {}", kind_name(other));
                Vec::new()
            }
        },
        JsonKind::Array => match value {
            Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
            other => {
                debug!(key = key, "expected an array, got {}", kind_name(other));
                Vec::new()
            }
        },
        JsonKind::Object => match value {
            Value::Object(_) => serde_json::to_string(value).ok().into_iter().collect(),
            other => {
                debug!(key = key, "expected an object, got {}", kind_name(other));
                Vec::new()
            }
        },
        JsonKind::Null => Vec::new(),
        JsonKind::Custom(f) => f(value).filter(|s| !s.is_empty()).into_iter().collect(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::String(_) | Value::Null => None,
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
