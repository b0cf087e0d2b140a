//! XML document adapter and tree walker.
//!
//! Parsing is deliberately lenient about everything except well-formedness:
//! no validation, no DTD fetching, no external entities (`roxmltree` has no
//! I/O surface at all, so a DOCTYPE in a delivery file can neither stall on
//! the network nor exfiltrate), and namespace-naive path matching. A schema
//! may additionally opt in to a byte-level repair pass that rescues the most
//! common encoding violations in single-byte feeds before the parser sees
//! them.
//!
//! Walking implements the record-scope algorithm: global fields once against
//! the document, the boundary path selecting one scope node per record in
//! document order, record fields relative to each scope, and the global
//! values merged into every record.

use crate::error::{HarvestError, Result};
use crate::record::RecordAccumulator;
use crate::schema::{XmlEvaluator, XmlKind, XmlSchema};
use crate::xpath::XMatch;
use encoding_rs::Encoding;
use roxmltree::{Document, ParsingOptions};
use tracing::{debug, trace, warn};

/// Replace bytes that routinely break publisher XML:
///
/// - control bytes outside {TAB, LF, CR} become `?`
/// - a bare `&` immediately followed by whitespace or end-of-input becomes
///   `?` (an `&` opening an entity reference is left alone)
///
/// This trades strict correctness for parse survivability and is only safe
/// on single-byte encodings; multi-byte text would be corrupted.
pub fn filter_xml_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    for (i, &b) in bytes.iter().enumerate() {
        let replaced = match b {
            b'\t' | b'\n' | b'\r' => b,
            0x00..=0x1F => b'?',
            b'&' => {
                let next = bytes.get(i + 1);
                match next {
                    None => b'?',
                    Some(n) if n.is_ascii_whitespace() => b'?',
                    Some(_) => b,
                }
            }
            _ => b,
        };
        out.push(replaced);
    }
    out
}

/// Resolve the encoding to decode with: a BOM wins, then the declared
/// charset, then content sniffing, defaulting to UTF-8.
pub(crate) fn resolve_encoding(
    bytes: &[u8],
    declared: Option<&str>,
) -> Result<&'static Encoding> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return Ok(encoding);
    }
    if let Some(label) = declared {
        return Encoding::for_label(label.as_bytes())
            .ok_or_else(|| HarvestError::UnsupportedEncoding(label.to_string()));
    }
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    Ok(detector.guess(None, true))
}

/// Parse `bytes` and extract one [`RecordAccumulator`] per record scope, in
/// document order. A parse failure is fatal to this document only.
pub fn extract(
    bytes: &[u8],
    declared_encoding: Option<&str>,
    schema: &XmlSchema,
) -> Result<Vec<RecordAccumulator>> {
    let encoding = resolve_encoding(bytes, declared_encoding)?;

    let filtered;
    let bytes = if schema.filters_bytes() {
        if encoding.is_single_byte() {
            filtered = filter_xml_bytes(bytes);
            &filtered[..]
        } else {
            warn!(
                encoding = encoding.name(),
                "byte filtering requested for a multi-byte encoding; skipping"
            );
            bytes
        }
    } else {
        bytes
    };

    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        debug!(
            encoding = encoding.name(),
            "malformed byte sequences replaced during decode"
        );
    }

    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(&text, options)
        .map_err(|e| HarvestError::parse_with_source("malformed XML document", e))?;

    Ok(walk(&doc, schema))
}

fn walk(doc: &Document<'_>, schema: &XmlSchema) -> Vec<RecordAccumulator> {
    let root = doc.root();

    let global = if schema.global_fields.is_empty() {
        None
    } else {
        trace!("evaluating global fields");
        Some(collect_fields(root, &schema.global_fields))
    };

    let mut records = Vec::new();
    if !schema.record_fields.is_empty() {
        match &schema.record_boundary {
            None => {
                // the whole document is the one record scope
                let mut rec = collect_fields(root, &schema.record_fields);
                if let Some(g) = &global {
                    rec.merge_from(g);
                }
                records.push(rec);
            }
            Some(boundary) => {
                let scopes = boundary.evaluate(root);
                trace!(count = scopes.len(), path = boundary.as_str(), "record scopes");
                for m in scopes {
                    let Some(scope) = m.as_element() else {
                        warn!(
                            path = boundary.as_str(),
                            "record boundary matched a non-element node; skipping"
                        );
                        continue;
                    };
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

fn collect_fields(
    scope: roxmltree::Node<'_, '_>,
    fields: &[(String, XmlEvaluator)],
) -> RecordAccumulator {
    let mut rec = RecordAccumulator::new();
    for (key, evaluator) in fields {
        for m in evaluator.path.evaluate(scope) {
            if let Some(value) = coerce(&m, &evaluator.kind, key) {
                trace!(key = key.as_str(), value = value.as_str(), "raw value");
                rec.put_raw(key.clone(), value);
            }
        }
    }
    rec
}

fn coerce(m: &XMatch<'_, '_>, kind: &XmlKind, key: &str) -> Option<String> {
    match kind {
        XmlKind::Text => non_empty(m.string_value()),
        XmlKind::Number => {
            let text = m.string_value();
            if text.is_empty() {
                return None;
            }
            match render_number(&text) {
                Some(v) => Some(v),
                None => {
                    debug!(key = key, text = text.as_str(), "ignoring invalid number");
                    None
                }
            }
        }
        XmlKind::Boolean => {
            let text = m.string_value();
            if text.is_empty() {
                return None;
            }
            Some(if text.trim().eq_ignore_ascii_case("true") {
                "true".to_string()
            } else {
                "false".to_string()
            })
        }
        XmlKind::Node(f) => m.as_element().and_then(|n| f(n)).and_then(non_empty),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

pub(crate) fn render_number(text: &str) -> Option<String> {
    let n: f64 = text.trim().parse().ok()?;
    if n.fract() == 0.0 && n.abs() < 9e15 {
        Some(format!("{}", n as i64))
    } else {
        Some(n.to_string())
    }
}
