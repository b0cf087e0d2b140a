//! Deduplication and consolidation of extracted records.
//!
//! Publisher delivery files frequently describe the same logical item once per
//! distribution format: one record for the PDF, one for the EPUB, and so on.
//! The sink wants a single record per item whose format list is the union of
//! all of them. Records are matched on the value of a designated raw field
//! (the dedup key); a second designated raw field (the consolidation key) is
//! unioned across matches.

use crate::record::RecordAccumulator;
use std::collections::HashMap;
use tracing::debug;

/// Reduce `records` to one survivor per distinct dedup-key value.
///
/// - `dedup_key` of `None` is the identity: every record survives.
/// - A record with no value under the dedup key is never merged with anything;
///   a missing identity is treated as distinct, not as a wildcard.
/// - When two records share a dedup value and `consolidation_key` is set, the
///   later record's consolidation values are appended (set-union, first-seen
///   order) onto the survivor and the later record is discarded. Without a
///   consolidation key the duplicate is discarded outright.
///
/// Output preserves first-seen order, including unkeyed records.
pub fn consolidate(
    records: Vec<RecordAccumulator>,
    dedup_key: Option<&str>,
    consolidation_key: Option<&str>,
) -> Vec<RecordAccumulator> {
    let Some(dedup_key) = dedup_key else {
        return records;
    };

    let mut surviving: Vec<RecordAccumulator> = Vec::with_capacity(records.len());
    // dedup value -> index into `surviving`
    let mut seen: HashMap<String, usize> = HashMap::new();

    for record in records {
        let Some(id) = record.get_raw(dedup_key).map(str::to_owned) else {
            surviving.push(record);
            continue;
        };
        match seen.get(&id) {
            None => {
                seen.insert(id, surviving.len());
                surviving.push(record);
            }
            Some(&idx) => {
                if let Some(union_key) = consolidation_key {
                    debug!(id = %id, "consolidating duplicate record");
                    surviving[idx].union_raw(union_key, &record);
                } else {
                    // Trust-first-wins: the duplicate's non-key fields are not
                    // compared against the survivor before dropping it.
                    debug!(id = %id, "discarding duplicate record");
                }
            }
        }
    }
    surviving
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> RecordAccumulator {
        let mut rec = RecordAccumulator::new();
        for (k, v) in pairs {
            rec.put_raw(*k, *v);
        }
        rec
    }

    #[test]
    fn test_no_dedup_key_is_identity() {
        let records = vec![record(&[("id", "A")]), record(&[("id", "A")])];
        let out = consolidate(records, None, None);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_union_across_duplicates() {
        let records = vec![
            record(&[("id", "A"), ("title", "T1")]),
            record(&[("id", "A"), ("title", "T2")]),
        ];
        let out = consolidate(records, Some("id"), Some("title"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get_raw("id"), Some("A"));
        assert_eq!(out[0].raw_values("title"), &["T1", "T2"]);
    }

    #[test]
    fn test_union_order_first_then_second() {
        let records = vec![
            record(&[("isbn", "9781"), ("form", "pdf")]),
            record(&[("isbn", "9781"), ("form", "epub")]),
        ];
        let out = consolidate(records, Some("isbn"), Some("form"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].raw_values("form"), &["pdf", "epub"]);
    }

    #[test]
    fn test_union_is_a_set() {
        let records = vec![
            record(&[("isbn", "9781"), ("form", "pdf")]),
            record(&[("isbn", "9781"), ("form", "pdf")]),
        ];
        let out = consolidate(records, Some("isbn"), Some("form"));
        assert_eq!(out[0].raw_values("form"), &["pdf"]);
    }

    #[test]
    fn test_duplicate_without_consolidation_key_discarded() {
        let records = vec![
            record(&[("id", "A"), ("title", "T1")]),
            record(&[("id", "A"), ("title", "T2")]),
        ];
        let out = consolidate(records, Some("id"), None);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get_raw("title"), Some("T1"));
    }

    #[test]
    fn test_missing_dedup_value_never_merges() {
        let records = vec![
            record(&[("title", "T1")]),
            record(&[("title", "T2")]),
            record(&[("id", "A"), ("title", "T3")]),
        ];
        let out = consolidate(records, Some("id"), Some("title"));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_idempotent_on_distinct_records() {
        let records = vec![
            record(&[("id", "A"), ("form", "pdf")]),
            record(&[("id", "B"), ("form", "epub")]),
        ];
        let once = consolidate(records, Some("id"), Some("form"));
        let twice = consolidate(once.clone(), Some("id"), Some("form"));
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.get_raw("id"), b.get_raw("id"));
            assert_eq!(a.raw_values("form"), b.raw_values("form"));
        }
    }

    #[test]
    fn test_first_seen_order_preserved() {
        let records = vec![
            record(&[("id", "B")]),
            record(&[("id", "A")]),
            record(&[("id", "B")]),
        ];
        let out = consolidate(records, Some("id"), None);
        let ids: Vec<_> = out.iter().map(|r| r.get_raw("id").unwrap()).collect();
        assert_eq!(ids, vec!["B", "A"]);
    }
}
