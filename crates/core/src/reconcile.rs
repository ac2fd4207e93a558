//! Cross-source reconciliation.
//!
//! Records harvested from different sources are bucketed by an identity key
//! built from the normalized address and postcode. A bucket with one member
//! passes through untouched. Larger buckets are folded into one
//! [`MergedRecord`], starting from the most complete member, and carry the
//! source tags and identifiers of everything that went into them.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::record::{MergedRecord, ReconciledRecord, Record, fields};
use crate::tree::NodeKind;

/// Normalize an address: lowercase, collapse whitespace, drop empty comma
/// segments.
pub fn normalize_address(address: &str) -> String {
    address
        .to_lowercase()
        .split(',')
        .map(|segment| segment.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Normalize a postcode fragment: remove whitespace, lowercase.
pub fn normalize_postcode(postcode: &str) -> String {
    postcode.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase()
}

/// Address text of a record. Structured addresses contribute their string
/// parts in order.
fn address_text(record: &Record) -> Option<String> {
    match NodeKind::of(record.get(fields::ADDRESS)?) {
        NodeKind::Text(text) => Some(text.to_string()),
        NodeKind::Object(parts) => {
            let joined = parts.values().filter_map(Value::as_str).collect::<Vec<_>>().join(", ");
            Some(joined)
        }
        _ => None,
    }
}

/// Postcode fragment of a record: the full postcode, else outcode + incode.
fn postcode_fragment(record: &Record) -> String {
    if let Some(postcode) = record.text(fields::POSTCODE) {
        return normalize_postcode(postcode);
    }

    [fields::OUTCODE, fields::INCODE]
        .iter()
        .filter_map(|field| record.text(field))
        .map(normalize_postcode)
        .collect()
}

/// Identity key of a record, or `None` when it has no usable address.
///
/// Records without any postcode information are keyed by address alone.
pub fn identity_key(record: &Record) -> Option<String> {
    let address = normalize_address(&address_text(record)?);
    if address.is_empty() {
        return None;
    }

    let postcode = postcode_fragment(record);
    if postcode.is_empty() { Some(address) } else { Some(format!("{address}|{postcode}")) }
}

/// Reconcile records from every source in one pass.
///
/// Outputs one entry per distinct identity key, in order of first encounter.
/// Keyless records are never merged.
pub fn reconcile(records: Vec<Record>) -> Vec<ReconciledRecord> {
    let mut buckets: Vec<Vec<Record>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        match identity_key(&record) {
            Some(key) => match index.get(&key) {
                Some(&slot) => buckets[slot].push(record),
                None => {
                    index.insert(key, buckets.len());
                    buckets.push(vec![record]);
                }
            },
            None => buckets.push(vec![record]),
        }
    }

    let merged_groups = buckets.iter().filter(|bucket| bucket.len() > 1).count();
    tracing::debug!(buckets = buckets.len(), merged = merged_groups, "records bucketed");

    buckets.into_iter().map(reconcile_bucket).collect()
}

fn reconcile_bucket(mut members: Vec<Record>) -> ReconciledRecord {
    if members.len() == 1
        && let Some(record) = members.pop()
    {
        return ReconciledRecord::Single(record);
    }

    let sources = collect_sources(&members);
    let duplicate_of = members.iter().filter_map(Record::identifier).cloned().collect();

    members.sort_by_key(|member| std::cmp::Reverse(member.completeness()));
    let mut ranked = members.into_iter();
    let mut base = ranked.next().unwrap_or_default();
    for member in ranked {
        merge_into(&mut base, member);
    }

    for field in fields::METADATA {
        base.remove(field);
    }

    ReconciledRecord::Merged(MergedRecord { record: base, sources, duplicate_of, is_duplicate: true })
}

/// Source tags in order of first appearance, including tags carried over from
/// earlier merges.
fn collect_sources(members: &[Record]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for member in members {
        let carried = member
            .get(fields::SOURCES)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str);
        for source in member.source().into_iter().chain(carried) {
            if !sources.iter().any(|s| s == source) {
                sources.push(source.to_string());
            }
        }
    }
    sources
}

fn merge_into(base: &mut Record, incoming: Record) {
    let fields = base.fields_mut();
    for (key, value) in incoming.into_fields() {
        if let Some(merged) = merge_field(fields.get(&key), &value) {
            fields.insert(key, merged);
        }
    }
}

/// Merge one field. Returns the replacement value, or `None` to keep the
/// accumulator as it is.
pub fn merge_field(current: Option<&Value>, incoming: &Value) -> Option<Value> {
    let current_kind = current.map(NodeKind::of).unwrap_or(NodeKind::Absent);

    match (current_kind, NodeKind::of(incoming)) {
        (_, NodeKind::Absent) => None,
        (NodeKind::Absent, _) => Some(incoming.clone()),
        (NodeKind::Text(existing), NodeKind::Text(candidate)) => {
            (candidate.chars().count() > existing.chars().count()).then(|| incoming.clone())
        }
        (NodeKind::List(existing), NodeKind::List(candidate)) => {
            let mut union = existing.to_vec();
            for item in candidate {
                if !union.contains(item) {
                    union.push(item.clone());
                }
            }
            Some(Value::Array(union))
        }
        (NodeKind::Object(existing), NodeKind::Object(candidate)) => {
            let mut merged: Map<String, Value> = existing.clone();
            merged.extend(candidate.iter().map(|(k, v)| (k.clone(), v.clone())));
            Some(Value::Object(merged))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    fn merged(output: &ReconciledRecord) -> &MergedRecord {
        match output {
            ReconciledRecord::Merged(merged) => merged,
            ReconciledRecord::Single(_) => panic!("expected a merged record"),
        }
    }

    #[rstest]
    #[case("  12  High   Street,, London , ", "12 high street, london")]
    #[case("Flat 2,\n3 Mill Lane", "flat 2, 3 mill lane")]
    #[case(",,,", "")]
    fn test_normalize_address(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_address(input), expected);
    }

    #[rstest]
    #[case(json!({"address": "1 Mill Lane", "postcode": "SW1A 1AA"}), Some("1 mill lane|sw1a1aa"))]
    #[case(json!({"address": "1 Mill Lane", "outcode": "SW1A", "incode": "1AA"}), Some("1 mill lane|sw1a1aa"))]
    #[case(json!({"address": "1 Mill Lane", "postcode": "  "}), Some("1 mill lane"))]
    #[case(json!({"address": {"streetAddress": "1 Mill Lane", "addressLocality": "Leeds"}}), Some("1 mill lane, leeds"))]
    #[case(json!({"postcode": "SW1A 1AA"}), None)]
    #[case(json!({"address": " , "}), None)]
    #[case(json!({"id": 1}), None)]
    fn test_identity_key(#[case] input: Value, #[case] expected: Option<&str>) {
        assert_eq!(identity_key(&record(input)).as_deref(), expected);
    }

    #[test]
    fn test_identity_key_case_insensitive() {
        let upper = record(json!({"address": "HIGH STREET, LONDON SW1A 1AA"}));
        let lower = record(json!({"address": "high street, london sw1a 1aa"}));
        assert_eq!(identity_key(&upper), identity_key(&lower));
        assert_eq!(reconcile(vec![upper, lower]).len(), 1);
    }

    #[test]
    fn test_single_record_unchanged() {
        let input = record(json!({"id": 1, "address": "1 Mill Lane", "source": "a"}));
        let output = reconcile(vec![input.clone()]);

        assert_eq!(output, vec![ReconciledRecord::Single(input.clone())]);
        let value = serde_json::to_value(&output[0]).unwrap();
        assert_eq!(value, serde_json::to_value(&input).unwrap());
        assert!(value.get("sources").is_none());
        assert!(value.get("duplicate_of").is_none());
        assert!(value.get("is_duplicate").is_none());
    }

    #[test]
    fn test_null_replaced_and_longer_text_wins() {
        let output = reconcile(vec![
            record(json!({"address": "A", "bedrooms": null, "description": "Flat"})),
            record(json!({"address": "A", "bedrooms": 2, "description": "Spacious two bedroom flat"})),
        ]);

        let record = &merged(&output[0]).record;
        assert_eq!(record.get("bedrooms"), Some(&json!(2)));
        assert_eq!(record.text("description"), Some("Spacious two bedroom flat"));
    }

    #[test]
    fn test_image_union() {
        assert_eq!(
            merge_field(Some(&json!(["a.jpg", "b.jpg"])), &json!(["b.jpg", "c.jpg"])),
            Some(json!(["a.jpg", "b.jpg", "c.jpg"]))
        );
    }

    #[rstest]
    #[case(Some(json!("keep")), json!(null), None)]
    #[case(Some(json!("keep")), json!("   "), None)]
    #[case(None, json!(3), Some(json!(3)))]
    #[case(Some(json!("")), json!("new"), Some(json!("new")))]
    #[case(Some(json!("same")), json!("tied"), None)]
    #[case(Some(json!({"a": 1, "b": 1})), json!({"b": 2, "c": 3}), Some(json!({"a": 1, "b": 2, "c": 3})))]
    #[case(Some(json!(1200)), json!(1300), None)]
    #[case(Some(json!("text")), json!(["list"]), None)]
    fn test_merge_field_rules(#[case] current: Option<Value>, #[case] incoming: Value, #[case] expected: Option<Value>) {
        assert_eq!(merge_field(current.as_ref(), &incoming), expected);
    }

    #[test]
    fn test_most_complete_member_is_base() {
        let output = reconcile(vec![
            record(json!({"id": 1, "address": "A", "price": 900})),
            record(json!({"id": 2, "address": "A", "price": 950, "bedrooms": 2, "agent": "Acme"})),
        ]);

        let merged = merged(&output[0]);
        assert_eq!(merged.record.get("price"), Some(&json!(950)));
        assert_eq!(merged.record.get("id"), Some(&json!(2)));
        assert_eq!(merged.duplicate_of, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_end_to_end_three_records() {
        let output = reconcile(vec![
            record(json!({"id": 1, "address": "A", "postcode": "AB1 2CD", "source": "portal-a"})),
            record(json!({"id": 2, "address": "A", "postcode": "ab12cd", "source": "portal-b"})),
            record(json!({"id": 3, "address": "B", "source": "portal-a"})),
        ]);

        assert_eq!(output.len(), 2);
        let first = merged(&output[0]);
        assert!(first.is_duplicate);
        assert_eq!(first.duplicate_of, vec![json!(1), json!(2)]);
        assert_eq!(first.sources, vec!["portal-a".to_string(), "portal-b".to_string()]);
        assert!(!output[1].is_duplicate());
        assert_eq!(output[1].record().get("id"), Some(&json!(3)));
    }

    #[test]
    fn test_duplicate_of_drops_null_identifiers() {
        let output = reconcile(vec![
            record(json!({"id": null, "address": "A"})),
            record(json!({"address": "A"})),
            record(json!({"id": "x9", "address": "A"})),
        ]);
        assert_eq!(merged(&output[0]).duplicate_of, vec![json!("x9")]);
    }

    #[test]
    fn test_keyless_records_pass_through() {
        let output = reconcile(vec![record(json!({"id": 1})), record(json!({"id": 1}))]);
        assert_eq!(output.len(), 2);
        assert!(output.iter().all(|r| !r.is_duplicate()));
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let first = reconcile(vec![
            record(json!({"id": 1, "address": "A", "source": "a"})),
            record(json!({"id": 2, "address": "A", "source": "b"})),
            record(json!({"id": 3, "address": "B", "source": "a"})),
        ]);
        let flattened: Vec<Record> = first.iter().cloned().map(ReconciledRecord::into_record).collect();

        let second = reconcile(flattened.clone());
        assert_eq!(second.len(), first.len());
        let again: Vec<Record> = second.into_iter().map(ReconciledRecord::into_record).collect();
        assert_eq!(again, flattened);
    }

    #[test]
    fn test_merge_of_merged_outputs_keeps_sources() {
        let earlier = reconcile(vec![
            record(json!({"id": 1, "address": "A", "source": "a"})),
            record(json!({"id": 2, "address": "A", "source": "b"})),
        ])
        .remove(0)
        .into_record();
        let later = record(json!({"id": 3, "address": "A", "source": "c"}));

        let output = reconcile(vec![earlier, later]);
        let merged = merged(&output[0]);
        assert_eq!(merged.sources, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        assert!(!merged.record.contains("sources"));
    }
}
