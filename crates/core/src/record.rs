//! Listing records and the field-name dictionary that produces them.
//!
//! A [`Record`] is a flat, ordered map from canonical field name to value.
//! Raw objects found on a page are turned into records by a [`FieldMap`],
//! which tries per-site aliases for each canonical field and drops every key
//! it does not recognize.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tree::{NodeKind, lookup_path};

/// Canonical field names.
pub mod fields {
    pub const ID: &str = "id";
    pub const URL: &str = "url";
    pub const ADDRESS: &str = "address";
    pub const POSTCODE: &str = "postcode";
    pub const OUTCODE: &str = "outcode";
    pub const INCODE: &str = "incode";
    pub const PRICE: &str = "price";
    pub const BEDROOMS: &str = "bedrooms";
    pub const BATHROOMS: &str = "bathrooms";
    pub const PROPERTY_TYPE: &str = "property_type";
    pub const DESCRIPTION: &str = "description";
    pub const IMAGES: &str = "images";
    pub const DATE: &str = "date";
    pub const AGENT: &str = "agent";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const SOURCE: &str = "source";

    /// Reconciliation metadata.
    pub const SOURCES: &str = "sources";
    pub const DUPLICATE_OF: &str = "duplicate_of";
    pub const IS_DUPLICATE: &str = "is_duplicate";

    pub const METADATA: &[&str] = &[SOURCES, DUPLICATE_OF, IS_DUPLICATE];
}

/// One extracted listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: &str, value: Value) -> Option<Value> {
        self.0.insert(field.to_string(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Whether `field` holds a value other than `null`.
    pub fn has_value(&self, field: &str) -> bool {
        self.0.get(field).is_some_and(|value| !value.is_null())
    }

    /// A string field, trimmed, when present and non-empty.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The external identifier, unless absent or null.
    pub fn identifier(&self) -> Option<&Value> {
        self.0.get(fields::ID).filter(|value| !value.is_null())
    }

    /// The source tag stamped by the extraction pass.
    pub fn source(&self) -> Option<&str> {
        self.text(fields::SOURCE)
    }

    /// Number of fields holding a non-null, non-blank value.
    pub fn completeness(&self) -> usize {
        self.0.values().filter(|value| !NodeKind::of(value).is_absent()).count()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Per-site field-name dictionary.
///
/// Each entry is a canonical field name plus the raw keys to try, in order.
/// Aliases may be dotted paths into nested objects (`price.amount`).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, Vec<String>)>,
}

impl FieldMap {
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Put `aliases` in front of the existing aliases for `field`, adding the
    /// field when it is new.
    pub fn prepend_aliases(&mut self, field: &str, aliases: &[String]) {
        match self.entries.iter_mut().find(|(name, _)| name == field) {
            Some((_, existing)) => {
                let mut merged = aliases.to_vec();
                merged.extend(existing.iter().filter(|alias| !aliases.contains(alias)).cloned());
                *existing = merged;
            }
            None => self.entries.push((field.to_string(), aliases.to_vec())),
        }
    }

    pub fn aliases(&self, field: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, aliases)| aliases.as_slice())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Whether `field` may appear in a record produced under this map.
    pub fn recognizes(&self, field: &str) -> bool {
        field == fields::SOURCE || fields::METADATA.contains(&field) || self.aliases(field).is_some()
    }

    /// Build a record from a raw object. Returns `None` for non-objects and
    /// for objects where no alias matched anything.
    pub fn normalize(&self, raw: &Value) -> Option<Record> {
        if !raw.is_object() {
            return None;
        }

        let mut record = Record::new();
        for (field, aliases) in &self.entries {
            let found = aliases
                .iter()
                .filter_map(|alias| lookup_path(raw, alias))
                .find(|value| !value.is_null());
            if let Some(value) = found {
                let value = if field == fields::IMAGES { flatten_images(value) } else { value.clone() };
                record.insert(field, value);
            }
        }

        if record.is_empty() { None } else { Some(record) }
    }

    /// Drop every field this map does not recognize.
    pub fn retain_recognized(&self, record: Record) -> Record {
        let mut map = record.into_fields();
        map.retain(|key, _| self.recognizes(key));
        Record::from(map)
    }
}

impl Default for FieldMap {
    fn default() -> Self {
        let table: &[(&str, &[&str])] = &[
            (fields::ID, &["id", "identifier", "listingId", "listing_id", "propertyId", "property_id"]),
            (fields::URL, &["url", "propertyUrl", "detailUrl", "listingUrl", "link", "href"]),
            (
                fields::ADDRESS,
                &["displayAddress", "address.displayAddress", "fullAddress", "address", "location.address", "streetAddress"],
            ),
            (
                fields::POSTCODE,
                &["postcode", "postalCode", "postCode", "zip", "address.postcode", "address.postalCode", "location.postcode"],
            ),
            (fields::OUTCODE, &["outcode", "address.outcode", "location.outcode"]),
            (fields::INCODE, &["incode", "address.incode", "location.incode"]),
            (fields::PRICE, &["price.amount", "price.value", "price", "amount", "rent"]),
            (fields::BEDROOMS, &["bedrooms", "beds", "numBedrooms", "bedroomCount"]),
            (fields::BATHROOMS, &["bathrooms", "baths", "numBathrooms", "bathroomCount"]),
            (fields::PROPERTY_TYPE, &["propertyType", "propertySubType", "property_type", "type"]),
            (fields::DESCRIPTION, &["description", "summary", "propertyDescription"]),
            (fields::IMAGES, &["images", "photos", "propertyImages.images", "imageUrls", "image"]),
            (fields::DATE, &["addedOn", "listedDate", "firstVisibleDate", "datePosted", "date"]),
            (fields::AGENT, &["agent", "agentName", "branchName", "customer.branchDisplayName"]),
            (fields::LATITUDE, &["latitude", "lat", "location.latitude", "geo.latitude"]),
            (fields::LONGITUDE, &["longitude", "lng", "lon", "location.longitude", "geo.longitude"]),
        ];

        Self {
            entries: table
                .iter()
                .map(|(field, aliases)| (field.to_string(), aliases.iter().map(|a| a.to_string()).collect()))
                .collect(),
        }
    }
}

/// Image lists often hold objects; keep just their URL strings.
fn flatten_images(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(_) => Some(item.clone()),
                    Value::Object(map) => ["url", "srcUrl", "src", "href"]
                        .iter()
                        .find_map(|key| map.get(*key).filter(|v| v.is_string()))
                        .cloned(),
                    _ => None,
                })
                .collect(),
        ),
        Value::String(_) => Value::Array(vec![value.clone()]),
        other => other.clone(),
    }
}

/// A record built from a group of duplicates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    #[serde(flatten)]
    pub record: Record,
    pub sources: Vec<String>,
    pub duplicate_of: Vec<Value>,
    pub is_duplicate: bool,
}

impl MergedRecord {
    /// Flatten into a plain record carrying the metadata as fields.
    pub fn into_record(self) -> Record {
        let mut record = self.record;
        record.insert(
            fields::SOURCES,
            Value::Array(self.sources.into_iter().map(Value::String).collect()),
        );
        record.insert(fields::DUPLICATE_OF, Value::Array(self.duplicate_of));
        record.insert(fields::IS_DUPLICATE, Value::Bool(self.is_duplicate));
        record
    }
}

/// One output of reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReconciledRecord {
    /// The sole member of its identity group, untouched.
    Single(Record),
    Merged(MergedRecord),
}

impl ReconciledRecord {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ReconciledRecord::Merged(_))
    }

    pub fn record(&self) -> &Record {
        match self {
            ReconciledRecord::Single(record) => record,
            ReconciledRecord::Merged(merged) => &merged.record,
        }
    }

    pub fn into_record(self) -> Record {
        match self {
            ReconciledRecord::Single(record) => record,
            ReconciledRecord::Merged(merged) => merged.into_record(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_uses_alias_order() {
        let raw = json!({
            "propertyId": 42,
            "displayAddress": "1 High Street, London",
            "price": {"amount": 1200, "currencyCode": "GBP"},
            "trackingCode": "xyz",
        });

        let normalized = FieldMap::default().normalize(&raw).unwrap();

        assert_eq!(normalized.get("id"), Some(&json!(42)));
        assert_eq!(normalized.get("address"), Some(&json!("1 High Street, London")));
        assert_eq!(normalized.get("price"), Some(&json!(1200)));
        assert!(!normalized.contains("trackingCode"));
    }

    #[test]
    fn test_normalize_skips_null_alias() {
        let raw = json!({"displayAddress": null, "address": "2 Mill Lane"});
        let normalized = FieldMap::default().normalize(&raw).unwrap();
        assert_eq!(normalized.text("address"), Some("2 Mill Lane"));
    }

    #[test]
    fn test_normalize_flattens_image_objects() {
        let raw = json!({"id": 1, "propertyImages": {"images": [{"srcUrl": "a.jpg"}, {"caption": "x"}, "b.jpg"]}});
        let normalized = FieldMap::default().normalize(&raw).unwrap();
        assert_eq!(normalized.get("images"), Some(&json!(["a.jpg", "b.jpg"])));
    }

    #[test]
    fn test_normalize_rejects_unrecognized_only() {
        assert_eq!(FieldMap::default().normalize(&json!({"foo": 1})), None);
        assert_eq!(FieldMap::default().normalize(&json!([1, 2])), None);
    }

    #[test]
    fn test_prepend_aliases() {
        let mut map = FieldMap::default();
        map.prepend_aliases("price", &["monthlyRent".to_string(), "price".to_string()]);

        let aliases = map.aliases("price").unwrap();
        assert_eq!(aliases[0], "monthlyRent");
        assert_eq!(aliases[1], "price");
        assert_eq!(aliases.iter().filter(|a| *a == "price").count(), 1);

        map.prepend_aliases("floor_area", &["size".to_string()]);
        assert!(map.recognizes("floor_area"));
    }

    #[test]
    fn test_retain_recognized() {
        let input = record(json!({"id": 1, "source": "a", "sources": ["a"], "tracking": true}));
        let kept = FieldMap::default().retain_recognized(input);
        assert_eq!(kept.len(), 3);
        assert!(!kept.contains("tracking"));
    }

    #[test]
    fn test_completeness_ignores_null_and_blank() {
        let r = record(json!({"id": 1, "address": "  ", "price": null, "description": "Flat"}));
        assert_eq!(r.completeness(), 2);
    }

    #[test]
    fn test_identifier_and_source() {
        let r = record(json!({"id": null, "source": "portal-a"}));
        assert_eq!(r.identifier(), None);
        assert_eq!(r.source(), Some("portal-a"));
    }

    #[test]
    fn test_merged_record_serialization() {
        let merged = MergedRecord {
            record: record(json!({"id": 1, "address": "A"})),
            sources: vec!["a".to_string(), "b".to_string()],
            duplicate_of: vec![json!(1), json!(2)],
            is_duplicate: true,
        };

        let value = serde_json::to_value(ReconciledRecord::Merged(merged.clone())).unwrap();
        assert_eq!(
            value,
            json!({"id": 1, "address": "A", "sources": ["a", "b"], "duplicate_of": [1, 2], "is_duplicate": true})
        );

        let flat = merged.into_record();
        assert_eq!(flat.get("is_duplicate"), Some(&json!(true)));
    }

    #[test]
    fn test_single_serializes_as_plain_record() {
        let single = ReconciledRecord::Single(record(json!({"id": 3})));
        assert_eq!(serde_json::to_value(&single).unwrap(), json!({"id": 3}));
        assert!(!single.is_duplicate());
    }
}
