//! Record-array discovery inside untyped page data.
//!
//! Embedded data objects nest their listings at unpredictable paths. A
//! [`RecordShape`] walks the tree looking for the first array whose leading
//! element looks like a listing: it carries an identifier and a price or an
//! address. Likely container keys are searched before everything else, and
//! the walk never goes deeper than `max_depth`.

use serde_json::{Map, Value};

use crate::tree::NodeKind;

pub const DEFAULT_MAX_DEPTH: usize = 5;

const DEFAULT_CONTAINER_KEYS: &[&str] =
    &["records", "results", "items", "data", "props", "listings", "properties", "pageProps", "searchResults"];

const DEFAULT_IDENTIFIER_KEYS: &[&str] = &["id", "identifier", "listingId", "propertyId", "uuid", "@id"];

const DEFAULT_PRICE_MARKERS: &[&str] = &["price", "rent", "amount", "cost"];

const DEFAULT_ADDRESS_MARKERS: &[&str] = &["address", "postcode", "postalcode", "street", "location"];

/// Structural description of a listing record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordShape {
    /// Exact keys that identify a record.
    pub identifier_keys: Vec<String>,
    /// Lowercase substrings marking a price-like key.
    pub price_markers: Vec<String>,
    /// Lowercase substrings marking an address-like key.
    pub address_markers: Vec<String>,
    /// Keys searched before the rest, in priority order.
    pub container_keys: Vec<String>,
    pub max_depth: usize,
}

impl Default for RecordShape {
    fn default() -> Self {
        let owned = |keys: &[&str]| keys.iter().map(|k| k.to_string()).collect();
        Self {
            identifier_keys: owned(DEFAULT_IDENTIFIER_KEYS),
            price_markers: owned(DEFAULT_PRICE_MARKERS),
            address_markers: owned(DEFAULT_ADDRESS_MARKERS),
            container_keys: owned(DEFAULT_CONTAINER_KEYS),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl RecordShape {
    /// Search `extra` container keys ahead of the current ones.
    pub fn with_containers(mut self, extra: &[String]) -> Self {
        let mut keys = extra.to_vec();
        keys.extend(self.container_keys.into_iter().filter(|key| !extra.contains(key)));
        self.container_keys = keys;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Return the first record array reachable from `node`.
    pub fn find<'a>(&self, node: &'a Value) -> Option<&'a [Value]> {
        self.find_at(node, 0)
    }

    fn find_at<'a>(&self, node: &'a Value, depth: usize) -> Option<&'a [Value]> {
        if depth > self.max_depth {
            return None;
        }

        match NodeKind::of(node) {
            NodeKind::List(items) => {
                if self.is_record_list(items) {
                    return Some(items);
                }
                items.iter().find_map(|item| self.find_at(item, depth + 1))
            }
            NodeKind::Object(map) => self.find_in_object(map, depth),
            _ => None,
        }
    }

    fn find_in_object<'a>(&self, map: &'a Map<String, Value>, depth: usize) -> Option<&'a [Value]> {
        let priority = self
            .container_keys
            .iter()
            .filter_map(|key| map.get(key))
            .find_map(|child| self.find_at(child, depth + 1));
        if priority.is_some() {
            return priority;
        }

        map.iter()
            .filter(|(key, _)| !self.container_keys.contains(key))
            .find_map(|(_, child)| self.find_at(child, depth + 1))
    }

    /// Whether `node` is a non-empty array of listing-like objects.
    pub fn looks_like_record_array(&self, node: &Value) -> bool {
        matches!(NodeKind::of(node), NodeKind::List(items) if self.is_record_list(items))
    }

    fn is_record_list(&self, items: &[Value]) -> bool {
        let Some(Value::Object(first)) = items.first() else {
            return false;
        };

        let identified = first.keys().any(|key| self.is_identifier_key(key));
        let priced = first.keys().any(|key| has_marker(key, &self.price_markers));
        let addressed = first.keys().any(|key| has_marker(key, &self.address_markers));

        identified && (priced || addressed)
    }

    fn is_identifier_key(&self, key: &str) -> bool {
        self.identifier_keys.iter().any(|k| k == key) || is_id_like(key)
    }
}

/// `propertyId`, `listing_id`, `ID` and the like.
fn is_id_like(key: &str) -> bool {
    key.eq_ignore_ascii_case("id") || key.ends_with("Id") || key.ends_with("ID") || key.to_lowercase().ends_with("_id")
}

fn has_marker(key: &str, markers: &[String]) -> bool {
    let key = key.to_lowercase();
    markers.iter().any(|marker| key.contains(marker.as_str()))
}

/// Find a record array with the default shape.
pub fn find_record_array(node: &Value) -> Option<&[Value]> {
    RecordShape::default().find(node)
}
