//! OSM tag normalization.
//!
//! Extract features arrive with tags either directly in `properties` or
//! nested under a `tags` key, which itself is sometimes a JSON-encoded
//! string and sometimes nests a further `tags` object. Everything is
//! flattened to a `BTreeMap<String, String>`; non-scalar values are
//! JSON-encoded into their string form.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Flattens a feature's `properties` into a string-to-string tag map.
#[must_use]
pub fn normalize_tags(properties: &Map<String, Value>) -> BTreeMap<String, String> {
    let source = match properties.get("tags") {
        Some(nested) => match unwrap_tags(nested) {
            Some(map) => map,
            // Unusable `tags` member; skip the feature's tags entirely.
            None => return BTreeMap::new(),
        },
        None => properties.clone(),
    };

    source
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key, scalar_to_string(&value)))
        .collect()
}

/// Resolves a `tags` member into a plain object, decoding JSON strings
/// and unwrapping one further level of `tags` nesting.
fn unwrap_tags(value: &Value) -> Option<Map<String, Value>> {
    let object = match value {
        Value::Object(map) => map.clone(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            _ => {
                log::error!("Error decoding tags member in GeoJSON: {raw}");
                return None;
            }
        },
        _ => return None,
    };

    // Sometimes the real tags sit one level deeper.
    if let Some(Value::Object(inner)) = object.get("tags") {
        return Some(inner.clone());
    }
    Some(object)
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // Nested structures are kept, JSON-encoded.
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(raw: &str) -> Map<String, Value> {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn reads_tags_directly_from_properties() {
        let tags = normalize_tags(&props(r#"{"building": "yes", "levels": 2}"#));
        assert_eq!(tags.get("building").unwrap(), "yes");
        assert_eq!(tags.get("levels").unwrap(), "2");
    }

    #[test]
    fn prefers_nested_tags_object() {
        let tags = normalize_tags(&props(
            r#"{"osm_id": 42, "tags": {"highway": "primary"}}"#,
        ));
        assert_eq!(tags.get("highway").unwrap(), "primary");
        assert!(!tags.contains_key("osm_id"));
    }

    #[test]
    fn decodes_json_encoded_tags_string() {
        let tags = normalize_tags(&props(r#"{"tags": "{\"building\": \"house\"}"}"#));
        assert_eq!(tags.get("building").unwrap(), "house");
    }

    #[test]
    fn unwraps_doubly_nested_tags() {
        let tags = normalize_tags(&props(
            r#"{"tags": {"tags": {"waterway": "river"}, "osm_id": 7}}"#,
        ));
        assert_eq!(tags.get("waterway").unwrap(), "river");
    }

    #[test]
    fn json_encodes_non_scalar_values() {
        let tags = normalize_tags(&props(r#"{"building": ["a", "b"]}"#));
        assert_eq!(tags.get("building").unwrap(), r#"["a","b"]"#);
    }

    #[test]
    fn drops_null_values_and_invalid_tag_strings() {
        let tags = normalize_tags(&props(r#"{"building": null, "highway": "residential"}"#));
        assert!(!tags.contains_key("building"));
        assert_eq!(tags.get("highway").unwrap(), "residential");

        let tags = normalize_tags(&props(r#"{"tags": "not json"}"#));
        assert!(tags.is_empty());
    }
}
