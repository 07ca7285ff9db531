//! Optional lookups into loosely shaped JSON payloads.

use serde_json::Value;

/// Walk `path` through nested objects. Absent as soon as a segment is missing
/// or an intermediate value is not an object.
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    match path.split_first() {
        None => Some(value),
        Some((head, rest)) => lookup(value.as_object()?.get(*head)?, rest),
    }
}

pub fn lookup_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    lookup(value, path)?.as_str()
}

pub fn lookup_u64(value: &Value, path: &[&str]) -> Option<u64> {
    lookup(value, path)?.as_u64()
}

/// Read a `[[key, value], ...]` property list into ordered pairs.
/// Entries that are not two-string arrays are dropped.
pub fn property_pairs(value: &Value) -> Vec<(String, String)> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match entry.as_array()?.as_slice() {
            [k, v] => Some((k.as_str()?.to_string(), v.as_str()?.to_string())),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_full_path() {
        let doc = json!({"a": {"b": {"c": {"d": 42}}}});
        assert_eq!(lookup(&doc, &["a", "b", "c", "d"]), Some(&json!(42)));
        assert_eq!(lookup(&doc, &["a", "b"]), Some(&json!({"c": {"d": 42}})));
        assert_eq!(lookup_u64(&doc, &["a", "b", "c", "d"]), Some(42));
    }

    #[test]
    fn lookup_empty_path_is_identity() {
        let doc = json!({"a": 1});
        assert_eq!(lookup(&doc, &[]), Some(&doc));
    }

    #[test]
    fn lookup_missing_segment() {
        let doc = json!({"a": {"b": {"c": 1}}});
        assert_eq!(lookup(&doc, &["x"]), None);
        assert_eq!(lookup(&doc, &["a", "x", "c"]), None);
        assert_eq!(lookup(&doc, &["a", "b", "c", "d"]), None);
        assert_eq!(lookup(&json!([1, 2]), &["a"]), None);
    }

    #[test]
    fn lookup_typed_mismatch() {
        let doc = json!({"executorLogs": {"stdout": "http://host/stdout", "size": 3}});
        assert_eq!(lookup_str(&doc, &["executorLogs", "stdout"]), Some("http://host/stdout"));
        assert_eq!(lookup_str(&doc, &["executorLogs", "size"]), None);
        assert_eq!(lookup_u64(&doc, &["executorLogs", "stdout"]), None);
    }

    #[test]
    fn property_pairs_keeps_order_and_drops_junk() {
        let props = json!([
            ["spark.app.name", "etl"],
            ["spark.executor.memory", "8g"],
            ["lonely"],
            [1, 2],
        ]);
        assert_eq!(
            property_pairs(&props),
            vec![
                ("spark.app.name".to_string(), "etl".to_string()),
                ("spark.executor.memory".to_string(), "8g".to_string()),
            ]
        );
        assert!(property_pairs(&json!({"not": "a list"})).is_empty());
    }
}
