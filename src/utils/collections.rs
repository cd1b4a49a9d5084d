//! Small helpers for the hash map types used throughout the crate.

use rustc_hash::FxHashMap;
use serde_json::Value;

/// Fresh field map for state channels and node updates.
pub fn new_fields_map() -> FxHashMap<String, Value> {
    FxHashMap::default()
}

/// Field map pre-populated from an iterator of key/value pairs.
pub fn fields_from<I, K>(pairs: I) -> FxHashMap<String, Value>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fields_from_collects_pairs() {
        let map = fields_from([("a", json!(1)), ("b", json!("x"))]);
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], json!(1));
    }
}
