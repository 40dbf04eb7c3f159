//! Field-by-field merging of configuration tiers.
//!
//! Objects merge key by key; everything else, arrays included, is replaced.

use serde_json::Value;

/// Merge `overlay` onto `base`. A null overlay leaves `base` untouched.
///
/// ```
/// use serde_json::json;
/// use taskboard::config::deep_merge;
///
/// let merged = deep_merge(
///     json!({ "server": { "port": 8080, "db_path": "a.db" } }),
///     json!({ "server": { "port": 9000 } }),
/// );
/// assert_eq!(merged, json!({ "server": { "port": 9000, "db_path": "a.db" } }));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut merged), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let next = match merged.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Fold tiers lowest-priority first.
pub fn deep_merge_all(tiers: impl IntoIterator<Item = Value>) -> Value {
    tiers.into_iter().fold(Value::Null, deep_merge)
}
