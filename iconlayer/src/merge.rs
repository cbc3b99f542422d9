//! Structural merge for incremental server patches.
//!
//! The backend pushes partial player-state updates rather than full
//! snapshots. [`merge_deep`] folds such a patch into the long-lived
//! in-memory state object without discarding fields the patch omits:
//! nested objects compose field by field, arrays merge element-wise keyed
//! by each element's `id`, and scalars overwrite.

use serde_json::Value;

/// Deep-merges `source` into `target`, mutating `target` in place.
///
/// Rules, applied per key of `source`:
///
/// - nested object: recurse into the matching target slot, resetting the
///   slot to an empty object first when it is absent or not an object;
/// - array: if the target slot holds no array, the source array replaces it
///   wholesale; otherwise each source element with an `id` merges into the
///   target element with the same `id` (appending when there is none), and
///   elements without an `id` are appended unconditionally, never
///   deduplicated;
/// - anything else: overwrite.
///
/// Values other than two objects are left untouched, mirroring the
/// server's patch shape (patches are always objects at the top).
pub fn merge_deep(target: &mut Value, source: &Value) {
    let (Value::Object(target_map), Value::Object(source_map)) = (target, source) else {
        return;
    };

    for (key, incoming) in source_map {
        match incoming {
            Value::Object(_) => {
                let slot = target_map
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Default::default()));
                if !slot.is_object() {
                    *slot = Value::Object(Default::default());
                }
                merge_deep(slot, incoming);
            }
            Value::Array(elements) => {
                let target_has_array = matches!(target_map.get(key), Some(Value::Array(_)));
                if !target_has_array {
                    target_map.insert(key.clone(), incoming.clone());
                } else if let Some(Value::Array(existing)) = target_map.get_mut(key) {
                    for element in elements {
                        merge_array_element(existing, element);
                    }
                }
            }
            _ => {
                target_map.insert(key.clone(), incoming.clone());
            }
        }
    }
}

/// Applies several patches left to right.
pub fn merge_deep_all<'a, I>(target: &mut Value, sources: I)
where
    I: IntoIterator<Item = &'a Value>,
{
    for source in sources {
        merge_deep(target, source);
    }
}

fn merge_array_element(existing: &mut Vec<Value>, element: &Value) {
    // A null id counts as no id at all.
    let id = element.get("id").filter(|id| !id.is_null());
    let Some(id) = id else {
        existing.push(element.clone());
        return;
    };

    match existing.iter().position(|it| it.get("id") == Some(id)) {
        Some(index) => merge_deep(&mut existing[index], element),
        None => existing.push(element.clone()),
    }
}
