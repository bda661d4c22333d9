//! Flattened attribute-map helpers.
//!
//! Instrumentation libraries flatten arrays into indexed keys, e.g.
//! `{"gen_ai.prompt.0.role": "user", "gen_ai.prompt.0.content": "hi"}`.
//! `rebuild_indexed_array` reverses that into
//! `[{"role": "user", "content": "hi"}]`.

use serde_json::{Map, Value};

/// The raw attribute map handed over by the owning tracer, one per span.
pub type AttributeMap = Map<String, Value>;

/// Rebuild the array flattened under `prefix` from its indexed keys.
///
/// Supports `prefix.N` (scalar element) and `prefix.N.rest` (object element;
/// `rest` may itself be dotted and produces nested objects). Returns `None`
/// when no indexed key is present at all.
pub fn rebuild_indexed_array(attrs: &AttributeMap, prefix: &str) -> Option<Value> {
    let mut elements: Vec<Value> = Vec::new();
    let mut found = false;

    for (key, value) in attrs {
        let Some(tail) = strip_prefix_dot(key, prefix) else {
            continue;
        };
        let (index, rest) = match tail.split_once('.') {
            Some((idx, rest)) => (idx, Some(rest)),
            None => (tail, None),
        };
        let Ok(index) = index.parse::<usize>() else {
            continue;
        };
        found = true;

        while elements.len() <= index {
            elements.push(Value::Object(Map::new()));
        }

        match rest {
            None => elements[index] = value.clone(),
            Some(rest) => {
                if let Value::Object(obj) = &mut elements[index] {
                    set_nested(obj, rest, value.clone());
                }
            }
        }
    }

    found.then_some(Value::Array(elements))
}

fn strip_prefix_dot<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)?.strip_prefix('.')
}

/// Set a value at a dotted path, creating intermediate objects as needed.
fn set_nested(obj: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            obj.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = obj
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(inner) = entry {
                set_nested(inner, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(pairs: &[(&str, Value)]) -> AttributeMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn rebuilds_object_elements() {
        let map = attrs(&[
            ("gen_ai.prompt.0.role", json!("system")),
            ("gen_ai.prompt.0.content", json!("You are helpful.")),
            ("gen_ai.prompt.1.role", json!("user")),
            ("gen_ai.prompt.1.content", json!("hi")),
            ("gen_ai.request.model", json!("gpt-4o")),
        ]);

        let rebuilt = rebuild_indexed_array(&map, "gen_ai.prompt").unwrap();
        assert_eq!(
            rebuilt,
            json!([
                {"role": "system", "content": "You are helpful."},
                {"role": "user", "content": "hi"},
            ])
        );
    }

    #[test]
    fn rebuilds_scalar_elements_and_nested_paths() {
        let map = attrs(&[
            ("stop.0", json!("\n")),
            ("stop.1", json!("END")),
            ("msgs.0.message.role", json!("user")),
        ]);

        assert_eq!(
            rebuild_indexed_array(&map, "stop").unwrap(),
            json!(["\n", "END"])
        );
        assert_eq!(
            rebuild_indexed_array(&map, "msgs").unwrap(),
            json!([{"message": {"role": "user"}}])
        );
    }

    #[test]
    fn absent_prefix_yields_none() {
        let map = attrs(&[("gen_ai.request.model", json!("gpt-4o"))]);
        assert!(rebuild_indexed_array(&map, "gen_ai.prompt").is_none());
        // A bare `prefix` key without an index is not an array.
        let map = attrs(&[("gen_ai.prompt", json!("not flattened"))]);
        assert!(rebuild_indexed_array(&map, "gen_ai.prompt").is_none());
    }
}
