use crate::errors::SandboxError;
use serde_json::{Map, Value};

/// Value at `path`, or `None` if any segment along the way is absent.
pub fn get_path<'a>(tree: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = tree;
    for segment in path {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Copy-on-write assignment: returns a tree identical to `tree` except the
/// value at `path` is replaced. Intermediate mappings are created when
/// absent; a primitive sitting where a mapping is needed is replaced by a
/// fresh mapping. The input tree is never mutated.
pub fn set_path(tree: &Value, path: &[&str], value: Value) -> Result<Value, SandboxError> {
    if path.is_empty() {
        return Err(SandboxError::invalid_params(
            "Path must contain at least one segment",
        ));
    }
    let mut updated = tree.clone();
    assign(&mut updated, path, value);
    Ok(updated)
}

fn assign(target: &mut Value, path: &[&str], value: Value) {
    let map = match target {
        Value::Object(map) => map,
        other => {
            *other = Value::Object(Map::new());
            match other {
                Value::Object(map) => map,
                _ => return,
            }
        }
    };
    if path.len() == 1 {
        map.insert(path[0].to_string(), value);
        return;
    }
    let entry = map
        .entry(path[0].to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    assign(entry, &path[1..], value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_path_creates_intermediate_mappings() {
        let tree = json!({});
        let updated = set_path(&tree, &["a", "b"], json!(5)).unwrap();
        assert_eq!(updated, json!({"a": {"b": 5}}));
        assert_eq!(get_path(&updated, &["a", "b"]), Some(&json!(5)));
        assert_eq!(get_path(&updated, &["a", "c"]), None);
    }

    #[test]
    fn set_path_never_mutates_the_input() {
        let tree = json!({"a": {"b": 1}});
        let snapshot = tree.clone();
        let updated = set_path(&tree, &["a", "b"], json!(2)).unwrap();
        assert_eq!(tree, snapshot);
        assert_eq!(get_path(&updated, &["a", "b"]), Some(&json!(2)));
    }

    #[test]
    fn set_path_replaces_primitive_intermediate() {
        let tree = json!({"a": "leaf"});
        let updated = set_path(&tree, &["a", "b"], json!(true)).unwrap();
        assert_eq!(updated, json!({"a": {"b": true}}));
    }

    #[test]
    fn set_path_rejects_empty_path() {
        let err = set_path(&json!({}), &[], json!(1)).unwrap_err();
        assert_eq!(err.kind, crate::errors::SandboxErrorKind::InvalidParams);
    }

    #[test]
    fn get_path_walks_nested_values() {
        let tree = json!({"a": {"b": {"c": "deep"}}});
        assert_eq!(get_path(&tree, &["a", "b", "c"]), Some(&json!("deep")));
        assert_eq!(get_path(&tree, &["a", "x", "c"]), None);
        assert_eq!(get_path(&tree, &[]), Some(&tree));
    }
}
