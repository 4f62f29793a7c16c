//! Nested-path addressing over JSON-like profile trees.
//!
//! Reads never fail for a missing node: a broken traversal (null node, absent
//! key, out-of-range index, index into a map, key into a list) yields the
//! fallback. Only a malformed path string is an error.

#![allow(dead_code)]

pub mod path;

use serde_json::{Map, Value};
use tracing::debug;

pub use path::{parse_path, InvalidPathError, PathSegment};

/// Resolves `path` against `tree`. A trailing `null` counts as unresolved.
pub fn get<'a>(tree: &'a Value, path: &str) -> Result<Option<&'a Value>, InvalidPathError> {
    let segments = parse_path(path)?;

    let mut node = tree;
    for segment in &segments {
        match step(node, segment) {
            Some(next) => node = next,
            None => return Ok(None),
        }
    }

    Ok(if node.is_null() { None } else { Some(node) })
}

/// Like [`get`], but returns an owned copy of the node or `fallback`.
pub fn get_or(tree: &Value, path: &str, fallback: Value) -> Result<Value, InvalidPathError> {
    Ok(get(tree, path)?.cloned().unwrap_or(fallback))
}

/// Assigns `value` at `path` in place and returns it.
///
/// Intermediate nodes are never created. If the traversal breaks, or the final
/// container cannot take the segment (key into a list, index past the end,
/// anything into a scalar), the tree is left untouched and `fallback` is returned.
pub fn set(
    tree: &mut Value,
    path: &str,
    value: Value,
    fallback: Value,
) -> Result<Value, InvalidPathError> {
    let segments = parse_path(path)?;
    let Some((last, parents)) = segments.split_last() else {
        return Ok(fallback);
    };

    let mut node = tree;
    for segment in parents {
        match step_mut(node, segment) {
            Some(next) => node = next,
            None => return Ok(fallback),
        }
    }

    match (node, last) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.insert(key.clone(), value.clone());
            Ok(value)
        }
        (Value::Array(items), PathSegment::Index(idx)) if *idx < items.len() => {
            items[*idx] = value.clone();
            Ok(value)
        }
        _ => Ok(fallback),
    }
}

/// Removes the node at `path`.
///
/// Map keys are removed outright. List slots are overwritten with `null` so
/// sibling indices stay stable. Any traversal break is a silent no-op.
pub fn delete(tree: &mut Value, path: &str) -> Result<(), InvalidPathError> {
    let segments = parse_path(path)?;
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };

    let mut node = tree;
    for segment in parents {
        match step_mut(node, segment) {
            Some(next) => node = next,
            None => return Ok(()),
        }
    }

    match (node, last) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.shift_remove(key);
        }
        (Value::Array(items), PathSegment::Index(idx)) => {
            if let Some(slot) = items.get_mut(*idx) {
                *slot = Value::Null;
            }
        }
        _ => {}
    }

    Ok(())
}

/// Pulls the profile fields relevant to one question.
///
/// Unresolvable paths are omitted rather than mapped to `null`, and a
/// malformed path is skipped without affecting the others.
pub fn extract_snippets<S: AsRef<str>>(tree: &Value, paths: &[S]) -> Map<String, Value> {
    let mut snippets = Map::new();

    for path in paths {
        let path = path.as_ref();
        match get(tree, path) {
            Ok(Some(value)) => {
                snippets.insert(path.to_string(), value.clone());
            }
            Ok(None) => {}
            Err(e) => debug!("Skipping snippet path: {e}"),
        }
    }

    snippets
}

fn step<'a>(node: &'a Value, segment: &PathSegment) -> Option<&'a Value> {
    match (node, segment) {
        (Value::Object(map), PathSegment::Key(key)) => map.get(key),
        (Value::Array(items), PathSegment::Index(idx)) => items.get(*idx),
        _ => None,
    }
}

fn step_mut<'a>(node: &'a mut Value, segment: &PathSegment) -> Option<&'a mut Value> {
    match (node, segment) {
        (Value::Object(map), PathSegment::Key(key)) => map.get_mut(key),
        (Value::Array(items), PathSegment::Index(idx)) => items.get_mut(*idx),
        _ => None,
    }
}
