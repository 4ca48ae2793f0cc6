//! Reconciling contexts evolved independently by parallel regions.
//!
//! Every composite region receives its own copy of the context. Afterward
//! each copy is diffed against the shared base and the non-destructive part
//! of every diff is replayed, in region order, onto a copy of the base.

use serde_json::{Map, Value};

/// Kind of a single structural difference.
#[derive(Clone, Debug, PartialEq)]
pub enum ChangeKind {
    /// Key absent from the base.
    Added(Value),
    /// Value present in both but different.
    Edited(Value),
    /// Key present in the base, absent from the derived copy.
    Deleted,
}

/// A difference located by its key path from the context root.
#[derive(Clone, Debug, PartialEq)]
pub struct Change {
    pub path: Vec<String>,
    pub kind: ChangeKind,
}

/// Structural diff of `derived` against `base`.
///
/// Objects are compared key by key; arrays and scalars are atomic.
pub fn diff(base: &Value, derived: &Value) -> Vec<Change> {
    let mut changes = Vec::new();
    diff_into(&mut Vec::new(), base, derived, &mut changes);
    changes
}

fn diff_into(path: &mut Vec<String>, base: &Value, derived: &Value, changes: &mut Vec<Change>) {
    match (base, derived) {
        (Value::Object(base), Value::Object(derived)) => {
            for (key, before) in base {
                path.push(key.clone());
                match derived.get(key) {
                    Some(after) => diff_into(path, before, after, changes),
                    None => changes.push(Change {
                        path: path.clone(),
                        kind: ChangeKind::Deleted,
                    }),
                }
                path.pop();
            }
            for (key, after) in derived {
                if !base.contains_key(key) {
                    let mut added = path.clone();
                    added.push(key.clone());
                    changes.push(Change {
                        path: added,
                        kind: ChangeKind::Added(after.clone()),
                    });
                }
            }
        }
        (before, after) if before != after => changes.push(Change {
            path: path.clone(),
            kind: ChangeKind::Edited(after.clone()),
        }),
        _ => {}
    }
}

/// Apply one change onto `target`.
///
/// Missing or non-object intermediate values along the path are replaced
/// with objects.
pub fn apply(target: &mut Value, change: &Change) {
    let Some((last, parents)) = change.path.split_last() else {
        match &change.kind {
            ChangeKind::Added(value) | ChangeKind::Edited(value) => *target = value.clone(),
            ChangeKind::Deleted => *target = Value::Null,
        }
        return;
    };

    let mut cursor = target;
    for key in parents {
        let Some(object) = object_mut(cursor) else {
            return;
        };
        cursor = object
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let Some(object) = object_mut(cursor) else {
        return;
    };
    match &change.kind {
        ChangeKind::Added(value) | ChangeKind::Edited(value) => {
            object.insert(last.clone(), value.clone());
        }
        ChangeKind::Deleted => {
            object.remove(last);
        }
    }
}

/// `value` as an object, replacing it with an empty one first if needed.
fn object_mut(value: &mut Value) -> Option<&mut Map<String, Value>> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    value.as_object_mut()
}

/// Merge the contexts produced by parallel regions.
///
/// A single derived context is returned as is. Otherwise deletions are
/// discarded and additions and edits are applied in region order, so later
/// regions win.
///
/// # Example
///
/// ```rust
/// use hierarch::core::context::merge;
/// use serde_json::json;
///
/// let merged = merge(
///     &json!({"a": 1}),
///     vec![json!({"a": 1, "b": 2}), json!({"a": 1, "c": 3})],
/// );
/// assert_eq!(merged, json!({"a": 1, "b": 2, "c": 3}));
/// ```
pub fn merge(base: &Value, derived: Vec<Value>) -> Value {
    let mut derived = derived;
    match derived.len() {
        0 => return base.clone(),
        1 => return derived.pop().unwrap_or_else(|| base.clone()),
        _ => {}
    }

    let mut merged = base.clone();
    derived
        .iter()
        .flat_map(|context| diff(base, context))
        .filter(|change| change.kind != ChangeKind::Deleted)
        .for_each(|change| apply(&mut merged, &change));
    merged
}
