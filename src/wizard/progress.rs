//! Progress state: the namespaced session view of wizard data.
//!
//! Layout under the configured namespace (default `Wizard`):
//!
//! ```text
//! <ns>.<index>            submitted fields for step <index> (JSON object)
//! <ns>.lastCompletedStep  highest step index successfully submitted
//! ```
//!
//! Values are schema-free; the host session owns durability and expiry.
//! Absent keys always mean "no progress yet", never a fault.

use anyhow::Result;
use serde_json::{Map, Value};
use tracing::warn;

use crate::session::SessionStore;

/// Session key leaf for the last completed index. Kept stable so existing
/// sessions survive a redeploy.
const LAST_COMPLETED: &str = "lastCompletedStep";

fn key(namespace: &str, leaf: &str) -> String {
    format!("{namespace}.{leaf}")
}

/// Stored field values for one step, or an empty map if none (or if the
/// stored value is not an object).
pub fn step_data<S>(session: &S, namespace: &str, index: usize) -> Result<Map<String, Value>>
where
    S: SessionStore + ?Sized,
{
    match session.read(&key(namespace, &index.to_string()))? {
        Some(Value::Object(map)) => Ok(map),
        Some(other) => {
            warn!(namespace, index, ?other, "non-object step data in session, ignoring");
            Ok(Map::new())
        }
        None => Ok(Map::new()),
    }
}

/// Persist submitted fields for one step, deep-merged over whatever was
/// stored before so a partial re-submission does not discard earlier fields.
pub fn store_step_data<S>(
    session: &mut S,
    namespace: &str,
    index: usize,
    data: &Map<String, Value>,
) -> Result<()>
where
    S: SessionStore + ?Sized,
{
    let mut stored = step_data(session, namespace, index)?;
    deep_merge(&mut stored, data);
    session.write(
        &key(namespace, &index.to_string()),
        Value::Object(stored),
    )
}

/// The last completed step index, or `None` when no progress is recorded or
/// the stored value is not a number.
pub fn last_completed<S>(session: &S, namespace: &str) -> Result<Option<usize>>
where
    S: SessionStore + ?Sized,
{
    let value = session.read(&key(namespace, LAST_COMPLETED))?;
    match value {
        Some(Value::Number(n)) => Ok(n.as_u64().map(|n| n as usize)),
        Some(other) => {
            warn!(namespace, ?other, "non-numeric lastCompletedStep, treating as no progress");
            Ok(None)
        }
        None => Ok(None),
    }
}

pub fn set_last_completed<S>(session: &mut S, namespace: &str, index: usize) -> Result<()>
where
    S: SessionStore + ?Sized,
{
    session.write(&key(namespace, LAST_COMPLETED), Value::from(index as u64))
}

/// Union of all stored step data for indices `0..=up_to`, merged in index
/// order so later steps win on key conflicts.
pub fn merged_data<S>(session: &S, namespace: &str, up_to: usize) -> Result<Map<String, Value>>
where
    S: SessionStore + ?Sized,
{
    let mut merged = Map::new();
    for index in 0..=up_to {
        let data = step_data(session, namespace, index)?;
        deep_merge(&mut merged, &data);
    }
    Ok(merged)
}

/// Drop the whole namespaced subtree, returning the wizard to its
/// no-progress state.
pub fn reset<S>(session: &mut S, namespace: &str) -> Result<()>
where
    S: SessionStore + ?Sized,
{
    session.delete_prefix(namespace)
}

/// Merge `overlay` into `base`. Nested objects merge recursively; any other
/// value in `overlay` replaces the one in `base`.
pub fn deep_merge(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (field, value) in overlay {
        match (base.get_mut(field), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                base.insert(field.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySession;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_deep_merge_nested_objects() {
        let mut base = obj(json!({"address": {"city": "Oslo", "zip": "0150"}, "a": 1}));
        let overlay = obj(json!({"address": {"zip": "0151"}, "b": 2}));

        deep_merge(&mut base, &overlay);

        assert_eq!(
            Value::Object(base),
            json!({"address": {"city": "Oslo", "zip": "0151"}, "a": 1, "b": 2})
        );
    }

    #[test]
    fn test_deep_merge_scalar_replaces_object() {
        let mut base = obj(json!({"k": {"nested": true}}));
        let overlay = obj(json!({"k": 7}));

        deep_merge(&mut base, &overlay);
        assert_eq!(base["k"], json!(7));
    }

    #[test]
    fn test_merged_data_later_index_wins() {
        let mut session = MemorySession::new();
        store_step_data(&mut session, "Wizard", 0, &obj(json!({"a": 1}))).unwrap();
        store_step_data(&mut session, "Wizard", 1, &obj(json!({"a": 2, "b": 3}))).unwrap();

        let merged = merged_data(&session, "Wizard", 1).unwrap();
        assert_eq!(Value::Object(merged), json!({"a": 2, "b": 3}));

        // Capped at the requested index
        let merged = merged_data(&session, "Wizard", 0).unwrap();
        assert_eq!(Value::Object(merged), json!({"a": 1}));
    }

    #[test]
    fn test_store_step_data_merges_with_prior() {
        let mut session = MemorySession::new();
        store_step_data(&mut session, "Wizard", 0, &obj(json!({"email": "a@b", "opt_in": true})))
            .unwrap();
        // Partial re-submission must not discard opt_in
        store_step_data(&mut session, "Wizard", 0, &obj(json!({"email": "c@d"}))).unwrap();

        let data = step_data(&session, "Wizard", 0).unwrap();
        assert_eq!(Value::Object(data), json!({"email": "c@d", "opt_in": true}));
    }

    #[test]
    fn test_last_completed_tolerates_garbage() {
        let mut session = MemorySession::new();
        assert_eq!(last_completed(&session, "Wizard").unwrap(), None);

        session.write("Wizard.lastCompletedStep", json!("two")).unwrap();
        assert_eq!(last_completed(&session, "Wizard").unwrap(), None);

        session.write("Wizard.lastCompletedStep", json!(-3)).unwrap();
        assert_eq!(last_completed(&session, "Wizard").unwrap(), None);

        set_last_completed(&mut session, "Wizard", 2).unwrap();
        assert_eq!(last_completed(&session, "Wizard").unwrap(), Some(2));
    }

    #[test]
    fn test_reset_clears_namespace_only() {
        let mut session = MemorySession::new();
        store_step_data(&mut session, "Wizard", 0, &obj(json!({"a": 1}))).unwrap();
        set_last_completed(&mut session, "Wizard", 0).unwrap();
        session.write("Flash.notice", json!("kept")).unwrap();

        reset(&mut session, "Wizard").unwrap();

        assert_eq!(last_completed(&session, "Wizard").unwrap(), None);
        assert!(step_data(&session, "Wizard", 0).unwrap().is_empty());
        assert_eq!(session.read("Flash.notice").unwrap(), Some(json!("kept")));
    }
}
