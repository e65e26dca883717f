//! Session storage abstraction.
//!
//! The wizard never owns session durability; the host hands it a
//! [`SessionStore`] scoped to one client identity. Keys are dot-joined
//! paths (`Wizard.0`, `Wizard.lastCompletedStep`) and values are plain
//! [`serde_json::Value`]s, so any key-value session backend can adapt.

use std::collections::HashMap;

use anyhow::Result;
use serde_json::Value;

/// Key-value session access scoped to a single client.
///
/// Implementations own serialization, expiry, and isolation per session
/// identity. The wizard assumes the host already serializes access for a
/// given session; concurrent submissions from the same session are
/// last-write-wins.
pub trait SessionStore {
    /// Read the value stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    fn write(&mut self, key: &str, value: Value) -> Result<()>;

    /// Delete `prefix` itself and every key under it (`prefix.*`).
    fn delete_prefix(&mut self, prefix: &str) -> Result<()>;
}

/// In-process session store backed by a `HashMap`.
///
/// Used by the demo server (one per client cookie) and by tests. Not a
/// production session backend.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    entries: HashMap<String, Value>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionStore for MemorySession {
    fn read(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete_prefix(&mut self, prefix: &str) -> Result<()> {
        let subtree = format!("{prefix}.");
        self.entries
            .retain(|key, _| key != prefix && !key.starts_with(&subtree));
        Ok(())
    }
}
