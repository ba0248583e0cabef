//! Per-run artifact store.
//!
//! Values are held as JSON so that any serializable artifact can be passed
//! between stages and dumped into the run log for diagnostics.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Short-lived key/value memory scoped to one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Unique run ID
    pub run_id: Uuid,
    values: HashMap<String, serde_json::Value>,
    producers: HashMap<String, String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Create an empty session with a fresh run ID.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            values: HashMap::new(),
            producers: HashMap::new(),
        }
    }

    /// Store a value, overwriting any previous value under `key`.
    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> CoreResult<()> {
        let json = serde_json::to_value(value)?;
        self.values.insert(key.into(), json);
        Ok(())
    }

    /// Store a value on behalf of a producer.
    ///
    /// A key first written through `set_from` belongs to that producer; writes
    /// from any other producer are rejected.
    pub fn set_from<T: Serialize>(
        &mut self,
        producer: &str,
        key: impl Into<String>,
        value: &T,
    ) -> CoreResult<()> {
        let key = key.into();
        if let Some(owner) = self.producers.get(&key) {
            if owner != producer {
                return Err(CoreError::KeyOwned {
                    key,
                    owner: owner.clone(),
                    producer: producer.to_string(),
                });
            }
        }
        self.set(key.clone(), value)?;
        self.producers.insert(key, producer.to_string());
        Ok(())
    }

    /// Fetch and decode a value.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> CoreResult<T> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| CoreError::KeyNotFound(key.to_string()))?;
        serde_json::from_value(value.clone())
            .map_err(|e| CoreError::Serialization(format!("{}: {}", key, e)))
    }

    /// Fetch a value that may legitimately be absent.
    pub fn get_optional<T: DeserializeOwned>(&self, key: &str) -> CoreResult<Option<T>> {
        match self.get(key) {
            Ok(value) => Ok(Some(value)),
            Err(CoreError::KeyNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Raw JSON view of a value.
    pub fn get_raw(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Name of the producer that owns `key`, if any.
    pub fn producer_of(&self, key: &str) -> Option<&str> {
        self.producers.get(key).map(|s| s.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.producers.remove(key);
        self.values.remove(key)
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.values.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
