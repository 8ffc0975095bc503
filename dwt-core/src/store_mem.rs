use std::collections::HashMap;

use serde_json::Value;

use crate::error::Result;
use crate::store::KvStore;

#[derive(Clone, Debug, Default)]
pub struct MemStore {
    values: HashMap<String, Value>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used to seed fixtures.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        self.values.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.values.contains_key(key))
    }
}
