// dwt_core/src/store.rs
use serde_json::Value;

use crate::error::Result;

/// Key-value collaborator holding JSON values (the analogue of browser
/// local storage). One writer at a time; no locking.
pub trait KvStore: Send {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn set(&mut self, key: &str, value: &Value) -> Result<()>;

    /// Whether the key holds anything at all, decodable or not.
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl<S: KvStore + ?Sized> KvStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        (**self).set(key, value)
    }

    fn contains(&self, key: &str) -> Result<bool> {
        (**self).contains(key)
    }
}
