use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::warn;

use crate::error::{DwtError, Result};
use crate::store::KvStore;
use crate::util::atomic::write_atomic;

/// One `<key>.json` file per key inside `dir`.
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let ok = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !ok {
            return Err(DwtError::InvalidInput(format!("invalid store key {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KvStore for FsStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let p = self.path_for(key)?;
        let bytes = match fs::read(&p) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        // Undecodable content reads as absent, like a corrupt local-storage slot.
        match serde_json::from_slice(&bytes) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                warn!(key, path = %p.display(), error = %e, "ignoring undecodable store value");
                Ok(None)
            }
        }
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        let p = self.path_for(key)?;
        let bytes = serde_json::to_vec(value)?;
        write_atomic(&p, &bytes)
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key)?.exists())
    }
}
