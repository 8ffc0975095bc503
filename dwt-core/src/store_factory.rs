use std::path::Path;

use crate::error::Result;
use crate::store::KvStore;
use crate::store_fs::FsStore;
use crate::store_mem::MemStore;

pub enum Backend {
    Fs,
    Memory,
}

pub fn open_store(backend: Backend, dir: &Path) -> Result<Box<dyn KvStore>> {
    match backend {
        Backend::Fs => Ok(Box::new(FsStore::new(dir)?)),
        Backend::Memory => Ok(Box::new(MemStore::new())),
    }
}
