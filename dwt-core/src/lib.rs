#![forbid(unsafe_code)]

pub mod error;

pub mod util {
    pub mod atomic;
}

pub mod checksum;
pub mod codec;

pub mod container {
    pub mod zip;
}

pub mod pack {
    pub mod writer;
}

pub mod read {
    pub mod zip;
}

pub mod domain;
pub mod store;
pub mod store_factory;
pub mod store_fs;
pub mod store_mem;

pub mod export;
pub mod migrate;
pub mod stats;
pub mod tracker;

// Re-exports: stable API surface
pub use checksum::crc32;
pub use domain::{Dog, Entry, Snapshot};
pub use error::{DwtError, Result};
pub use migrate::{MigrationOutcome, MigrationReport, migrate_if_needed, normalize_entries};
pub use pack::writer::{ArchiveOptions, DuplicateNames, NamedPayload, create_archive, create_archive_with};
pub use read::zip::{list_archive, read_archive};
pub use stats::WeightStats;
pub use store::KvStore;
pub use store_factory::{Backend, open_store};
pub use tracker::{DogPatch, EntryPatch, Tracker};
