pub mod crc32;

pub use crc32::{Crc32, crc32};
