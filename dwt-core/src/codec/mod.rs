pub mod le;

pub use le::{u16le, u32le};
