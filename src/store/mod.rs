//! Storage backends and the abstract store contract.

pub mod memory;
pub mod postgres;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{OutputSnapshot, ReadStore, WriteStore};
