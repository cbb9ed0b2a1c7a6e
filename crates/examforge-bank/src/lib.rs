//! examforge-bank — Item bank backends.
//!
//! Implements the `ItemStore` trait over an in-memory collection and a
//! JSON-file-backed bank. Durable multi-user storage is a product concern;
//! these backends cover single-host assembly runs and tests.

pub mod file;
pub mod memory;

pub use file::FileBank;
pub use memory::MemoryBank;
