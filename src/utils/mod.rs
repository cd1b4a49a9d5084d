//! Shared helpers: collection constructors and test fixtures.

pub mod collections;
pub mod testing;
