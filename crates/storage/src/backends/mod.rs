//! Bundle source backends.

pub mod filesystem;
pub mod memory;
