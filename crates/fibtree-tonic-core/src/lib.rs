#![doc = include_str!("../README.md")]

mod common;
pub use common::*;
// Public re-export so downstream crates can access `fibtree` via
// `fibtree_tonic_core::fibtree`
pub use fibtree;
