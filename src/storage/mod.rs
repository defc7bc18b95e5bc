//! Storage engine components

pub mod engine;
pub mod index;
pub mod stripes;
pub mod wal;

pub use engine::{Engine, StatSnapshot};
